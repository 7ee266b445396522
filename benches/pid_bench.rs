use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use nalgebra::{UnitQuaternion, Vector3};

use ship_stabilization::component_a::sensor::SensorSnapshot;
use ship_stabilization::component_b::{
    pid::{PidController, PidGains},
    torque::{TorqueConfig, TorqueStabilization, TorqueStabilizer},
};

fn pid_refresh_bench(c: &mut Criterion) {
    let mut pid = PidController::new(PidGains::new(1.5, 0.05, 0.4));
    let mut pv = 0.0;

    c.bench_function("pid_refresh", |b| {
        b.iter(|| {
            pv = (pv + 0.01) % 1.0;
            black_box(pid.refresh(black_box(pv), 0.0, 0.02));
        })
    });
}

fn torque_direction_bench(c: &mut Criterion) {
    let mut torque = TorqueStabilizer::new(TorqueConfig::default());
    torque.set_on(true);
    torque.set_xz_mode(TorqueStabilization::Direction);
    torque.set_y_mode(TorqueStabilization::Direction);

    let snapshot = SensorSnapshot {
        rotation: UnitQuaternion::from_euler_angles(0.2, -0.4, 0.1),
        angular_velocity: Vector3::new(0.3, 0.1, -0.2),
        ..SensorSnapshot::default()
    };

    c.bench_function("torque_direction_update", |b| {
        b.iter(|| {
            black_box(torque.update(0.02, black_box(&snapshot)));
        })
    });
}

criterion_group!(benches, pid_refresh_bench, torque_direction_bench);
criterion_main!(benches);
