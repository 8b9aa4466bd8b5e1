//! # RK4 Step Benchmark
//!
//! One physics step = four derivative evaluations plus normalization.
//! Real-time mode needs this well under a millisecond.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use aerosync_core::aircraft::{
    GenericCoefficients, GraphicsAssets, InitialCondition, LinearCoefficients,
};
use aerosync_core::{
    AeroModelConfig, AircraftConfig, AircraftModel, Airframe, ControlSettings, RigidBodyState, Rk4,
};

fn model(aero: AeroModelConfig) -> AircraftModel {
    let config = AircraftConfig {
        name: "bench".to_string(),
        airframe: Airframe::default(),
        initial: InitialCondition::default(),
        controls: ControlSettings { throttle: 0.6, ..ControlSettings::default() },
        graphics: GraphicsAssets::default(),
        aero,
    };
    AircraftModel::from_config(&config).unwrap()
}

fn bench_constant_field(c: &mut Criterion) {
    let field = RigidBodyState::from_array([0.1; 13]);
    let state = RigidBodyState::at_rest();

    c.bench_function("rk4_constant_field", |b| {
        b.iter(|| black_box(Rk4.step(black_box(&state), |_, _| field, 0.0, 0.01)));
    });
}

fn bench_linearized_step(c: &mut Criterion) {
    let aircraft = model(AeroModelConfig::LinearizedCoefficients(LinearCoefficients::default()));
    let state = aerosync_core::AircraftDerivativeProvider::initial_state(&aircraft);

    c.bench_function("rk4_linearized_step", |b| {
        b.iter(|| black_box(Rk4.step_provider(&aircraft, black_box(&state), 0.0, 0.01)));
    });
}

fn bench_generic_1s(c: &mut Criterion) {
    let aircraft = model(AeroModelConfig::GenericAero(GenericCoefficients::default()));
    let initial = aerosync_core::AircraftDerivativeProvider::initial_state(&aircraft);

    c.bench_function("rk4_generic_100_steps", |b| {
        b.iter(|| {
            let mut state = initial;
            let mut t = 0.0;
            for _ in 0..100 {
                state = Rk4.step_provider(&aircraft, &state, t, 0.01);
                t += 0.01;
            }
            black_box(state)
        });
    });
}

criterion_group!(benches, bench_constant_field, bench_linearized_step, bench_generic_1s);
criterion_main!(benches);
