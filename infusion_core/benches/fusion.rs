//! Benchmarks the per-tick cost of `Core::tick` under a steady drip, the
//! hot path run once per second on-device (spec §4.G `T_main`).

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use infusion_core::builder::CoreBuilder;
use infusion_core::state_machine::{ButtonEvent, ButtonKind};
use infusion_traits::TestClock;
use std::time::Duration;

fn bench_steady_state_tick(c: &mut Criterion) {
    let clock = TestClock::new();
    let mut core = CoreBuilder::new()
        .with_clock(clock.clone())
        .with_target_empty_g(10.0)
        .build()
        .expect("valid config");
    core.on_mass_sample(572.0);
    core.on_button(ButtonKind::Init, ButtonEvent::ShortPress);

    c.bench_function("core_tick_steady_drip", |b| {
        b.iter(|| {
            clock.advance(Duration::from_millis(1000));
            core.on_mass_sample(black_box(560.0));
            core.on_drop_edge();
            let (snapshot, _events) = core.tick();
            black_box(snapshot);
        });
    });
}

criterion_group!(benches, bench_steady_state_tick);
criterion_main!(benches);
