//! Property-based invariants over `Core::tick` that must hold regardless of
//! the specific sequence of mass samples and drop edges fed into it (spec
//! §3 `Snapshot` field bounds, §4.F `auto_clamp` semantics).

use infusion_core::builder::CoreBuilder;
use infusion_core::state_machine::{ButtonEvent, ButtonKind};
use infusion_core::{CoreEvent, State};
use infusion_traits::TestClock;
use proptest::prelude::*;
use std::time::Duration;

prop_compose! {
    /// A bounded sequence of (raw_mass_g, drop_edges_this_tick) pairs, mass
    /// drifting slowly downward from a plausible starting reading.
    fn tick_sequence()(len in 5usize..60) -> Vec<(f32, u8)> {
        let mut mass = 572.0f32;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            mass -= (i % 3) as f32 * 0.5;
            out.push((mass.max(0.0), (i % 4) as u8));
        }
        out
    }
}

proptest! {
    /// `progress_pct` is always clamped to `[0, 100]` no matter how the
    /// mass/drop trajectory behaves.
    #[test]
    fn progress_pct_stays_within_bounds(seq in tick_sequence()) {
        let clock = TestClock::new();
        let mut core = CoreBuilder::new()
            .with_clock(clock.clone())
            .with_target_empty_g(10.0)
            .build()
            .unwrap();
        core.on_mass_sample(572.0);
        core.on_button(ButtonKind::Init, ButtonEvent::ShortPress);

        for (mass, drops) in seq {
            clock.advance(Duration::from_millis(1000));
            core.on_mass_sample(mass);
            for _ in 0..drops {
                core.on_drop_edge();
            }
            let (snap, _events) = core.tick();
            prop_assert!(snap.progress_pct >= 0.0 && snap.progress_pct <= 100.0);
            prop_assert!(snap.fused_remaining_g >= 0.0);
        }
    }

    /// `total_drops` is monotonically non-decreasing across ticks: the ring
    /// only ever accumulates, never loses, edges (spec §4.E, §3 Ownership).
    #[test]
    fn total_drops_never_decreases(seq in tick_sequence()) {
        let clock = TestClock::new();
        let mut core = CoreBuilder::new()
            .with_clock(clock.clone())
            .with_target_empty_g(10.0)
            .build()
            .unwrap();
        core.on_mass_sample(572.0);
        core.on_button(ButtonKind::Init, ButtonEvent::ShortPress);

        let mut last_total = 0u32;
        for (mass, drops) in seq {
            clock.advance(Duration::from_millis(1000));
            core.on_mass_sample(mass);
            for _ in 0..drops {
                core.on_drop_edge();
            }
            let (snap, _events) = core.tick();
            prop_assert!(snap.total_drops >= last_total);
            last_total = snap.total_drops;
        }
    }

    /// `auto_clamp` is only ever observed alongside `Completed` or
    /// `InfusionError` — the two states that latch it (spec §4.F).
    #[test]
    fn auto_clamp_implies_terminal_or_error_state(seq in tick_sequence()) {
        let clock = TestClock::new();
        let mut core = CoreBuilder::new()
            .with_clock(clock.clone())
            .with_target_empty_g(10.0)
            .build()
            .unwrap();
        core.on_mass_sample(572.0);
        core.on_button(ButtonKind::Init, ButtonEvent::ShortPress);

        for (mass, drops) in seq {
            clock.advance(Duration::from_millis(1000));
            core.on_mass_sample(mass);
            for _ in 0..drops {
                core.on_drop_edge();
            }
            let (snap, _events) = core.tick();
            if snap.auto_clamp {
                prop_assert!(matches!(snap.state, State::Completed | State::InfusionError));
            }
        }
    }

    /// No event stream ever contains more than one `StateChanged` into the
    /// same state back-to-back for a single tick (each tick evaluates the
    /// FSM once; duplicate same-tick transitions would indicate a bug).
    #[test]
    fn no_tick_emits_duplicate_state_changed_events(seq in tick_sequence()) {
        let clock = TestClock::new();
        let mut core = CoreBuilder::new()
            .with_clock(clock.clone())
            .with_target_empty_g(10.0)
            .build()
            .unwrap();
        core.on_mass_sample(572.0);
        core.on_button(ButtonKind::Init, ButtonEvent::ShortPress);

        for (mass, drops) in seq {
            clock.advance(Duration::from_millis(1000));
            core.on_mass_sample(mass);
            for _ in 0..drops {
                core.on_drop_edge();
            }
            let (_snap, events) = core.tick();
            let state_changes = events
                .iter()
                .filter(|e| matches!(e, CoreEvent::StateChanged { .. }))
                .count();
            prop_assert!(state_changes <= 1);
        }
    }
}
