//! Tick orchestrator (spec §4.G): the `Core<C>` struct composing every
//! estimator component and the supervisory state machine.

use infusion_traits::Clock;
use std::time::Instant;

use crate::calibration::CalibrationContext;
use crate::commands::{Command, parse_command};
use crate::config::CoreConfig;
use crate::drip_kf::DripKf;
use crate::drop_ring::DropRing;
use crate::events::CoreEvent;
use crate::fusion::Fusion;
use crate::snapshot::Snapshot;
use crate::state_machine::{ButtonEvent, ButtonKind, ReinitOutcome, StateMachine};
use crate::weight_kf::WeightKf;
use crate::wpd::Wpd;

pub struct Core<C: Clock> {
    clock: C,
    epoch: Instant,
    config: CoreConfig,
    weight_kf: WeightKf,
    drip_kf: DripKf,
    wpd: Wpd,
    fusion: Fusion,
    ring: DropRing,
    calib: CalibrationContext,
    sm: StateMachine,
    last_tick_ms: Option<u64>,
    last_raw_mass_g: f32,
}

impl<C: Clock> Core<C> {
    pub(crate) fn new(clock: C, config: CoreConfig) -> Self {
        let epoch = clock.now();
        let weight_kf = WeightKf::new(
            config.filters.weight_sigma_a,
            config.filters.weight_sigma_j,
            config.filters.weight_r,
        );
        let drip_kf = DripKf::new(config.filters.drip_sigma_a, config.filters.drip_r);
        let wpd = Wpd::new(
            (config.physical.wpd_min_gpd + config.physical.wpd_max_gpd) / 2.0,
            config.filters.wpd_q,
            config.physical.wpd_min_gpd,
            config.physical.wpd_max_gpd,
        );
        let fusion = Fusion::new(
            config.fusion.q_flow,
            config.fusion.q_rem,
            config.fusion.r_flow_w,
            config.fusion.r_flow_d,
            config.fusion.r_rem_w,
            config.fusion.r_rem_d,
        );
        let ring = DropRing::new(config.ring.capacity);
        Self {
            clock,
            epoch,
            config,
            weight_kf,
            drip_kf,
            wpd,
            fusion,
            ring,
            calib: CalibrationContext::default(),
            sm: StateMachine::new(),
            last_tick_ms: None,
            last_raw_mass_g: 0.0,
        }
    }

    pub fn state(&self) -> crate::snapshot::State {
        self.sm.state()
    }

    fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// Producer-side entry point for a debounced drop edge (spec §4.E). Safe
    /// to call from an interrupt context or a background polling thread.
    pub fn on_drop_edge(&self) {
        self.ring.on_drop_edge(self.now_ms());
    }

    /// Record the latest raw load-cell sample; consumed by the next `tick`.
    pub fn on_mass_sample(&mut self, raw_g: f32) {
        self.last_raw_mass_g = crate::util::sanitize(raw_g, self.last_raw_mass_g);
    }

    fn restore_original_rs(&mut self) {
        if let Some(orig) = self.sm.original_rs() {
            self.weight_kf.set_r(orig.weight_r);
            self.drip_kf.set_r(orig.drip_r);
            self.fusion.set_flow_rs(orig.r_flow_w, orig.r_flow_d);
            self.fusion.set_rem_rs(orig.r_rem_w, orig.r_rem_d);
        }
    }

    /// Physical button press (spec §4.F, §6). `Init` runs the
    /// reinitialization procedure; `Reset` clears a latched error/completed
    /// state.
    pub fn on_button(&mut self, kind: ButtonKind, event: ButtonEvent) -> Vec<CoreEvent> {
        match kind {
            ButtonKind::Init => {
                let now_ms = self.now_ms();
                let raw_g = self.last_raw_mass_g;
                match self
                    .sm
                    .attempt_reinit(raw_g, &self.config.physical, &self.config.timings, now_ms)
                {
                    ReinitOutcome::Entered { liquid_mass_g, fast_rs, events } => {
                        self.weight_kf.set_r(fast_rs.weight_r);
                        self.weight_kf.init(liquid_mass_g, 0.0, 0.0);
                        self.drip_kf.set_r(fast_rs.drip_r);
                        self.drip_kf.init(0.0, 0.0);
                        self.fusion.set_flow_rs(fast_rs.r_flow_w, fast_rs.r_flow_d);
                        self.fusion.set_rem_rs(fast_rs.r_rem_w, fast_rs.r_rem_d);
                        self.fusion.reinit(liquid_mass_g);
                        self.wpd.start();
                        self.calib.reinit(liquid_mass_g);
                        self.ring = DropRing::new(self.config.ring.capacity);
                        self.last_tick_ms = None;
                        events
                    }
                    ReinitOutcome::Rejected { events, .. } => events,
                }
            }
            ButtonKind::Reset => self.sm.on_button(kind, event),
        }
    }

    /// WebSocket command grammar (spec §6).
    pub fn on_command(&mut self, cmd: &str) -> Vec<CoreEvent> {
        match parse_command(cmd) {
            Ok(Command::CalibrateWpdStart) => {
                let now_ms = self.now_ms();
                self.wpd.start();
                self.sm.start_wpd_longcal(now_ms, self.calib.cumulative_drops);
                vec![CoreEvent::WpdCalibrationStarted]
            }
            Ok(Command::CalibrateWpdStop) => {
                let now_ms = self.now_ms();
                self.wpd.stop();
                match self.sm.stop_wpd_longcal(now_ms, self.calib.cumulative_drops, &self.config.timings) {
                    Some(CoreEvent::WpdCalibrationCompleted { drops, duration_s, .. }) => {
                        vec![CoreEvent::WpdCalibrationCompleted {
                            wpd_gpd: self.wpd.wpd_gpd(),
                            drops,
                            duration_s,
                        }]
                    }
                    Some(other) => vec![other],
                    None => vec![],
                }
            }
            Ok(Command::SetTotalVolume(ml)) => {
                if ml > 0.0 {
                    self.calib.initial_total_mass_g = ml * self.config.physical.liquid_density_g_per_ml;
                    vec![]
                } else {
                    vec![CoreEvent::CommandRejected {
                        reason: "SET_TOTAL_VOLUME must be > 0".to_string(),
                    }]
                }
            }
            Err(e) => vec![CoreEvent::CommandRejected { reason: e.to_string() }],
        }
    }

    /// Run one tick of the estimator (spec §4.G). Returns the published
    /// snapshot and any events raised this tick.
    pub fn tick(&mut self) -> (Snapshot, Vec<CoreEvent>) {
        let now_ms = self.now_ms();
        let dt_s = match self.last_tick_ms {
            Some(prev) => now_ms.saturating_sub(prev) as f32 / 1000.0,
            None => 0.0,
        };
        self.last_tick_ms = Some(now_ms);

        let raw_mass_g = self.last_raw_mass_g.max(0.0);
        let filtered_mass_g = self.weight_kf.update(raw_mass_g, dt_s);
        let weight_flow_gps = self.weight_kf.flow_gps();

        let (measured_rate, new_drops) = self.ring.drain_for_tick();
        let raw_drop_rate_dps = measured_rate.unwrap_or(0.0);
        match measured_rate {
            Some(rate) => {
                self.drip_kf.update(rate, dt_s);
            }
            None => self.drip_kf.predict_only(dt_s),
        }
        if new_drops > 0 {
            self.calib.cumulative_drops = self.calib.cumulative_drops.saturating_add(new_drops);
        }
        let filtered_drop_rate_dps = self.drip_kf.drop_rate_dps();
        let drip_flow_gps = self.drip_kf.flow_gps(self.wpd.wpd_gpd());

        if self.wpd.is_active() {
            self.wpd.calibrate(raw_mass_g, &self.calib);
        }

        let drop_remaining_g =
            (self.calib.initial_total_mass_g - self.calib.cumulative_drops as f32 * self.wpd.wpd_gpd())
                .max(0.0);

        self.fusion
            .step(dt_s, weight_flow_gps, drip_flow_gps, filtered_mass_g, drop_remaining_g);
        let fused_flow_gps = self.fusion.flow_gps();
        let fused_remaining_g = self.fusion.remaining_g();

        let target = self.config.target_empty_g;
        let raw_drip_flow_gps = raw_drop_rate_dps * self.wpd.wpd_gpd();
        let remaining_time_raw_weight_s = Snapshot::remaining_time_s(raw_mass_g, weight_flow_gps, target);
        let remaining_time_filt_weight_s =
            Snapshot::remaining_time_s(filtered_mass_g, weight_flow_gps, target);
        let remaining_time_raw_drip_s =
            Snapshot::remaining_time_s(drop_remaining_g, raw_drip_flow_gps, target);
        let remaining_time_filt_drip_s =
            Snapshot::remaining_time_s(drop_remaining_g, drip_flow_gps, target);
        let remaining_time_fused_s = Snapshot::remaining_time_s(fused_remaining_g, fused_flow_gps, target);

        let progress_pct = if self.calib.initial_total_mass_g > 1e-6 {
            (100.0 * (1.0 - fused_remaining_g / self.calib.initial_total_mass_g)).clamp(0.0, 100.0)
        } else {
            0.0
        };

        let ms_since_last_drip = self.ring.ms_since_last_drip(now_ms);
        let mut outcome = self.sm.evaluate(
            now_ms,
            fused_remaining_g,
            target,
            ms_since_last_drip,
            self.calib.cumulative_drops,
            &self.config.timings,
        );
        if outcome.restore_original_rs {
            self.restore_original_rs();
        }
        for ev in outcome.events.iter_mut() {
            if let CoreEvent::WpdCalibrationCompleted { wpd_gpd, .. } = ev {
                *wpd_gpd = self.wpd.wpd_gpd();
            }
        }

        let snapshot = Snapshot {
            filtered_mass_g,
            raw_mass_g,
            filtered_drop_rate_dps,
            raw_drop_rate_dps,
            weight_flow_gps,
            drip_flow_gps,
            fused_flow_gps,
            fused_remaining_g,
            drop_remaining_g,
            wpd_gpd: self.wpd.wpd_gpd(),
            total_drops: self.calib.cumulative_drops,
            progress_pct,
            remaining_time_raw_weight_s,
            remaining_time_filt_weight_s,
            remaining_time_raw_drip_s,
            remaining_time_filt_drip_s,
            remaining_time_fused_s,
            state: self.sm.state(),
            auto_clamp: self.sm.auto_clamp(),
        };
        (snapshot, outcome.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CoreBuilder;
    use infusion_traits::TestClock;
    use std::time::Duration;

    fn fresh_core() -> (Core<TestClock>, TestClock) {
        let clock = TestClock::new();
        let core = CoreBuilder::new()
            .with_clock(clock.clone())
            .with_target_empty_g(0.0)
            .build()
            .expect("build");
        (core, clock)
    }

    #[test]
    fn tick_before_any_reinit_reports_initializing() {
        let (mut core, _clock) = fresh_core();
        let (snap, _events) = core.tick();
        assert_eq!(snap.state, crate::snapshot::State::Initializing);
    }

    #[test]
    fn reinit_with_valid_reading_enters_fast_convergence() {
        let (mut core, _clock) = fresh_core();
        core.on_mass_sample(572.0); // 500g liquid after tare
        let events = core.on_button(ButtonKind::Init, ButtonEvent::ShortPress);
        assert_eq!(core.state(), crate::snapshot::State::FastConvergence);
        assert!(events.iter().any(|e| matches!(e, CoreEvent::WpdCalibrationStarted)));
    }

    #[test]
    fn fused_remaining_tracks_drops_over_ticks() {
        let (mut core, clock) = fresh_core();
        core.on_mass_sample(572.0);
        core.on_button(ButtonKind::Init, ButtonEvent::ShortPress);
        for i in 0..5u64 {
            clock.advance(Duration::from_millis(1000));
            core.on_drop_edge();
            core.on_mass_sample(572.0 - i as f32);
            let (snap, _) = core.tick();
            assert!(snap.fused_remaining_g <= 500.0 + 1.0);
        }
    }

    #[test]
    fn set_total_volume_updates_initial_mass() {
        let (mut core, _clock) = fresh_core();
        let events = core.on_command("SET_TOTAL_VOLUME:250.0");
        assert!(events.is_empty());
        assert_eq!(core.calib.initial_total_mass_g, 250.0);
    }

    #[test]
    fn set_total_volume_rejects_non_positive() {
        let (mut core, _clock) = fresh_core();
        let events = core.on_command("SET_TOTAL_VOLUME:-1.0");
        assert!(matches!(events[0], CoreEvent::CommandRejected { .. }));
    }

    #[test]
    fn unrecognized_command_is_rejected() {
        let (mut core, _clock) = fresh_core();
        let events = core.on_command("NONSENSE");
        assert!(matches!(events[0], CoreEvent::CommandRejected { .. }));
    }
}
