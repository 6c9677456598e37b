//! Supervisory state machine (spec §4.F): orchestrates
//! `Initializing → FastConvergence → Normal → (InfusionError | Completed)`,
//! drop-interval stall detection, completion detection, and the
//! fast-convergence parameter swap.

use crate::calibration::ReinitRejection;
use crate::config::StateMachineTimings;
use crate::events::CoreEvent;
use crate::snapshot::State;

/// Every filter's `R`, captured exactly once at first construction so the
/// fast-convergence swap is always reversible (spec §4.F, §9
/// "Parameter-swap reversibility").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterRs {
    pub weight_r: f32,
    pub drip_r: f32,
    pub r_flow_w: f32,
    pub r_flow_d: f32,
    pub r_rem_w: f32,
    pub r_rem_d: f32,
}

impl FilterRs {
    /// Every `R` divided by 10, clipped at `>= 1e-7` (spec §4.F).
    pub fn fast_convergence(&self) -> FilterRs {
        let shrink = |r: f32| (r / 10.0).max(1e-7);
        FilterRs {
            weight_r: shrink(self.weight_r),
            drip_r: shrink(self.drip_r),
            r_flow_w: shrink(self.r_flow_w),
            r_flow_d: shrink(self.r_flow_d),
            r_rem_w: shrink(self.r_rem_w),
            r_rem_d: shrink(self.r_rem_d),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    Init,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ShortPress,
    LongPress,
}

/// Outcome of evaluating per-tick state-machine conditions (spec §4.F
/// stall/completion/fast-convergence-exit checks).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EvalOutcome {
    pub events: Vec<CoreEvent>,
    pub restore_original_rs: bool,
}

/// Outcome of a reinitialization attempt (spec §4.F "Reinitialization
/// procedure").
#[derive(Debug, Clone, PartialEq)]
pub enum ReinitOutcome {
    /// Reinit accepted; apply these fast-convergence `R`s to every filter
    /// and reset filter/calibration state with `liquid_mass_g`.
    Entered {
        liquid_mass_g: f32,
        fast_rs: FilterRs,
        events: Vec<CoreEvent>,
    },
    /// Reinit rejected; `latched` is true once three consecutive failures
    /// have occurred.
    Rejected {
        rejection: ReinitRejection,
        latched: bool,
        events: Vec<CoreEvent>,
    },
}

pub struct StateMachine {
    state: State,
    auto_clamp: bool,
    original_rs: Option<FilterRs>,
    fc_entered_at_ms: u64,
    last_stall_check_ms: u64,
    persistent_error_count: u8,
    wpd_cal_start: Option<(u64, u32)>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: State::Initializing,
            auto_clamp: false,
            original_rs: None,
            fc_entered_at_ms: 0,
            last_stall_check_ms: 0,
            persistent_error_count: 0,
            wpd_cal_start: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn auto_clamp(&self) -> bool {
        self.auto_clamp
    }

    /// Capture the first-seen `R`s as the restoration baseline. Subsequent
    /// calls are no-ops (spec §9 "captured once at first init").
    pub fn capture_original_rs_once(&mut self, rs: FilterRs) {
        if self.original_rs.is_none() {
            self.original_rs = Some(rs);
        }
    }

    fn transition(&mut self, to: State, events: &mut Vec<CoreEvent>) {
        if self.state != to {
            tracing::info!(from = self.state.as_upper_str(), to = to.as_upper_str(), "state transition");
            events.push(CoreEvent::StateChanged { from: self.state, to });
            self.state = to;
        }
    }

    /// Attempt a reinitialization (spec §4.F). `raw_g` is the unfiltered
    /// load-cell reading; `timings.max_reinit_failures` bounds the
    /// persistent-error latch.
    pub fn attempt_reinit(
        &mut self,
        raw_g: f32,
        physical: &crate::config::PhysicalConstants,
        timings: &StateMachineTimings,
        now_ms: u64,
    ) -> ReinitOutcome {
        match crate::calibration::validate_reinit_reading(raw_g, physical) {
            Ok(liquid_mass_g) => {
                self.persistent_error_count = 0;
                let mut events = Vec::new();
                self.transition(State::Initializing, &mut events);
                let original = self.original_rs.unwrap_or(FilterRs {
                    weight_r: 0.01,
                    drip_r: 0.02,
                    r_flow_w: 4e-4,
                    r_flow_d: 9e-4,
                    r_rem_w: 1e-2,
                    r_rem_d: 4e-2,
                });
                self.capture_original_rs_once(original);
                let fast_rs = self.original_rs.expect("captured above").fast_convergence();
                self.fc_entered_at_ms = now_ms;
                self.transition(State::FastConvergence, &mut events);
                events.push(CoreEvent::WpdCalibrationStarted);
                ReinitOutcome::Entered { liquid_mass_g, fast_rs, events }
            }
            Err(rejection) => {
                self.persistent_error_count = self.persistent_error_count.saturating_add(1);
                let latched = self.persistent_error_count >= timings.max_reinit_failures;
                tracing::warn!(?rejection, count = self.persistent_error_count, latched, "reinit rejected");
                let mut events = Vec::new();
                if latched {
                    self.transition(State::InitError, &mut events);
                }
                ReinitOutcome::Rejected { rejection, latched, events }
            }
        }
    }

    /// Per-tick evaluation: fast-convergence exit, stall detection,
    /// completion detection, WPD long-cal completion (spec §4.F).
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate(
        &mut self,
        now_ms: u64,
        fused_remaining_g: f32,
        target_empty_g: f32,
        ms_since_last_drip: u64,
        cumulative_drops: u32,
        timings: &StateMachineTimings,
    ) -> EvalOutcome {
        let mut out = EvalOutcome::default();

        if self.state == State::FastConvergence {
            let elapsed_s = now_ms.saturating_sub(self.fc_entered_at_ms) as f32 / 1000.0;
            if elapsed_s >= timings.t_fc_s {
                out.restore_original_rs = true;
                out.events.push(CoreEvent::FastConvergenceEnded);
                self.transition(State::Normal, &mut out.events);
            }
        }

        if self.state == State::Normal {
            // Stall check at T_stall_check cadence (spec: pauses during
            // FastConvergence per spec §9 open-question resolution).
            if now_ms.saturating_sub(self.last_stall_check_ms) as f32 >= timings.t_stall_check_s * 1000.0
            {
                self.last_stall_check_ms = now_ms;
                if (ms_since_last_drip as f32 / 1000.0) >= timings.t_no_drip_s {
                    tracing::warn!(ms_since_last_drip, "drip stall detected, clamping");
                    self.auto_clamp = true;
                    out.events.push(CoreEvent::InfusionAbnormalityDetected);
                    self.transition(State::InfusionError, &mut out.events);
                }
            }
        }

        if self.state == State::Normal && fused_remaining_g <= target_empty_g + 1.0 {
            self.auto_clamp = true;
            out.events.push(CoreEvent::InfusionCompleted);
            self.transition(State::Completed, &mut out.events);
        }

        if let Some((started_at_ms, drops_at_start)) = self.wpd_cal_start {
            let duration_s = now_ms.saturating_sub(started_at_ms) as f32 / 1000.0;
            let drops = cumulative_drops.saturating_sub(drops_at_start);
            if duration_s >= timings.wpd_longcal_min_duration_s
                && drops >= timings.wpd_longcal_min_drops
            {
                out.events.push(CoreEvent::WpdCalibrationCompleted {
                    wpd_gpd: 0.0, // filled in by Core, which knows the live estimate
                    drops,
                    duration_s,
                });
                self.wpd_cal_start = None;
            }
        }

        out
    }

    pub fn on_button(&mut self, kind: ButtonKind, event: ButtonEvent) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        match (kind, event) {
            (ButtonKind::Init, _) => {
                // Handled by Core::on_button via attempt_reinit; this just
                // marks the transition into Initializing for bookkeeping
                // when called standalone (e.g. tests of the FSM alone).
                self.transition(State::Initializing, &mut events);
            }
            (ButtonKind::Reset, ButtonEvent::ShortPress) => match self.state {
                State::InfusionError | State::Completed => {
                    let was_error = self.state == State::InfusionError;
                    self.auto_clamp = false;
                    self.transition(State::Normal, &mut events);
                    if was_error {
                        events.push(CoreEvent::InfusionAbnormalityCleared);
                    }
                }
                State::InitError => {
                    self.persistent_error_count = 0;
                    self.transition(State::Initializing, &mut events);
                }
                _ => {}
            },
            // Long press on Reset is reserved for the collaborator's
            // toggle-motor action, not consumed by the core (spec §6).
            (ButtonKind::Reset, ButtonEvent::LongPress) => {}
        }
        events
    }

    pub fn start_wpd_longcal(&mut self, now_ms: u64, drops_now: u32) {
        self.wpd_cal_start = Some((now_ms, drops_now));
    }

    /// Explicit stop of a long-cal window; reports completion vs. a
    /// low-drop timeout depending on whether both thresholds were met.
    pub fn stop_wpd_longcal(
        &mut self,
        now_ms: u64,
        drops_now: u32,
        timings: &StateMachineTimings,
    ) -> Option<CoreEvent> {
        let (started_at_ms, drops_at_start) = self.wpd_cal_start.take()?;
        let duration_s = now_ms.saturating_sub(started_at_ms) as f32 / 1000.0;
        let drops = drops_now.saturating_sub(drops_at_start);
        if duration_s >= timings.wpd_longcal_min_duration_s
            && drops >= timings.wpd_longcal_min_drops
        {
            Some(CoreEvent::WpdCalibrationCompleted { wpd_gpd: 0.0, drops, duration_s })
        } else {
            Some(CoreEvent::WpdCalibrationTimedOutLowDrops)
        }
    }

    pub fn original_rs(&self) -> Option<FilterRs> {
        self.original_rs
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
