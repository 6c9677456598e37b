//! `Snapshot` and `State`, the core's read-only published output (spec §3).

/// Operator-visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Initializing,
    InitError,
    FastConvergence,
    Normal,
    InfusionError,
    Completed,
}

impl State {
    /// Uppercase enum name, as required by the cloud JSON payload (spec §6).
    pub fn as_upper_str(&self) -> &'static str {
        match self {
            State::Initializing => "INITIALIZING",
            State::InitError => "INITERROR",
            State::FastConvergence => "FASTCONVERGENCE",
            State::Normal => "NORMAL",
            State::InfusionError => "INFUSIONERROR",
            State::Completed => "COMPLETED",
        }
    }
}

/// Sentinel remaining-time value used when flow is effectively zero and the
/// infusion has not yet reached target (spec §4.G step 9): "~88 888 s".
pub const REMAINING_TIME_UNDEFINED_S: f32 = 88_888.0;

/// Everything the tick orchestrator publishes each tick. Collaborators
/// receive this by value; the core retains exclusive ownership of the
/// underlying filter/calibration state (spec §3 "Ownership").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub filtered_mass_g: f32,
    pub raw_mass_g: f32,
    pub filtered_drop_rate_dps: f32,
    pub raw_drop_rate_dps: f32,
    pub weight_flow_gps: f32,
    pub drip_flow_gps: f32,
    pub fused_flow_gps: f32,
    pub fused_remaining_g: f32,
    pub drop_remaining_g: f32,
    pub wpd_gpd: f32,
    pub total_drops: u32,
    pub progress_pct: f32,
    pub remaining_time_raw_weight_s: f32,
    pub remaining_time_filt_weight_s: f32,
    pub remaining_time_raw_drip_s: f32,
    pub remaining_time_filt_drip_s: f32,
    pub remaining_time_fused_s: f32,
    pub state: State,
    pub auto_clamp: bool,
}

impl Snapshot {
    /// Remaining-time estimate given a (mass, flow) pair, per spec §4.G step 9.
    pub(crate) fn remaining_time_s(mass_g: f32, flow_gps: f32, target_empty_g: f32) -> f32 {
        if flow_gps > 1e-5 {
            ((mass_g - target_empty_g) / flow_gps).max(0.0)
        } else if mass_g <= target_empty_g {
            0.0
        } else {
            REMAINING_TIME_UNDEFINED_S
        }
    }
}
