//! Filter tunables and physical constants for the estimator core (spec §4, §6).
//!
//! This is the in-memory runtime configuration used by `Core`. The
//! TOML-deserialized schema lives in `infusion_config`; `conversions` bridges
//! the two.

/// Physical constants fixed by the giving-set and fixture (spec §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalConstants {
    pub equipment_tare_g: f32,
    pub empty_bag_tare_g: f32,
    pub drops_per_ml: f32,
    pub liquid_density_g_per_ml: f32,
    pub wpd_min_gpd: f32,
    pub wpd_max_gpd: f32,
    pub debounce_ms: u64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            equipment_tare_g: 12.0,
            empty_bag_tare_g: 60.0,
            drops_per_ml: 20.0,
            liquid_density_g_per_ml: 1.0,
            wpd_min_gpd: 0.04,
            wpd_max_gpd: 0.06,
            debounce_ms: 50,
        }
    }
}

/// Timing constants for the state machine (spec §4.F, §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateMachineTimings {
    pub t_fc_s: f32,
    pub t_no_drip_s: f32,
    pub t_stall_check_s: f32,
    pub wpd_longcal_min_duration_s: f32,
    pub wpd_longcal_min_drops: u32,
    pub max_reinit_failures: u8,
}

impl Default for StateMachineTimings {
    fn default() -> Self {
        Self {
            t_fc_s: 60.0,
            t_no_drip_s: 10.0,
            t_stall_check_s: 10.0,
            wpd_longcal_min_duration_s: 60.0,
            wpd_longcal_min_drops: 30,
            max_reinit_failures: 3,
        }
    }
}

/// Measurement-noise variances for the four fusion sub-updates (spec §4.D).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionTuning {
    pub q_flow: f32,
    pub q_rem: f32,
    pub r_flow_w: f32,
    pub r_flow_d: f32,
    pub r_rem_w: f32,
    pub r_rem_d: f32,
}

impl Default for FusionTuning {
    fn default() -> Self {
        Self {
            q_flow: 1e-4,
            q_rem: 1e-3,
            r_flow_w: 4e-4,
            r_flow_d: 9e-4,
            r_rem_w: 1e-2,
            r_rem_d: 4e-2,
        }
    }
}

/// Process/measurement-noise tuning for the weight, drip, and WPD filters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterTuning {
    pub weight_sigma_a: f32,
    pub weight_sigma_j: f32,
    pub weight_r: f32,
    pub drip_sigma_a: f32,
    pub drip_r: f32,
    pub wpd_q: f32,
}

impl Default for FilterTuning {
    fn default() -> Self {
        Self {
            weight_sigma_a: 0.01,
            weight_sigma_j: 0.005,
            weight_r: 0.01,
            drip_sigma_a: 0.01,
            drip_r: 0.02,
            wpd_q: 1e-6,
        }
    }
}

/// Drop-event ring sizing (spec §3, §5: "N ≥ 8 suffices; reference: 20").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingConfig {
    pub capacity: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self { capacity: 20 }
    }
}

/// Full estimator configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreConfig {
    pub physical: PhysicalConstants,
    pub timings: StateMachineTimings,
    pub filters: FilterTuning,
    pub fusion: FusionTuning,
    pub ring: RingConfig,
    pub target_empty_g: f32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            physical: PhysicalConstants::default(),
            timings: StateMachineTimings::default(),
            filters: FilterTuning::default(),
            fusion: FusionTuning::default(),
            ring: RingConfig::default(),
            target_empty_g: 0.0,
        }
    }
}

impl CoreConfig {
    /// Validate the ranges documented in spec §6/§3/§4. Mirrors the style of
    /// `infusion_config::Config::validate` but operates on the in-memory type.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.physical.drops_per_ml <= 0.0 {
            return Err("drops_per_ml must be > 0");
        }
        if self.physical.liquid_density_g_per_ml <= 0.0 {
            return Err("liquid_density_g_per_ml must be > 0");
        }
        if self.physical.wpd_min_gpd <= 0.0 || self.physical.wpd_max_gpd <= self.physical.wpd_min_gpd
        {
            return Err("wpd bounds must be positive and increasing");
        }
        if self.ring.capacity < 8 {
            return Err("ring capacity must be >= 8");
        }
        if self.timings.t_fc_s <= 0.0 || self.timings.t_no_drip_s <= 0.0 {
            return Err("state machine timings must be positive");
        }
        if self.target_empty_g < 0.0 {
            return Err("target_empty_g must be >= 0");
        }
        Ok(())
    }
}
