#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! TOML configuration schema for the infusion estimator (spec §6).
//!
//! `Config` is deserialized from a fixture/deployment TOML file and
//! validated; `infusion_core::conversions` bridges its sub-structs to the
//! in-memory tunables `infusion_core::config` uses at runtime.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    pub drop_sensor: u8,
    pub button_init: u8,
    pub button_reset: u8,
    pub clamp_actuator: Option<u8>,
}

/// Physical constants fixed by the giving-set and fixture (spec §6).
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PhysicalCfg {
    pub equipment_tare_g: f32,
    pub empty_bag_tare_g: f32,
    pub drops_per_ml: f32,
    pub liquid_density_g_per_ml: f32,
    pub wpd_min_gpd: f32,
    pub wpd_max_gpd: f32,
    pub debounce_ms: u64,
}

impl Default for PhysicalCfg {
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

/// State-machine timing thresholds (spec §4.F).
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TimingsCfg {
    pub t_fc_s: f32,
    pub t_no_drip_s: f32,
    pub t_stall_check_s: f32,
    pub wpd_longcal_min_duration_s: f32,
    pub wpd_longcal_min_drops: u32,
    pub max_reinit_failures: u8,
}

impl Default for TimingsCfg {
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

/// Process/measurement-noise tuning for the weight, drip, and WPD filters
/// (spec §4.A-C).
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct FilterCfg {
    pub weight_sigma_a: f32,
    pub weight_sigma_j: f32,
    pub weight_r: f32,
    pub drip_sigma_a: f32,
    pub drip_r: f32,
    pub wpd_q: f32,
}

impl Default for FilterCfg {
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

/// Measurement-noise variances for the four fusion sub-updates (spec §4.D).
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct FusionCfg {
    pub q_flow: f32,
    pub q_rem: f32,
    pub r_flow_w: f32,
    pub r_flow_d: f32,
    pub r_rem_w: f32,
    pub r_rem_d: f32,
}

impl Default for FusionCfg {
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

/// Drop-event ring sizing (spec §3, §5: "N >= 8 suffices; reference: 20").
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct RingCfg {
    pub capacity: usize,
}

impl Default for RingCfg {
    fn default() -> Self {
        Self { capacity: 20 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,
    pub level: Option<String>,
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never).
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    /// Max time to wait for HX711 data-ready (DT low) before failing.
    pub sensor_read_timeout_ms: u64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self { sensor_read_timeout_ms: 150 }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub physical: PhysicalCfg,
    #[serde(default)]
    pub timings: TimingsCfg,
    #[serde(default)]
    pub filters: FilterCfg,
    #[serde(default)]
    pub fusion: FusionCfg,
    #[serde(default)]
    pub ring: RingCfg,
    pub target_empty_g: f32,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub hardware: Hardware,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        if self.physical.drops_per_ml <= 0.0 {
            eyre::bail!("physical.drops_per_ml must be > 0");
        }
        if self.physical.liquid_density_g_per_ml <= 0.0 {
            eyre::bail!("physical.liquid_density_g_per_ml must be > 0");
        }
        if self.physical.wpd_min_gpd <= 0.0 || self.physical.wpd_max_gpd <= self.physical.wpd_min_gpd {
            eyre::bail!("physical.wpd bounds must be positive and increasing");
        }
        if self.ring.capacity < 8 {
            eyre::bail!("ring.capacity must be >= 8");
        }
        if self.timings.t_fc_s <= 0.0 || self.timings.t_no_drip_s <= 0.0 {
            eyre::bail!("timings must be positive");
        }
        if self.timings.max_reinit_failures == 0 {
            eyre::bail!("timings.max_reinit_failures must be >= 1");
        }
        if self.target_empty_g < 0.0 {
            eyre::bail!("target_empty_g must be >= 0");
        }
        if self.hardware.sensor_read_timeout_ms == 0 {
            eyre::bail!("hardware.sensor_read_timeout_ms must be >= 1");
        }
        Ok(())
    }
}
