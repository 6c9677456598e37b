//! `From` implementations bridging `infusion_config` types to
//! `infusion_core` runtime types.
//!
//! These eliminate the manual field-by-field mapping that would otherwise
//! be scattered across the CLI.

use crate::config::{
    CoreConfig, FilterTuning, FusionTuning, PhysicalConstants, RingConfig, StateMachineTimings,
};

impl From<&infusion_config::PhysicalCfg> for PhysicalConstants {
    fn from(c: &infusion_config::PhysicalCfg) -> Self {
        Self {
            equipment_tare_g: c.equipment_tare_g,
            empty_bag_tare_g: c.empty_bag_tare_g,
            drops_per_ml: c.drops_per_ml,
            liquid_density_g_per_ml: c.liquid_density_g_per_ml,
            wpd_min_gpd: c.wpd_min_gpd,
            wpd_max_gpd: c.wpd_max_gpd,
            debounce_ms: c.debounce_ms,
        }
    }
}

impl From<&infusion_config::TimingsCfg> for StateMachineTimings {
    fn from(c: &infusion_config::TimingsCfg) -> Self {
        Self {
            t_fc_s: c.t_fc_s,
            t_no_drip_s: c.t_no_drip_s,
            t_stall_check_s: c.t_stall_check_s,
            wpd_longcal_min_duration_s: c.wpd_longcal_min_duration_s,
            wpd_longcal_min_drops: c.wpd_longcal_min_drops,
            max_reinit_failures: c.max_reinit_failures,
        }
    }
}

impl From<&infusion_config::FilterCfg> for FilterTuning {
    fn from(c: &infusion_config::FilterCfg) -> Self {
        Self {
            weight_sigma_a: c.weight_sigma_a,
            weight_sigma_j: c.weight_sigma_j,
            weight_r: c.weight_r,
            drip_sigma_a: c.drip_sigma_a,
            drip_r: c.drip_r,
            wpd_q: c.wpd_q,
        }
    }
}

impl From<&infusion_config::FusionCfg> for FusionTuning {
    fn from(c: &infusion_config::FusionCfg) -> Self {
        Self {
            q_flow: c.q_flow,
            q_rem: c.q_rem,
            r_flow_w: c.r_flow_w,
            r_flow_d: c.r_flow_d,
            r_rem_w: c.r_rem_w,
            r_rem_d: c.r_rem_d,
        }
    }
}

impl From<&infusion_config::RingCfg> for RingConfig {
    fn from(c: &infusion_config::RingCfg) -> Self {
        Self { capacity: c.capacity }
    }
}

impl From<&infusion_config::Config> for CoreConfig {
    fn from(c: &infusion_config::Config) -> Self {
        Self {
            physical: (&c.physical).into(),
            timings: (&c.timings).into(),
            filters: (&c.filters).into(),
            fusion: (&c.fusion).into(),
            ring: (&c.ring).into(),
            target_empty_g: c.target_empty_g,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> infusion_config::Config {
        infusion_config::load_toml(
            r#"
            target_empty_g = 5.0

            [pins]
            hx711_dt = 5
            hx711_sck = 6
            drop_sensor = 17
            button_init = 22
            button_reset = 23
            "#,
        )
        .expect("parse")
    }

    #[test]
    fn bridges_every_field_to_core_config() {
        let toml_cfg = sample();
        let core_cfg: CoreConfig = (&toml_cfg).into();
        assert_eq!(core_cfg.target_empty_g, 5.0);
        assert_eq!(core_cfg.physical.equipment_tare_g, toml_cfg.physical.equipment_tare_g);
        assert_eq!(core_cfg.ring.capacity, toml_cfg.ring.capacity);
        assert!(core_cfg.validate().is_ok());
    }
}
