//! Scalar weight-per-drop (WPD) Kalman estimator (spec §4.C).

use crate::calibration::CalibrationContext;
use crate::util::floor_denominator;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wpd {
    wpd_gpd: f32,
    p_wpd: f32,
    q_wpd: f32,
    active: bool,
    min_gpd: f32,
    max_gpd: f32,
}

impl Wpd {
    pub fn new(initial_gpd: f32, q_wpd: f32, min_gpd: f32, max_gpd: f32) -> Self {
        Self {
            wpd_gpd: initial_gpd.clamp(min_gpd, max_gpd),
            p_wpd: 0.05,
            q_wpd,
            active: false,
            min_gpd,
            max_gpd,
        }
    }

    pub fn wpd_gpd(&self) -> f32 {
        self.wpd_gpd
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Re-inflate `P_wpd` to 0.25 and mark active, to accept new data
    /// quickly (spec §4.C).
    pub fn start(&mut self) {
        self.p_wpd = 0.25;
        self.active = true;
    }

    /// Clears the active flag only; does not touch `P_wpd` (spec §4.C).
    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Fold in a cumulative (Δmass, Δdrops) measurement if the guard
    /// conditions of spec §4.C hold; otherwise a no-op.
    pub fn calibrate(&mut self, current_mass_g: f32, ctx: &CalibrationContext) {
        if !ctx.initial_set || ctx.cumulative_drops < 5 {
            return;
        }
        let delta_mass = ctx.initial_total_mass_g - current_mass_g;
        if delta_mass < 0.01 {
            return;
        }
        let measured_wpd = delta_mass / ctx.cumulative_drops as f32;
        if !(0.01..=0.20).contains(&measured_wpd) {
            return;
        }

        // 1-D Kalman update.
        self.p_wpd += self.q_wpd;
        let s = floor_denominator(self.p_wpd + 1e-6);
        let k = self.p_wpd / s;
        self.wpd_gpd += k * (measured_wpd - self.wpd_gpd);
        self.p_wpd *= 1.0 - k;

        self.wpd_gpd = self.wpd_gpd.clamp(self.min_gpd, self.max_gpd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(initial_mass: f32, drops: u32) -> CalibrationContext {
        CalibrationContext {
            initial_total_mass_g: initial_mass,
            cumulative_drops: drops,
            initial_set: true,
        }
    }

    #[test]
    fn ignores_early_window_below_five_drops() {
        let mut wpd = Wpd::new(0.05, 1e-6, 0.04, 0.06);
        wpd.calibrate(490.0, &ctx(500.0, 4));
        assert_eq!(wpd.wpd_gpd(), 0.05);
    }

    #[test]
    fn ignores_outlier_measurement() {
        let mut wpd = Wpd::new(0.05, 1e-6, 0.04, 0.06);
        // delta=490 over 10 drops -> wpd=49, way outside [0.01,0.20]
        wpd.calibrate(10.0, &ctx(500.0, 10));
        assert_eq!(wpd.wpd_gpd(), 0.05);
    }

    #[test]
    fn stays_within_clamp_after_update() {
        let mut wpd = Wpd::new(0.05, 1e-2, 0.04, 0.06);
        // true wpd 0.05, 100 drops -> delta=5g
        for _ in 0..20 {
            wpd.calibrate(495.0, &ctx(500.0, 100));
        }
        assert!(wpd.wpd_gpd() >= 0.04 && wpd.wpd_gpd() <= 0.06);
    }

    #[test]
    fn start_reinflates_covariance_and_sets_active() {
        let mut wpd = Wpd::new(0.05, 1e-6, 0.04, 0.06);
        wpd.start();
        assert!(wpd.is_active());
        assert_eq!(wpd.p_wpd, 0.25);
    }

    #[test]
    fn stop_clears_active_only() {
        let mut wpd = Wpd::new(0.05, 1e-6, 0.04, 0.06);
        wpd.start();
        wpd.stop();
        assert!(!wpd.is_active());
        assert_eq!(wpd.p_wpd, 0.25);
    }
}
