//! Tare subtraction and the `CalibrationContext` entity (spec §3, §4.F).

use crate::config::PhysicalConstants;

/// Subtract the fixed equipment + empty-bag tare from a raw load-cell
/// reading, per spec §4.F ("EQUIPMENT_TARE + EMPTY_BAG_TARE, numerically
/// 12 + 60 = 72 g in the reference").
pub fn tare_subtract(raw_g: f32, physical: &PhysicalConstants) -> f32 {
    raw_g - physical.equipment_tare_g - physical.empty_bag_tare_g
}

/// Why a reinit attempt was rejected, used to drive `InitError` and the
/// persistent-error counter (spec §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReinitRejection {
    NonFinite,
    OutOfRange,
    TooLight,
}

/// Validate a raw reading for reinit, returning the tared liquid mass on
/// success. Does not mutate any state; the caller decides what to do with a
/// rejection (increment the persistent-error counter, latch `InitError`).
pub fn validate_reinit_reading(
    raw_g: f32,
    physical: &PhysicalConstants,
) -> Result<f32, ReinitRejection> {
    if !raw_g.is_finite() {
        return Err(ReinitRejection::NonFinite);
    }
    if raw_g.abs() > 5000.0 {
        return Err(ReinitRejection::OutOfRange);
    }
    let liquid_g = tare_subtract(raw_g, physical);
    if liquid_g <= 10.0 {
        return Err(ReinitRejection::TooLight);
    }
    Ok(liquid_g)
}

/// `CalibrationContext` (spec §3): written on reinit; `cumulative_drops` is
/// monotonically non-decreasing during a run; both fields reset on reinit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationContext {
    pub initial_total_mass_g: f32,
    pub cumulative_drops: u32,
    pub initial_set: bool,
}

impl Default for CalibrationContext {
    fn default() -> Self {
        Self {
            initial_total_mass_g: 0.0,
            cumulative_drops: 0,
            initial_set: false,
        }
    }
}

impl CalibrationContext {
    pub fn reinit(&mut self, initial_total_mass_g: f32) {
        self.initial_total_mass_g = initial_total_mass_g;
        self.cumulative_drops = 0;
        self.initial_set = true;
    }

    /// `total_volume_ml = ceil(mass/100) * 100` (spec §4.F).
    pub fn total_volume_ml(&self, density_g_per_ml: f32) -> f32 {
        let ml = self.initial_total_mass_g / density_g_per_ml.max(1e-6);
        (ml / 100.0).ceil() * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tare_subtracts_fixed_constants() {
        let p = PhysicalConstants::default();
        assert_eq!(tare_subtract(572.0, &p), 500.0);
    }

    #[test]
    fn reinit_rejects_non_finite() {
        let p = PhysicalConstants::default();
        assert_eq!(
            validate_reinit_reading(f32::NAN, &p),
            Err(ReinitRejection::NonFinite)
        );
    }

    #[test]
    fn reinit_rejects_out_of_range() {
        let p = PhysicalConstants::default();
        assert_eq!(
            validate_reinit_reading(6000.0, &p),
            Err(ReinitRejection::OutOfRange)
        );
    }

    #[test]
    fn reinit_rejects_too_light() {
        let p = PhysicalConstants::default();
        // 72 + 5 = 77 raw -> 5g liquid, below 10g floor
        assert_eq!(
            validate_reinit_reading(77.0, &p),
            Err(ReinitRejection::TooLight)
        );
    }

    #[test]
    fn reinit_accepts_plausible_reading() {
        let p = PhysicalConstants::default();
        assert_eq!(validate_reinit_reading(572.0, &p), Ok(500.0));
    }

    #[test]
    fn total_volume_rounds_up_to_nearest_100ml() {
        let mut ctx = CalibrationContext::default();
        ctx.reinit(501.0);
        assert_eq!(ctx.total_volume_ml(1.0), 600.0);
    }
}
