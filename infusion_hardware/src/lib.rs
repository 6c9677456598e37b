//! Simulated and (feature-gated) real sensor implementations for the
//! infusion-flow estimator.
//!
//! `infusion_core` never talks to GPIO or ADCs directly — it only consumes
//! `infusion_traits::MassSensor` and raw drop-edge timestamps fed to it by
//! whatever sits in this crate.

pub mod error;
pub mod util;

#[cfg(feature = "hardware")]
pub mod hx711;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use infusion_traits::MassSensor;

/// Simulated gravity-fed bag: drains linearly at `drain_gps` grams/second of
/// wall-clock time, with a small amount of sensor noise. Useful for the CLI's
/// `simulate` command and for manual testing without real hardware.
pub struct SimulatedMassSensor {
    weight_g: Rc<Cell<f32>>,
    drain_gps: f32,
    last_read: std::time::Instant,
    noise_seed: Rc<Cell<u32>>,
}

impl SimulatedMassSensor {
    pub fn new(initial_weight_g: f32, drain_gps: f32) -> Self {
        Self {
            weight_g: Rc::new(Cell::new(initial_weight_g)),
            drain_gps,
            last_read: std::time::Instant::now(),
            noise_seed: Rc::new(Cell::new(0x9e37_79b9)),
        }
    }

    fn next_noise(&self) -> f32 {
        // xorshift32, deterministic per-process, just enough jitter to exercise
        // the weight filter's measurement noise handling.
        let mut x = self.noise_seed.get();
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_seed.set(x);
        ((x as f32 / u32::MAX as f32) - 0.5) * 0.02
    }
}

impl MassSensor for SimulatedMassSensor {
    fn read(
        &mut self,
        _timeout: Duration,
    ) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        let now = std::time::Instant::now();
        let dt_s = now.duration_since(self.last_read).as_secs_f32();
        self.last_read = now;
        let drained = self.weight_g.get() - self.drain_gps * dt_s;
        let drained = drained.max(0.0);
        self.weight_g.set(drained);
        Ok(drained + self.next_noise())
    }
}

/// Deterministic, non-sensor-timed drop-edge generator for simulation: given
/// elapsed time since the last call, reports how many drop edges are due at
/// the configured average drop period.
pub struct SimulatedDropSource {
    period_ms: u32,
    backlog_ms: u32,
}

impl SimulatedDropSource {
    pub fn new(drops_per_min: f32) -> Self {
        let period_ms = if drops_per_min > 0.0 {
            (60_000.0 / drops_per_min).round() as u32
        } else {
            u32::MAX
        };
        Self {
            period_ms: period_ms.max(1),
            backlog_ms: 0,
        }
    }

    /// Returns how many drop edges occurred during `elapsed_ms` of simulated
    /// time, carrying over any fractional remainder.
    pub fn due_edges(&mut self, elapsed_ms: u32) -> u32 {
        self.backlog_ms = self.backlog_ms.saturating_add(elapsed_ms);
        let n = self.backlog_ms / self.period_ms;
        self.backlog_ms -= n * self.period_ms;
        n
    }
}

#[cfg(feature = "hardware")]
pub struct HardwareMassSensor {
    hx711: hx711::Hx711,
    counts_per_gram: f32,
    offset_counts: i32,
}

#[cfg(feature = "hardware")]
impl HardwareMassSensor {
    pub fn new(hx711: hx711::Hx711, counts_per_gram: f32, offset_counts: i32) -> Self {
        Self {
            hx711,
            counts_per_gram,
            offset_counts,
        }
    }
}

#[cfg(feature = "hardware")]
impl MassSensor for HardwareMassSensor {
    fn read(
        &mut self,
        timeout: Duration,
    ) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        let raw = self.hx711.read_with_timeout(timeout)?;
        let counts = raw - self.offset_counts;
        Ok(counts as f32 / self.counts_per_gram)
    }
}

/// Spawn a background thread that watches a GPIO input pin for falling edges
/// (break-beam drop detector going dark) and invokes `on_edge` with the
/// monotonic millisecond timestamp of each debounced edge. Debouncing follows
/// the 50ms floor from spec §4.E: edges closer together than that are folded
/// into one.
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn spawn_drop_interrupt(
    pin: u8,
    debounce_ms: u64,
    mut on_edge: impl FnMut(u64) + Send + 'static,
) -> Result<std::thread::JoinHandle<()>, error::HwError> {
    use infusion_traits::clock::{Clock, MonotonicClock};
    let gpio = rppal::gpio::Gpio::new().map_err(|e| error::HwError::Gpio(e.to_string()))?;
    let input = gpio
        .get(pin)
        .map_err(|e| error::HwError::Gpio(e.to_string()))?
        .into_input_pullup();

    let handle = std::thread::spawn(move || {
        let clock = MonotonicClock::new();
        let start = clock.now();
        let mut last_edge_ms: u64 = 0;
        let mut was_high = input.is_high();
        loop {
            let now_high = input.is_high();
            if was_high && !now_high {
                let now_ms = clock.ms_since(start);
                if now_ms.saturating_sub(last_edge_ms) >= debounce_ms {
                    last_edge_ms = now_ms;
                    on_edge(now_ms);
                }
            }
            was_high = now_high;
            std::thread::sleep(Duration::from_millis(1));
        }
    });
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_mass_sensor_drains_toward_zero() {
        let mut s = SimulatedMassSensor::new(100.0, 1.0);
        std::thread::sleep(Duration::from_millis(5));
        let w = s.read(Duration::ZERO).unwrap();
        assert!(w <= 100.0);
    }

    #[test]
    fn simulated_drop_source_emits_expected_rate() {
        let mut src = SimulatedDropSource::new(60.0); // 1 drop/sec
        let edges = src.due_edges(2500);
        assert_eq!(edges, 2);
        let edges2 = src.due_edges(500);
        assert_eq!(edges2, 1);
    }

    #[test]
    fn simulated_drop_source_zero_rate_never_fires() {
        let mut src = SimulatedDropSource::new(0.0);
        assert_eq!(src.due_edges(10_000), 0);
    }
}
