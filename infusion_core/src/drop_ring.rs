//! Drop-event ingest (spec §4.E, §5): a bounded single-producer /
//! single-consumer ring of drop timestamps, plus per-tick rate extraction.
//!
//! The producer is the edge handler (possibly an interrupt or a background
//! hardware thread); the consumer is the tick orchestrator. Per spec §5, the
//! shared state is kept to `DropRing` and `last_drip_time` only, and the
//! handler never blocks. This takes the critical-section route the design
//! notes bless: a small `Mutex` around the ring buffer plus an `AtomicU64`
//! for `last_drip_time`, so the handler's hold time is just a few writes.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

const MIN_INTERVAL_MS: u64 = 50;
const MAX_INTERVAL_MS: u64 = 5000;

pub struct DropRing {
    buf: Mutex<VecDeque<u64>>,
    capacity: usize,
    last_edge_ms: AtomicU64,
    last_drip_time_ms: AtomicU64,
    has_edge: std::sync::atomic::AtomicBool,
}

impl DropRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            last_edge_ms: AtomicU64::new(0),
            last_drip_time_ms: AtomicU64::new(0),
            has_edge: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Edge handler: debounce, then push `now_ms` into the ring, dropping
    /// the oldest entry if full (spec §4.E, §7 "ring overflow").
    pub fn on_drop_edge(&self, now_ms: u64) {
        if self.has_edge.load(Ordering::Acquire) {
            let last = self.last_edge_ms.load(Ordering::Acquire);
            let dt_edge = now_ms.saturating_sub(last);
            if dt_edge <= MIN_INTERVAL_MS {
                return; // bounce
            }
        }
        {
            let mut buf = self.buf.lock().expect("drop ring mutex poisoned");
            if buf.len() >= self.capacity {
                buf.pop_front();
            }
            buf.push_back(now_ms);
        }
        self.last_edge_ms.store(now_ms, Ordering::Release);
        self.has_edge.store(true, Ordering::Release);
        self.last_drip_time_ms.store(now_ms, Ordering::Release);
    }

    /// Milliseconds since the last accepted drop edge, used by the stall
    /// detector (spec §4.F). Returns `now_ms` unchanged if no edge has ever
    /// been observed (never stalls before the first drop).
    pub fn ms_since_last_drip(&self, now_ms: u64) -> u64 {
        if !self.has_edge.load(Ordering::Acquire) {
            return 0;
        }
        now_ms.saturating_sub(self.last_drip_time_ms.load(Ordering::Acquire))
    }

    /// Drain the ring for this tick (spec §4.E "Per-tick extraction").
    /// Returns `(measured_drip_rate_dps, new_drops)`.
    pub fn drain_for_tick(&self) -> (Option<f32>, u32) {
        let mut buf = self.buf.lock().expect("drop ring mutex poisoned");
        let ts: Vec<u64> = buf.drain(..).collect();
        if ts.len() <= 1 {
            if let Some(&last) = ts.last() {
                buf.push_back(last);
            }
            return (None, 0);
        }

        let mut accepted_sum_ms: u64 = 0;
        let mut accepted_count: u32 = 0;
        for w in ts.windows(2) {
            let dt = w[1].saturating_sub(w[0]);
            if dt > MIN_INTERVAL_MS && dt < MAX_INTERVAL_MS {
                accepted_sum_ms += dt;
                accepted_count += 1;
            }
        }

        if let Some(&last) = ts.last() {
            buf.push_back(last);
        }

        if accepted_count == 0 {
            return (None, 0);
        }
        let mean_interval_s = (accepted_sum_ms as f32 / accepted_count as f32) / 1000.0;
        let rate = if mean_interval_s > 1e-6 {
            Some(1.0 / mean_interval_s)
        } else {
            None
        };
        (rate, accepted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounces_edges_within_50ms() {
        let ring = DropRing::new(20);
        ring.on_drop_edge(0);
        ring.on_drop_edge(20); // bounce, within 50ms
        ring.on_drop_edge(100); // accepted
        let (rate, drops) = ring.drain_for_tick();
        assert_eq!(drops, 1);
        assert!(rate.is_some());
    }

    #[test]
    fn drain_with_zero_or_one_timestamp_yields_no_rate() {
        let ring = DropRing::new(20);
        let (rate, drops) = ring.drain_for_tick();
        assert_eq!(rate, None);
        assert_eq!(drops, 0);

        ring.on_drop_edge(1000);
        let (rate, drops) = ring.drain_for_tick();
        assert_eq!(rate, None);
        assert_eq!(drops, 0);
    }

    #[test]
    fn retains_last_timestamp_as_new_head() {
        let ring = DropRing::new(20);
        ring.on_drop_edge(0);
        ring.on_drop_edge(500);
        let _ = ring.drain_for_tick();
        ring.on_drop_edge(1000);
        let (rate, drops) = ring.drain_for_tick();
        assert_eq!(drops, 1);
        assert!(rate.is_some());
    }

    #[test]
    fn overflow_drops_oldest() {
        let ring = DropRing::new(4);
        for i in 0..10u64 {
            ring.on_drop_edge(i * 100);
        }
        let (_, drops) = ring.drain_for_tick();
        assert!(drops <= 4);
    }

    #[test]
    fn intervals_outside_window_are_ignored() {
        let ring = DropRing::new(20);
        ring.on_drop_edge(0);
        ring.on_drop_edge(8000); // gap > 5000ms, ignored as noise/gap
        let (rate, drops) = ring.drain_for_tick();
        assert_eq!(rate, None);
        assert_eq!(drops, 0);
    }

    #[test]
    fn last_drip_time_tracks_accepted_edges_only() {
        let ring = DropRing::new(20);
        assert_eq!(ring.ms_since_last_drip(1000), 0);
        ring.on_drop_edge(500);
        assert_eq!(ring.ms_since_last_drip(1500), 1000);
    }
}
