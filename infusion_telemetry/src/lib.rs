#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Telemetry formatting for the infusion estimator's external interfaces
//! (spec §6): the 26-field CSV row broadcast over the dashboard WebSocket,
//! and the cloud JSON upload payload.
//!
//! Both are pure functions of a `Snapshot` plus a small amount of run
//! context (`target_empty_g`, `total_volume_ml`, a timestamp, a tick
//! index) that the core itself does not carry — `infusion_core` publishes
//! only the `Snapshot`; the caller driving the tick loop is responsible for
//! tracking wall-clock time and the run's configured targets and handing
//! them in here.

use infusion_core::Snapshot;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run context a `Snapshot` alone does not carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryContext {
    pub timestamp_ms: u64,
    pub tick_index: u64,
    pub target_empty_g: f32,
    pub total_volume_ml: f32,
    pub initial_total_mass_g: f32,
}

/// One fixed-order CSV row for the dashboard WebSocket broadcast (spec §6:
/// "fixed-order CSV snapshot ... 26 fields"). Field order is load-bearing —
/// it is a wire contract with an external dashboard, never reorder it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryRow {
    pub timestamp_ms: u64,
    pub tick_index: u64,
    pub state: &'static str,
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
    pub auto_clamp: u8,
    pub target_empty_g: f32,
    pub total_volume_ml: f32,
    pub initial_total_mass_g: f32,
    pub current_rate_dpm: f32,
    pub estimated_time_min: f32,
}

impl TelemetryRow {
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot, ctx: &TelemetryContext) -> Self {
        Self {
            timestamp_ms: ctx.timestamp_ms,
            tick_index: ctx.tick_index,
            state: snapshot.state.as_upper_str(),
            filtered_mass_g: snapshot.filtered_mass_g,
            raw_mass_g: snapshot.raw_mass_g,
            filtered_drop_rate_dps: snapshot.filtered_drop_rate_dps,
            raw_drop_rate_dps: snapshot.raw_drop_rate_dps,
            weight_flow_gps: snapshot.weight_flow_gps,
            drip_flow_gps: snapshot.drip_flow_gps,
            fused_flow_gps: snapshot.fused_flow_gps,
            fused_remaining_g: snapshot.fused_remaining_g,
            drop_remaining_g: snapshot.drop_remaining_g,
            wpd_gpd: snapshot.wpd_gpd,
            total_drops: snapshot.total_drops,
            progress_pct: snapshot.progress_pct,
            remaining_time_raw_weight_s: snapshot.remaining_time_raw_weight_s,
            remaining_time_filt_weight_s: snapshot.remaining_time_filt_weight_s,
            remaining_time_raw_drip_s: snapshot.remaining_time_raw_drip_s,
            remaining_time_filt_drip_s: snapshot.remaining_time_filt_drip_s,
            remaining_time_fused_s: snapshot.remaining_time_fused_s,
            auto_clamp: u8::from(snapshot.auto_clamp),
            target_empty_g: ctx.target_empty_g,
            total_volume_ml: ctx.total_volume_ml,
            initial_total_mass_g: ctx.initial_total_mass_g,
            current_rate_dpm: snapshot.filtered_drop_rate_dps * 60.0,
            estimated_time_min: (snapshot.remaining_time_fused_s / 60.0).ceil(),
        }
    }
}

/// Appends `TelemetryRow`s to a CSV sink. No header is written implicitly;
/// call `write_header` once up front if the sink is fresh.
pub struct CsvTelemetryWriter<W: std::io::Write> {
    inner: csv::Writer<W>,
}

impl<W: std::io::Write> CsvTelemetryWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { inner: csv::WriterBuilder::new().has_headers(false).from_writer(sink) }
    }

    pub fn write_header(&mut self) -> Result<(), TelemetryError> {
        self.inner.write_record([
            "timestamp_ms",
            "tick_index",
            "state",
            "filtered_mass_g",
            "raw_mass_g",
            "filtered_drop_rate_dps",
            "raw_drop_rate_dps",
            "weight_flow_gps",
            "drip_flow_gps",
            "fused_flow_gps",
            "fused_remaining_g",
            "drop_remaining_g",
            "wpd_gpd",
            "total_drops",
            "progress_pct",
            "remaining_time_raw_weight_s",
            "remaining_time_filt_weight_s",
            "remaining_time_raw_drip_s",
            "remaining_time_filt_drip_s",
            "remaining_time_fused_s",
            "auto_clamp",
            "target_empty_g",
            "total_volume_ml",
            "initial_total_mass_g",
            "current_rate_dpm",
            "estimated_time_min",
        ])?;
        Ok(())
    }

    pub fn write_row(&mut self, row: &TelemetryRow) -> Result<(), TelemetryError> {
        self.inner.serialize(row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), TelemetryError> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Cloud JSON upload payload (spec §6): `currentRate` is drops/minute
/// rounded to the nearest integer, `estimatedTime` is whole minutes
/// (ceiling), `systemState` is the uppercase enum name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudPayload {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(rename = "totalVolume")]
    pub total_volume: f32,
    #[serde(rename = "remainingVolume")]
    pub remaining_volume: f32,
    #[serde(rename = "currentRate")]
    pub current_rate: i64,
    #[serde(rename = "estimatedTime")]
    pub estimated_time: i64,
    #[serde(rename = "systemState")]
    pub system_state: &'static str,
    #[serde(rename = "autoClamp")]
    pub auto_clamp: u8,
}

impl CloudPayload {
    #[must_use]
    pub fn from_snapshot(device_id: &str, snapshot: &Snapshot, total_volume_ml: f32) -> Self {
        Self {
            device_id: device_id.to_owned(),
            total_volume: total_volume_ml,
            remaining_volume: snapshot.fused_remaining_g,
            current_rate: (snapshot.filtered_drop_rate_dps * 60.0).round() as i64,
            estimated_time: (snapshot.remaining_time_fused_s / 60.0).ceil() as i64,
            system_state: snapshot.state.as_upper_str(),
            auto_clamp: u8::from(snapshot.auto_clamp),
        }
    }

    pub fn to_json(&self) -> Result<String, TelemetryError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infusion_core::State;

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            filtered_mass_g: 480.0,
            raw_mass_g: 481.2,
            filtered_drop_rate_dps: 0.5,
            raw_drop_rate_dps: 0.48,
            weight_flow_gps: 0.06,
            drip_flow_gps: 0.025,
            fused_flow_gps: 0.05,
            fused_remaining_g: 470.0,
            drop_remaining_g: 472.0,
            wpd_gpd: 0.05,
            total_drops: 120,
            progress_pct: 6.0,
            remaining_time_raw_weight_s: 9000.0,
            remaining_time_filt_weight_s: 9100.0,
            remaining_time_raw_drip_s: 9200.0,
            remaining_time_filt_drip_s: 9300.0,
            remaining_time_fused_s: 9150.0,
            state: State::Normal,
            auto_clamp: false,
        }
    }

    #[test]
    fn csv_row_preserves_field_order_and_count() {
        let snap = sample_snapshot();
        let ctx = TelemetryContext {
            timestamp_ms: 1_000,
            tick_index: 42,
            target_empty_g: 60.0,
            total_volume_ml: 500.0,
            initial_total_mass_g: 500.0,
        };
        let row = TelemetryRow::from_snapshot(&snap, &ctx);

        let mut buf = Vec::new();
        {
            let mut w = CsvTelemetryWriter::new(&mut buf);
            w.write_header().expect("header");
            w.write_row(&row).expect("row");
            w.flush().expect("flush");
        }
        let text = String::from_utf8(buf).expect("utf8");
        let mut lines = text.lines();
        let header = lines.next().expect("header line");
        let data = lines.next().expect("data line");
        assert_eq!(header.split(',').count(), 26);
        assert_eq!(data.split(',').count(), 26);
        assert!(data.contains("NORMAL"));
    }

    #[test]
    fn cloud_payload_rounds_rate_to_per_minute_and_state_is_uppercase() {
        let snap = sample_snapshot();
        let payload = CloudPayload::from_snapshot("pump-07", &snap, 500.0);
        assert_eq!(payload.current_rate, 30);
        assert_eq!(payload.system_state, "NORMAL");
        assert_eq!(payload.auto_clamp, 0);

        let json = payload.to_json().expect("serialize");
        assert!(json.contains("\"deviceId\":\"pump-07\""));
        assert!(json.contains("\"systemState\":\"NORMAL\""));
    }

    #[test]
    fn auto_clamp_serializes_as_one_when_true() {
        let mut snap = sample_snapshot();
        snap.auto_clamp = true;
        let payload = CloudPayload::from_snapshot("pump-07", &snap, 500.0);
        assert_eq!(payload.auto_clamp, 1);
    }
}
