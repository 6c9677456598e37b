//! Drives `infusion_core::Core` against `infusion_hardware`'s simulated mass
//! sensor and drop source for a fixed wall-clock duration, one tick per
//! `T_main` (1 s), writing the 26-field CSV telemetry trace and printing a
//! final JSON summary.

use std::io::Write as _;
use std::time::Duration;

use infusion_core::builder::CoreBuilder;
use infusion_core::state_machine::{ButtonEvent, ButtonKind};
use infusion_hardware::{SimulatedDropSource, SimulatedMassSensor};
use infusion_telemetry::{CloudPayload, CsvTelemetryWriter, TelemetryContext, TelemetryRow};
use infusion_traits::MassSensor;

use crate::cli::RtLock;
use crate::rt::setup_rt_once;

const T_MAIN_MS: u64 = 1000;

#[allow(clippy::too_many_arguments)]
pub fn run_simulation(
    cfg: &infusion_config::Config,
    duration_s: u64,
    initial_mass_g: f32,
    drain_gps: f32,
    drops_per_min: f32,
    device_id: &str,
    csv_out: Option<&std::path::Path>,
    json: bool,
    rt: bool,
    rt_prio: Option<i32>,
    rt_lock: Option<RtLock>,
    rt_cpu: Option<usize>,
    shutdown: std::sync::Arc<std::sync::atomic::AtomicBool>,
) -> eyre::Result<()> {
    #[cfg(target_os = "linux")]
    {
        let mode = rt_lock.unwrap_or(RtLock::os_default());
        setup_rt_once(rt, rt_prio, mode, rt_cpu);
    }
    #[cfg(target_os = "macos")]
    {
        let mode = rt_lock.unwrap_or(RtLock::os_default());
        let _ = (rt_prio, rt_cpu);
        setup_rt_once(rt, mode);
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    let _ = (rt, rt_prio, rt_lock, rt_cpu);

    let core_cfg: infusion_core::config::CoreConfig = cfg.into();
    let mut core = CoreBuilder::new()
        .with_physical(core_cfg.physical)
        .with_timings(core_cfg.timings)
        .with_filters(core_cfg.filters)
        .with_fusion(core_cfg.fusion)
        .with_ring(core_cfg.ring)
        .with_target_empty_g(core_cfg.target_empty_g)
        .build()?;

    let mut sensor = SimulatedMassSensor::new(initial_mass_g, drain_gps);
    let mut drop_source = SimulatedDropSource::new(drops_per_min);
    let total_volume_ml = initial_mass_g / cfg.physical.liquid_density_g_per_ml;

    let mut csv_writer = match csv_out {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let mut w = CsvTelemetryWriter::new(file);
            w.write_header()?;
            Some(w)
        }
        None => None,
    };

    let mut core_initialized = false;
    let mut final_snapshot = None;

    for tick_index in 0..=duration_s {
        if shutdown.load(std::sync::atomic::Ordering::Relaxed) {
            tracing::warn!("simulation interrupted by shutdown signal");
            break;
        }

        let raw_g = sensor.read(Duration::from_millis(50))?;
        core.on_mass_sample(raw_g);

        if !core_initialized {
            let events = core.on_button(ButtonKind::Init, ButtonEvent::ShortPress);
            for ev in &events {
                tracing::info!(?ev, "init button event");
            }
            core_initialized = true;
        }

        let new_drops = drop_source.due_edges(T_MAIN_MS as u32);
        for _ in 0..new_drops {
            core.on_drop_edge();
        }

        let (snapshot, events) = core.tick();
        for ev in &events {
            tracing::info!(?ev, "core event");
        }

        if let Some(writer) = csv_writer.as_mut() {
            let ctx = TelemetryContext {
                timestamp_ms: tick_index * T_MAIN_MS,
                tick_index,
                target_empty_g: core_cfg.target_empty_g,
                total_volume_ml,
                initial_total_mass_g: initial_mass_g,
            };
            let row = TelemetryRow::from_snapshot(&snapshot, &ctx);
            writer.write_row(&row)?;
        }

        let terminal = matches!(
            snapshot.state,
            infusion_core::State::Completed | infusion_core::State::InfusionError
        );
        final_snapshot = Some(snapshot);
        if terminal {
            tracing::info!("terminal state reached, stopping simulation early");
            break;
        }

        if tick_index < duration_s {
            std::thread::sleep(Duration::from_millis(T_MAIN_MS));
        }
    }

    if let Some(writer) = csv_writer.as_mut() {
        writer.flush()?;
    }

    let final_snapshot = match final_snapshot {
        Some(s) => s,
        None => core.tick().0,
    };
    let payload = CloudPayload::from_snapshot(device_id, &final_snapshot, total_volume_ml);
    if json {
        println!("{}", payload.to_json()?);
    } else {
        println!(
            "final state: {}  remaining: {:.1} g  rate: {} drops/min",
            final_snapshot.state.as_upper_str(),
            final_snapshot.fused_remaining_g,
            payload.current_rate
        );
    }
    std::io::stdout().flush().ok();
    Ok(())
}
