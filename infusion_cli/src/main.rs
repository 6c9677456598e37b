#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! CLI entrypoint for the infusion sensor-fusion estimator.
//!
//! Responsibilities:
//! - Parse config/flags and assemble a simulated mass sensor + drop source
//! - Initialize tracing and manage log sinks
//! - Offer `--json` mode emitting a stable JSON summary on stdout (logs to stderr)
//! - Provide optional RT helpers via libc on supported OSes, with safety docs
//! - Map estimator build/config errors to stable exit codes

mod cli;
mod error_fmt;
mod rt;
mod simulate;
mod tracing_setup;

use std::fs;

use clap::Parser;
use eyre::WrapErr;

use cli::{Cli, Commands, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use tracing_setup::init_tracing;

fn main() -> eyre::Result<()> {
    let _ = color_eyre::install();

    let shutdown = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let shutdown_clone = std::sync::Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nReceived shutdown signal, stopping gracefully...");
        shutdown_clone.store(true, std::sync::atomic::Ordering::SeqCst);
    }) {
        eprintln!("Warning: Failed to set signal handler: {e}");
    }

    if let Err(e) = real_main(shutdown) {
        let json = *JSON_MODE.get().unwrap_or(&false);
        let code = exit_code_for_error(&e);
        if json {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(code);
    }
    Ok(())
}

fn real_main(shutdown: std::sync::Arc<std::sync::atomic::AtomicBool>) -> eyre::Result<()> {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let cfg_text = fs::read_to_string(&cli.config)
        .wrap_err_with(|| format!("read config {:?}", cli.config))?;
    let cfg: infusion_config::Config =
        toml::from_str(&cfg_text).wrap_err_with(|| format!("parse config {:?}", cli.config))?;
    cfg.validate().wrap_err("invalid configuration")?;

    init_tracing(
        cli.json,
        &cli.log_level,
        cfg.logging.file.as_deref(),
        cfg.logging.rotation.as_deref(),
    );

    match cli.cmd {
        Commands::ValidateConfig => {
            println!("config ok: target_empty_g={}", cfg.target_empty_g);
            Ok(())
        }
        Commands::SelfCheck => {
            tracing::info!("self-check starting");
            use infusion_hardware::SimulatedMassSensor;
            use infusion_traits::MassSensor;
            use std::time::{Duration, Instant};

            let mut sensor = SimulatedMassSensor::new(500.0, 0.5);
            let t_end = Instant::now() + Duration::from_millis(500);
            let mut samples = 0u32;
            while Instant::now() < t_end {
                sensor
                    .read(Duration::from_millis(50))
                    .wrap_err("sensor read failed")?;
                samples += 1;
            }
            println!("self-check ok: {samples} samples in 500ms");
            Ok(())
        }
        Commands::Simulate {
            duration_s,
            initial_mass_g,
            drain_gps,
            drops_per_min,
            device_id,
            csv_out,
            rt,
            rt_prio,
            rt_lock,
            rt_cpu,
        } => simulate::run_simulation(
            &cfg,
            duration_s,
            initial_mass_g,
            drain_gps,
            drops_per_min,
            &device_id,
            csv_out.as_deref(),
            cli.json,
            rt,
            rt_prio,
            rt_lock,
            rt_cpu,
            shutdown,
        ),
    }
}
