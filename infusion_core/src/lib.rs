#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Hardware-agnostic sensor-fusion and state-machine core for a gravity-fed
//! infusion pump (spec §1-§9).
//!
//! Three cooperating Kalman filters — `weight_kf` (load-cell mass),
//! `drip_kf` (drop-rate) and `wpd` (weight-per-drop) — feed a 1-D `fusion`
//! stage that publishes the canonical flow-rate and remaining-mass
//! estimates. `state_machine` supervises the
//! `Initializing -> FastConvergence -> Normal -> (InfusionError | Completed)`
//! lifecycle; `core::Core` is the tick orchestrator that ties every
//! component together and is the crate's only public entry point for
//! driving a run.
//!
//! ## Architecture
//!
//! - **Filtering**: `weight_kf`, `drip_kf`, `wpd` (spec §4.A-C)
//! - **Fusion**: `fusion` (spec §4.D)
//! - **Drop ingest**: `drop_ring` (spec §4.E, §5)
//! - **Supervision**: `state_machine` (spec §4.F)
//! - **Orchestration**: `core` (spec §4.G)
//! - **Configuration**: `config` (runtime tunables), `conversions` (bridge
//!   from the TOML schema in `infusion_config`)

pub mod builder;
pub mod calibration;
pub mod commands;
pub mod config;
pub mod conversions;
pub mod core;
pub mod drip_kf;
pub mod drop_ring;
pub mod error;
pub mod events;
pub mod fusion;
pub mod snapshot;
pub mod state_machine;
pub mod util;
pub mod weight_kf;
pub mod wpd;

pub use builder::CoreBuilder;
pub use core::Core;
pub use error::{BuildError, CommandError};
pub use events::CoreEvent;
pub use snapshot::{Snapshot, State};
