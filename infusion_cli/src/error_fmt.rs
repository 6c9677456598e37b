//! Human-readable error descriptions and structured JSON error formatting.
//!
//! Per spec §7, the running core never raises an error out of a tick — the
//! only fallible operations this CLI can hit are construction-time
//! (`BuildError`, invalid config) and I/O (reading the config file, writing
//! the CSV trace). This module maps those to operator-facing text and a
//! stable exit code, the way the teacher's CLI mapped its own domain errors.

use infusion_core::BuildError;

/// Map an `eyre::Report` to a human-readable explanation with likely causes
/// and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingClock => {
                "What happened: no clock was provided to the estimator builder.\nLikely causes: internal wiring bug; the CLI always supplies a clock.\nHow to fix: this should not happen from the CLI; file a bug.".to_string()
            }
            BuildError::MissingTargetEmpty => {
                "What happened: target_empty_g was not set.\nLikely causes: the config TOML is missing the top-level target_empty_g key.\nHow to fix: add target_empty_g = <grams> to the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: invalid configuration ({msg}).\nLikely causes: missing or out-of-range values in the TOML.\nHow to fix: edit the config file and rerun."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("no such file") || lower.contains("read config") {
        return "What happened: the config file could not be read.\nLikely causes: wrong --config path.\nHow to fix: pass --config pointing at a valid TOML file.".to_string();
    }

    if lower.contains("missing field") || lower.contains("invalid type") {
        return format!(
            "What happened: the config TOML failed to parse ({msg}).\nLikely causes: a required field (e.g. [pins]) is missing or has the wrong type.\nHow to fix: compare the file against the sample config."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!("Something went wrong.{cause}\nHow to fix: re-run with --log-level=debug for details. Original: {msg}")
}

/// Map a `BuildError` (if present) to a stable exit code; anything else is 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingClock => 10,
            BuildError::MissingTargetEmpty => 11,
            BuildError::InvalidConfig(_) => 12,
        };
    }
    1
}

/// Structured JSON for errors when `--json` is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(be) = err.downcast_ref::<BuildError>() {
        let reason = match be {
            BuildError::MissingClock => "MissingClock",
            BuildError::MissingTargetEmpty => "MissingTargetEmpty",
            BuildError::InvalidConfig(_) => "InvalidConfig",
        };
        return json!({ "reason": reason, "message": humanize(err) }).to_string();
    }
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}
