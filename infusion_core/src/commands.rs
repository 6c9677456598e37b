//! WebSocket command grammar (spec §6): `on_command(cmd)`.

use crate::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    CalibrateWpdStart,
    CalibrateWpdStop,
    SetTotalVolume(f32),
}

/// Parse a single command line. Unrecognized commands and malformed
/// `SET_TOTAL_VOLUME` values are rejected without mutating any state (spec
/// §7 "Invalid external command").
pub fn parse_command(cmd: &str) -> Result<Command, CommandError> {
    let cmd = cmd.trim();
    if cmd == "CALIBRATE_WPD_START" {
        return Ok(Command::CalibrateWpdStart);
    }
    if cmd == "CALIBRATE_WPD_STOP" {
        return Ok(Command::CalibrateWpdStop);
    }
    if let Some(rest) = cmd.strip_prefix("SET_TOTAL_VOLUME:") {
        let ml: f32 = rest
            .parse()
            .map_err(|_| CommandError::MalformedVolume(rest.to_string()))?;
        return Ok(Command::SetTotalVolume(ml));
    }
    Err(CommandError::Unrecognized(cmd.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_calibration_commands() {
        assert_eq!(parse_command("CALIBRATE_WPD_START"), Ok(Command::CalibrateWpdStart));
        assert_eq!(parse_command("CALIBRATE_WPD_STOP"), Ok(Command::CalibrateWpdStop));
    }

    #[test]
    fn parses_set_total_volume() {
        assert_eq!(
            parse_command("SET_TOTAL_VOLUME:500.0"),
            Ok(Command::SetTotalVolume(500.0))
        );
    }

    #[test]
    fn rejects_malformed_volume() {
        assert!(parse_command("SET_TOTAL_VOLUME:abc").is_err());
    }

    #[test]
    fn rejects_unknown_command() {
        assert!(parse_command("FOO_BAR").is_err());
    }
}
