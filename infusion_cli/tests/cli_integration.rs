use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
target_empty_g = 60.0

[pins]
hx711_dt = 5
hx711_sck = 6
drop_sensor = 17
button_init = 22
button_reset = 23

[timings]
t_fc_s = 1.0
t_no_drip_s = 120.0
t_stall_check_s = 120.0
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["validate-config"], 0, "config ok", "stdout")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
#[case(&["simulate", "--duration-s", "2"], 0, "final state:", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("infusion_cli").unwrap();
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn cli_reports_missing_config_file() {
    let mut cmd = Command::cargo_bin("infusion_cli").unwrap();
    cmd.arg("--config")
        .arg("/nonexistent/path/does-not-exist.toml")
        .arg("validate-config");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("config file could not be read"));
}

#[rstest]
fn cli_reports_invalid_config_ring_capacity() {
    let dir = tempdir().unwrap();
    let toml = r#"
target_empty_g = 60.0

[pins]
hx711_dt = 5
hx711_sck = 6
drop_sensor = 17
button_init = 22
button_reset = 23

[ring]
capacity = 2
"#;
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, toml).unwrap();

    let mut cmd = Command::cargo_bin("infusion_cli").unwrap();
    cmd.arg("--config").arg(&cfg).arg("validate-config");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[rstest]
fn simulate_writes_requested_csv_trace() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let csv_path = dir.path().join("trace.csv");

    let mut cmd = Command::cargo_bin("infusion_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("simulate")
        .arg("--duration-s")
        .arg("2")
        .arg("--csv-out")
        .arg(&csv_path);

    cmd.assert().success();
    let contents = fs::read_to_string(&csv_path).unwrap();
    assert!(contents.lines().count() >= 2, "expected a header plus at least one row");
    assert_eq!(contents.lines().next().unwrap().split(',').count(), 26);
}
