use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Fast timing so short runs still take several samples.
const FAST_CONFIG: &str = r#"
[filter]
kind = "ema"
alpha = 0.2

[calibration]
window_capacity = 32
blend_alpha = 0.05
initial_min_lux = 0.0
initial_max_lux = 1000.0

[timing]
tick_ms = 1
sample_ms = 5

[simulation]
base_lux = 500.0
"#;

fn write_config(dir: &tempfile::TempDir, toml: &str) -> PathBuf {
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn write_trace(dir: &tempfile::TempDir, header: &str, rows: &[(u64, f64, f64)]) -> PathBuf {
    let path = dir.path().join("trace.csv");
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, "{header}").unwrap();
    for (ts, a, b) in rows {
        writeln!(f, "{ts},{a},{b}").unwrap();
    }
    path
}

fn lumen() -> Command {
    Command::cargo_bin("lumen").unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--ticks", "60"], 0, "Run complete: 60 ticks", "stdout")]
#[case(&["run", "--ticks", "10", "--off"], 0, "LED off, duty 0", "stdout")]
#[case(&["run", "--ticks", "10", "--manual", "--pot", "2047"], 0, "mode manual", "stdout")]
#[case(&["self-check"], 0, "Self-check OK", "stdout")]
#[case(&["run", "--ticks", "nope"], 2, "invalid value", "stderr")]
#[case(&["replay"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_CONFIG);

    let mut cmd = lumen();
    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg).arg("--log-level").arg("error");
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
fn run_json_summary_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_CONFIG);

    let out = lumen()
        .args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .args(["run", "--ticks", "25", "--manual", "--pot", "4095"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    let line = stdout
        .lines()
        .find(|l| l.contains("\"ticks\""))
        .unwrap_or_else(|| panic!("no summary line; stdout was: {stdout}"));
    let v: serde_json::Value = serde_json::from_str(line).expect("valid JSON");

    assert_eq!(v["ticks"], 25);
    assert_eq!(v["backend"], "sim");
    assert_eq!(v["mode"], "manual");
    assert_eq!(v["duty"], 1023);
    assert!(v["samples"].as_u64().is_some());
    assert!(v["timestamp"].as_u64().is_some());
    assert!(v["min_lux"].as_f64().is_some());
}

#[rstest]
fn replay_prints_one_json_line_per_row() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_CONFIG);
    let rows: Vec<(u64, f64, f64)> = (0..40)
        .map(|i| (1000 + i * 500, 480.0 + i as f64, 520.0 - i as f64))
        .collect();
    let trace = write_trace(&dir, "timestamp,lux1,lux2", &rows);

    let out = lumen()
        .args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .arg("replay")
        .arg("--trace")
        .arg(&trace)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("JSON line"))
        .collect();
    assert_eq!(lines.len(), rows.len());
    assert_eq!(lines[0]["timestamp"], 1000);
    assert_eq!(lines[0]["raw_lux"], 500.0);
    for v in &lines {
        let duty = v["duty"].as_u64().unwrap();
        assert!(duty <= 1023);
        assert!(v["max_lux"].as_f64().unwrap() > v["min_lux"].as_f64().unwrap());
    }
}

#[rstest]
fn replay_text_ends_with_summary() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_CONFIG);
    let trace = write_trace(
        &dir,
        "timestamp,lux1,lux2",
        &[(0, 100.0, 100.0), (500, 100.0, 100.0), (1000, 100.0, 100.0)],
    );

    lumen()
        .arg("--config")
        .arg(&cfg)
        .args(["--log-level", "error", "replay", "--trace"])
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("Replayed 3 samples"));
}

#[rstest]
fn run_from_trace_stops_when_rows_are_consumed() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_CONFIG);
    let rows: Vec<(u64, f64, f64)> = (0..8).map(|i| (i * 5, 200.0, 210.0)).collect();
    let trace = write_trace(&dir, "timestamp,lux1,lux2", &rows);

    let out = lumen()
        .args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .arg("run")
        .arg("--trace")
        .arg(&trace)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    let v: serde_json::Value = serde_json::from_str(stdout.trim()).expect("JSON summary");

    // Every row read exactly once, never past the end.
    assert_eq!(v["samples"], 8);
    assert_eq!(v["sensor_faults"], 0);
    assert_eq!(v["filtered_lux"].as_f64().map(|f| f.round()), Some(205.0));
}

#[rstest]
fn manual_run_from_trace_uses_nominal_tick_count() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_CONFIG);
    let trace = write_trace(
        &dir,
        "timestamp,lux1,lux2",
        &[(0, 200.0, 210.0), (5, 200.0, 210.0), (10, 200.0, 210.0), (15, 200.0, 210.0)],
    );

    // 4 rows x 5 ticks per sample
    lumen()
        .arg("--config")
        .arg(&cfg)
        .args(["--log-level", "error", "run", "--manual", "--trace"])
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("Run complete: 20 ticks"));
}

#[rstest]
fn cli_reports_bad_trace_header() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_CONFIG);
    let trace = write_trace(&dir, "ts,a,b", &[(0, 1.0, 1.0)]);

    lumen()
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--trace")
        .arg(&trace)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
#[case("[filter]\nkind = \"ema\"\n[calibration]\nblend_alpha = 0.0\n", "blend_alpha")]
#[case("[filter]\nkind = \"ema\"\n[timing]\ntick_ms = 20\nsample_ms = 10\n", "sample_ms")]
#[case("[calibration]\nadaptive = true\n", "filter")]
fn invalid_config_exits_with_config_code(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, toml);

    lumen()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains(needle));
}

#[rstest]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[filter]\nkind = \"ema\"\nalpha = 1.5\n");

    let out = lumen()
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(3)
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&out).trim()).expect("JSON error");
    assert_eq!(v["reason"], "Config");
    assert_eq!(v["exit_code"], 3);
    assert!(v["message"].as_str().unwrap().contains("filter.alpha"));
}

#[rstest]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    lumen()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not read"));
}

#[rstest]
fn self_check_reports_savgol_coefficients() {
    let dir = tempdir().unwrap();
    let cfg = write_config(
        &dir,
        "[filter]\nkind = \"savitzky_golay\"\nwindow = 7\npoly_order = 2\n",
    );

    lumen()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("coefficient sum 1.000000"))
        .stdout(predicate::str::contains("window 7, order 2"));
}

#[rstest]
fn log_file_receives_json_lines() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("lumen.log");
    let toml = format!(
        "{FAST_CONFIG}\n[logging]\nfile = {:?}\nlevel = \"info\"\n",
        log.display().to_string()
    );
    let cfg = write_config(&dir, &toml);

    lumen()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--ticks", "5"])
        .assert()
        .success();

    let text = fs::read_to_string(&log).unwrap();
    let first = text.lines().next().expect("log file has lines");
    let v: serde_json::Value = serde_json::from_str(first).expect("JSON log line");
    assert!(v.get("level").is_some());
}
