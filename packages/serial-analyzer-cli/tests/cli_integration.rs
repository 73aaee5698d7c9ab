use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn serial_analyzer() -> Command {
    let mut cmd = Command::cargo_bin("serial-analyzer").unwrap();
    cmd.env_remove("SERIAL_ANALYZER_CONFIG")
        .env_remove("SERIAL_ANALYZER_PORT");
    cmd
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    serial_analyzer()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    serial_analyzer()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("serial-analyzer"));
}

#[test]
fn test_help_lists_subcommands() {
    serial_analyzer()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("monitor"))
        .stdout(predicate::str::contains("filter"))
        .stdout(predicate::str::contains("ports"));
}

// =============================================================================
// FILTER SUBCOMMAND
// =============================================================================

fn samples_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_filter_median() {
    let input = samples_file("3\n1\n5\nabc\n4\n");

    let output = serial_analyzer()
        .args(["filter", "--kind", "median", "--radius", "1", "--compact", "--file"])
        .arg(input.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["filter"], "MedianFilter");
    assert_eq!(json["samples"], 4);
    assert_eq!(json["rejected"], 1);

    let rows = json["rows"].as_array().unwrap();
    assert!(rows[0]["processed"].is_null());
    assert!(rows[1]["processed"].is_null());
    // median of 3, 1, 5 belongs to the centered line 2
    assert_eq!(rows[2]["processed"], 3.0);
    assert_eq!(rows[2]["processed_line"], 2);
    // window is now 1, 5, 4
    assert_eq!(rows[3]["line"], 5);
    assert_eq!(rows[3]["raw"], 4.0);
    assert_eq!(rows[3]["processed"], 4.0);
    assert_eq!(rows[3]["processed_line"], 3);
}

#[test]
fn test_filter_control_line_resets_window() {
    let input = samples_file("2\n4\nCLOSED\n6\n");

    let output = serial_analyzer()
        .args(["filter", "--kind", "mean", "--radius", "0", "--compact", "--file"])
        .arg(input.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["filter"], "MovingAverageFilter");
    assert_eq!(json["samples"], 3);
    assert_eq!(json["rejected"], 0);
    assert_eq!(json["rows"][2]["processed"], 6.0);
}

#[test]
fn test_filter_writes_output_file() {
    let input = samples_file("1\n2\n3\n");
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("filtered.json");

    serial_analyzer()
        .args(["filter", "--kind", "mean", "--radius", "1", "--file"])
        .arg(input.path())
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["rows"][2]["processed"], 2.0);
}

#[test]
fn test_filter_missing_file() {
    serial_analyzer()
        .args(["filter", "--file", "/nonexistent/samples.txt"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_filter_keeps_leading_number_of_cut_frames() {
    let input = samples_file("12abc\n 7.5 mV\nx9\n");

    let output = serial_analyzer()
        .args(["filter", "--kind", "mean", "--radius", "0", "--compact", "--file"])
        .arg(input.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["samples"], 2);
    assert_eq!(json["rejected"], 1);
    assert_eq!(json["rows"][0]["raw"], 12.0);
    assert_eq!(json["rows"][1]["raw"], 7.5);
}

#[test]
fn test_filter_rejects_oversized_radius() {
    let input = samples_file("1\n2\n");

    for radius in ["18446744073709551615", "1000000"] {
        serial_analyzer()
            .args(["filter", "--radius", radius, "--file"])
            .arg(input.path())
            .assert()
            .code(2)
            .stderr(predicate::str::contains("too large"));
    }
}

#[test]
fn test_filter_unknown_kind() {
    serial_analyzer()
        .args(["filter", "--kind", "mode", "--file", "samples.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mode"));
}

// =============================================================================
// MONITOR SUBCOMMAND
// =============================================================================

#[test]
fn test_monitor_requires_source() {
    serial_analyzer()
        .arg("monitor")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--port"));
}

#[test]
fn test_monitor_rejects_port_with_file() {
    serial_analyzer()
        .args(["monitor", "--port", "COM3", "--file", "capture.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_monitor_missing_capture_is_source_error() {
    let dir = tempfile::tempdir().unwrap();
    serial_analyzer()
        .args(["monitor", "--file", "/nonexistent/capture.txt", "--output-dir"])
        .arg(dir.path())
        .assert()
        .code(3);
}

#[test]
fn test_monitor_invalid_config() {
    let config = samples_file("{ \"source\": { \"type\": \"serial\" } }");
    serial_analyzer()
        .arg("monitor")
        .arg("--config")
        .arg(config.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid config"));
}

#[test]
fn test_monitor_rejects_oversized_radius() {
    serial_analyzer()
        .args(["monitor", "--file", "capture.txt", "--median", "1000000"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("too large"));
}

#[test]
fn test_monitor_output_failure_shuts_reader_down() {
    let capture = samples_file("1.0\n2.0\n");
    let dir = tempfile::tempdir().unwrap();
    // a directory where the analyzer log should go cannot be opened for appending
    std::fs::create_dir(dir.path().join("blocked.txt")).unwrap();

    let config = samples_file(&format!(
        r#"{{
            "source": {{
                "type": "file",
                "path": {},
                "frame_size": 4,
                "rate_limit_ms": 20,
                "loop_playback": true
            }},
            "analyzers": [
                {{ "kind": "median", "radius": 1 }},
                {{ "kind": "mean", "radius": 1, "output": "blocked.txt" }}
            ],
            "output_dir": {}
        }}"#,
        serde_json::to_string(capture.path().to_str().unwrap()).unwrap(),
        serde_json::to_string(dir.path().to_str().unwrap()).unwrap(),
    ));

    serial_analyzer()
        .arg("monitor")
        .arg("--config")
        .arg(config.path())
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("blocked.txt"));

    assert!(dir.path().join("RawData.txt").exists());
    assert!(dir.path().join("MedianFilter.txt").exists());
}

#[test]
fn test_monitor_replays_capture_until_it_ends() {
    // 4-byte frames
    let capture = samples_file("1.0\n5.0\n3.0\n2.0\n4.0\n");
    let dir = tempfile::tempdir().unwrap();

    let output = serial_analyzer()
        .args(["monitor", "--frame-size", "4", "--rate-limit-ms", "30"])
        .args(["--median", "1", "--mean", "1", "--interval-ms", "20", "--json"])
        .args(["--duration", "30", "--file"])
        .arg(capture.path())
        .arg("--output-dir")
        .arg(dir.path())
        .timeout(std::time::Duration::from_secs(30))
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["frames_read"], 5);
    assert_eq!(summary["reader_active"], false);
    assert_eq!(summary["analyzers"].as_array().unwrap().len(), 2);
    assert_eq!(summary["analyzers"][0]["name"], "MedianFilter");
    assert_eq!(summary["analyzers"][1]["name"], "MovingAverageFilter");

    assert!(dir.path().join("RawData.txt").exists());
    assert!(dir.path().join("MedianFilter.txt").exists());
    assert!(dir.path().join("MovingAverageFilter.txt").exists());

    let raw = std::fs::read_to_string(dir.path().join("RawData.txt")).unwrap();
    for line in raw.lines() {
        let (_, value) = line.rsplit_once(" , ").unwrap();
        assert!(["1", "5", "3", "2", "4"].contains(&value));
    }
}

// =============================================================================
// PORTS SUBCOMMAND
// =============================================================================

#[test]
fn test_ports_json_is_an_array() {
    let output = serial_analyzer().args(["ports", "--json"]).output().unwrap();
    // enumeration can fail on machines without a serial subsystem
    if output.status.success() {
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert!(json.is_array());
    }
}
