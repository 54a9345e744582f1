//! Append-only JSONL provenance event log for generation runs.

use crate::core::error::{GenError, Result};
use crate::core::types::{GenEvent, TimestampedEvent};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Generate an ISO 8601 timestamp.
pub fn now_iso8601() -> String {
    // Manual implementation — no chrono dependency
    use std::time::{SystemTime, UNIX_EPOCH};
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = dur.as_secs();
    let days = secs / 86400;
    let time_secs = secs % 86400;
    let hours = time_secs / 3600;
    let minutes = (time_secs % 3600) / 60;
    let seconds = time_secs % 60;

    // Days since epoch to Y-M-D (simplified Gregorian)
    let mut year = 1970i64;
    let mut remaining = days as i64;
    loop {
        let year_days = if is_leap(year) { 366 } else { 365 };
        if remaining < year_days {
            break;
        }
        remaining -= year_days;
        year += 1;
    }
    let leap = is_leap(year);
    let month_days = [
        31,
        if leap { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];
    let mut month = 0;
    for (i, &md) in month_days.iter().enumerate() {
        if remaining < md as i64 {
            month = i + 1;
            break;
        }
        remaining -= md as i64;
    }
    let day = remaining + 1;

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year, month, day, hours, minutes, seconds
    )
}

fn is_leap(y: i64) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

/// Generate a run ID.
pub fn generate_run_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("g-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

/// Event log path within the output directory.
pub fn event_log_path(out_dir: &Path) -> PathBuf {
    out_dir.join("fragua.events.jsonl")
}

/// Append an event to the output directory's event log.
pub fn append_event(out_dir: &Path, event: GenEvent) -> Result<()> {
    let path = event_log_path(out_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GenError::EmissionIo {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let te = TimestampedEvent {
        ts: now_iso8601(),
        event,
    };
    let json = serde_json::to_string(&te).map_err(|e| GenError::EmissionIo {
        path: path.clone(),
        source: std::io::Error::other(e),
    })?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| GenError::EmissionIo {
            path: path.clone(),
            source: e,
        })?;

    writeln!(file, "{}", json).map_err(|e| GenError::EmissionIo { path, source: e })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_iso8601_shape() {
        let ts = now_iso8601();
        assert!(ts.starts_with("20"));
        assert!(ts.ends_with('Z'));
        assert!(ts.contains('T'));
        assert_eq!(ts.len(), 20);
    }

    #[test]
    fn test_generate_run_id() {
        let id = generate_run_id();
        assert!(id.starts_with("g-"));
        assert_eq!(id.len(), 14);
    }

    #[test]
    fn test_event_log_path() {
        let p = event_log_path(Path::new("/out"));
        assert_eq!(p, PathBuf::from("/out/fragua.events.jsonl"));
    }

    #[test]
    fn test_append_event() {
        let dir = tempfile::tempdir().unwrap();
        append_event(
            dir.path(),
            GenEvent::GenerateStarted {
                name: "payments".to_string(),
                run_id: "g-abc".to_string(),
                fragua_version: "0.3.1".to_string(),
            },
        )
        .unwrap();
        append_event(
            dir.path(),
            GenEvent::DriftDetected {
                file: "com/acme/A.java".to_string(),
                expected_hash: "blake3:aaa".to_string(),
                actual_hash: "blake3:bbb".to_string(),
            },
        )
        .unwrap();

        let content = std::fs::read_to_string(event_log_path(dir.path())).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"event\":\"generate_started\""));
        assert!(lines[1].contains("\"event\":\"drift_detected\""));
        // Each line is standalone JSON with a timestamp.
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert!(parsed["ts"].as_str().unwrap().ends_with('Z'));
    }
}
