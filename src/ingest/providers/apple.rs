// src/ingest/providers/apple.rs
//! Helpers shared by the macOS-local adapters: subprocess calls and Core Data timestamps.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Seconds between 1970-01-01 and 2001-01-01 (Apple reference date).
pub const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

/// Average durations above this are taken to be nanoseconds.
const NANOS_THRESHOLD: i64 = 100_000;

/// Absolute timestamps in seconds stay below this until the year 33000.
const NANOS_TIMESTAMP_THRESHOLD: i64 = 1_000_000_000_000;

/// Run `program args…`, optionally feeding `stdin`, and return trimmed stdout.
/// The child is killed when `timeout` elapses.
pub async fn run_command(
    program: &str,
    args: &[&str],
    stdin: Option<&str>,
    timeout: Duration,
) -> Result<String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning {program}"))?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input.as_bytes())
            .await
            .with_context(|| format!("writing stdin of {program}"))?;
        drop(pipe);
    }

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .with_context(|| format!("{program} timed out after {}ms", timeout.as_millis()))?
        .with_context(|| format!("waiting for {program}"))?;

    if !output.status.success() {
        let err = String::from_utf8_lossy(&output.stderr);
        bail!("{program} exited with {}: {}", output.status, err.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Execute an AppleScript by piping it to `osascript` on stdin.
pub async fn run_applescript(script: &str) -> Result<String> {
    run_command("osascript", &[], Some(script), Duration::from_secs(10)).await
}

/// Apple "Core Data" timestamps come in seconds or nanoseconds depending on the OS version.
pub fn detect_nanoseconds(avg: Option<i64>) -> bool {
    avg.is_some_and(|v| v > NANOS_THRESHOLD)
}

/// Same question for absolute timestamps (e.g. `message.date`) rather than durations.
pub fn detect_nanosecond_timestamps(avg: Option<i64>) -> bool {
    avg.is_some_and(|v| v > NANOS_TIMESTAMP_THRESHOLD)
}

pub fn apple_to_datetime(ts: i64, is_nanos: bool) -> Option<DateTime<Utc>> {
    let secs = if is_nanos { ts / 1_000_000_000 } else { ts };
    DateTime::from_timestamp(secs + APPLE_EPOCH_OFFSET, 0)
}

/// Apple timestamp for a unix time, in the same unit as the database.
pub fn unix_to_apple(unix_secs: i64, is_nanos: bool) -> i64 {
    let secs = unix_secs - APPLE_EPOCH_OFFSET;
    if is_nanos {
        secs.saturating_mul(1_000_000_000)
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apple_epoch_maps_to_2001() {
        let dt = apple_to_datetime(0, false).unwrap();
        assert_eq!(dt.to_rfc3339(), "2001-01-01T00:00:00+00:00");
        let ns = apple_to_datetime(86_400 * 1_000_000_000, true).unwrap();
        assert_eq!(ns.to_rfc3339(), "2001-01-02T00:00:00+00:00");
    }

    #[test]
    fn unit_detection_uses_threshold() {
        assert!(!detect_nanoseconds(None));
        assert!(!detect_nanoseconds(Some(3_600)));
        assert!(detect_nanoseconds(Some(700_000_000_000_000_000)));
    }

    #[test]
    fn timestamp_detection_tolerates_second_precision_dates() {
        assert!(!detect_nanosecond_timestamps(Some(780_000_000)));
        assert!(detect_nanosecond_timestamps(Some(780_000_000_000_000_000)));
    }

    #[test]
    fn unix_to_apple_round_trips() {
        let unix = 1_700_000_000;
        let apple = unix_to_apple(unix, true);
        assert_eq!(
            apple_to_datetime(apple, true).unwrap().timestamp(),
            unix
        );
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let res = run_command(
            "definitely-not-a-real-binary-7f3a",
            &[],
            None,
            Duration::from_secs(1),
        )
        .await;
        assert!(res.is_err());
    }
}
