//! Ranging sensor adapter.
//!
//! Spawns a configured ranging command that prints one distance reading
//! (centimeters) to stdout. The measurement is bounded by a short timeout
//! so a wedged sensor can never hang the control loop.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

use super::DistanceSensor;

/// Errors from a single distance measurement.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("timed out waiting for ranging result")]
    Timeout,

    #[error("failed to run ranging command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ranging command failed: {0}")]
    Command(String),

    #[error("unparseable ranging output: {0:?}")]
    Parse(String),
}

/// Subprocess-backed distance sensor.
pub struct RangingSensor {
    command: Vec<String>,
    sample_timeout: Duration,
}

impl RangingSensor {
    pub fn new(command: Vec<String>, sample_timeout: Duration) -> Self {
        Self {
            command,
            sample_timeout,
        }
    }
}

#[async_trait]
impl DistanceSensor for RangingSensor {
    async fn sample(&self) -> Result<f64, SensorError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| SensorError::Command("empty ranging command".to_string()))?;

        let output = timeout(
            self.sample_timeout,
            Command::new(program)
                .args(args)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| SensorError::Timeout)?
        .map_err(SensorError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SensorError::Command(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_distance(&stdout)
    }
}

fn parse_distance(output: &str) -> Result<f64, SensorError> {
    output
        .trim()
        .parse::<f64>()
        .map_err(|_| SensorError::Parse(output.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distance() {
        assert_eq!(parse_distance("12.5\n").unwrap(), 12.5);
        assert_eq!(parse_distance("  7 ").unwrap(), 7.0);
        assert!(matches!(
            parse_distance("no reading"),
            Err(SensorError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_sample_via_subprocess() {
        let sensor = RangingSensor::new(
            vec!["echo".to_string(), "23.4".to_string()],
            Duration::from_secs(1),
        );
        assert_eq!(sensor.sample().await.unwrap(), 23.4);
    }

    #[tokio::test]
    async fn test_sample_timeout() {
        let sensor = RangingSensor::new(
            vec!["sleep".to_string(), "5".to_string()],
            Duration::from_millis(50),
        );
        assert!(matches!(sensor.sample().await, Err(SensorError::Timeout)));
    }
}
