//! Record-button events via a gpiomon subprocess.
//!
//! The button is wired pull-up, so a falling edge is a press and a rising
//! edge a release. gpiomon prints one line per edge; a spawned task
//! translates those lines into [`ButtonEvent`]s on an mpsc channel.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// A physical button edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
    Released,
}

/// gpiomon-backed button event source.
pub struct GpiomonButtons {
    chip: String,
    line: u32,
}

impl GpiomonButtons {
    pub fn new(chip: impl Into<String>, line: u32) -> Self {
        Self {
            chip: chip.into(),
            line,
        }
    }

    /// Spawn the monitor and return the event stream.
    ///
    /// The reader task exits when gpiomon does; failures inside it are
    /// logged, never propagated.
    pub fn spawn(self) -> Result<mpsc::Receiver<ButtonEvent>> {
        let mut child = Command::new("gpiomon")
            .arg(&self.chip)
            .arg(self.line.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to spawn gpiomon for {}:{}", self.chip, self.line))?;

        let stdout = child
            .stdout
            .take()
            .context("gpiomon stdout not captured")?;

        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(event) = parse_edge_line(&line) {
                            debug!(?event, "Button edge");
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => {
                        error!("gpiomon exited, button events stopped");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "Failed reading gpiomon output");
                        break;
                    }
                }
            }

            let _ = child.start_kill();
        });

        Ok(rx)
    }
}

/// Map one gpiomon output line to a button event.
fn parse_edge_line(line: &str) -> Option<ButtonEvent> {
    let upper = line.to_ascii_uppercase();
    if upper.contains("FALLING") {
        Some(ButtonEvent::Pressed)
    } else if upper.contains("RISING") {
        Some(ButtonEvent::Released)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edge_line() {
        assert_eq!(
            parse_edge_line("event: FALLING EDGE offset: 22 timestamp: [1234.000]"),
            Some(ButtonEvent::Pressed)
        );
        assert_eq!(
            parse_edge_line("event: RISING EDGE offset: 22 timestamp: [1235.000]"),
            Some(ButtonEvent::Released)
        );
        assert_eq!(parse_edge_line("gpiomon: watching line 22"), None);
    }
}
