//! systemd liveness notifications.
//!
//! Sends `READY=1` and `WATCHDOG=1` datagrams to the socket named by
//! `NOTIFY_SOCKET`. Outside systemd (no socket in the environment) every
//! call is a no-op. Delivery failures are warnings; liveness signalling
//! must never fail the caller.

use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;

use tracing::{debug, warn};

use super::LivenessNotifier;

/// sd_notify-style supervisor notifier.
pub struct SdNotifier {
    socket_path: Option<PathBuf>,
}

impl SdNotifier {
    /// Build from the `NOTIFY_SOCKET` environment variable.
    pub fn from_env() -> Self {
        let socket_path = match std::env::var("NOTIFY_SOCKET") {
            // Abstract-namespace sockets need nul-prefixed addresses the
            // std API cannot express; treat them as absent.
            Ok(path) if path.starts_with('@') => {
                warn!("Abstract NOTIFY_SOCKET unsupported, liveness disabled");
                None
            }
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => None,
        };

        if socket_path.is_none() {
            debug!("No NOTIFY_SOCKET, liveness notifications disabled");
        }

        Self { socket_path }
    }

    fn send(&self, state: &str) {
        let Some(ref path) = self.socket_path else {
            return;
        };

        let result = UnixDatagram::unbound().and_then(|socket| socket.send_to(state.as_bytes(), path));

        if let Err(e) = result {
            warn!(error = %e, state, "Failed to send liveness notification");
        }
    }
}

impl LivenessNotifier for SdNotifier {
    fn ready(&self) {
        self.send("READY=1");
    }

    fn heartbeat(&self) {
        self.send("WATCHDOG=1");
    }
}
