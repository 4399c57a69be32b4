//! Termination signals as channel messages.
//!
//! # Why a channel? (for beginners)
//!
//! A Unix signal handler may interrupt the program anywhere, even halfway
//! through a registry update, so it must not touch barriers itself.  Tokio's
//! signal driver installs a handler that only writes a byte to a self-pipe;
//! the task spawned here turns that wake-up into a signal number on an `mpsc`
//! channel.  The runtime loop selects on the channel and performs the
//! teardown on its own stack.

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::info;

/// Signals that stop the daemon.
pub const TERMINATION_SIGNALS: [(i32, &str); 3] = [(2, "SIGINT"), (15, "SIGTERM"), (1, "SIGHUP")];

/// Installs handlers for SIGINT, SIGTERM, and SIGHUP and returns the receiving
/// end of the notification channel.
///
/// Must be called from within a Tokio runtime.  The forwarding tasks stop
/// once the receiver is dropped.
///
/// # Errors
///
/// Returns an I/O error if a signal handler cannot be registered.
pub fn install_termination_signals() -> std::io::Result<mpsc::Receiver<i32>> {
    let (tx, rx) = mpsc::channel(TERMINATION_SIGNALS.len());

    for (number, name) in TERMINATION_SIGNALS {
        let mut stream = signal(SignalKind::from_raw(number))?;
        let tx = tx.clone();
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                info!(signal = name, "termination signal received");
                // A full channel already holds a pending termination.
                if tx.try_send(number).is_err() && tx.is_closed() {
                    break;
                }
            }
        });
    }

    Ok(rx)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
