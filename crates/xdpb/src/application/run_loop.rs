//! The runtime loop: waits on the display connection and the shutdown channel.
//!
//! # One iteration (for beginners)
//!
//! ```text
//! ┌─► drain_pending()        dispatch every event already read, flush
//! │        │
//! │   select! (biased)
//! │     ├─ shutdown.recv()   → dispatcher.shutdown(), return
//! │     └─ wait_readable()   → loop (a spurious wake-up just re-drains)
//! └────────┘
//! ```
//!
//! Signal handlers never touch barriers.  They only push the signal number
//! into the channel (see `infrastructure::shutdown`); teardown runs here, on
//! the loop's own stack, once the channel is observed.
//!
//! The shutdown branch is polled first so a pending signal always wins over a
//! stream of barrier events.

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::application::barrier_service::{BarrierService, ServiceError};
use crate::application::dispatch_events::EventDispatcher;

/// What woke the loop up.
enum Wake {
    Terminate(Option<i32>),
    Readable(Result<(), ServiceError>),
}

/// Runs `dispatcher` until a termination signal arrives.
///
/// Returns the received signal number, or `None` if every sender of
/// `shutdown` was dropped.  Either way every barrier has been destroyed when
/// this returns.
///
/// # Errors
///
/// Returns [`ServiceError`] if the connection fails.  Barriers are torn down
/// (as far as the connection still allows) before the error is returned.
pub async fn run_until_terminated<S: BarrierService>(
    dispatcher: &mut EventDispatcher<S>,
    shutdown: &mut mpsc::Receiver<i32>,
) -> Result<Option<i32>, ServiceError> {
    info!("waiting for barrier events");

    loop {
        if let Err(e) = dispatcher.drain_pending() {
            error!("display connection failed: {e}");
            dispatcher.shutdown(None);
            return Err(e);
        }

        let wake = tokio::select! {
            biased;
            signal = shutdown.recv() => Wake::Terminate(signal),
            ready = dispatcher.service().wait_readable() => Wake::Readable(ready),
        };

        match wake {
            Wake::Terminate(signal) => {
                if signal.is_none() {
                    debug!("shutdown channel closed");
                }
                dispatcher.shutdown(signal);
                return Ok(signal);
            }
            Wake::Readable(Ok(())) => {}
            Wake::Readable(Err(e)) => {
                error!("waiting for display events failed: {e}");
                dispatcher.shutdown(None);
                return Err(e);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
