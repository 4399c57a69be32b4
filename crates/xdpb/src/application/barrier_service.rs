//! The display-connection seam.
//!
//! Everything the daemon needs from the display server is expressed by the
//! [`BarrierService`] trait.  The X11 implementation lives in the
//! infrastructure layer; tests use the recording implementation in
//! `infrastructure::mock`.

use async_trait::async_trait;
use thiserror::Error;
use xdpb_core::{BarrierHandle, EdgeBarrier, MotionDelta, OutputRect};

/// Error type for display-connection operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The display could not be opened.
    #[error("failed to connect to display: {0}")]
    Connect(String),

    /// A required protocol extension is not offered by the server.
    #[error("{0} extension not found")]
    MissingExtension(&'static str),

    /// A required protocol extension is present but too old.
    #[error("{name} too old (have {have}, need {need}+)")]
    ExtensionTooOld {
        name: &'static str,
        have: String,
        need: &'static str,
    },

    /// A request failed or the connection broke.
    #[error("display protocol error: {0}")]
    Protocol(String),

    /// Barrier geometry that the protocol cannot express.
    #[error("barrier coordinates out of range: {0:?}")]
    OutOfRange(EdgeBarrier),

    /// Waiting for the connection to become readable failed.
    #[error("I/O error while waiting for display events: {0}")]
    Io(#[from] std::io::Error),
}

/// An event read from the display connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionEvent {
    /// The pointer is held back by a barrier.
    BarrierHit {
        handle: BarrierHandle,
        delta: MotionDelta,
        /// Master pointer that hit the barrier.
        device_id: u16,
        /// Server-assigned id of this barrier event; must accompany a release.
        event_id: u32,
    },
    /// The pointer moved away from a barrier.
    BarrierLeave {
        handle: BarrierHandle,
        delta: MotionDelta,
    },
    /// Outputs were added, removed, moved, or resized.
    TopologyChanged,
    /// Anything else the connection delivered.
    Other,
}

/// Display-server operations used by the daemon.
///
/// Requests are buffered; [`flush`](BarrierService::flush) pushes them to the
/// server.  Events are read with the non-blocking
/// [`poll_event`](BarrierService::poll_event); when it returns `None` the
/// caller awaits [`wait_readable`](BarrierService::wait_readable).
#[async_trait(?Send)]
pub trait BarrierService {
    /// Creates a barrier along `edge` and returns its handle.
    ///
    /// Motion in `edge.direction` stays permitted so a released pointer can
    /// travel back onto the output.
    fn create_barrier(&mut self, edge: &EdgeBarrier) -> Result<BarrierHandle, ServiceError>;

    /// Destroys a barrier.
    fn destroy_barrier(&mut self, handle: BarrierHandle) -> Result<(), ServiceError>;

    /// Lets `device_id` pass `handle` for the barrier event `event_id`.
    fn release_pointer(
        &mut self,
        device_id: u16,
        handle: BarrierHandle,
        event_id: u32,
    ) -> Result<(), ServiceError>;

    /// Returns the rectangles of all outputs, including disabled ones.
    fn query_output_rectangles(&mut self) -> Result<Vec<OutputRect>, ServiceError>;

    /// Sends all buffered requests to the server.
    fn flush(&mut self) -> Result<(), ServiceError>;

    /// Returns the next already-received event, without blocking.
    fn poll_event(&mut self) -> Result<Option<ConnectionEvent>, ServiceError>;

    /// Resolves once the connection may have new events.
    ///
    /// Spurious wake-ups are allowed; callers re-poll and wait again.
    async fn wait_readable(&self) -> Result<(), ServiceError>;
}
