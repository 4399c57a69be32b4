//! Recording barrier service for unit and integration testing.
//!
//! # Why a recording service?
//!
//! The real X11 service needs a running X server with XFixes, XInput, and
//! RandR, and it actually confines the pointer of whoever is sitting at the
//! machine.  None of that is available (or welcome) in a test run.
//!
//! `RecordingBarrierService` keeps everything in memory instead:
//!
//! - `query_output_rectangles()` returns whatever `set_outputs()` configured.
//! - `create_barrier()` hands out X-style handles and remembers the edge.
//! - `destroy_barrier()` / `release_pointer()` / `flush()` are recorded so
//!   tests can assert on exactly what the daemon asked the server to do.
//! - `push_event()` queues a [`ConnectionEvent`] and wakes `wait_readable()`.
//!
//! # Shared handle
//!
//! The service is `Clone`; every clone shares the same recorded state.  A test
//! hands one clone to the dispatcher and keeps another to inject events and
//! inspect the results:
//!
//! ```ignore
//! let service = RecordingBarrierService::new();
//! let probe = service.clone();
//! let mut dispatcher = EventDispatcher::new(service, mode, clock);
//! probe.push_event(ConnectionEvent::TopologyChanged);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;
use xdpb_core::{BarrierHandle, EdgeBarrier, OutputRect};

use crate::application::barrier_service::{BarrierService, ConnectionEvent, ServiceError};

/// First handle handed out, shaped like an X client resource id.
const FIRST_HANDLE: u32 = 0x0020_0001;

#[derive(Debug, Default)]
struct Recorded {
    outputs: Vec<OutputRect>,
    events: VecDeque<ConnectionEvent>,
    next_handle: u32,
    created: Vec<(BarrierHandle, EdgeBarrier)>,
    live: Vec<BarrierHandle>,
    destroyed: Vec<BarrierHandle>,
    releases: Vec<(u16, BarrierHandle, u32)>,
    flushes: usize,
    fail_queries: bool,
    fail_destroys: bool,
}

/// In-memory [`BarrierService`] that records every request.
#[derive(Debug, Clone, Default)]
pub struct RecordingBarrierService {
    recorded: Arc<Mutex<Recorded>>,
    readable: Arc<Notify>,
}

impl RecordingBarrierService {
    /// Creates a service with no outputs and an empty event queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the rectangles returned by the next `query_output_rectangles()`.
    pub fn set_outputs(&self, outputs: Vec<OutputRect>) {
        self.recorded().outputs = outputs;
    }

    /// Queues an event and wakes a pending `wait_readable()`.
    pub fn push_event(&self, event: ConnectionEvent) {
        self.recorded().events.push_back(event);
        self.readable.notify_one();
    }

    /// Makes `query_output_rectangles()` fail with a protocol error.
    pub fn fail_queries(&self, fail: bool) {
        self.recorded().fail_queries = fail;
    }

    /// Makes `destroy_barrier()` fail with a protocol error.
    pub fn fail_destroys(&self, fail: bool) {
        self.recorded().fail_destroys = fail;
    }

    /// Every barrier ever created, in creation order.
    pub fn created(&self) -> Vec<(BarrierHandle, EdgeBarrier)> {
        self.recorded().created.clone()
    }

    /// Barriers created and not yet destroyed.
    pub fn live_barriers(&self) -> Vec<BarrierHandle> {
        self.recorded().live.clone()
    }

    /// Every destroy request, in order.
    pub fn destroyed(&self) -> Vec<BarrierHandle> {
        self.recorded().destroyed.clone()
    }

    /// Every `(device_id, handle, event_id)` release request, in order.
    pub fn releases(&self) -> Vec<(u16, BarrierHandle, u32)> {
        self.recorded().releases.clone()
    }

    pub fn flush_count(&self) -> usize {
        self.recorded().flushes
    }

    /// Events queued and not yet polled.
    pub fn pending_events(&self) -> usize {
        self.recorded().events.len()
    }
}

#[async_trait(?Send)]
impl BarrierService for RecordingBarrierService {
    fn create_barrier(&mut self, edge: &EdgeBarrier) -> Result<BarrierHandle, ServiceError> {
        let mut recorded = self.recorded();
        let handle = BarrierHandle(FIRST_HANDLE + recorded.next_handle);
        recorded.next_handle += 1;
        recorded.created.push((handle, *edge));
        recorded.live.push(handle);
        Ok(handle)
    }

    fn destroy_barrier(&mut self, handle: BarrierHandle) -> Result<(), ServiceError> {
        let mut recorded = self.recorded();
        if recorded.fail_destroys {
            return Err(ServiceError::Protocol("mock destroy failure".into()));
        }
        recorded.live.retain(|h| *h != handle);
        recorded.destroyed.push(handle);
        Ok(())
    }

    fn release_pointer(
        &mut self,
        device_id: u16,
        handle: BarrierHandle,
        event_id: u32,
    ) -> Result<(), ServiceError> {
        self.recorded().releases.push((device_id, handle, event_id));
        Ok(())
    }

    fn query_output_rectangles(&mut self) -> Result<Vec<OutputRect>, ServiceError> {
        let recorded = self.recorded();
        if recorded.fail_queries {
            return Err(ServiceError::Protocol("mock query failure".into()));
        }
        Ok(recorded.outputs.clone())
    }

    fn flush(&mut self) -> Result<(), ServiceError> {
        self.recorded().flushes += 1;
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<ConnectionEvent>, ServiceError> {
        Ok(self.recorded().events.pop_front())
    }

    async fn wait_readable(&self) -> Result<(), ServiceError> {
        if self.pending_events() > 0 {
            return Ok(());
        }
        self.readable.notified().await;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
