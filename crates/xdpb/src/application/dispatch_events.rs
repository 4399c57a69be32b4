//! EventDispatcher: turns connection events into barrier releases.
//!
//! The dispatcher owns everything the daemon mutates: the connection service,
//! the barrier registry, the release policy, and the layout manager.  It is
//! driven by the runtime loop (`run_loop`), one event at a time.
//!
//! # Event routing (for beginners)
//!
//! ```text
//! BarrierHit / BarrierLeave ──► registry.lookup(handle)
//!                                   │ None → stale, ignored
//!                                   ▼
//!                              policy.evaluate(...)
//!                                   │ Release
//!                                   ▼
//!                   service.release_pointer(device, handle, event) + flush
//!
//! TopologyChanged ──► layout.rebuild()
//! signal          ──► shutdown(): ShuttingDown + layout.teardown()
//! ```
//!
//! Once the dispatcher is `ShuttingDown` every further event is ignored; the
//! state never goes back to `Running`.

use tracing::{debug, info, trace};
use xdpb_core::{
    BarrierEventKind, BarrierHandle, BarrierRegistry, Clock, Decision, MotionDelta, ReleaseMode,
    ReleasePolicy,
};

use crate::application::barrier_service::{BarrierService, ConnectionEvent, ServiceError};
use crate::application::manage_barriers::LayoutManager;

/// Lifecycle of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// Barrier events are evaluated and topology changes rebuild the layout.
    Running,
    /// Terminal: barriers are torn down and events are ignored.
    ShuttingDown,
}

/// Counters reported when the daemon exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Barrier hits evaluated by the policy.
    pub hits: u64,
    /// Hits that released the pointer.
    pub releases: u64,
    /// Hits moving away from their barrier.
    pub discarded: u64,
    /// Events naming a barrier that no longer exists.
    pub stale: u64,
    /// Layout rebuilds triggered by topology changes.
    pub rebuilds: u64,
}

/// Routes connection events to the registry, the policy, and the layout manager.
pub struct EventDispatcher<S> {
    service: S,
    registry: BarrierRegistry,
    policy: ReleasePolicy,
    layout: LayoutManager,
    state: RuntimeState,
    stats: DispatchStats,
}

impl<S: BarrierService> EventDispatcher<S> {
    /// Creates a dispatcher with an empty registry.  Call [`start`](Self::start)
    /// to create the initial barriers.
    pub fn new(service: S, mode: ReleaseMode, clock: Box<dyn Clock>) -> Self {
        Self {
            service,
            registry: BarrierRegistry::new(mode),
            policy: ReleasePolicy::new(mode, clock),
            layout: LayoutManager::new(),
            state: RuntimeState::Running,
            stats: DispatchStats::default(),
        }
    }

    /// Fences the current output layout.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the layout cannot be set up.
    pub fn start(&mut self) -> Result<usize, ServiceError> {
        info!(mode = %self.policy.mode(), "starting barrier dispatcher");
        self.layout.setup(&mut self.service, &mut self.registry)
    }

    /// Handles one connection event.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if a release or a rebuild fails.
    pub fn dispatch(&mut self, event: ConnectionEvent) -> Result<(), ServiceError> {
        if self.state == RuntimeState::ShuttingDown {
            trace!(?event, "ignoring event during shutdown");
            return Ok(());
        }

        match event {
            ConnectionEvent::BarrierHit { handle, delta, device_id, event_id } => {
                if let Some(Decision::Release) =
                    self.evaluate(BarrierEventKind::Hit, handle, delta)
                {
                    debug!(%handle, device_id, event_id, "releasing pointer");
                    self.service.release_pointer(device_id, handle, event_id)?;
                    self.service.flush()?;
                }
            }
            ConnectionEvent::BarrierLeave { handle, delta } => {
                self.evaluate(BarrierEventKind::Leave, handle, delta);
            }
            ConnectionEvent::TopologyChanged => {
                info!("output layout changed, rebuilding barriers");
                self.stats.rebuilds += 1;
                self.layout.rebuild(&mut self.service, &mut self.registry)?;
            }
            ConnectionEvent::Other => {}
        }
        Ok(())
    }

    fn evaluate(
        &mut self,
        kind: BarrierEventKind,
        handle: BarrierHandle,
        delta: MotionDelta,
    ) -> Option<Decision> {
        let Some((direction, state)) = self.registry.lookup(handle) else {
            trace!(%handle, ?kind, "event for unknown barrier");
            self.stats.stale += 1;
            return None;
        };

        let decision = self.policy.evaluate(kind, direction, delta, state);
        if kind == BarrierEventKind::Hit {
            self.stats.hits += 1;
            match decision {
                Decision::Release => self.stats.releases += 1,
                Decision::Discarded => self.stats.discarded += 1,
                Decision::Hold => {}
            }
        }
        Some(decision)
    }

    /// Dispatches every event the connection has already buffered, then
    /// flushes outgoing requests.
    ///
    /// Returns the number of events dispatched.
    ///
    /// # Errors
    ///
    /// Returns the first [`ServiceError`] raised by polling or dispatching.
    pub fn drain_pending(&mut self) -> Result<usize, ServiceError> {
        let mut count = 0;
        while let Some(event) = self.service.poll_event()? {
            self.dispatch(event)?;
            count += 1;
        }
        self.service.flush()?;
        Ok(count)
    }

    /// Enters `ShuttingDown` and destroys every barrier.
    ///
    /// `signal` is the signal number that caused the shutdown, or `None` when
    /// the dispatcher is stopped for another reason.  Calling this more than
    /// once has no further effect.
    pub fn shutdown(&mut self, signal: Option<i32>) {
        if self.state == RuntimeState::ShuttingDown {
            return;
        }
        self.state = RuntimeState::ShuttingDown;
        info!(?signal, "shutting down, removing barriers");
        self.layout.teardown(&mut self.service, &mut self.registry);

        let stats = self.stats;
        info!(
            hits = stats.hits,
            releases = stats.releases,
            discarded = stats.discarded,
            stale = stats.stale,
            rebuilds = stats.rebuilds,
            "dispatch statistics"
        );
    }

    pub fn state(&self) -> RuntimeState {
        self.state
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn registry(&self) -> &BarrierRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &LayoutManager {
        &self.layout
    }

    /// The connection service, for waiting on readiness.
    pub fn service(&self) -> &S {
        &self.service
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::RecordingBarrierService;
    use xdpb_core::{ManualClock, OutputRect};

    fn make_dispatcher(mode: ReleaseMode) -> (EventDispatcher<RecordingBarrierService>, RecordingBarrierService) {
        let service = RecordingBarrierService::new();
        service.set_outputs(vec![OutputRect::new(0, 0, 1920, 1080)]);
        let probe = service.clone();
        let mut dispatcher = EventDispatcher::new(service, mode, Box::new(ManualClock::default()));
        dispatcher.start().unwrap();
        (dispatcher, probe)
    }

    /// Handle of the left-edge barrier of the first output.
    fn left_edge(probe: &RecordingBarrierService) -> BarrierHandle {
        probe.created()[0].0
    }

    fn hit(handle: BarrierHandle, dx: f64, dy: f64) -> ConnectionEvent {
        ConnectionEvent::BarrierHit { handle, delta: MotionDelta::new(dx, dy), device_id: 2, event_id: 1 }
    }

    #[test]
    fn test_start_fences_every_output() {
        let (dispatcher, probe) = make_dispatcher(ReleaseMode::default());

        assert_eq!(dispatcher.registry().len(), 4);
        assert_eq!(probe.live_barriers().len(), 4);
        assert_eq!(dispatcher.state(), RuntimeState::Running);
    }

    #[test]
    fn test_release_decision_sends_release_with_event_ids() {
        // Arrange
        let (mut dispatcher, probe) = make_dispatcher(ReleaseMode::speed(10.0).unwrap());
        let left = left_edge(&probe);

        // Act
        dispatcher
            .dispatch(ConnectionEvent::BarrierHit {
                handle: left,
                delta: MotionDelta::new(-25.0, 0.0),
                device_id: 3,
                event_id: 42,
            })
            .unwrap();

        // Assert
        assert_eq!(probe.releases(), vec![(3, left, 42)]);
        assert_eq!(dispatcher.stats().releases, 1);
    }

    #[test]
    fn test_hold_decision_sends_nothing() {
        let (mut dispatcher, probe) = make_dispatcher(ReleaseMode::speed(10.0).unwrap());
        let left = left_edge(&probe);

        dispatcher.dispatch(hit(left, -5.0, 0.0)).unwrap();

        assert!(probe.releases().is_empty());
        assert_eq!(dispatcher.stats().hits, 1);
    }

    #[test]
    fn test_hit_moving_away_is_counted_as_discarded() {
        let (mut dispatcher, probe) = make_dispatcher(ReleaseMode::default());
        let left = left_edge(&probe);

        dispatcher.dispatch(hit(left, 80.0, 0.0)).unwrap();

        assert!(probe.releases().is_empty());
        assert_eq!(dispatcher.stats().discarded, 1);
    }

    #[test]
    fn test_unknown_handle_is_ignored_and_counted() {
        let (mut dispatcher, probe) = make_dispatcher(ReleaseMode::speed(0.0).unwrap());

        dispatcher.dispatch(hit(BarrierHandle(0xdead), -100.0, 0.0)).unwrap();
        dispatcher
            .dispatch(ConnectionEvent::BarrierLeave {
                handle: BarrierHandle(0xdead),
                delta: MotionDelta::default(),
            })
            .unwrap();

        assert!(probe.releases().is_empty());
        assert_eq!(dispatcher.stats().stale, 2);
    }

    #[test]
    fn test_leave_resets_distance_accumulation() {
        // Arrange: 40 px into a 50 px threshold, then the pointer leaves.
        let (mut dispatcher, probe) = make_dispatcher(ReleaseMode::default());
        let left = left_edge(&probe);
        dispatcher.dispatch(hit(left, -40.0, 0.0)).unwrap();
        dispatcher
            .dispatch(ConnectionEvent::BarrierLeave { handle: left, delta: MotionDelta::new(1.0, 0.0) })
            .unwrap();

        // Act
        dispatcher.dispatch(hit(left, -40.0, 0.0)).unwrap();

        // Assert
        assert!(probe.releases().is_empty());
    }

    #[test]
    fn test_double_tap_uses_injected_clock() {
        // Arrange
        let clock = ManualClock::default();
        let service = RecordingBarrierService::new();
        service.set_outputs(vec![OutputRect::new(0, 0, 800, 600)]);
        let probe = service.clone();
        let mut dispatcher = EventDispatcher::new(
            service,
            ReleaseMode::double_tap(0.5).unwrap(),
            Box::new(clock.clone()),
        );
        dispatcher.start().unwrap();
        let left = left_edge(&probe);
        let leave = ConnectionEvent::BarrierLeave { handle: left, delta: MotionDelta::default() };

        // Act: tap at 10.0 s, leave, tap again at 10.2 s.
        clock.set(10.0);
        dispatcher.dispatch(hit(left, -2.0, 0.0)).unwrap();
        dispatcher.dispatch(leave).unwrap();
        clock.advance(0.2);
        dispatcher.dispatch(hit(left, -2.0, 0.0)).unwrap();

        // Assert
        assert_eq!(probe.releases().len(), 1);
    }

    #[test]
    fn test_topology_change_rebuilds_with_new_handles() {
        // Arrange
        let (mut dispatcher, probe) = make_dispatcher(ReleaseMode::default());
        let old = left_edge(&probe);
        probe.set_outputs(vec![
            OutputRect::new(0, 0, 1920, 1080),
            OutputRect::new(1920, 0, 1280, 1024),
        ]);

        // Act
        dispatcher.dispatch(ConnectionEvent::TopologyChanged).unwrap();

        // Assert
        assert_eq!(dispatcher.registry().len(), 8);
        assert!(!dispatcher.registry().contains(old));
        assert_eq!(dispatcher.stats().rebuilds, 1);
        assert_eq!(dispatcher.layout().generation(), 2);
    }

    #[test]
    fn test_drain_pending_dispatches_all_buffered_events_and_flushes() {
        let (mut dispatcher, probe) = make_dispatcher(ReleaseMode::speed(1.0).unwrap());
        let left = left_edge(&probe);
        probe.push_event(hit(left, -5.0, 0.0));
        probe.push_event(ConnectionEvent::Other);
        probe.push_event(hit(left, -5.0, 0.0));
        let flushes_before = probe.flush_count();

        let count = dispatcher.drain_pending().unwrap();

        assert_eq!(count, 3);
        assert_eq!(probe.pending_events(), 0);
        assert_eq!(probe.releases().len(), 2);
        assert!(probe.flush_count() > flushes_before);
    }

    #[test]
    fn test_shutdown_tears_down_and_ignores_later_events() {
        // Arrange
        let (mut dispatcher, probe) = make_dispatcher(ReleaseMode::speed(0.0).unwrap());
        let left = left_edge(&probe);

        // Act
        dispatcher.shutdown(Some(15));
        dispatcher.dispatch(hit(left, -50.0, 0.0)).unwrap();
        dispatcher.dispatch(ConnectionEvent::TopologyChanged).unwrap();

        // Assert
        assert_eq!(dispatcher.state(), RuntimeState::ShuttingDown);
        assert!(dispatcher.registry().is_empty());
        assert!(probe.live_barriers().is_empty());
        assert!(probe.releases().is_empty());
        assert_eq!(dispatcher.stats().rebuilds, 0);
    }

    #[test]
    fn test_shutdown_twice_destroys_barriers_once() {
        let (mut dispatcher, probe) = make_dispatcher(ReleaseMode::default());

        dispatcher.shutdown(Some(2));
        dispatcher.shutdown(Some(15));

        assert_eq!(probe.destroyed().len(), 4);
    }
}
