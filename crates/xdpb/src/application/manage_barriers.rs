//! LayoutManager: keeps the barrier set in sync with the output layout.
//!
//! # Lifecycle (for beginners)
//!
//! ```text
//! startup ──► setup() ──► ... events ... ──► TopologyChanged ──► rebuild()
//!                                                                 │
//!                                               teardown() + setup()
//! SIGTERM ──► teardown() ──► exit
//! ```
//!
//! `setup()` asks the display for every output rectangle, skips disabled
//! outputs (reported with a zero size), and creates four barriers per output.
//! `teardown()` destroys every barrier the registry knows about.  Because the
//! runtime is single-threaded and `rebuild()` runs to completion, no event is
//! ever dispatched against a half-built registry.

use tracing::{debug, info, warn};
use xdpb_core::{compute_edge_barriers, BarrierRegistry};

use crate::application::barrier_service::{BarrierService, ServiceError};

/// Derives, creates, and destroys the barriers of the current output layout.
#[derive(Debug, Default)]
pub struct LayoutManager {
    generation: u64,
}

impl LayoutManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed `setup()` calls.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Creates and registers four barriers for every non-degenerate output.
    ///
    /// Returns the number of barriers created.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the outputs cannot be queried or a barrier
    /// cannot be created.  Barriers created before the failure stay
    /// registered so a later `teardown()` removes them.
    pub fn setup<S: BarrierService>(
        &mut self,
        service: &mut S,
        registry: &mut BarrierRegistry,
    ) -> Result<usize, ServiceError> {
        let outputs = service.query_output_rectangles()?;
        let mut created = 0;

        for rect in outputs.iter().filter(|r| !r.is_degenerate()) {
            debug!(?rect, "fencing output");
            for edge in compute_edge_barriers(rect) {
                let handle = service.create_barrier(&edge)?;
                registry.register(handle, edge.direction);
                created += 1;
            }
        }
        service.flush()?;

        self.generation += 1;
        let skipped = outputs.iter().filter(|r| r.is_degenerate()).count();
        info!(
            generation = self.generation,
            outputs = outputs.len() - skipped,
            skipped,
            barriers = created,
            "barriers set up"
        );
        Ok(created)
    }

    /// Destroys every registered barrier and empties the registry.
    ///
    /// Destruction failures are logged and do not stop the sweep; the registry
    /// is always left empty.
    pub fn teardown<S: BarrierService>(&mut self, service: &mut S, registry: &mut BarrierRegistry) {
        let count = registry.len();
        registry.teardown_all(|handle| {
            if let Err(e) = service.destroy_barrier(handle) {
                warn!(%handle, "failed to destroy barrier: {e}");
            }
        });
        if let Err(e) = service.flush() {
            warn!("failed to flush barrier teardown: {e}");
        }
        debug!(barriers = count, "barriers torn down");
    }

    /// Tears every barrier down and sets the layout up again.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`setup`](Self::setup).
    pub fn rebuild<S: BarrierService>(
        &mut self,
        service: &mut S,
        registry: &mut BarrierRegistry,
    ) -> Result<usize, ServiceError> {
        self.teardown(service, registry);
        self.setup(service, registry)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
