//! The barrier registry: every live barrier and its policy state.
//!
//! The display server identifies barriers by an opaque handle (an X resource
//! id).  Barrier events carry only that handle, so the registry maps each
//! handle to the barrier's direction and its mutable [`PolicyState`].
//!
//! # Stale handles
//!
//! Events can arrive for barriers that were destroyed a moment earlier (for
//! example right after a monitor was unplugged and the layout rebuilt).  Such
//! lookups return `None`; they are expected and never an error.
//!
//! # BTreeMap choice
//!
//! A display has a handful of outputs and four barriers per output, so the
//! map holds tens of entries.  A `BTreeMap` keyed by handle keeps lookup at
//! O(log n) and makes iteration deterministic, which keeps teardown logs and
//! tests stable.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::domain::geometry::BarrierDirection;
use crate::policy::mode::{PolicyState, ReleaseMode};

/// Opaque barrier handle issued by the display server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BarrierHandle(pub u32);

impl fmt::Display for BarrierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Registry-assigned sequence number, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BarrierId(pub u64);

impl fmt::Display for BarrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "barrier#{}", self.0)
    }
}

#[derive(Debug)]
struct BarrierEntry {
    id: BarrierId,
    direction: BarrierDirection,
    state: PolicyState,
}

/// Handle-keyed store of live barriers.
#[derive(Debug)]
pub struct BarrierRegistry {
    mode: ReleaseMode,
    entries: BTreeMap<BarrierHandle, BarrierEntry>,
    next_id: u64,
}

impl BarrierRegistry {
    /// Creates an empty registry whose entries start in `mode`'s initial state.
    pub fn new(mode: ReleaseMode) -> Self {
        Self { mode, entries: BTreeMap::new(), next_id: 1 }
    }

    /// Registers a freshly created barrier.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is already registered.  The display server never
    /// hands out a live handle twice, so a duplicate means the caller lost
    /// track of a barrier.
    pub fn register(&mut self, handle: BarrierHandle, direction: BarrierDirection) -> BarrierId {
        assert!(
            !self.entries.contains_key(&handle),
            "barrier handle {handle} registered twice"
        );
        let id = BarrierId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            handle,
            BarrierEntry { id, direction, state: PolicyState::initial(&self.mode) },
        );
        debug!(%handle, %id, ?direction, "barrier registered");
        id
    }

    /// Looks up a barrier by handle.
    ///
    /// Returns `None` for handles that were never registered or have been torn
    /// down.
    pub fn lookup(&mut self, handle: BarrierHandle) -> Option<(BarrierDirection, &mut PolicyState)> {
        self.entries
            .get_mut(&handle)
            .map(|entry| (entry.direction, &mut entry.state))
    }

    /// Returns the registry id of `handle`, if registered.
    pub fn id_of(&self, handle: BarrierHandle) -> Option<BarrierId> {
        self.entries.get(&handle).map(|entry| entry.id)
    }

    /// Calls `on_each` for every registered handle, then empties the registry.
    ///
    /// Safe to call on an empty registry and to call repeatedly.
    pub fn teardown_all<F>(&mut self, mut on_each: F)
    where
        F: FnMut(BarrierHandle),
    {
        let entries = std::mem::take(&mut self.entries);
        for (handle, entry) in entries {
            debug!(%handle, id = %entry.id, "barrier torn down");
            on_each(handle);
        }
    }

    /// Returns `true` if `handle` is registered.
    pub fn contains(&self, handle: BarrierHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Iterates over registered handles in ascending order.
    pub fn handles(&self) -> impl Iterator<Item = BarrierHandle> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The release mode every entry's state belongs to.
    pub fn mode(&self) -> ReleaseMode {
        self.mode
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
