//! # xdpb-core
//!
//! Display-server independent core of xdpb, a daemon that fences every
//! monitor with pointer barriers and decides when a pointer pushing against a
//! barrier should be let through.
//!
//! # Architecture overview (for beginners)
//!
//! On a multi-monitor desktop it is easy to overshoot a window's edge and land
//! on the next screen.  xdpb places an invisible barrier along every edge of
//! every output.  The pointer stops at the barrier; only a deliberate gesture
//! (pushing fast, pushing far, or tapping twice) releases it onto the
//! neighbouring output.
//!
//! This crate holds the pieces that need no X server:
//!
//! - **`domain`** – output rectangles, barrier directions, and the derivation
//!   of the four edge barriers of an output.
//!
//! - **`policy`** – the three release modes and the state machine that turns a
//!   barrier event into a release decision.
//!
//! - **`registry`** – the handle-keyed store that tracks every live barrier
//!   and its per-barrier policy state.

pub mod domain;
pub mod policy;
pub mod registry;

// Re-export the most-used types at the crate root so callers can write
// `xdpb_core::ReleasePolicy` instead of `xdpb_core::policy::engine::ReleasePolicy`.
pub use domain::geometry::{
    compute_edge_barriers, BarrierDirection, EdgeBarrier, MotionDelta, OutputRect,
};
pub use policy::clock::{Clock, ManualClock, MonotonicClock};
pub use policy::engine::{BarrierEventKind, Decision, ReleasePolicy};
pub use policy::mode::{PolicyError, PolicyState, ReleaseMode, DEFAULT_DISTANCE_THRESHOLD};
pub use registry::{BarrierHandle, BarrierId, BarrierRegistry};
