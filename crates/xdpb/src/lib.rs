//! xdpb library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does xdpb do? (for beginners)
//!
//! xdpb runs for the length of an X11 session.  At startup it asks the X
//! server (through RandR) where every monitor is and places four XFixes
//! pointer barriers around each one.  The X server then reports, through
//! XInput 2.3, every time the pointer presses against a barrier.
//!
//! For each of those reports the daemon:
//!
//! 1. Finds the barrier in the registry (stale barriers are ignored).
//! 2. Asks the release policy (speed, distance, or double tap) whether the
//!    push was deliberate.
//! 3. If so, tells the X server to let the pointer through this one time.
//!
//! When monitors are plugged in or rearranged the barriers are rebuilt, and
//! on SIGINT/SIGTERM/SIGHUP every barrier is removed before the process exits.

/// Application layer: the connection seam, layout management, dispatching,
/// and the runtime loop.
pub mod application;

/// Infrastructure layer: X11 adapter, signal bridge, configuration storage,
/// and the recording service used by tests.
pub mod infrastructure;
