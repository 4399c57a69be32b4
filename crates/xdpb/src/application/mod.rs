//! Application layer of the daemon.
//!
//! # What lives here?
//!
//! - **`barrier_service`** – the `BarrierService` trait: every request the
//!   daemon makes to the display server and every event it reads back.
//!
//! - **`manage_barriers`** – `LayoutManager`, which turns output rectangles
//!   into registered barriers and removes them again.
//!
//! - **`dispatch_events`** – `EventDispatcher`, which routes barrier events
//!   through the registry and the release policy.
//!
//! - **`run_loop`** – the async loop that waits on the connection and the
//!   shutdown channel.
//!
//! Nothing in this layer knows about X11; the display server is reached only
//! through `BarrierService`.

pub mod barrier_service;
pub mod dispatch_events;
pub mod manage_barriers;
pub mod run_loop;
