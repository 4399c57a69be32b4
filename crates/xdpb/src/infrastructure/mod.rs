//! Infrastructure layer of the daemon.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `xdpb_core`, but MUST NOT be imported by the `application` layer (tests
//! excepted).
//!
//! # Sub-modules
//!
//! - **`x11`** – `X11BarrierService`, the `BarrierService` implementation
//!   speaking XFixes, XInput 2.3, and RandR through `x11rb`.  Linux only.
//!
//! - **`shutdown`** – bridges SIGINT/SIGTERM/SIGHUP into an `mpsc` channel.
//!
//! - **`storage`** – reads the optional TOML configuration file.
//!
//! - **`mock`** – `RecordingBarrierService`, an in-memory service for tests.

pub mod mock;
#[cfg(unix)]
pub mod shutdown;
pub mod storage;

#[cfg(target_os = "linux")]
pub mod x11;
