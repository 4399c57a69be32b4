//! Barrier release policies.
//!
//! - **`mode`** – the three release modes (speed, distance, double-tap) and
//!   the per-barrier state each one keeps.
//! - **`engine`** – the state machine that turns a barrier event into a
//!   release decision.
//! - **`clock`** – the monotonic time source used by double-tap detection.

pub mod clock;
pub mod engine;
pub mod mode;
