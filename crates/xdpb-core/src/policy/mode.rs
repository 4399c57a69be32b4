//! Release modes and the per-barrier state each mode needs.

use std::fmt;

use thiserror::Error;

/// Default distance threshold in pixels.
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 50.0;

/// Errors raised while building a [`ReleaseMode`].
#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    /// The threshold is negative, NaN, or infinite.
    #[error("threshold must be a finite non-negative number, got {0}")]
    InvalidThreshold(f64),
}

/// How the daemon decides to let a blocked pointer through a barrier.
///
/// Selected once at startup and never changed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReleaseMode {
    /// Release when a single event pushes further than the threshold.
    Speed { threshold_px_per_event: f64 },
    /// Release once the accumulated push exceeds the threshold.
    Distance { threshold_px: f64 },
    /// Release when the barrier is tapped twice within the window.
    DoubleTap { window_seconds: f64 },
}

impl ReleaseMode {
    /// Builds a [`ReleaseMode::Speed`].
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidThreshold`] unless `threshold` is finite
    /// and non-negative.
    pub fn speed(threshold: f64) -> Result<Self, PolicyError> {
        validate(threshold).map(|t| ReleaseMode::Speed { threshold_px_per_event: t })
    }

    /// Builds a [`ReleaseMode::Distance`].
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidThreshold`] unless `threshold` is finite
    /// and non-negative.
    pub fn distance(threshold: f64) -> Result<Self, PolicyError> {
        validate(threshold).map(|t| ReleaseMode::Distance { threshold_px: t })
    }

    /// Builds a [`ReleaseMode::DoubleTap`].
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidThreshold`] unless `window` is finite and
    /// non-negative.
    pub fn double_tap(window: f64) -> Result<Self, PolicyError> {
        validate(window).map(|w| ReleaseMode::DoubleTap { window_seconds: w })
    }

    /// The numeric threshold of this mode, whatever its unit.
    pub fn threshold(&self) -> f64 {
        match *self {
            ReleaseMode::Speed { threshold_px_per_event } => threshold_px_per_event,
            ReleaseMode::Distance { threshold_px } => threshold_px,
            ReleaseMode::DoubleTap { window_seconds } => window_seconds,
        }
    }
}

impl Default for ReleaseMode {
    /// Distance mode with a 50 pixel threshold.
    fn default() -> Self {
        ReleaseMode::Distance { threshold_px: DEFAULT_DISTANCE_THRESHOLD }
    }
}

impl fmt::Display for ReleaseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseMode::Speed { threshold_px_per_event } => {
                write!(f, "speed ({threshold_px_per_event} px/event)")
            }
            ReleaseMode::Distance { threshold_px } => write!(f, "distance ({threshold_px} px)"),
            ReleaseMode::DoubleTap { window_seconds } => {
                write!(f, "double-tap ({window_seconds} s)")
            }
        }
    }
}

fn validate(threshold: f64) -> Result<f64, PolicyError> {
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(threshold)
    } else {
        Err(PolicyError::InvalidThreshold(threshold))
    }
}

/// Mutable per-barrier state.  The variant always matches the active
/// [`ReleaseMode`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolicyState {
    /// Speed mode keeps nothing between events.
    Speed,
    /// Pixels pushed into the barrier since the last release or leave.
    Distance { accumulated_distance: f64 },
    /// Time of the last counted tap and whether the current press already
    /// counted as one.
    DoubleTap { last_tap_time: f64, armed: bool },
}

impl PolicyState {
    /// The state a freshly created barrier starts with under `mode`.
    pub fn initial(mode: &ReleaseMode) -> Self {
        match mode {
            ReleaseMode::Speed { .. } => PolicyState::Speed,
            ReleaseMode::Distance { .. } => PolicyState::Distance { accumulated_distance: 0.0 },
            ReleaseMode::DoubleTap { .. } => PolicyState::DoubleTap {
                last_tap_time: f64::NEG_INFINITY,
                armed: false,
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
