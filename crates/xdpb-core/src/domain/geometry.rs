//! Output rectangles, barrier directions, and edge-barrier derivation.
//!
//! Every display output is surrounded by four one-pixel barriers, one per
//! edge.  Each barrier carries a [`BarrierDirection`]: the side from which
//! pointer motion presses against it.  The same direction is what the display
//! server is told to let through, so a pointer that has been released onto a
//! neighbouring output can always travel back.
//!
//! ```text
//!            y = ymin   PositiveY
//!          ┌───────────────────────┐
//!          │                       │
//! x = xmin │        output         │ x = xmax
//! PositiveX│                       │ NegativeX
//!          │                       │
//!          └───────────────────────┘
//!            y = ymax   NegativeY
//! ```

/// A display output in root-window pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputRect {
    /// X coordinate of the top-left corner.
    pub x: i32,
    /// Y coordinate of the top-left corner.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl OutputRect {
    /// Creates a rectangle from its top-left corner and size.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Returns `true` when the rectangle covers no pixels.
    ///
    /// Disabled CRTCs are reported with a zero size and must never receive
    /// barriers.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Rightmost pixel column (inclusive).
    pub fn x_max(&self) -> i32 {
        self.x + self.width as i32 - 1
    }

    /// Bottom pixel row (inclusive).
    pub fn y_max(&self) -> i32 {
        self.y + self.height as i32 - 1
    }
}

/// Raw pointer motion reported with a barrier event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionDelta {
    pub dx: f64,
    pub dy: f64,
}

impl MotionDelta {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

/// The side of a barrier that pointer motion presses against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarrierDirection {
    /// Left edge of an output; pressed by motion towards negative X.
    PositiveX,
    /// Right edge of an output; pressed by motion towards positive X.
    NegativeX,
    /// Top edge of an output; pressed by motion towards negative Y.
    PositiveY,
    /// Bottom edge of an output; pressed by motion towards positive Y.
    NegativeY,
}

impl BarrierDirection {
    /// Projects a raw motion delta onto this barrier's axis.
    ///
    /// The result is the component of the motion *into* the barrier: positive
    /// when the pointer pushes against it, negative when it apparently moves
    /// away.
    pub fn project(self, delta: MotionDelta) -> f64 {
        match self {
            BarrierDirection::PositiveX => -delta.dx,
            BarrierDirection::NegativeX => delta.dx,
            BarrierDirection::PositiveY => -delta.dy,
            BarrierDirection::NegativeY => delta.dy,
        }
    }

    /// Returns `true` for barriers that run vertically (left and right edges).
    pub fn is_vertical(self) -> bool {
        matches!(self, BarrierDirection::PositiveX | BarrierDirection::NegativeX)
    }
}

/// One straight barrier segment, ready to be created on the display server.
///
/// Endpoints are inclusive.  Vertical barriers have `x1 == x2`, horizontal
/// barriers have `y1 == y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeBarrier {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub direction: BarrierDirection,
}

/// Derives the four edge barriers of an output.
///
/// Order: left, right, top, bottom.
pub fn compute_edge_barriers(rect: &OutputRect) -> [EdgeBarrier; 4] {
    let (xmin, ymin) = (rect.x, rect.y);
    let (xmax, ymax) = (rect.x_max(), rect.y_max());

    [
        EdgeBarrier { x1: xmin, y1: ymin, x2: xmin, y2: ymax, direction: BarrierDirection::PositiveX },
        EdgeBarrier { x1: xmax, y1: ymin, x2: xmax, y2: ymax, direction: BarrierDirection::NegativeX },
        EdgeBarrier { x1: xmin, y1: ymin, x2: xmax, y2: ymin, direction: BarrierDirection::PositiveY },
        EdgeBarrier { x1: xmin, y1: ymax, x2: xmax, y2: ymax, direction: BarrierDirection::NegativeY },
    ]
}

// ── Tests ─────────────────────────────────────────────────────────────────────
