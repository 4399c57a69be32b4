//! Domain entities for xdpb.
//!
//! Pure geometry with no display-server dependencies: output rectangles, the
//! four barrier directions, and the derivation of edge barriers from an
//! output.  Everything here can be tested without an X server.

/// Output rectangles and edge barriers.
///
/// See [`geometry::compute_edge_barriers`] for the main entry point.
pub mod geometry;
