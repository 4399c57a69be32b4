//! The release-decision state machine.
//!
//! [`ReleasePolicy::evaluate`] is called once per barrier event.  It projects
//! the raw motion delta onto the barrier's axis, updates the barrier's
//! [`PolicyState`], and answers whether the pointer should be let through.
//!
//! # Hit vs. Leave (for beginners)
//!
//! The X server sends a *BarrierHit* event every time the pointer is held back
//! by a barrier, and a single *BarrierLeave* event once the pointer moves away
//! from it.  Hits drive the release decision; a leave only resets whatever a
//! mode has been accumulating for the current press.
//!
//! # Why are negative projections discarded?
//!
//! While a barrier is pressed the server clamps the pointer, and the reported
//! delta occasionally points away from the barrier even though the user is
//! still pushing into it.  Such events carry no information about the push and
//! are dropped without touching the state.

use tracing::trace;

use crate::domain::geometry::{BarrierDirection, MotionDelta};
use crate::policy::clock::Clock;
use crate::policy::mode::{PolicyState, ReleaseMode};

/// Kind of barrier event delivered by the display server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierEventKind {
    /// The pointer is being held back by the barrier.
    Hit,
    /// The pointer moved away from the barrier.
    Leave,
}

/// Outcome of evaluating one barrier event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Let the pointer through the barrier.
    Release,
    /// Keep blocking; state may have changed.
    Hold,
    /// A hit whose motion points away from the barrier; nothing changed.
    Discarded,
}

/// The release policy shared by every barrier of the process.
pub struct ReleasePolicy {
    mode: ReleaseMode,
    clock: Box<dyn Clock>,
}

impl ReleasePolicy {
    /// Creates a policy for `mode` reading time from `clock`.
    pub fn new(mode: ReleaseMode, clock: Box<dyn Clock>) -> Self {
        Self { mode, clock }
    }

    /// The mode this policy was built with.
    pub fn mode(&self) -> ReleaseMode {
        self.mode
    }

    /// Evaluates one event against one barrier's state.
    ///
    /// # Panics
    ///
    /// Panics if `state` is not the variant belonging to this policy's mode.
    /// States are only ever created from the same mode, so a mismatch means
    /// the process is misconfigured.
    pub fn evaluate(
        &self,
        kind: BarrierEventKind,
        direction: BarrierDirection,
        delta: MotionDelta,
        state: &mut PolicyState,
    ) -> Decision {
        match kind {
            BarrierEventKind::Leave => {
                self.on_leave(state);
                Decision::Hold
            }
            BarrierEventKind::Hit => {
                let pushed = direction.project(delta);
                // Also rejects NaN.
                if !(pushed >= 0.0) {
                    trace!(?direction, pushed, "discarding hit moving away from barrier");
                    return Decision::Discarded;
                }
                self.on_hit(pushed, state)
            }
        }
    }

    fn on_leave(&self, state: &mut PolicyState) {
        match (&self.mode, state) {
            (ReleaseMode::Speed { .. }, PolicyState::Speed) => {}
            (ReleaseMode::Distance { .. }, PolicyState::Distance { accumulated_distance }) => {
                *accumulated_distance = 0.0;
            }
            (ReleaseMode::DoubleTap { .. }, PolicyState::DoubleTap { armed, .. }) => {
                *armed = false;
            }
            (mode, state) => mismatch(mode, state),
        }
    }

    fn on_hit(&self, pushed: f64, state: &mut PolicyState) -> Decision {
        match (&self.mode, state) {
            (ReleaseMode::Speed { threshold_px_per_event }, PolicyState::Speed) => {
                if pushed > *threshold_px_per_event {
                    Decision::Release
                } else {
                    Decision::Hold
                }
            }
            (
                ReleaseMode::Distance { threshold_px },
                PolicyState::Distance { accumulated_distance },
            ) => {
                *accumulated_distance += pushed;
                if *accumulated_distance > *threshold_px {
                    *accumulated_distance = 0.0;
                    Decision::Release
                } else {
                    Decision::Hold
                }
            }
            (
                ReleaseMode::DoubleTap { window_seconds },
                PolicyState::DoubleTap { last_tap_time, armed },
            ) => {
                // One continuous press must not count as two taps.
                if *armed {
                    return Decision::Hold;
                }
                let now = self.clock.now_seconds();
                if now - *last_tap_time < *window_seconds {
                    *last_tap_time = f64::NEG_INFINITY;
                    Decision::Release
                } else {
                    *last_tap_time = now;
                    *armed = true;
                    Decision::Hold
                }
            }
            (mode, state) => mismatch(mode, state),
        }
    }
}

fn mismatch(mode: &ReleaseMode, state: &PolicyState) -> ! {
    panic!("policy state {state:?} does not belong to release mode {mode:?}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::clock::{ManualClock, MockClock};

    const ALL_DIRECTIONS: [BarrierDirection; 4] = [
        BarrierDirection::PositiveX,
        BarrierDirection::NegativeX,
        BarrierDirection::PositiveY,
        BarrierDirection::NegativeY,
    ];

    fn policy(mode: ReleaseMode) -> (ReleasePolicy, ManualClock) {
        let clock = ManualClock::default();
        (ReleasePolicy::new(mode, Box::new(clock.clone())), clock)
    }

    fn hit_px(direction: BarrierDirection, px: f64) -> MotionDelta {
        // A delta whose projection onto `direction` is exactly `px`.
        match direction {
            BarrierDirection::PositiveX => MotionDelta::new(-px, 0.0),
            BarrierDirection::NegativeX => MotionDelta::new(px, 0.0),
            BarrierDirection::PositiveY => MotionDelta::new(0.0, -px),
            BarrierDirection::NegativeY => MotionDelta::new(0.0, px),
        }
    }

    // ── Negative projection ───────────────────────────────────────────────────

    #[test]
    fn test_hit_moving_away_is_discarded_in_every_mode_and_direction() {
        let modes = [
            ReleaseMode::speed(0.0).unwrap(),
            ReleaseMode::distance(0.0).unwrap(),
            ReleaseMode::double_tap(10.0).unwrap(),
        ];
        for mode in modes {
            for direction in ALL_DIRECTIONS {
                // Arrange
                let (policy, _) = policy(mode);
                let mut state = PolicyState::initial(&mode);
                let before = state;

                // Act
                let decision = policy.evaluate(
                    BarrierEventKind::Hit,
                    direction,
                    hit_px(direction, -3.0),
                    &mut state,
                );

                // Assert
                assert_eq!(decision, Decision::Discarded, "{mode:?} {direction:?}");
                assert_eq!(state, before, "{mode:?} {direction:?}");
            }
        }
    }

    #[test]
    fn test_hit_with_nan_delta_is_discarded() {
        let (policy, _) = policy(ReleaseMode::default());
        let mut state = PolicyState::initial(&ReleaseMode::default());

        let decision = policy.evaluate(
            BarrierEventKind::Hit,
            BarrierDirection::NegativeX,
            MotionDelta::new(f64::NAN, 0.0),
            &mut state,
        );

        assert_eq!(decision, Decision::Discarded);
        assert_eq!(state, PolicyState::Distance { accumulated_distance: 0.0 });
    }

    // ── Speed ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_speed_releases_only_above_threshold() {
        let mode = ReleaseMode::speed(15.0).unwrap();
        let (policy, _) = policy(mode);
        let mut state = PolicyState::initial(&mode);
        let dir = BarrierDirection::NegativeY;

        assert_eq!(policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 15.0), &mut state), Decision::Hold);
        assert_eq!(policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 15.5), &mut state), Decision::Release);
    }

    #[test]
    fn test_speed_does_not_carry_over_between_events() {
        // Arrange
        let mode = ReleaseMode::speed(10.0).unwrap();
        let (policy, _) = policy(mode);
        let mut state = PolicyState::initial(&mode);
        let dir = BarrierDirection::PositiveX;

        // Act
        let first = policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 9.9), &mut state);
        let second = policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 9.9), &mut state);

        // Assert
        assert_eq!((first, second), (Decision::Hold, Decision::Hold));
        assert_eq!(state, PolicyState::Speed);
    }

    #[test]
    fn test_speed_leave_is_a_no_op() {
        let mode = ReleaseMode::speed(10.0).unwrap();
        let (policy, _) = policy(mode);
        let mut state = PolicyState::Speed;

        let decision = policy.evaluate(
            BarrierEventKind::Leave,
            BarrierDirection::PositiveY,
            MotionDelta::default(),
            &mut state,
        );

        assert_eq!(decision, Decision::Hold);
        assert_eq!(state, PolicyState::Speed);
    }

    // ── Distance ──────────────────────────────────────────────────────────────

    #[test]
    fn test_distance_accumulates_until_threshold_is_crossed() {
        // Arrange
        let mode = ReleaseMode::default();
        let (policy, _) = policy(mode);
        let mut state = PolicyState::initial(&mode);
        let dir = BarrierDirection::PositiveX;

        // Act
        let first = policy.evaluate(BarrierEventKind::Hit, dir, MotionDelta::new(-30.0, 0.0), &mut state);
        let after_first = state;
        let second = policy.evaluate(BarrierEventKind::Hit, dir, MotionDelta::new(-25.0, 0.0), &mut state);

        // Assert
        assert_eq!(first, Decision::Hold);
        assert_eq!(after_first, PolicyState::Distance { accumulated_distance: 30.0 });
        assert_eq!(second, Decision::Release);
        assert_eq!(state, PolicyState::Distance { accumulated_distance: 0.0 });
    }

    #[test]
    fn test_distance_exactly_at_threshold_does_not_release() {
        let mode = ReleaseMode::distance(20.0).unwrap();
        let (policy, _) = policy(mode);
        let mut state = PolicyState::initial(&mode);
        let dir = BarrierDirection::NegativeX;

        policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 10.0), &mut state);
        let decision = policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 10.0), &mut state);

        assert_eq!(decision, Decision::Hold);
        assert_eq!(state, PolicyState::Distance { accumulated_distance: 20.0 });
    }

    #[test]
    fn test_distance_leave_resets_accumulation() {
        // Arrange
        let mode = ReleaseMode::default();
        let (policy, _) = policy(mode);
        let mut state = PolicyState::Distance { accumulated_distance: 49.0 };

        // Act
        policy.evaluate(BarrierEventKind::Leave, BarrierDirection::PositiveY, MotionDelta::new(0.0, 4.0), &mut state);

        // Assert
        assert_eq!(state, PolicyState::Distance { accumulated_distance: 0.0 });
    }

    // ── DoubleTap ─────────────────────────────────────────────────────────────

    #[test]
    fn test_double_tap_single_tap_only_arms() {
        let mode = ReleaseMode::double_tap(0.5).unwrap();
        let (policy, clock) = policy(mode);
        let mut state = PolicyState::initial(&mode);
        let dir = BarrierDirection::NegativeX;
        clock.set(0.0);

        let decision = policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 1.0), &mut state);

        assert_eq!(decision, Decision::Hold);
        assert_eq!(state, PolicyState::DoubleTap { last_tap_time: 0.0, armed: true });
    }

    #[test]
    fn test_double_tap_releases_on_second_tap_within_window() {
        // Arrange
        let mode = ReleaseMode::double_tap(0.5).unwrap();
        let (policy, clock) = policy(mode);
        let mut state = PolicyState::initial(&mode);
        let dir = BarrierDirection::PositiveY;

        // Act
        clock.set(0.0);
        let first = policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 2.0), &mut state);
        policy.evaluate(BarrierEventKind::Leave, dir, MotionDelta::default(), &mut state);
        clock.set(0.3);
        let second = policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 2.0), &mut state);

        // Assert
        assert_eq!(first, Decision::Hold);
        assert_eq!(second, Decision::Release);
    }

    #[test]
    fn test_double_tap_continuous_press_never_counts_twice() {
        let mode = ReleaseMode::double_tap(0.5).unwrap();
        let (policy, clock) = policy(mode);
        let mut state = PolicyState::initial(&mode);
        let dir = BarrierDirection::PositiveX;

        for step in 0..5 {
            clock.set(step as f64 * 0.05);
            let decision = policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 3.0), &mut state);
            assert_eq!(decision, Decision::Hold, "step {step}");
        }
    }

    #[test]
    fn test_double_tap_second_tap_outside_window_rearms() {
        let mode = ReleaseMode::double_tap(0.5).unwrap();
        let (policy, clock) = policy(mode);
        let mut state = PolicyState::initial(&mode);
        let dir = BarrierDirection::NegativeY;

        clock.set(1.0);
        policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 1.0), &mut state);
        policy.evaluate(BarrierEventKind::Leave, dir, MotionDelta::default(), &mut state);
        clock.set(1.6);
        let decision = policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 1.0), &mut state);

        assert_eq!(decision, Decision::Hold);
        assert_eq!(state, PolicyState::DoubleTap { last_tap_time: 1.6, armed: true });
    }

    #[test]
    fn test_double_tap_after_release_next_tap_is_fresh() {
        // Arrange
        let mode = ReleaseMode::double_tap(0.5).unwrap();
        let (policy, clock) = policy(mode);
        let mut state = PolicyState::initial(&mode);
        let dir = BarrierDirection::PositiveX;
        let tap = |state: &mut PolicyState| {
            let d = policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 1.0), state);
            policy.evaluate(BarrierEventKind::Leave, dir, MotionDelta::default(), state);
            d
        };

        // Act
        clock.set(0.0);
        let first = tap(&mut state);
        clock.set(0.3);
        let second = tap(&mut state);
        clock.set(0.4);
        let third = tap(&mut state);

        // Assert
        assert_eq!(first, Decision::Hold);
        assert_eq!(second, Decision::Release);
        assert_eq!(third, Decision::Hold, "third tap must start a new pair");
    }

    #[test]
    fn test_double_tap_does_not_read_clock_while_armed() {
        // Arrange: the clock may be consulted exactly once (for the first tap).
        let mode = ReleaseMode::double_tap(0.5).unwrap();
        let mut clock = MockClock::new();
        clock.expect_now_seconds().times(1).return_const(7.0);
        let policy = ReleasePolicy::new(mode, Box::new(clock));
        let mut state = PolicyState::initial(&mode);
        let dir = BarrierDirection::NegativeX;

        // Act
        policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 1.0), &mut state);
        let decision = policy.evaluate(BarrierEventKind::Hit, dir, hit_px(dir, 1.0), &mut state);

        // Assert
        assert_eq!(decision, Decision::Hold);
        assert_eq!(state, PolicyState::DoubleTap { last_tap_time: 7.0, armed: true });
    }

    #[test]
    fn test_double_tap_leave_disarms_without_forgetting_last_tap() {
        let mode = ReleaseMode::double_tap(0.5).unwrap();
        let (policy, _) = policy(mode);
        let mut state = PolicyState::DoubleTap { last_tap_time: 3.0, armed: true };

        policy.evaluate(BarrierEventKind::Leave, BarrierDirection::PositiveX, MotionDelta::default(), &mut state);

        assert_eq!(state, PolicyState::DoubleTap { last_tap_time: 3.0, armed: false });
    }

    // ── Misconfiguration ──────────────────────────────────────────────────────

    #[test]
    #[should_panic(expected = "does not belong to release mode")]
    fn test_state_from_another_mode_panics() {
        let (policy, _) = policy(ReleaseMode::speed(5.0).unwrap());
        let mut state = PolicyState::Distance { accumulated_distance: 0.0 };

        policy.evaluate(
            BarrierEventKind::Hit,
            BarrierDirection::NegativeX,
            MotionDelta::new(1.0, 0.0),
            &mut state,
        );
    }
}
