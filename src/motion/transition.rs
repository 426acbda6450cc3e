//! Timed position transitions
//!
//! A transition animates an element's rendered offset from where it is to
//! where it should be, then commits the destination as layout so later
//! geometry reads never depend on the animation's internal transform.

use glam::Vec2;

use super::easing::Easing;
use crate::platform::{Actor, Stage, StageError};

/// One interpolated move between two origins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: Vec2,
    pub to: Vec2,
    pub duration_ms: f64,
    pub easing: Easing,
}

impl Transition {
    pub fn new(from: Vec2, to: Vec2, duration_ms: f64, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration_ms,
            easing,
        }
    }

    /// Translation applied at the end of the move
    #[inline]
    pub fn delta(&self) -> Vec2 {
        self.to - self.from
    }

    /// Linear progress in `[0, 1]`
    pub fn progress(&self, elapsed_ms: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (elapsed_ms / self.duration_ms).clamp(0.0, 1.0) as f32
    }

    pub fn is_complete(&self, elapsed_ms: f64) -> bool {
        elapsed_ms >= self.duration_ms
    }

    /// Translation (relative to `from`) after `elapsed_ms`
    pub fn offset_at(&self, elapsed_ms: f64) -> Vec2 {
        self.delta() * self.easing.apply(self.progress(elapsed_ms))
    }

    /// Rendered origin after `elapsed_ms`
    pub fn sample(&self, elapsed_ms: f64) -> Vec2 {
        if self.is_complete(elapsed_ms) {
            return self.to;
        }
        self.from + self.offset_at(elapsed_ms)
    }
}

/// Animate `actor` to `to` and commit it there.
///
/// A zero duration is a plain jump-cut. Only one transition may be active on
/// an actor at a time; the controller sequences its phases to guarantee it.
pub async fn run<S: Stage>(
    stage: &S,
    actor: Actor,
    to: Vec2,
    duration_ms: u32,
    easing: Easing,
) -> Result<(), StageError> {
    if duration_ms > 0 {
        stage.animate(actor, to, duration_ms, easing).await?;
    }
    stage.commit(actor, to)
}
