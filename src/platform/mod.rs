//! Platform abstraction layer
//!
//! Everything the evasion sequence does to the page goes through [`Stage`]:
//! - Live geometry reads (element rectangles, viewport)
//! - Position locking and committing
//! - Interactivity, pose and grip presentation
//! - Timed animations and per-frame follow subscriptions
//!
//! `dom` drives the real document on wasm32, `headless` is an in-memory
//! scene used by the native binary and the tests.

pub mod headless;

#[cfg(target_arch = "wasm32")]
pub mod dom;

use std::future::Future;

use glam::Vec2;
use thiserror::Error;

use crate::celebrate::Particle;
use crate::config::Grip;
use crate::motion::{Easing, EvasionState, Rect, Viewport};

pub use headless::HeadlessStage;

/// Page elements the controller works with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    /// The evading "No" control
    Control,
    /// The "Yes" control
    Accept,
    /// The puppy
    Pursuer,
}

impl Actor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::Control => "control",
            Actor::Accept => "accept",
            Actor::Pursuer => "pursuer",
        }
    }
}

/// Host failures. None of these ever reach the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    #[error("{} is not on the page", .0.as_str())]
    Missing(Actor),
    #[error("host rejected {action}: {message}")]
    Host {
        action: &'static str,
        message: String,
    },
}

/// The visual host the evasion sequence runs against
pub trait Stage {
    /// Per-frame follow subscription, cancelled on drop
    type Tracking;

    /// Current visible area, read fresh every call
    fn viewport(&self) -> Viewport;

    /// Rendered rectangle of an actor, `None` when it is not on the page.
    /// Must reflect pending layout and in-flight animations.
    fn rect_of(&self, actor: Actor) -> Option<Rect>;

    /// Rendered rectangle of the puppy's mouth anchor, if the page has one
    fn anchor_rect(&self) -> Option<Rect>;

    /// Pin an actor in fixed coordinates at `origin` so reflow cannot move it
    fn lock(&self, actor: Actor, origin: Vec2) -> Result<(), StageError>;

    /// Make `origin` the actor's resting layout position and drop any
    /// transient transform. Committing the same origin twice is a no-op.
    fn commit(&self, actor: Actor, origin: Vec2) -> Result<(), StageError>;

    /// Enable or disable pointer and keyboard interaction
    fn set_interactive(&self, actor: Actor, interactive: bool);

    /// Mirror the controller state onto the puppy's pose
    fn set_pose(&self, state: EvasionState);

    /// Apply or remove the "gripped" flourish on the control
    fn set_grip(&self, grip: Option<Grip>, transition_ms: u32);

    /// Move an actor's rendered position to `to` over `duration_ms`.
    ///
    /// Resolves once the animation finished and its handle was cancelled.
    /// Hosts without an animation facility resolve immediately; the caller
    /// commits the destination either way.
    fn animate(
        &self,
        actor: Actor,
        to: Vec2,
        duration_ms: u32,
        easing: Easing,
    ) -> impl Future<Output = Result<(), StageError>>;

    /// Every frame until the returned handle is dropped, place `follower`
    /// at `leader`'s rendered origin plus `offset`
    fn track(&self, follower: Actor, leader: Actor, offset: Vec2) -> Self::Tracking;
}

/// The "Yes" side effects. Fire-and-forget.
pub trait Effects {
    /// Spawn self-removing particles
    fn release_particles(&self, particles: &[Particle]);

    /// Show `message` after `delay_ms`
    fn announce(&self, message: &str, delay_ms: u32);
}
