//! Runaway No - a Valentine ask-out page
//!
//! The "No" button refuses to be pressed: a puppy runs over, grabs it and
//! carries it somewhere else on screen. "Yes" pops a burst of hearts.
//!
//! Core modules:
//! - `motion`: Host-independent geometry, placement, transitions and the evasion controller
//! - `platform`: The `Stage` seam plus its browser and headless implementations
//! - `celebrate`: Heart burst and confirmation message for "Yes"
//! - `config`: Immutable page configuration

pub mod celebrate;
pub mod config;
pub mod motion;
pub mod platform;

pub use config::Config;
pub use motion::{EvasionController, EvasionState, Outcome};
pub use platform::{Actor, Stage, StageError};

/// Default tuning constants
pub mod consts {
    /// Puppy sprint to the button
    pub const RUN_TO_MS: u32 = 420;
    /// Button snaps into the puppy's mouth
    pub const GRAB_MS: u32 = 120;
    /// Puppy carries the button across the screen
    pub const CARRY_MS: u32 = 850;
    /// Button is set down at its new spot
    pub const DROP_MS: u32 = 520;
    /// Optional trot back home
    pub const RETURN_MS: u32 = 520;

    /// Control keeps this far from the viewport edges
    pub const EDGE_PADDING: f32 = 16.0;
    /// Puppy keeps this far from the viewport edges
    pub const SAFETY_MARGIN: f32 = 8.0;
    /// Forbidden zone radius as a fraction of the shorter viewport side
    pub const AVOID_FRACTION: f32 = 0.22;
    /// Placement sampling budget
    pub const PLACEMENT_ATTEMPTS: u32 = 40;

    /// Puppy parks with the button center at this fraction of its own size
    pub const STAND_OFF: [f32; 2] = [0.65, 0.55];
    /// Mouth position inside the puppy when the page has no anchor element
    pub const BITE: [f32; 2] = [0.62, 0.58];
    /// Point of the button that ends up in the mouth
    pub const HOLD: [f32; 2] = [0.5, 0.25];
    pub const GRIP_SCALE: f32 = 0.96;
    pub const GRIP_ROTATE_DEG: f32 = -3.0;
    pub const GRIP_MS: u32 = 120;

    /// Puppy starts in the top-left corner
    pub const PURSUER_START: [f32; 2] = [18.0, 18.0];

    pub const CONFIRM_TEXT: &str = "Yessss 💖";
    pub const CONFIRM_DELAY_MS: u32 = 60;
    pub const BURST_PARTICLES: usize = 10;
    pub const MAX_PARTICLES: usize = 200;
    pub const PARTICLE_LIFETIME_MS: u32 = 1400;
}
