//! Page configuration
//!
//! Loaded once at startup and shared read-only. On the web an optional
//! `<script type="application/json" id="runaway-config">` block overrides
//! any subset of the defaults.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::motion::Easing;

/// Rejected configuration values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("avoidance fraction {0} must be within [0, 0.5]")]
    AvoidFraction(f32),
    #[error("placement needs at least one attempt")]
    NoAttempts,
    #[error("edge padding and safety margin must be non-negative")]
    NegativeInset,
    #[error("grip scale {0} must be positive")]
    GripScale(f32),
    #[error("easing {0} has a control point x outside [0, 1]")]
    Easing(String),
    #[error("particle count {0} is too large")]
    TooManyParticles(usize),
    #[error("config is not valid JSON: {0}")]
    Parse(String),
}

/// DOM ids of the page's collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementIds {
    /// The evading "No" control
    pub control: String,
    /// The "Yes" control
    pub accept: String,
    /// The puppy
    pub pursuer: String,
    /// Optional mouth anchor inside the puppy
    pub mouth: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            control: "btnNo".to_string(),
            accept: "btnYes".to_string(),
            pursuer: "dog".to_string(),
            mouth: "dogMouth".to_string(),
        }
    }
}

/// Phase durations in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub run_to_ms: u32,
    pub grab_ms: u32,
    pub carry_ms: u32,
    pub drop_ms: u32,
    pub return_ms: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            run_to_ms: RUN_TO_MS,
            grab_ms: GRAB_MS,
            carry_ms: CARRY_MS,
            drop_ms: DROP_MS,
            return_ms: RETURN_MS,
        }
    }
}

/// Placement constraints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Minimum gap between the control and the viewport edge
    pub edge_padding: f32,
    /// Minimum gap between the puppy and the viewport edge
    pub safety_margin: f32,
    /// Radius of the forbidden zone as a fraction of the shorter viewport side
    pub avoid_fraction: f32,
    /// Candidate positions sampled before giving up
    pub attempts: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            edge_padding: EDGE_PADDING,
            safety_margin: SAFETY_MARGIN,
            avoid_fraction: AVOID_FRACTION,
            attempts: PLACEMENT_ATTEMPTS,
        }
    }
}

/// "Gripped" flourish applied to the carried control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Grip {
    pub scale: f32,
    pub rotate_deg: f32,
}

impl Default for Grip {
    fn default() -> Self {
        Self {
            scale: GRIP_SCALE,
            rotate_deg: GRIP_ROTATE_DEG,
        }
    }
}

/// How the puppy approaches and holds the control.
///
/// Fractions are relative to the element's own size; they are tuned by eye
/// for the puppy artwork and carry no deeper meaning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dock {
    /// Puppy origin = control center - puppy size * stand_off
    pub stand_off: Vec2,
    /// Bite point inside the puppy when no mouth anchor exists
    pub bite: Vec2,
    /// Point of the control held in the mouth
    pub hold: Vec2,
    pub grip: Grip,
    /// Duration of the grip flourish (CSS transition)
    pub grip_ms: u32,
}

impl Default for Dock {
    fn default() -> Self {
        Self {
            stand_off: Vec2::from(STAND_OFF),
            bite: Vec2::from(BITE),
            hold: Vec2::from(HOLD),
            grip: Grip::default(),
            grip_ms: GRIP_MS,
        }
    }
}

/// Heart burst and confirmation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Celebration {
    pub message: String,
    /// Delay before the message so the burst starts rendering first
    pub message_delay_ms: u32,
    pub particles: usize,
    /// Removal backstop in case `animationend` never fires
    pub particle_lifetime_ms: u32,
}

impl Default for Celebration {
    fn default() -> Self {
        Self {
            message: CONFIRM_TEXT.to_string(),
            message_delay_ms: CONFIRM_DELAY_MS,
            particles: BURST_PARTICLES,
            particle_lifetime_ms: PARTICLE_LIFETIME_MS,
        }
    }
}

/// Which extra interactions count as an attempt to press "No"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Triggers {
    /// Mouse pointer entering the control (never touch)
    pub hover: bool,
    /// Keyboard focus landing on the control
    pub focus: bool,
}

impl Triggers {
    /// Whether a `pointerenter` of this pointer type should start an evasion
    pub fn hover_from(&self, pointer_type: &str) -> bool {
        self.hover && pointer_type == "mouse"
    }
}

impl Default for Triggers {
    fn default() -> Self {
        Self {
            hover: true,
            focus: true,
        }
    }
}

/// Immutable page configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ids: ElementIds,
    pub timings: Timings,
    pub easing: Easing,
    pub settle_easing: Easing,
    pub layout: Layout,
    pub dock: Dock,
    pub celebration: Celebration,
    pub triggers: Triggers,
    /// Where the puppy sits when the page loads
    pub pursuer_start: Option<Vec2>,
    /// If set, the puppy trots back here after each drop
    pub pursuer_home: Option<Vec2>,
    /// Fixed RNG seed (clock-seeded when absent)
    pub seed: Option<u64>,
    /// `log` level filter: error, warn, info, debug, trace
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ids: ElementIds::default(),
            timings: Timings::default(),
            easing: Easing::SNAPPY,
            settle_easing: Easing::SETTLE,
            layout: Layout::default(),
            dock: Dock::default(),
            celebration: Celebration::default(),
            triggers: Triggers::default(),
            pursuer_start: Some(Vec2::from(PURSUER_START)),
            pursuer_home: None,
            seed: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// DOM id of the optional JSON override block
    pub const SCRIPT_ID: &'static str = "runaway-config";

    /// Check the few values with hard constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        if !(0.0..=0.5).contains(&layout.avoid_fraction) {
            return Err(ConfigError::AvoidFraction(layout.avoid_fraction));
        }
        if layout.attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if layout.edge_padding < 0.0 || layout.safety_margin < 0.0 {
            return Err(ConfigError::NegativeInset);
        }
        for easing in [self.easing, self.settle_easing] {
            if !easing.is_valid() {
                return Err(ConfigError::Easing(easing.css()));
            }
        }
        if self.dock.grip.scale <= 0.0 {
            return Err(ConfigError::GripScale(self.dock.grip.scale));
        }
        if self.celebration.particles > MAX_PARTICLES {
            return Err(ConfigError::TooManyParticles(self.celebration.particles));
        }
        Ok(())
    }

    /// Parse and validate a JSON override
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed log level, Info when unrecognised
    pub fn level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }

    /// Load the page override (WASM only).
    ///
    /// A page without the override script gets the defaults. Runs before
    /// logging is up, so a rejected override is returned for the caller to report.
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Result<Self, ConfigError> {
        let json = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(Self::SCRIPT_ID))
            .and_then(|el| el.text_content());

        match json {
            Some(json) => Self::from_json(&json),
            None => Ok(Self::default()),
        }
    }

    /// Native stub
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self::default())
    }
}
