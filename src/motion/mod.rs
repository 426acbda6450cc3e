//! Host-independent motion logic
//!
//! Nothing here touches the DOM directly:
//! - Geometry is plain `glam` math on CSS pixels
//! - Randomness comes from the caller's seeded RNG
//! - Every visual effect goes through the `Stage` trait

pub mod controller;
pub mod dock;
pub mod easing;
pub mod geometry;
pub mod placement;
pub mod transition;

pub use controller::{EvasionController, EvasionState, Outcome};
pub use easing::Easing;
pub use geometry::{Rect, Viewport, clamp, clamp_origin, parse_px, random_in_range};
pub use placement::{Placement, avoid_radius, select_position};
pub use transition::Transition;
