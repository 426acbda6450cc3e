//! Where the button lands next
//!
//! Positions are sampled uniformly inside the padded viewport until one puts
//! the button's center outside a disk around the viewport center. The search
//! is best effort: when the budget runs out the last candidate is used anyway.

use glam::Vec2;
use rand::Rng;

use super::geometry::{Viewport, random_in_range};
use crate::config::Layout;

/// Result of a placement search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Top-left corner for the control
    pub position: Vec2,
    /// Candidates drawn, `1..=layout.attempts`
    pub attempts: u32,
    /// Whether the accepted candidate is outside the forbidden zone
    pub clear_of_center: bool,
}

/// Radius of the forbidden disk around the viewport center
#[inline]
pub fn avoid_radius(viewport: Viewport, layout: &Layout) -> f32 {
    viewport.min_side() * layout.avoid_fraction
}

/// Pick a new top-left corner for a control of `size`
pub fn select_position<R: Rng>(
    size: Vec2,
    viewport: Viewport,
    layout: &Layout,
    rng: &mut R,
) -> Placement {
    let pad = layout.edge_padding;
    let max_x = (viewport.width - size.x - pad).max(pad);
    let max_y = (viewport.height - size.y - pad).max(pad);

    let center = viewport.center();
    let radius = avoid_radius(viewport, layout);
    let budget = layout.attempts.max(1);

    let mut position = Vec2::splat(pad);
    let mut attempts = 0;
    let mut clear_of_center = false;
    while attempts < budget {
        attempts += 1;
        position = Vec2::new(
            random_in_range(rng, pad, max_x),
            random_in_range(rng, pad, max_y),
        );
        let candidate_center = position + size * 0.5;
        if candidate_center.distance(center) > radius {
            clear_of_center = true;
            break;
        }
    }

    Placement {
        position,
        attempts,
        clear_of_center,
    }
}
