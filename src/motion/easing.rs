//! Easing curves
//!
//! Curves are evaluated in Rust for frame-stepped hosts and rendered as CSS
//! timing functions for the Web Animations API.

use serde::{Deserialize, Serialize};

/// Timing function applied to a transition's progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    /// CSS `cubic-bezier(x1, y1, x2, y2)`
    CubicBezier([f32; 4]),
}

impl Default for Easing {
    fn default() -> Self {
        Easing::CubicBezier([0.2, 0.9, 0.2, 1.0])
    }
}

impl Easing {
    /// Quick start, long soft landing
    pub const SNAPPY: Easing = Easing::CubicBezier([0.2, 0.9, 0.2, 1.0]);
    /// Slightly gentler variant used for settling
    pub const SETTLE: Easing = Easing::CubicBezier([0.2, 0.8, 0.2, 1.0]);
    /// CSS `ease`
    pub const EASE: Easing = Easing::CubicBezier([0.25, 0.1, 0.25, 1.0]);

    /// Map linear progress `x` in `[0, 1]` to eased progress
    pub fn apply(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        match *self {
            Easing::Linear => x,
            Easing::CubicBezier([x1, y1, x2, y2]) => {
                if x == 0.0 || x == 1.0 {
                    return x;
                }
                let t = solve_t(x, x1, x2);
                bezier(t, y1, y2)
            }
        }
    }

    /// CSS only accepts control-point x coordinates within `[0, 1]`
    pub fn is_valid(&self) -> bool {
        match *self {
            Easing::Linear => true,
            Easing::CubicBezier([x1, _, x2, _]) => {
                (0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2)
            }
        }
    }

    /// CSS timing-function string
    pub fn css(&self) -> String {
        match *self {
            Easing::Linear => "linear".to_string(),
            Easing::CubicBezier([x1, y1, x2, y2]) => {
                format!("cubic-bezier({}, {}, {}, {})", x1, y1, x2, y2)
            }
        }
    }
}

/// One coordinate of a unit cubic bezier with P0 = 0 and P3 = 1
#[inline]
fn bezier(t: f32, p1: f32, p2: f32) -> f32 {
    let u = 1.0 - t;
    3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t
}

#[inline]
fn bezier_slope(t: f32, p1: f32, p2: f32) -> f32 {
    let u = 1.0 - t;
    3.0 * u * u * p1 + 6.0 * u * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}

/// Find the curve parameter whose x-coordinate equals `x`.
/// Newton first, bisection if the slope flattens out.
fn solve_t(x: f32, x1: f32, x2: f32) -> f32 {
    const EPSILON: f32 = 1e-6;

    let mut t = x;
    for _ in 0..8 {
        let err = bezier(t, x1, x2) - x;
        if err.abs() < EPSILON {
            return t;
        }
        let slope = bezier_slope(t, x1, x2);
        if slope.abs() < EPSILON {
            break;
        }
        t -= err / slope;
    }

    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    t = x;
    for _ in 0..32 {
        let value = bezier(t, x1, x2);
        if (value - x).abs() < EPSILON {
            break;
        }
        if value < x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) * 0.5;
    }
    t
}
