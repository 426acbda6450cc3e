//! Screen-space geometry helpers
//!
//! All coordinates are CSS pixels in the fixed-position (viewport) space,
//! origin at the top-left corner, y growing downwards.

use glam::Vec2;
use rand::Rng;

/// Restrict `value` to `[low, high]`.
///
/// Unlike `f32::clamp` this never panics: with `low > high` the result is `high`.
#[inline]
pub fn clamp(value: f32, low: f32, high: f32) -> f32 {
    value.max(low).min(high)
}

/// Uniform sample in `[min, max)`. A collapsed range yields `min`.
#[inline]
pub fn random_in_range<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    if max <= min {
        return min;
    }
    min + rng.random::<f32>() * (max - min)
}

/// Parse a CSS pixel length such as `"123.5px"`
pub fn parse_px(value: &str) -> Option<f32> {
    value.trim().strip_suffix("px")?.trim().parse().ok()
}

/// Visible rendering area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.size() * 0.5
    }

    /// Length of the shorter side
    #[inline]
    pub fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }
}

/// Axis-aligned rectangle: top-left origin plus size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    pub fn from_ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self::new(Vec2::new(left, top), Vec2::new(width, height))
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.origin.x
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.origin.y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size.y
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.origin.x + self.size.x
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.y
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.origin + self.size * 0.5
    }

    /// Same size, new origin
    #[inline]
    pub fn moved_to(&self, origin: Vec2) -> Self {
        Self::new(origin, self.size)
    }

    /// Whether the rectangle lies inside the viewport shrunk by `inset` on every side
    pub fn within(&self, viewport: Viewport, inset: f32) -> bool {
        self.left() >= inset
            && self.top() >= inset
            && self.right() <= viewport.width - inset
            && self.bottom() <= viewport.height - inset
    }
}

/// Clamp a top-left origin so a box of `size` stays `margin` away from every
/// viewport edge. Degenerate viewports pin the box to `margin`.
pub fn clamp_origin(origin: Vec2, size: Vec2, viewport: Viewport, margin: f32) -> Vec2 {
    let max_x = (viewport.width - size.x - margin).max(margin);
    let max_y = (viewport.height - size.y - margin).max(margin);
    Vec2::new(
        clamp(origin.x, margin, max_x),
        clamp(origin.y, margin, max_y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5.0, 0.0, 10.0), 5.0);
        assert_eq!(clamp(-3.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp(42.0, 0.0, 10.0), 10.0);
    }

    #[test]
    fn test_clamp_inverted_bounds_does_not_panic() {
        assert_eq!(clamp(5.0, 10.0, 0.0), 0.0);
    }

    #[test]
    fn test_random_in_range_bounds() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..1000 {
            let v = random_in_range(&mut rng, 16.0, 864.0);
            assert!((16.0..=864.0).contains(&v));
        }
        assert_eq!(random_in_range(&mut rng, 16.0, 16.0), 16.0);
        assert_eq!(random_in_range(&mut rng, 16.0, 4.0), 16.0);
    }

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px("123.5px"), Some(123.5));
        assert_eq!(parse_px(" -8px "), Some(-8.0));
        assert_eq!(parse_px("0px"), Some(0.0));
        // Unset or non-pixel values fall back to the rendered box
        assert_eq!(parse_px(""), None);
        assert_eq!(parse_px("auto"), None);
        assert_eq!(parse_px("12em"), None);
    }

    #[test]
    fn test_rect_center_and_edges() {
        let r = Rect::from_ltwh(20.0, 20.0, 120.0, 48.0);
        assert_eq!(r.center(), Vec2::new(80.0, 44.0));
        assert_eq!(r.right(), 140.0);
        assert_eq!(r.bottom(), 68.0);
        assert!(r.within(Viewport::new(1000.0, 800.0), 16.0));
        assert!(!r.within(Viewport::new(1000.0, 800.0), 24.0));
    }

    #[test]
    fn test_clamp_origin() {
        let vp = Viewport::new(400.0, 300.0);
        let size = Vec2::new(100.0, 80.0);
        assert_eq!(
            clamp_origin(Vec2::new(-50.0, 500.0), size, vp, 8.0),
            Vec2::new(8.0, 212.0)
        );
        // Box wider than the viewport pins to the margin
        assert_eq!(
            clamp_origin(Vec2::new(30.0, 30.0), Vec2::new(500.0, 80.0), vp, 8.0),
            Vec2::new(8.0, 30.0)
        );
    }
}
