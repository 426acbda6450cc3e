//! Where the puppy parks and where the button sits in its mouth

use glam::Vec2;

use super::geometry::{Rect, Viewport, clamp_origin};
use crate::config::Dock;

/// Puppy origin next to a control, kept `margin` inside the viewport
pub fn stand_off(control: &Rect, pursuer_size: Vec2, dock: &Dock, viewport: Viewport, margin: f32) -> Vec2 {
    let raw = control.center() - pursuer_size * dock.stand_off;
    clamp_origin(raw, pursuer_size, viewport, margin)
}

/// The bite point: center of the mouth anchor when the page has one,
/// otherwise a fixed fraction of the puppy's box
pub fn mouth_point(pursuer: &Rect, anchor: Option<Rect>, dock: &Dock) -> Vec2 {
    match anchor {
        Some(anchor) => anchor.center(),
        None => pursuer.origin + pursuer.size * dock.bite,
    }
}

/// Control origin that puts its hold point on the mouth
pub fn docked_origin(mouth: Vec2, control_size: Vec2, dock: &Dock) -> Vec2 {
    mouth - control_size * dock.hold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stand_off_near_control() {
        let dock = Dock::default();
        let control = Rect::from_ltwh(400.0, 300.0, 120.0, 48.0);
        let origin = stand_off(&control, Vec2::new(100.0, 80.0), &dock, Viewport::new(1000.0, 800.0), 8.0);
        // center (460, 324) - (65, 44)
        assert!((origin - Vec2::new(395.0, 280.0)).length() < 1e-3);
    }

    #[test]
    fn test_stand_off_clamped_to_viewport() {
        let dock = Dock::default();
        let control = Rect::from_ltwh(0.0, 0.0, 20.0, 20.0);
        let origin = stand_off(&control, Vec2::new(100.0, 80.0), &dock, Viewport::new(1000.0, 800.0), 8.0);
        assert_eq!(origin, Vec2::new(8.0, 8.0));

        let control = Rect::from_ltwh(980.0, 780.0, 20.0, 20.0);
        let origin = stand_off(&control, Vec2::new(100.0, 80.0), &dock, Viewport::new(1000.0, 800.0), 8.0);
        assert_eq!(origin, Vec2::new(892.0, 712.0));
    }

    #[test]
    fn test_mouth_prefers_anchor() {
        let dock = Dock::default();
        let pursuer = Rect::from_ltwh(100.0, 100.0, 100.0, 100.0);
        let anchor = Rect::from_ltwh(170.0, 150.0, 10.0, 10.0);
        assert_eq!(mouth_point(&pursuer, Some(anchor), &dock), Vec2::new(175.0, 155.0));
    }

    #[test]
    fn test_mouth_falls_back_to_bite_fraction() {
        let dock = Dock::default();
        let pursuer = Rect::from_ltwh(100.0, 100.0, 100.0, 100.0);
        let mouth = mouth_point(&pursuer, None, &dock);
        assert!((mouth - Vec2::new(162.0, 158.0)).length() < 1e-3);
    }

    #[test]
    fn test_docked_origin_holds_top_middle() {
        let dock = Dock::default();
        let origin = docked_origin(Vec2::new(160.0, 150.0), Vec2::new(120.0, 48.0), &dock);
        assert_eq!(origin, Vec2::new(100.0, 138.0));
    }
}
