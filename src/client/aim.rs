//! Drag vector clamping and impulse conversion

use crate::sim::{FORCE_SCALE, MAX_DRAG};
use crate::ws::protocol::Vec2;

/// Clamp a drag vector to the maximum drag magnitude, preserving direction
pub fn clamp_drag(drag: Vec2) -> Vec2 {
    let mag = drag.magnitude();
    if mag <= MAX_DRAG {
        drag
    } else {
        drag.scaled(MAX_DRAG / mag)
    }
}

/// Convert a (clamped) drag vector into the impulse applied to a body; a
/// full-length drag yields `FORCE_SCALE`
pub fn drag_to_impulse(drag: Vec2) -> Vec2 {
    clamp_drag(drag).scaled(FORCE_SCALE / MAX_DRAG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_drags_pass_through_unchanged() {
        let drag = Vec2::new(30.0, -40.0);
        assert_eq!(clamp_drag(drag), drag);
    }

    #[test]
    fn long_drags_clamp_to_max_magnitude_preserving_direction() {
        let drag = Vec2::new(300.0, -400.0);
        let clamped = clamp_drag(drag);
        assert!((clamped.magnitude() - MAX_DRAG).abs() < 1e-4);

        // Unit vector unchanged up to floating tolerance
        let (ux, uy) = (drag.x / drag.magnitude(), drag.y / drag.magnitude());
        let (cx, cy) = (clamped.x / clamped.magnitude(), clamped.y / clamped.magnitude());
        assert!((ux - cx).abs() < 1e-6);
        assert!((uy - cy).abs() < 1e-6);
    }

    #[test]
    fn zero_drag_stays_zero() {
        assert_eq!(clamp_drag(Vec2::ZERO), Vec2::ZERO);
        assert_eq!(drag_to_impulse(Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn full_drag_yields_the_force_scale() {
        let impulse = drag_to_impulse(Vec2::new(MAX_DRAG, 0.0));
        assert!((impulse.x - FORCE_SCALE).abs() < 1e-7);
        assert_eq!(impulse.y, 0.0);

        // Anything longer clamps to the same impulse
        let over = drag_to_impulse(Vec2::new(MAX_DRAG * 10.0, 0.0));
        assert!((over.x - FORCE_SCALE).abs() < 1e-7);
    }
}
