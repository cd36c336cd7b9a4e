//! Input mapping helpers
//!
//! Browser events are translated here into simulation-friendly values so the
//! mapping can be tested without a DOM.

use std::collections::HashSet;

use glam::Vec2;

use crate::Viewport;

/// Set of currently held keys (by `KeyboardEvent.key`)
#[derive(Debug, Default, Clone)]
pub struct KeyState {
    held: HashSet<String>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: &str) {
        self.held.insert(key.to_string());
    }

    pub fn release(&mut self, key: &str) {
        self.held.remove(key);
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    /// Forget everything (window blur drops keyup events)
    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn up_held(&self) -> bool {
        self.is_held("w") || self.is_held("W") || self.is_held("ArrowUp")
    }

    pub fn down_held(&self) -> bool {
        self.is_held("s") || self.is_held("S") || self.is_held("ArrowDown")
    }
}

/// Client-space rectangle of the canvas (`getBoundingClientRect`)
#[derive(Debug, Clone, Copy)]
pub struct CanvasRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Unproject a mouse position into world coordinates
///
/// The pointer is normalized against the canvas rectangle, then scaled by the
/// orthographic camera extents (the full viewport).
pub fn screen_to_world(client_x: f32, client_y: f32, rect: CanvasRect, viewport: Viewport) -> Vec2 {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Vec2::ZERO;
    }
    let x = client_x - rect.left;
    let y = client_y - rect.top;
    let ndc_x = (x / rect.width) * 2.0 - 1.0;
    let ndc_y = -(y / rect.height) * 2.0 + 1.0;
    Vec2::new(ndc_x * viewport.half_width(), ndc_y * viewport.half_height())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> CanvasRect {
        CanvasRect {
            left: 10.0,
            top: 20.0,
            width: 760.0,
            height: 570.0,
        }
    }

    #[test]
    fn test_screen_to_world_center_and_corners() {
        let vp = Viewport::new(800.0, 600.0);

        let center = screen_to_world(10.0 + 380.0, 20.0 + 285.0, rect(), vp);
        assert!(center.length() < 1e-3);

        let top_left = screen_to_world(10.0, 20.0, rect(), vp);
        assert!((top_left.x + 400.0).abs() < 1e-3);
        assert!((top_left.y - 300.0).abs() < 1e-3);

        let bottom_right = screen_to_world(770.0, 590.0, rect(), vp);
        assert!((bottom_right.x - 400.0).abs() < 1e-3);
        assert!((bottom_right.y + 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_rect() {
        let r = CanvasRect {
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
        };
        assert_eq!(screen_to_world(5.0, 5.0, r, Viewport::default()), Vec2::ZERO);
    }

    #[test]
    fn test_key_state() {
        let mut keys = KeyState::new();
        keys.press("w");
        assert!(keys.up_held());
        assert!(!keys.down_held());
        keys.release("w");
        keys.press("ArrowDown");
        assert!(keys.down_held());
        keys.clear();
        assert!(!keys.down_held());
    }
}
