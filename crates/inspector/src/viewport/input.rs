use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Client pixel position to container-relative [0,1] x [0,1] coords.
/// `None` for a degenerate container.
pub fn normalize_pointer(pos: egui::Pos2, rect: egui::Rect) -> Option<Vec2> {
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return None;
    }
    Some(Vec2::new(
        (pos.x - rect.left()) / rect.width(),
        (pos.y - rect.top()) / rect.height(),
    ))
}

/// Mouse button driving a pointer gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
}

/// Down/up tracking for click detection
#[derive(Debug, Default)]
pub struct PointerState {
    down: Option<Vec2>,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, point: Vec2) {
        self.down = Some(point);
    }

    /// Release at `point`. Returns the click position when the pointer did
    /// not move since the matching press.
    pub fn release(&mut self, point: Vec2) -> Option<Vec2> {
        let down = self.down.take()?;
        (down.distance(point) == 0.0).then_some(point)
    }

    pub fn is_pressed(&self) -> bool {
        self.down.is_some()
    }
}
