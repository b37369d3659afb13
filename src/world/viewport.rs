use crate::world::position::Position;

/// Half extents of the classic 18x14 client viewport.
pub const VIEW_HALF_WIDTH: u16 = 9;
pub const VIEW_HALF_HEIGHT: u16 = 7;

/// Rectangular neighbourhood around an observer inside which other creatures
/// and map changes are reported to it. Wider in x than in y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityWindow {
    pub half_width: u16,
    pub half_height: u16,
}

impl Default for VisibilityWindow {
    fn default() -> Self {
        Self {
            half_width: VIEW_HALF_WIDTH,
            half_height: VIEW_HALF_HEIGHT,
        }
    }
}

impl VisibilityWindow {
    /// Whether an observer standing at `observer` sees `target`.
    pub fn can_see(&self, observer: Position, target: Position) -> bool {
        let (dx, dy) = observer.distance_xy(target);
        observer.z == target.z && dx <= self.half_width && dy <= self.half_height
    }

    /// Corners of the window centred on `center`, clamped to the coordinate space.
    pub fn bounds(&self, center: Position) -> (Position, Position) {
        let min = Position {
            x: center.x.saturating_sub(self.half_width),
            y: center.y.saturating_sub(self.half_height),
            z: center.z,
        };
        let max = Position {
            x: center.x.saturating_add(self.half_width),
            y: center.y.saturating_add(self.half_height),
            z: center.z,
        };
        (min, max)
    }
}
