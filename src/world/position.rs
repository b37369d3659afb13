use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
    pub z: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionDelta {
    pub dx: i16,
    pub dy: i16,
    pub dz: i8,
}

pub const ALL_DIRECTIONS: [Direction; 8] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
    Direction::Northeast,
    Direction::Northwest,
    Direction::Southeast,
    Direction::Southwest,
];

impl Position {
    pub const fn new(x: u16, y: u16, z: u8) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, delta: PositionDelta) -> Option<Self> {
        let x = i32::from(self.x) + i32::from(delta.dx);
        let y = i32::from(self.y) + i32::from(delta.dy);
        let z = i16::from(self.z) + i16::from(delta.dz);

        if x < 0 || y < 0 || z < 0 {
            return None;
        }

        if x > i32::from(u16::MAX) || y > i32::from(u16::MAX) || z > i16::from(u8::MAX) {
            return None;
        }

        Some(Self {
            x: x as u16,
            y: y as u16,
            z: z as u8,
        })
    }

    pub fn step(self, direction: Direction) -> Option<Self> {
        self.offset(direction.delta())
    }

    /// Per-axis distance to `other`, ignoring the floor.
    pub fn distance_xy(self, other: Position) -> (u16, u16) {
        (self.x.abs_diff(other.x), self.y.abs_diff(other.y))
    }

    /// True when `other` is this tile or one of its eight neighbours on the same floor.
    pub fn is_adjacent(self, other: Position) -> bool {
        let (dx, dy) = self.distance_xy(other);
        self.z == other.z && dx <= 1 && dy <= 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl Direction {
    pub fn delta(self) -> PositionDelta {
        match self {
            Direction::North => PositionDelta { dx: 0, dy: -1, dz: 0 },
            Direction::East => PositionDelta { dx: 1, dy: 0, dz: 0 },
            Direction::South => PositionDelta { dx: 0, dy: 1, dz: 0 },
            Direction::West => PositionDelta { dx: -1, dy: 0, dz: 0 },
            Direction::Northeast => PositionDelta { dx: 1, dy: -1, dz: 0 },
            Direction::Northwest => PositionDelta { dx: -1, dy: -1, dz: 0 },
            Direction::Southeast => PositionDelta { dx: 1, dy: 1, dz: 0 },
            Direction::Southwest => PositionDelta { dx: -1, dy: 1, dz: 0 },
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::Northeast
                | Direction::Northwest
                | Direction::Southeast
                | Direction::Southwest
        )
    }

    /// The way a creature faces after stepping in this direction. Clients only
    /// draw four facings, diagonal steps keep the horizontal component.
    pub fn facing(self) -> Direction {
        match self {
            Direction::Northeast | Direction::Southeast => Direction::East,
            Direction::Northwest | Direction::Southwest => Direction::West,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opposite(direction: Direction) -> Direction {
        match direction {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::Northeast => Direction::Southwest,
            Direction::Northwest => Direction::Southeast,
            Direction::Southeast => Direction::Northwest,
            Direction::Southwest => Direction::Northeast,
        }
    }

    #[test]
    fn step_and_back_returns_to_origin() {
        let origin = Position::new(100, 100, 7);
        for direction in ALL_DIRECTIONS {
            let next = origin.step(direction).expect("step");
            assert!(origin.is_adjacent(next));
            let back = next.step(opposite(direction)).expect("step back");
            assert_eq!(back, origin);
        }
    }

    #[test]
    fn step_off_the_coordinate_space_fails() {
        assert_eq!(Position::new(0, 5, 7).step(Direction::West), None);
        assert_eq!(Position::new(5, 0, 7).step(Direction::Northeast), None);
        assert_eq!(
            Position::new(u16::MAX, 5, 7).step(Direction::East),
            None
        );
    }

    #[test]
    fn adjacency_requires_same_floor() {
        let origin = Position::new(50, 50, 7);
        assert!(!origin.is_adjacent(Position::new(50, 51, 6)));
        assert!(!origin.is_adjacent(Position::new(52, 50, 7)));
        assert_eq!(origin.distance_xy(Position::new(47, 53, 7)), (3, 3));
    }

    #[test]
    fn diagonal_steps_face_horizontally() {
        assert_eq!(Direction::Northeast.facing(), Direction::East);
        assert_eq!(Direction::Southwest.facing(), Direction::West);
        assert_eq!(Direction::North.facing(), Direction::North);
    }

    #[test]
    fn position_deserializes_from_yaml_mapping() {
        let position: Position = serde_yaml::from_str("{ x: 192, y: 200, z: 7 }").expect("yaml");
        assert_eq!(position, Position::new(192, 200, 7));
        assert_eq!(position.to_string(), "(192, 200, 7)");
    }
}
