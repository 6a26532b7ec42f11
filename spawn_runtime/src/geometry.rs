use serde::{Deserialize, Serialize};

/// Width and height of the square colony grid.
pub const ROOM_SIZE: u8 = 50;

/// Tile coordinate inside the colony grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: u8,
    pub y: u8,
}

impl Position {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Neighbouring tile in `dir`, or `None` when it would leave the grid.
    pub fn step(self, dir: Direction) -> Option<Position> {
        let (dx, dy) = dir.offset();
        let x = i16::from(self.x) + i16::from(dx);
        let y = i16::from(self.y) + i16::from(dy);
        let bound = i16::from(ROOM_SIZE);
        if x < 0 || y < 0 || x >= bound || y >= bound {
            return None;
        }
        Some(Position::new(x as u8, y as u8))
    }

    /// In-bounds neighbours in compass order starting at [`Direction::Top`].
    pub fn adjacent(self) -> Vec<(Direction, Position)> {
        Direction::ALL
            .iter()
            .filter_map(|dir| self.step(*dir).map(|pos| (*dir, pos)))
            .collect()
    }

}

/// Chebyshev distance: diagonal steps cost the same as orthogonal ones.
pub fn range(a: Position, b: Position) -> u8 {
    a.x.abs_diff(b.x).max(a.y.abs_diff(b.y))
}

/// Compass direction, numbered clockwise from `Top = 1`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Top = 1,
    TopRight = 2,
    Right = 3,
    BottomRight = 4,
    Bottom = 5,
    BottomLeft = 6,
    Left = 7,
    TopLeft = 8,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Top,
        Direction::TopRight,
        Direction::Right,
        Direction::BottomRight,
        Direction::Bottom,
        Direction::BottomLeft,
        Direction::Left,
        Direction::TopLeft,
    ];

    pub fn offset(self) -> (i8, i8) {
        match self {
            Direction::Top => (0, -1),
            Direction::TopRight => (1, -1),
            Direction::Right => (1, 0),
            Direction::BottomRight => (1, 1),
            Direction::Bottom => (0, 1),
            Direction::BottomLeft => (-1, 1),
            Direction::Left => (-1, 0),
            Direction::TopLeft => (-1, -1),
        }
    }
}

/// Exit order for a unit leaving a facility at `facility`.
///
/// Tiles farther from the colony `anchor` come first so freshly created units
/// clear the core instead of clogging it. Ties keep compass order.
pub fn exit_directions(facility: Position, anchor: Position) -> Vec<Direction> {
    let mut candidates = facility.adjacent();
    candidates.sort_by_key(|(_, pos)| std::cmp::Reverse(range(*pos, anchor)));
    candidates.into_iter().map(|(dir, _)| dir).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_chebyshev() {
        assert_eq!(range(Position::new(10, 10), Position::new(13, 11)), 3);
        assert_eq!(range(Position::new(10, 10), Position::new(8, 15)), 5);
        assert_eq!(range(Position::new(4, 4), Position::new(4, 4)), 0);
    }

    #[test]
    fn step_stays_on_grid() {
        assert_eq!(Position::new(0, 0).step(Direction::Left), None);
        assert_eq!(Position::new(49, 49).step(Direction::BottomRight), None);
        assert_eq!(
            Position::new(5, 5).step(Direction::TopRight),
            Some(Position::new(6, 4))
        );
        assert_eq!(Position::new(0, 0).adjacent().len(), 3);
        assert_eq!(Position::new(20, 20).adjacent().len(), 8);
    }

    #[test]
    fn exit_directions_face_away_from_anchor() {
        let anchor = Position::new(25, 25);
        let facility = Position::new(25, 23);
        let dirs = exit_directions(facility, anchor);
        assert_eq!(dirs.len(), 8);
        // The three tiles on row 22 are all range 3 from the anchor.
        assert_eq!(
            &dirs[..3],
            &[Direction::Top, Direction::TopRight, Direction::TopLeft]
        );
        assert_eq!(*dirs.last().unwrap(), Direction::BottomLeft);
    }
}
