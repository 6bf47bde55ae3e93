use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
        }
    }
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Row-major index of this cell on a `grid_size` wide grid.
    pub fn index(&self, grid_size: usize) -> usize {
        self.row * grid_size + self.col
    }

    pub fn from_index(index: usize, grid_size: usize) -> Self {
        Self {
            row: index / grid_size,
            col: index % grid_size,
        }
    }

    pub fn manhattan_distance(&self, other: &Position) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// The neighbouring cell in `direction`, if it is still on the grid.
    pub fn step(&self, direction: Direction, grid_size: usize) -> Option<Position> {
        let (row, col) = match direction {
            Direction::Up => (self.row.checked_sub(1)?, self.col),
            Direction::Down => (self.row + 1, self.col),
            Direction::Left => (self.row, self.col.checked_sub(1)?),
            Direction::Right => (self.row, self.col + 1),
        };
        if row >= grid_size || col >= grid_size {
            return None;
        }
        Some(Position { row, col })
    }

    /// Direction that leads from `self` to an orthogonally adjacent `other`.
    pub fn direction_to(&self, other: &Position) -> Option<Direction> {
        if !can_move(self, other) {
            return None;
        }
        if other.row < self.row {
            Some(Direction::Up)
        } else if other.row > self.row {
            Some(Direction::Down)
        } else if other.col < self.col {
            Some(Direction::Left)
        } else {
            Some(Direction::Right)
        }
    }
}

impl Direction {
    pub fn all() -> [Direction; 4] {
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
    }
}

/// A tile may slide into the empty cell only when the two cells share an edge.
pub fn can_move(tile_position: &Position, empty_position: &Position) -> bool {
    tile_position.manhattan_distance(empty_position) == 1
}
