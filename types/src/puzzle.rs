use std::{collections::HashSet, fmt::Display};

use itertools::Itertools;
use rand::{seq::SliceRandom, thread_rng, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    error::GameSetupError,
    position::{can_move, Direction, Position},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleTile {
    pub id: u32,
    pub correct_position: Position,
    pub current_position: Position,
}

impl PuzzleTile {
    pub fn is_in_place(&self) -> bool {
        self.current_position == self.correct_position
    }
}

/// An N×N sliding tile puzzle with a single blank cell.
///
/// Tile `k` (1-based) belongs at row-major index `k - 1`; the blank belongs in the
/// bottom-right corner. Every constructor and the deserializer check that the tiles
/// plus the one blank cover the grid exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPuzzleState")]
pub struct PuzzleState {
    tiles: Vec<PuzzleTile>,
    grid_size: usize,
    move_count: u32,
    is_complete: bool,
}

#[derive(Deserialize)]
struct RawPuzzleState {
    tiles: Vec<PuzzleTile>,
    grid_size: usize,
    #[serde(default)]
    move_count: u32,
}

impl TryFrom<RawPuzzleState> for PuzzleState {
    type Error = GameSetupError;

    fn try_from(raw: RawPuzzleState) -> Result<Self, Self::Error> {
        PuzzleState::from_tiles(raw.grid_size, raw.tiles, raw.move_count)
    }
}

/// Input a player can give the puzzle. Both forms go through the same legality check.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PuzzleInput {
    Tap(u32),
    Swipe { tile_id: u32, direction: Direction },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved {
        tile_id: u32,
        from: Position,
        to: Position,
    },
    Rejected(MoveRejection),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MoveRejection {
    AlreadyComplete,
    UnknownTile(u32),
    NotAdjacent { tile_id: u32, empty: Position },
    WrongDirection { tile_id: u32, direction: Direction },
}

impl MoveOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MoveOutcome::Moved { .. })
    }
}

impl Display for PuzzleInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PuzzleInput::Tap(tile_id) => write!(f, "tap {tile_id}"),
            PuzzleInput::Swipe { tile_id, direction } => write!(f, "{direction} {tile_id}"),
        }
    }
}

impl PuzzleState {
    /// Shuffles a fresh `grid_size` puzzle that is solvable and not already solved.
    pub fn new(grid_size: usize) -> Result<Self, GameSetupError> {
        Self::new_with_rng(grid_size, &mut thread_rng())
    }

    pub fn new_with_rng<R: Rng + ?Sized>(
        grid_size: usize,
        rng: &mut R,
    ) -> Result<Self, GameSetupError> {
        let mut state = Self::solved(grid_size)?;
        loop {
            state.shuffle_tiles(rng);
            if !state.is_complete {
                break;
            }
            log::debug!("Shuffle left the {grid_size}x{grid_size} grid solved, shuffling again");
        }
        log::info!(
            "New {grid_size}x{grid_size} puzzle with {} inversions",
            state.inversion_count()
        );
        Ok(state)
    }

    /// Every tile at its correct position, blank bottom-right.
    pub fn solved(grid_size: usize) -> Result<Self, GameSetupError> {
        if grid_size < 2 {
            return Err(GameSetupError::GridTooSmall(grid_size));
        }
        let tiles = (1..grid_size * grid_size)
            .map(|id| {
                let position = Position::from_index(id - 1, grid_size);
                PuzzleTile {
                    id: id as u32,
                    correct_position: position,
                    current_position: position,
                }
            })
            .collect();
        Ok(Self {
            tiles,
            grid_size,
            move_count: 0,
            is_complete: true,
        })
    }

    /// Builds a puzzle from an explicit arrangement, e.g. one restored from storage.
    pub fn from_tiles(
        grid_size: usize,
        mut tiles: Vec<PuzzleTile>,
        move_count: u32,
    ) -> Result<Self, GameSetupError> {
        if grid_size < 2 {
            return Err(GameSetupError::GridTooSmall(grid_size));
        }
        let cell_count = grid_size * grid_size;
        if tiles.len() != cell_count - 1 {
            return Err(GameSetupError::InvalidArrangement(format!(
                "expected {} tiles, got {}",
                cell_count - 1,
                tiles.len()
            )));
        }
        tiles.sort_by_key(|tile| tile.id);

        let mut occupied = HashSet::with_capacity(tiles.len());
        for (idx, tile) in tiles.iter().enumerate() {
            if tile.id as usize != idx + 1 {
                return Err(GameSetupError::InvalidArrangement(format!(
                    "tile ids must be 1..={}, found {}",
                    cell_count - 1,
                    tile.id
                )));
            }
            if tile.correct_position != Position::from_index(idx, grid_size) {
                return Err(GameSetupError::InvalidArrangement(format!(
                    "tile {} has correct position {} instead of {}",
                    tile.id,
                    tile.correct_position,
                    Position::from_index(idx, grid_size)
                )));
            }
            let current = tile.current_position;
            if current.row >= grid_size || current.col >= grid_size {
                return Err(GameSetupError::InvalidArrangement(format!(
                    "tile {} is off the grid at {current}",
                    tile.id
                )));
            }
            if !occupied.insert(current) {
                return Err(GameSetupError::InvalidArrangement(format!(
                    "two tiles share cell {current}"
                )));
            }
        }

        let mut state = Self {
            tiles,
            grid_size,
            move_count,
            is_complete: false,
        };
        state.is_complete = state.check_complete();
        Ok(state)
    }

    pub fn tiles(&self) -> &[PuzzleTile] {
        &self.tiles
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn tile(&self, tile_id: u32) -> Option<&PuzzleTile> {
        self.tiles.iter().find(|tile| tile.id == tile_id)
    }

    pub fn tile_at(&self, position: Position) -> Option<&PuzzleTile> {
        self.tiles
            .iter()
            .find(|tile| tile.current_position == position)
    }

    /// The one cell no tile occupies.
    pub fn find_empty_position(&self) -> Position {
        let occupied: HashSet<Position> =
            self.tiles.iter().map(|tile| tile.current_position).collect();
        (0..self.grid_size * self.grid_size)
            .map(|idx| Position::from_index(idx, self.grid_size))
            .find(|position| !occupied.contains(position))
            .expect("A valid puzzle always has exactly one empty cell")
    }

    /// Row-major view of the grid, `None` marking the blank.
    pub fn board(&self) -> Vec<Option<u32>> {
        let mut board = vec![None; self.grid_size * self.grid_size];
        for tile in &self.tiles {
            board[tile.current_position.index(self.grid_size)] = Some(tile.id);
        }
        board
    }

    /// Ids of the tiles that a tap would currently move.
    pub fn movable_tiles(&self) -> Vec<u32> {
        let empty = self.find_empty_position();
        self.tiles
            .iter()
            .filter(|tile| can_move(&tile.current_position, &empty))
            .map(|tile| tile.id)
            .collect()
    }

    pub fn apply_input(&mut self, input: PuzzleInput) -> MoveOutcome {
        match input {
            PuzzleInput::Tap(tile_id) => self.attempt_move(tile_id),
            PuzzleInput::Swipe { tile_id, direction } => self.attempt_swipe(tile_id, direction),
        }
    }

    /// Slides `tile_id` into the blank if it is adjacent. Anything else leaves the
    /// state untouched.
    pub fn attempt_move(&mut self, tile_id: u32) -> MoveOutcome {
        if self.is_complete {
            return MoveOutcome::Rejected(MoveRejection::AlreadyComplete);
        }
        let empty = self.find_empty_position();
        let Some(tile) = self.tiles.iter_mut().find(|tile| tile.id == tile_id) else {
            return MoveOutcome::Rejected(MoveRejection::UnknownTile(tile_id));
        };
        if !can_move(&tile.current_position, &empty) {
            return MoveOutcome::Rejected(MoveRejection::NotAdjacent { tile_id, empty });
        }

        let from = tile.current_position;
        tile.current_position = empty;
        self.move_count += 1;
        self.is_complete = self.check_complete();
        log::debug!(
            "Moved tile {tile_id} from {from} to {empty} (move {})",
            self.move_count
        );
        if self.is_complete {
            log::info!("Puzzle solved in {} moves", self.move_count);
        }
        MoveOutcome::Moved {
            tile_id,
            from,
            to: empty,
        }
    }

    /// A swipe on a tile only counts when the blank is the next cell in that direction.
    pub fn attempt_swipe(&mut self, tile_id: u32, direction: Direction) -> MoveOutcome {
        if self.is_complete {
            return MoveOutcome::Rejected(MoveRejection::AlreadyComplete);
        }
        let Some(tile) = self.tile(tile_id) else {
            return MoveOutcome::Rejected(MoveRejection::UnknownTile(tile_id));
        };
        let empty = self.find_empty_position();
        if tile.current_position.step(direction, self.grid_size) != Some(empty) {
            return MoveOutcome::Rejected(MoveRejection::WrongDirection { tile_id, direction });
        }
        self.attempt_move(tile_id)
    }

    /// Out-of-order pairs of tile ids, reading the grid row by row and skipping the blank.
    pub fn inversion_count(&self) -> usize {
        self.tiles
            .iter()
            .sorted_by_key(|tile| tile.current_position.index(self.grid_size))
            .map(|tile| tile.id)
            .tuple_combinations()
            .filter(|(earlier, later)| earlier > later)
            .count()
    }

    /// Whether the goal arrangement is reachable through legal moves.
    pub fn is_solvable(&self) -> bool {
        let inversions = self.inversion_count();
        if self.grid_size % 2 == 1 {
            inversions % 2 == 0
        } else {
            let blank_row_from_bottom = self.grid_size - self.find_empty_position().row;
            (inversions + blank_row_from_bottom) % 2 == 1
        }
    }

    fn shuffle_tiles<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut positions: Vec<Position> =
            self.tiles.iter().map(|tile| tile.correct_position).collect();
        positions.shuffle(rng);
        for (tile, position) in self.tiles.iter_mut().zip(positions) {
            tile.current_position = position;
        }

        // swapping any two tiles flips the permutation parity
        if self.inversion_count() % 2 == 1 {
            let first = self.tiles[0].current_position;
            self.tiles[0].current_position = self.tiles[1].current_position;
            self.tiles[1].current_position = first;
        }
        self.move_count = 0;
        self.is_complete = self.check_complete();
    }

    fn check_complete(&self) -> bool {
        self.tiles.iter().all(PuzzleTile::is_in_place)
    }
}

impl Display for PuzzleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = (self.grid_size * self.grid_size - 1).to_string().len();
        let rows = self
            .board()
            .chunks(self.grid_size)
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Some(id) => format!("{id:>width$}"),
                        None => format!("{:>width$}", "."),
                    })
                    .join(" ")
            })
            .join("\n");
        write!(f, "{rows}")
    }
}
