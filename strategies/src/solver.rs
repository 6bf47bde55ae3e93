//! Breadth-first search over sliding puzzle boards.

use std::collections::{HashMap, VecDeque};

use types::{Direction, Position};

/// Enough to exhaust every reachable 3x3 board.
pub const DEFAULT_STATE_BUDGET: usize = 200_000;

const BLANK: u16 = 0;

/// Shortest sequence of tile ids to tap that turns `board` into the solved layout, or
/// `None` if no solution was found within `state_budget` distinct boards.
pub fn solve(board: &[Option<u32>], grid_size: usize, state_budget: usize) -> Option<Vec<u32>> {
    let cells = grid_size * grid_size;
    if board.len() != cells || cells > u16::MAX as usize {
        return None;
    }
    let start: Vec<u16> = board
        .iter()
        .map(|cell| cell.map(|id| id as u16).unwrap_or(BLANK))
        .collect();
    let goal: Vec<u16> = (1..cells as u16).chain(std::iter::once(BLANK)).collect();
    if start == goal {
        return Some(Vec::new());
    }

    let mut states = vec![start.clone()];
    let mut parents: Vec<Option<(usize, u32)>> = vec![None];
    let mut seen: HashMap<Vec<u16>, usize> = HashMap::from([(start, 0)]);
    let mut queue = VecDeque::from([0usize]);

    while let Some(current) = queue.pop_front() {
        let state = states[current].clone();
        let blank = state.iter().position(|cell| *cell == BLANK)?;
        let blank_position = Position::from_index(blank, grid_size);

        for direction in Direction::all() {
            let Some(neighbour) = blank_position.step(direction, grid_size) else {
                continue;
            };
            let neighbour_idx = neighbour.index(grid_size);
            let mut next = state.clone();
            let tile = next[neighbour_idx] as u32;
            next.swap(blank, neighbour_idx);
            if seen.contains_key(&next) {
                continue;
            }

            let next_idx = states.len();
            seen.insert(next.clone(), next_idx);
            parents.push(Some((current, tile)));
            let reached_goal = next == goal;
            states.push(next);

            if reached_goal {
                return Some(path_to(&parents, next_idx));
            }
            if states.len() >= state_budget {
                log::debug!("Gave up solving after {} boards", states.len());
                return None;
            }
            queue.push_back(next_idx);
        }
    }
    None
}

fn path_to(parents: &[Option<(usize, u32)>], mut idx: usize) -> Vec<u32> {
    let mut path = Vec::new();
    while let Some((parent, tile)) = parents[idx] {
        path.push(tile);
        idx = parent;
    }
    path.reverse();
    path
}

/// `board` after tapping `tile_id`, which must be next to the blank.
pub fn apply_tap(board: &mut [Option<u32>], tile_id: u32) {
    let tile_idx = board.iter().position(|cell| *cell == Some(tile_id));
    let blank_idx = board.iter().position(|cell| cell.is_none());
    if let (Some(tile_idx), Some(blank_idx)) = (tile_idx, blank_idx) {
        board.swap(tile_idx, blank_idx);
    }
}
