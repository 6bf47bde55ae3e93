use std::io::{self, Write};

use itertools::Itertools;
use regex::{Captures, Regex};
use types::{CardView, Direction, MatchStrategy, PuzzleInput, PuzzleState, PuzzleStrategy};

/// Reads moves typed on stdin.
///
/// Puzzle commands are `tap <tile>`, `<up|down|left|right> <tile>` or just `<tile>`.
/// Card commands are `flip <card>` or just `<card>`.
#[derive(Debug, Default)]
pub struct InputStrategy {}

impl PuzzleStrategy for InputStrategy {
    fn select_input(&mut self, puzzle: &PuzzleState) -> PuzzleInput {
        println!("{puzzle}");
        let movable = puzzle.movable_tiles();
        println!("Movable tiles: {}", movable.iter().sorted().join(", "));

        read_until_parsed("Your move? >> ", parse_puzzle_input)
    }
}

impl MatchStrategy for InputStrategy {
    fn select_card(&mut self, board: &[CardView<'_>]) -> u32 {
        println!("{}", render_board(board));

        // if only one card can be turned over, turn it
        let face_down: Vec<u32> = board
            .iter()
            .filter(|card| card.face.is_none() && !card.is_matched)
            .map(|card| card.id)
            .collect();
        if let [only] = face_down.as_slice() {
            log::info!("Only card {only} is left face down");
            return *only;
        }

        read_until_parsed("Which card? >> ", parse_card_choice)
    }
}

fn render_board(board: &[CardView<'_>]) -> String {
    board
        .iter()
        .map(|card| match (card.face, card.is_matched) {
            (Some(face), true) => format!("({face})"),
            (Some(face), false) => format!("[{face}]"),
            (None, _) => format!("#{}", card.id),
        })
        .join(" ")
}

fn read_until_parsed<T>(prompt: &str, parse: fn(&str) -> Result<T, String>) -> T {
    let mut buf = String::new();
    loop {
        print!("{prompt}");
        let _ = io::stdout().flush();
        buf.clear();
        let parsed = match io::stdin().read_line(&mut buf) {
            Ok(_) => parse(&buf),
            Err(err) => Err(format!("Error reading line from stdin: {err}")),
        };
        match parsed {
            Ok(value) => return value,
            Err(err) => log::error!("Error parsing message from stdin: {err}"),
        }
    }
}

pub fn parse_puzzle_input(input: &str) -> Result<PuzzleInput, String> {
    let input = input.trim().to_lowercase();
    let input = input.as_str();

    let swipe_re = Regex::new(r"^(?<direction>up|down|left|right)\s+(?<tile>\d+)$")
        .expect("Valid swipe regex");
    if let Some(swipe_result) = input_from_regex(input, swipe_re, swipe_from_captures) {
        return swipe_result;
    }

    if let Some(tap_result) = input_from_regex(
        input,
        Regex::new(r"^(?:tap\s+)?(?<tile>\d+)$").expect("Valid tap regex"),
        tap_from_captures,
    ) {
        return tap_result;
    }

    Err(format!("Unable to parse a tap or swipe from string: {input}"))
}

pub fn parse_card_choice(input: &str) -> Result<u32, String> {
    let input = input.trim().to_lowercase();
    let re = Regex::new(r"^(?:flip\s+)?(?<card>\d+)$").expect("Valid flip regex");
    let caps = re
        .captures(&input)
        .ok_or_else(|| format!("Unable to parse a card to flip from string: {input}"))?;
    parse_id(&caps, "card")
}

fn input_from_regex<T>(
    input: &str,
    re: Regex,
    callback: for<'a, 'b> fn(&'a Captures<'b>) -> Result<T, String>,
) -> Option<Result<T, String>> {
    let caps = re.captures(input)?;
    Some(callback(&caps))
}

fn parse_id(caps: &Captures, group: &str) -> Result<u32, String> {
    let raw = caps
        .name(group)
        .map(|m| m.as_str())
        .ok_or_else(|| format!("Missing {group}"))?;
    raw.parse::<u32>()
        .map_err(|err| format!("Invalid {group} {raw:?}: {err}"))
}

fn tap_from_captures(caps: &Captures) -> Result<PuzzleInput, String> {
    Ok(PuzzleInput::Tap(parse_id(caps, "tile")?))
}

fn swipe_from_captures(caps: &Captures) -> Result<PuzzleInput, String> {
    let direction = match caps.name("direction").map(|m| m.as_str()) {
        Some("up") => Direction::Up,
        Some("down") => Direction::Down,
        Some("left") => Direction::Left,
        Some("right") => Direction::Right,
        other => return Err(format!("Unknown direction {other:?}")),
    };
    Ok(PuzzleInput::Swipe {
        tile_id: parse_id(caps, "tile")?,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_taps() {
        assert_eq!(parse_puzzle_input("tap 5\n"), Ok(PuzzleInput::Tap(5)));
        assert_eq!(parse_puzzle_input("  12 "), Ok(PuzzleInput::Tap(12)));
        assert_eq!(parse_puzzle_input("TAP 3"), Ok(PuzzleInput::Tap(3)));
    }

    #[test]
    fn test_parse_swipes() {
        assert_eq!(
            parse_puzzle_input("left 7"),
            Ok(PuzzleInput::Swipe {
                tile_id: 7,
                direction: Direction::Left
            })
        );
        assert_eq!(
            parse_puzzle_input("Up 1\n"),
            Ok(PuzzleInput::Swipe {
                tile_id: 1,
                direction: Direction::Up
            })
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_puzzle_input("slide 3").is_err());
        assert!(parse_puzzle_input("tap").is_err());
        assert!(parse_puzzle_input("tap 99999999999").is_err());
        assert!(parse_card_choice("flip").is_err());
        assert!(parse_card_choice("flip -1").is_err());
    }

    #[test]
    fn test_parse_card_choice() {
        assert_eq!(parse_card_choice("flip 4"), Ok(4));
        assert_eq!(parse_card_choice("0\n"), Ok(0));
    }

    #[test]
    fn test_render_board_hides_face_down_cards() {
        let board = [
            CardView {
                id: 0,
                face: Some("cat"),
                is_matched: true,
            },
            CardView {
                id: 1,
                face: Some("dog"),
                is_matched: false,
            },
            CardView {
                id: 2,
                face: None,
                is_matched: false,
            },
        ];
        assert_eq!(render_board(&board), "(cat) [dog] #2");
    }
}
