use serde::Serialize;
use std::{
    fmt,
    str::FromStr,
};

pub const BOARD_CELLS: usize = 9;
pub const MICRO_STX_PER_STX: u64 = 1_000_000;

/// A board cell, and the mark a player places. `Empty` is only ever a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Move {
    #[default]
    Empty,
    X,
    O,
}

impl Move {
    pub fn code(self) -> u8 {
        match self {
            Move::Empty => 0,
            Move::X => 1,
            Move::O => 2,
        }
    }

    pub fn from_code(code: u128) -> Option<Self> {
        match code {
            0 => Some(Move::Empty),
            1 => Some(Move::X),
            2 => Some(Move::O),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Move::Empty => '·',
            Move::X => 'X',
            Move::O => 'O',
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Move {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" | "X" => Ok(Move::X),
            "o" | "O" => Ok(Move::O),
            other => Err(format!("unknown mark {other:?}; expected X or O")),
        }
    }
}

pub type Board = [Move; BOARD_CELLS];

pub const EMPTY_BOARD: Board = [Move::Empty; BOARD_CELLS];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Open,
    InProgress,
    Ended,
}

/// Snapshot of one on-chain game. Identity is `id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Game {
    pub id: u64,
    pub player_one: String,
    pub player_two: Option<String>,
    pub is_player_one_turn: bool,
    /// micro-STX staked by each player
    pub bet_amount: u64,
    pub board: Board,
    pub winner: Option<String>,
}

impl Game {
    pub fn status(&self) -> GameStatus {
        match (&self.winner, &self.player_two) {
            (Some(_), _) => GameStatus::Ended,
            (None, Some(_)) => GameStatus::InProgress,
            (None, None) => GameStatus::Open,
        }
    }

    pub fn has_player(&self, address: &str) -> bool {
        self.player_one == address || self.player_two.as_deref() == Some(address)
    }

    pub fn next_mark(&self) -> Move {
        if self.is_player_one_turn {
            Move::X
        } else {
            Move::O
        }
    }

    /// Side that won an ended game.
    ///
    /// The contract does not store the winning mark. Once a winner is set the
    /// turn flag is left pointing at the side that did *not* make the last
    /// move, so the winner is the opposite of `next_mark`. This couples two
    /// unrelated fields and breaks if the contract ever flips the turn flag
    /// differently on the winning move.
    pub fn winning_mark(&self) -> Option<Move> {
        self.winner.as_ref()?;
        Some(if self.is_player_one_turn {
            Move::O
        } else {
            Move::X
        })
    }
}

pub fn format_stx(micro_stx: u64) -> String {
    let whole = micro_stx / MICRO_STX_PER_STX;
    let fraction = micro_stx % MICRO_STX_PER_STX;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{fraction:06}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn game(player_two: Option<&str>, winner: Option<&str>, turn: bool) -> Game {
        Game {
            id: 0,
            player_one: "A".to_string(),
            player_two: player_two.map(str::to_string),
            is_player_one_turn: turn,
            bet_amount: 100,
            board: EMPTY_BOARD,
            winner: winner.map(str::to_string),
        }
    }

    #[test]
    fn status__follows_player_two_and_winner_presence() {
        assert_eq!(game(None, None, true).status(), GameStatus::Open);
        assert_eq!(game(Some("B"), None, true).status(), GameStatus::InProgress);
        assert_eq!(game(Some("B"), Some("A"), true).status(), GameStatus::Ended);
    }

    #[test]
    fn winning_mark__is_opposite_of_turn_flag() {
        // player one (X) made the winning move, flag now says player two is next
        assert_eq!(game(Some("B"), Some("A"), false).winning_mark(), Some(Move::X));
        assert_eq!(game(Some("B"), Some("B"), true).winning_mark(), Some(Move::O));
        assert_eq!(game(Some("B"), None, true).winning_mark(), None);
    }

    #[test]
    fn has_player__matches_either_seat() {
        let g = game(Some("B"), None, true);
        assert!(g.has_player("A"));
        assert!(g.has_player("B"));
        assert!(!g.has_player("C"));
    }

    #[test]
    fn format_stx__trims_fractional_zeros() {
        assert_eq!(format_stx(0), "0");
        assert_eq!(format_stx(2_000_000), "2");
        assert_eq!(format_stx(1_500_000), "1.5");
        assert_eq!(format_stx(1), "0.000001");
    }

    #[test]
    fn move__parses_either_case_and_rejects_empty() {
        assert_eq!("x".parse::<Move>(), Ok(Move::X));
        assert_eq!("O".parse::<Move>(), Ok(Move::O));
        assert!("".parse::<Move>().is_err());
        assert_eq!(Move::from_code(3), None);
    }
}
