//! Mapping between the contract's tagged tuples and [`Game`].

use crate::{
    chain::{
        ChainQueryError,
        GET_LATEST_GAME_ID,
    },
    game::{
        BOARD_CELLS,
        Board,
        EMPTY_BOARD,
        Game,
        Move,
    },
};
use clarity_codec::{
    ClarityValue,
    CodecError,
};
use std::collections::BTreeMap;
use thiserror::Error;

const PLAYER_ONE: &str = "player-one";
const PLAYER_TWO: &str = "player-two";
const IS_PLAYER_ONE_TURN: &str = "is-player-one-turn";
const BET_AMOUNT: &str = "bet-amount";
const BOARD: &str = "board";
const WINNER: &str = "winner";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected an optional game record, found {0}")]
    NotOptional(&'static str),
    #[error("expected a tuple payload, found {0}")]
    NotTuple(&'static str),
    #[error("game record is missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` should be {expected}, found {found}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("board has {0} cells")]
    BoardLength(usize),
    #[error("board cell {index} holds unknown mark {code}")]
    BoardCell { index: usize, code: u128 },
    #[error("bet amount {0} does not fit in 64 bits")]
    BetOverflow(u128),
}

/// Decodes a `get-game` response. `none` is a game that does not exist.
pub fn decode_game(id: u64, value: ClarityValue) -> Result<Option<Game>, DecodeError> {
    match value {
        ClarityValue::OptionalNone => Ok(None),
        ClarityValue::OptionalSome(payload) => match *payload {
            ClarityValue::Tuple(fields) => decode_fields(id, fields).map(Some),
            other => Err(DecodeError::NotTuple(other.type_name())),
        },
        other => Err(DecodeError::NotOptional(other.type_name())),
    }
}

fn decode_fields(
    id: u64,
    mut fields: BTreeMap<String, ClarityValue>,
) -> Result<Game, DecodeError> {
    let mut take = |name: &'static str| {
        fields.remove(name).ok_or(DecodeError::MissingField(name))
    };

    let player_one = principal(PLAYER_ONE, take(PLAYER_ONE)?)?;
    let player_two = optional_principal(PLAYER_TWO, take(PLAYER_TWO)?)?;
    let is_player_one_turn = match take(IS_PLAYER_ONE_TURN)? {
        ClarityValue::Bool(turn) => turn,
        other => return Err(mismatch(IS_PLAYER_ONE_TURN, "bool", &other)),
    };
    let bet_amount = match take(BET_AMOUNT)? {
        ClarityValue::UInt(amount) => {
            u64::try_from(amount).map_err(|_| DecodeError::BetOverflow(amount))?
        }
        other => return Err(mismatch(BET_AMOUNT, "uint", &other)),
    };
    let board = board(take(BOARD)?)?;
    let winner = optional_principal(WINNER, take(WINNER)?)?;

    Ok(Game {
        id,
        player_one,
        player_two,
        is_player_one_turn,
        bet_amount,
        board,
        winner,
    })
}

fn principal(field: &'static str, value: ClarityValue) -> Result<String, DecodeError> {
    match value {
        ClarityValue::Principal(principal) => Ok(principal.to_string()),
        other => Err(mismatch(field, "principal", &other)),
    }
}

fn optional_principal(
    field: &'static str,
    value: ClarityValue,
) -> Result<Option<String>, DecodeError> {
    match value {
        ClarityValue::OptionalNone => Ok(None),
        ClarityValue::OptionalSome(inner) => principal(field, *inner).map(Some),
        other => Err(mismatch(field, "optional principal", &other)),
    }
}

fn board(value: ClarityValue) -> Result<Board, DecodeError> {
    let cells = match value {
        ClarityValue::List(cells) => cells,
        other => return Err(mismatch(BOARD, "list", &other)),
    };
    if cells.len() != BOARD_CELLS {
        return Err(DecodeError::BoardLength(cells.len()));
    }
    let mut board = EMPTY_BOARD;
    for (index, cell) in cells.into_iter().enumerate() {
        board[index] = match cell {
            ClarityValue::UInt(code) => {
                Move::from_code(code).ok_or(DecodeError::BoardCell { index, code })?
            }
            other => return Err(mismatch(BOARD, "list of uint", &other)),
        };
    }
    Ok(board)
}

fn mismatch(
    field: &'static str,
    expected: &'static str,
    found: &ClarityValue,
) -> DecodeError {
    DecodeError::FieldType {
        field,
        expected,
        found: found.type_name(),
    }
}

/// Builds the `(some {...})` value the contract would return for `game`.
pub fn encode_game(game: &Game) -> Result<ClarityValue, CodecError> {
    let optional_principal = |address: &Option<String>| match address {
        Some(address) => ClarityValue::principal(address).map(ClarityValue::some),
        None => Ok(ClarityValue::OptionalNone),
    };
    let tuple = ClarityValue::tuple([
        (PLAYER_ONE, ClarityValue::principal(&game.player_one)?),
        (PLAYER_TWO, optional_principal(&game.player_two)?),
        (IS_PLAYER_ONE_TURN, ClarityValue::Bool(game.is_player_one_turn)),
        (BET_AMOUNT, ClarityValue::uint(game.bet_amount)),
        (
            BOARD,
            ClarityValue::List(
                game.board
                    .iter()
                    .map(|cell| ClarityValue::uint(cell.code()))
                    .collect(),
            ),
        ),
        (WINNER, optional_principal(&game.winner)?),
    ]);
    Ok(ClarityValue::some(tuple))
}

/// Decodes the `get-latest-game-id` result, a bare or `ok`-wrapped uint.
pub fn decode_count(value: ClarityValue) -> Result<u64, ChainQueryError> {
    let unexpected = |found: &ClarityValue| ChainQueryError::UnexpectedShape {
        function: GET_LATEST_GAME_ID,
        found: found.type_name(),
    };
    let count = match value {
        ClarityValue::UInt(count) => count,
        ClarityValue::ResponseOk(inner) => match *inner {
            ClarityValue::UInt(count) => count,
            other => return Err(unexpected(&other)),
        },
        other => return Err(unexpected(&other)),
    };
    u64::try_from(count).map_err(|_| ChainQueryError::UnexpectedShape {
        function: GET_LATEST_GAME_ID,
        found: "uint beyond u64",
    })
}
