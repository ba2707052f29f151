use crate::{
    actions::{
        CallSigner,
        HandoffError,
    },
    chain::{
        ChainQueryError,
        GET_GAME,
        GET_LATEST_GAME_ID,
        ReadOnlyCall,
        ReadOnlyCaller,
    },
    config::{
        AppConfig,
        ConfigOverrides,
        ContractRef,
    },
    decode::encode_game,
    game::{
        EMPTY_BOARD,
        Game,
    },
    intent::ContractCallRequest,
};
use clarity_codec::{
    ClarityValue,
    StandardPrincipal,
};
use std::{
    collections::{
        BTreeMap,
        HashSet,
    },
    sync::{
        Mutex,
        MutexGuard,
    },
    time::Duration,
};
use tokio::time::Instant;

pub const TEST_BET: u64 = 1_000_000;

/// Deterministic testnet address whose hash160 is twenty copies of `n`.
pub fn address(n: u8) -> String {
    StandardPrincipal::new(26, [n; 20]).unwrap().to_string()
}

pub fn test_contract() -> ContractRef {
    ContractRef::new(address(200), "tic-tac-toe").unwrap()
}

pub fn test_config() -> AppConfig {
    let overrides = ConfigOverrides {
        contract: Some(test_contract()),
        session_dir: Some("/tmp/tictactoe-test-session".to_string()),
        ..Default::default()
    };
    AppConfig::resolve(overrides, |_| None, |_| None).unwrap()
}

pub fn open_game(id: u64, player_one: String) -> Game {
    Game {
        id,
        player_one,
        player_two: None,
        is_player_one_turn: false,
        bet_amount: TEST_BET,
        board: EMPTY_BOARD,
        winner: None,
    }
}

pub fn in_progress_game(id: u64, player_one: String, player_two: String) -> Game {
    Game {
        player_two: Some(player_two),
        is_player_one_turn: true,
        ..open_game(id, player_one)
    }
}

pub fn ended_game(
    id: u64,
    player_one: String,
    player_two: String,
    winner: String,
) -> Game {
    let is_player_one_turn = winner != player_one;
    Game {
        winner: Some(winner),
        is_player_one_turn,
        ..in_progress_game(id, player_one, player_two)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub function_name: &'static str,
    pub arguments: Vec<ClarityValue>,
    pub sender: String,
    /// Time since the fake was created, on the tokio clock.
    pub at: Duration,
}

impl RecordedCall {
    pub fn game_id(&self) -> Option<u64> {
        match self.arguments.first() {
            Some(ClarityValue::UInt(id)) => u64::try_from(*id).ok(),
            _ => None,
        }
    }
}

#[derive(Default)]
struct FakeChainState {
    responses: BTreeMap<u64, ClarityValue>,
    count: Option<u64>,
    count_fails: bool,
    failing_games: HashSet<u64>,
    calls: Vec<RecordedCall>,
}

/// Scripted chain that answers `get-latest-game-id` and `get-game` from
/// memory and records every call it receives.
pub struct FakeChain {
    started: Instant,
    state: Mutex<FakeChainState>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            state: Mutex::new(FakeChainState::default()),
        }
    }

    pub fn with_games(games: impl IntoIterator<Item = Game>) -> Self {
        let chain = Self::new();
        for game in games {
            chain.insert_game(&game);
        }
        chain
    }

    pub fn insert_game(&self, game: &Game) {
        let value = encode_game(game).unwrap();
        self.state().responses.insert(game.id, value);
    }

    /// Answers `get-game(id)` with `value` verbatim.
    pub fn set_raw_game(&self, id: u64, value: ClarityValue) {
        self.state().responses.insert(id, value);
    }

    /// Overrides the reported count, which otherwise is one past the
    /// highest scripted id.
    pub fn set_count(&self, count: u64) {
        self.state().count = Some(count);
    }

    pub fn fail_count(&self, fails: bool) {
        self.state().count_fails = fails;
    }

    pub fn fail_game(&self, id: u64) {
        self.state().failing_games.insert(id);
    }

    pub fn heal_game(&self, id: u64) {
        self.state().failing_games.remove(&id);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    pub fn game_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.function_name == GET_GAME)
            .collect()
    }

    pub fn count_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.function_name == GET_LATEST_GAME_ID)
            .count()
    }

    fn state(&self) -> MutexGuard<'_, FakeChainState> {
        self.state.lock().unwrap()
    }

    fn answer(&self, call: ReadOnlyCall) -> Result<ClarityValue, ChainQueryError> {
        let mut state = self.state();
        let recorded = RecordedCall {
            function_name: call.function_name,
            arguments: call.arguments,
            sender: call.sender,
            at: self.started.elapsed(),
        };
        let game_id = recorded.game_id();
        state.calls.push(recorded);

        match call.function_name {
            GET_LATEST_GAME_ID if state.count_fails => Err(ChainQueryError::Status {
                status: 503,
                body: "count unavailable".to_string(),
            }),
            GET_LATEST_GAME_ID => {
                let count = state.count.unwrap_or_else(|| {
                    state.responses.keys().next_back().map_or(0, |id| id + 1)
                });
                Ok(ClarityValue::uint(count))
            }
            GET_GAME => {
                let id = game_id.ok_or_else(|| ChainQueryError::Rejected {
                    cause: "get-game expects a uint id".to_string(),
                })?;
                if state.failing_games.contains(&id) {
                    return Err(ChainQueryError::Status {
                        status: 429,
                        body: format!("rate limited on game {id}"),
                    });
                }
                Ok(state
                    .responses
                    .get(&id)
                    .cloned()
                    .unwrap_or(ClarityValue::OptionalNone))
            }
            other => Err(ChainQueryError::Rejected {
                cause: format!("unknown function {other}"),
            }),
        }
    }
}

impl ReadOnlyCaller for FakeChain {
    async fn call_read_only(
        &self,
        call: ReadOnlyCall,
    ) -> Result<ClarityValue, ChainQueryError> {
        let answer = self.answer(call);
        tokio::task::yield_now().await;
        answer
    }
}

/// Signer that keeps every request it is handed.
#[derive(Debug, Default)]
pub struct RecordingSigner {
    pub requests: Vec<ContractCallRequest>,
}

impl CallSigner for RecordingSigner {
    fn hand_off(&mut self, request: &ContractCallRequest) -> Result<(), HandoffError> {
        self.requests.push(request.clone());
        Ok(())
    }
}
