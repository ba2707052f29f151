use crate::{
    config::{
        AppDetails,
        ContractRef,
        Network,
    },
    game::{
        BOARD_CELLS,
        Move,
    },
};
use clarity_codec::{
    ClarityValue,
    CodecError,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("invalid move: cell {0} is outside the board")]
    InvalidMove(usize),
    #[error("invalid bet: a new game needs a non-zero bet")]
    InvalidBet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ContractFunction {
    #[serde(rename = "create-game")]
    CreateGame,
    #[serde(rename = "join-game")]
    JoinGame,
    #[serde(rename = "play")]
    Play,
}

impl ContractFunction {
    pub fn name(self) -> &'static str {
        match self {
            ContractFunction::CreateGame => "create-game",
            ContractFunction::JoinGame => "join-game",
            ContractFunction::Play => "play",
        }
    }
}

impl fmt::Display for ContractFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unsigned description of a state-changing contract call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCallIntent {
    pub contract: ContractRef,
    pub function: ContractFunction,
    /// Positional: bet or game id, then cell index, then mark.
    pub arguments: Vec<ClarityValue>,
}

#[derive(Clone, Debug)]
pub struct IntentBuilder {
    contract: ContractRef,
}

impl IntentBuilder {
    pub fn new(contract: ContractRef) -> Self {
        Self { contract }
    }

    pub fn build_create(
        &self,
        bet_amount: u64,
        move_index: usize,
        mark: Move,
    ) -> Result<ContractCallIntent, IntentError> {
        check_move_index(move_index)?;
        if bet_amount == 0 {
            return Err(IntentError::InvalidBet);
        }
        Ok(self.intent(ContractFunction::CreateGame, bet_amount, move_index, mark))
    }

    pub fn build_join(
        &self,
        game_id: u64,
        move_index: usize,
        mark: Move,
    ) -> Result<ContractCallIntent, IntentError> {
        check_move_index(move_index)?;
        Ok(self.intent(ContractFunction::JoinGame, game_id, move_index, mark))
    }

    pub fn build_play(
        &self,
        game_id: u64,
        move_index: usize,
        mark: Move,
    ) -> Result<ContractCallIntent, IntentError> {
        check_move_index(move_index)?;
        Ok(self.intent(ContractFunction::Play, game_id, move_index, mark))
    }

    fn intent(
        &self,
        function: ContractFunction,
        lead: u64,
        move_index: usize,
        mark: Move,
    ) -> ContractCallIntent {
        ContractCallIntent {
            contract: self.contract.clone(),
            function,
            arguments: vec![
                ClarityValue::uint(lead),
                ClarityValue::UInt(move_index as u128),
                ClarityValue::uint(mark.code()),
            ],
        }
    }
}

fn check_move_index(move_index: usize) -> Result<(), IntentError> {
    if move_index < BOARD_CELLS {
        Ok(())
    } else {
        Err(IntentError::InvalidMove(move_index))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostConditionMode {
    #[default]
    Allow,
}

/// What the external signer receives: the intent in wire form plus the
/// app details shown in its prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCallRequest {
    pub contract_address: String,
    pub contract_name: String,
    pub function_name: ContractFunction,
    /// Hex-encoded consensus-serialized arguments.
    pub function_args: Vec<String>,
    pub app_details: AppDetails,
    pub post_condition_mode: PostConditionMode,
    pub network: Network,
}

impl ContractCallRequest {
    pub fn new(
        intent: &ContractCallIntent,
        app_details: AppDetails,
        network: Network,
    ) -> Result<Self, CodecError> {
        let function_args = intent
            .arguments
            .iter()
            .map(ClarityValue::to_hex)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            contract_address: intent.contract.address.clone(),
            contract_name: intent.contract.name.clone(),
            function_name: intent.function,
            function_args,
            app_details,
            post_condition_mode: PostConditionMode::Allow,
            network,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_helpers::{
        test_config,
        test_contract,
    };

    fn builder() -> IntentBuilder {
        IntentBuilder::new(test_contract())
    }

    #[test]
    fn build_create__rejects_zero_bet() {
        assert_eq!(
            builder().build_create(0, 4, Move::X),
            Err(IntentError::InvalidBet)
        );
    }

    #[test]
    fn build_join__rejects_cell_outside_board() {
        assert_eq!(
            builder().build_join(3, 9, Move::O),
            Err(IntentError::InvalidMove(9))
        );
    }

    #[test]
    fn build_create__checks_move_before_bet() {
        assert_eq!(
            builder().build_create(0, 12, Move::X),
            Err(IntentError::InvalidMove(12))
        );
    }

    #[test]
    fn build_play__encodes_positional_uint_arguments() {
        // when
        let intent = builder().build_play(3, 4, Move::X).unwrap();

        // then
        assert_eq!(intent.function.name(), "play");
        assert_eq!(intent.contract, test_contract());
        assert_eq!(
            intent.arguments,
            vec![
                ClarityValue::uint(3u8),
                ClarityValue::uint(4u8),
                ClarityValue::uint(1u8),
            ]
        );
    }

    #[test]
    fn build_create__leads_with_bet_amount() {
        let intent = builder().build_create(2_500_000, 0, Move::O).unwrap();
        assert_eq!(intent.function, ContractFunction::CreateGame);
        assert_eq!(intent.arguments[0], ClarityValue::uint(2_500_000u64));
        assert_eq!(intent.arguments[2], ClarityValue::uint(2u8));
    }

    #[test]
    fn contract_call_request__serializes_for_signer() {
        // given
        let config = test_config();
        let intent = builder().build_join(7, 8, Move::O).unwrap();

        // when
        let request =
            ContractCallRequest::new(&intent, config.app.clone(), config.network).unwrap();
        let json = serde_json::to_value(&request).unwrap();

        // then
        assert_eq!(json["functionName"], "join-game");
        assert_eq!(json["postConditionMode"], "allow");
        assert_eq!(json["network"], "testnet");
        assert_eq!(json["appDetails"]["name"], config.app.name);
        assert_eq!(
            json["functionArgs"][0],
            "0x0100000000000000000000000000000007"
        );
        assert_eq!(json["contractName"], "tic-tac-toe");
    }
}
