use crate::{
    chain::ReadOnlyCaller,
    config::{
        AppConfig,
        AppDetails,
        Network,
    },
    game::Move,
    intent::{
        ContractCallIntent,
        ContractCallRequest,
        IntentBuilder,
        IntentError,
    },
    reader::ChainStateReader,
    session::{
        SessionResolver,
        SessionStore,
    },
};
use clarity_codec::CodecError;
use std::error::Error as StdError;
use thiserror::Error;
use tracing::info;

pub type HandoffError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("user not connected")]
    NotConnected,
    #[error(transparent)]
    Intent(#[from] IntentError),
    #[error("could not encode call arguments: {0}")]
    Codec(#[from] CodecError),
    #[error("signer handoff failed: {0}")]
    Handoff(#[source] HandoffError),
}

/// Receives call requests for signing and broadcast.
pub trait CallSigner {
    fn hand_off(&mut self, request: &ContractCallRequest) -> Result<(), HandoffError>;
}

/// Create, join and play on behalf of the connected identity.
pub struct GameActions<'a, C, S> {
    reader: &'a ChainStateReader<C>,
    session: &'a SessionResolver<S>,
    builder: IntentBuilder,
    app: AppDetails,
    network: Network,
}

impl<'a, C: ReadOnlyCaller, S: SessionStore> GameActions<'a, C, S> {
    pub fn new(
        config: &AppConfig,
        reader: &'a ChainStateReader<C>,
        session: &'a SessionResolver<S>,
    ) -> Self {
        Self {
            reader,
            session,
            builder: IntentBuilder::new(config.contract.clone()),
            app: config.app.clone(),
            network: config.network,
        }
    }

    pub fn create_game(
        &self,
        bet_amount: u64,
        move_index: usize,
        mark: Move,
        signer: &mut impl CallSigner,
    ) -> Result<ContractCallRequest, ActionError> {
        let intent = self.builder.build_create(bet_amount, move_index, mark)?;
        self.submit(intent, signer)
    }

    pub fn join_game(
        &self,
        game_id: u64,
        move_index: usize,
        mark: Move,
        signer: &mut impl CallSigner,
    ) -> Result<ContractCallRequest, ActionError> {
        let intent = self.builder.build_join(game_id, move_index, mark)?;
        self.submit(intent, signer)
    }

    pub fn play(
        &self,
        game_id: u64,
        move_index: usize,
        mark: Move,
        signer: &mut impl CallSigner,
    ) -> Result<ContractCallRequest, ActionError> {
        let intent = self.builder.build_play(game_id, move_index, mark)?;
        self.submit(intent, signer)
    }

    fn submit(
        &self,
        intent: ContractCallIntent,
        signer: &mut impl CallSigner,
    ) -> Result<ContractCallRequest, ActionError> {
        let sender = self
            .session
            .viewer_address()
            .ok_or(ActionError::NotConnected)?;
        let request = ContractCallRequest::new(&intent, self.app.clone(), self.network)?;
        signer.hand_off(&request).map_err(ActionError::Handoff)?;
        info!(%sender, function = %intent.function, "handed call to signer");
        // the listing is stale once the call lands
        self.reader.clear_cache();
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        intent::ContractFunction,
        session::{
            InMemorySessionStore,
            SESSION_KEY,
        },
        test_helpers::{
            FakeChain,
            RecordingSigner,
            address,
            open_game,
            test_config,
        },
    };

    fn connected_session(config: &AppConfig) -> SessionResolver<InMemorySessionStore> {
        let store = InMemorySessionStore::new();
        store.insert(
            SESSION_KEY,
            format!(r#"{{"userData": {{"identityAddress": "{}"}}}}"#, address(1)),
        );
        let mut session = SessionResolver::new(store, config.network);
        session.load();
        session
    }

    fn reader(config: &AppConfig) -> ChainStateReader<FakeChain> {
        ChainStateReader::new(
            FakeChain::with_games([open_game(0, address(2))]),
            config.contract.clone(),
            config.network,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn play__hands_off_request_and_clears_cache() {
        // given
        let config = test_config();
        let reader = reader(&config);
        let session = connected_session(&config);
        let mut signer = RecordingSigner::default();
        reader.get_all_games().await;
        reader.caller().insert_game(&open_game(1, address(3)));

        // when
        let actions = GameActions::new(&config, &reader, &session);
        let request = actions.play(0, 4, Move::X, &mut signer).unwrap();
        let after = reader.get_all_games().await;

        // then
        assert_eq!(request.function_name, ContractFunction::Play);
        assert_eq!(signer.requests, vec![request]);
        assert_eq!(after.len(), 2);
    }

    #[test]
    fn create_game__refuses_without_session() {
        // given
        let config = test_config();
        let reader = ChainStateReader::new(
            FakeChain::new(),
            config.contract.clone(),
            config.network,
        );
        let session = SessionResolver::new(InMemorySessionStore::new(), config.network);
        let mut signer = RecordingSigner::default();

        // when
        let result = GameActions::new(&config, &reader, &session).create_game(
            1_000_000,
            0,
            Move::X,
            &mut signer,
        );

        // then
        assert!(matches!(result, Err(ActionError::NotConnected)));
        assert!(signer.requests.is_empty());
    }

    #[test]
    fn join_game__reports_invalid_move_before_anything_else() {
        let config = test_config();
        let reader = ChainStateReader::new(
            FakeChain::new(),
            config.contract.clone(),
            config.network,
        );
        let session = connected_session(&config);
        let mut signer = RecordingSigner::default();

        let result =
            GameActions::new(&config, &reader, &session).join_game(0, 9, Move::O, &mut signer);

        assert!(matches!(
            result,
            Err(ActionError::Intent(IntentError::InvalidMove(9)))
        ));
        assert!(signer.requests.is_empty());
    }
}
