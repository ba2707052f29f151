use crate::{
    cache::ExpiringCache,
    chain::{
        ChainQueryError,
        GET_GAME,
        GET_LATEST_GAME_ID,
        ReadOnlyCall,
        ReadOnlyCaller,
    },
    config::{
        ContractRef,
        Network,
    },
    decode::{
        decode_count,
        decode_game,
    },
    game::Game,
};
use clarity_codec::ClarityValue;
use futures::future::join_all;
use std::time::Duration;
use tracing::{
    debug,
    error,
    info,
    warn,
};

pub const BATCH_SIZE: u64 = 3;
pub const BATCH_PAUSE: Duration = Duration::from_secs(2);
pub const CACHE_TTL: Duration = Duration::from_secs(30);

const ALL_GAMES_KEY: &str = "all-games";

fn game_key(id: u64) -> String {
    format!("game-{id}")
}

#[derive(Clone, Debug)]
enum CacheSlot {
    Game(Option<Game>),
    Games(Vec<Game>),
}

/// Read model over the game contract.
///
/// Owns the only cache of chain state. Every cached value lives for
/// [`CACHE_TTL`]; callers that just mutated the chain should use
/// [`ChainStateReader::refresh`] to see their own writes.
pub struct ChainStateReader<C> {
    caller: C,
    contract: ContractRef,
    network: Network,
    cache: ExpiringCache<CacheSlot>,
}

impl<C: ReadOnlyCaller> ChainStateReader<C> {
    pub fn new(caller: C, contract: ContractRef, network: Network) -> Self {
        Self {
            caller,
            contract,
            network,
            cache: ExpiringCache::new(),
        }
    }

    pub fn caller(&self) -> &C {
        &self.caller
    }

    pub async fn get_latest_game_count(&self) -> Result<u64, ChainQueryError> {
        let value = self.call(GET_LATEST_GAME_ID, Vec::new()).await?;
        decode_count(value)
    }

    /// `Ok(None)` covers both a missing game and a record that fails to
    /// decode. Only collaborator failures are errors, and those are not cached.
    pub async fn get_game(&self, id: u64) -> Result<Option<Game>, ChainQueryError> {
        let key = game_key(id);
        if let Some(CacheSlot::Game(cached)) = self.cache.get(&key) {
            debug!(id, "game cache hit");
            return Ok(cached);
        }

        let value = self.call(GET_GAME, vec![ClarityValue::uint(id)]).await?;
        let game = decode_game(id, value).unwrap_or_else(|err| {
            warn!(id, %err, "treating undecodable game record as absent");
            None
        });
        self.cache.set(key, CacheSlot::Game(game.clone()), CACHE_TTL);
        Ok(game)
    }

    /// Every game that could be fetched, in ascending id order.
    ///
    /// Only a failed count query is an error. Individual games that fail are
    /// left out of the listing.
    pub async fn get_all_games_checked(&self) -> Result<Vec<Game>, ChainQueryError> {
        if let Some(CacheSlot::Games(games)) = self.cache.get(ALL_GAMES_KEY) {
            debug!(count = games.len(), "game list cache hit");
            return Ok(games);
        }

        let count = self.get_latest_game_count().await?;
        info!(count, "fetching games");

        let mut games = Vec::new();
        let mut start = 0;
        while start < count {
            if start > 0 {
                tokio::time::sleep(BATCH_PAUSE).await;
            }
            let end = count.min(start + BATCH_SIZE);
            let results = join_all((start..end).map(|id| self.get_game(id))).await;
            for (id, result) in (start..end).zip(results) {
                match result {
                    Ok(Some(game)) => games.push(game),
                    Ok(None) => debug!(id, "game does not exist"),
                    Err(err) => warn!(id, %err, "dropping game from listing"),
                }
            }
            start = end;
        }

        info!(fetched = games.len(), count, "fetched games");
        self.cache
            .set(ALL_GAMES_KEY, CacheSlot::Games(games.clone()), CACHE_TTL);
        Ok(games)
    }

    /// Like [`Self::get_all_games_checked`] but degrades a failed count
    /// query to an empty listing.
    pub async fn get_all_games(&self) -> Vec<Game> {
        match self.get_all_games_checked().await {
            Ok(games) => games,
            Err(err) => {
                error!(%err, "failed to fetch game count");
                Vec::new()
            }
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub async fn refresh(&self) -> Result<Vec<Game>, ChainQueryError> {
        self.clear_cache();
        self.get_all_games_checked().await
    }

    async fn call(
        &self,
        function_name: &'static str,
        arguments: Vec<ClarityValue>,
    ) -> Result<ClarityValue, ChainQueryError> {
        let call = ReadOnlyCall {
            contract: self.contract.clone(),
            function_name,
            arguments,
            sender: self.contract.address.clone(),
            network: self.network,
        };
        self.caller.call_read_only(call).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_helpers::{
        FakeChain,
        address,
        ended_game,
        in_progress_game,
        open_game,
        test_contract,
    };

    fn reader(chain: FakeChain) -> ChainStateReader<FakeChain> {
        ChainStateReader::new(chain, test_contract(), Network::Testnet)
    }

    fn seven_games() -> Vec<Game> {
        (0..7).map(|id| open_game(id, address(1))).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn get_all_games__fetches_in_batches_of_three_with_pauses_between() {
        // given
        let reader = reader(FakeChain::with_games(seven_games()));

        // when
        let games = reader.get_all_games().await;

        // then
        assert_eq!(games.len(), 7);
        let calls = reader.caller().game_calls();
        let at = |secs| {
            calls
                .iter()
                .filter(|call| call.at == Duration::from_secs(secs))
                .filter_map(|call| call.game_id())
                .collect::<Vec<_>>()
        };
        assert_eq!(calls.len(), 7);
        assert_eq!(at(0), vec![0, 1, 2]);
        assert_eq!(at(2), vec![3, 4, 5]);
        assert_eq!(at(4), vec![6]);
    }

    #[tokio::test(start_paused = true)]
    async fn get_all_games__does_not_pause_after_last_batch() {
        // given
        let reader = reader(FakeChain::with_games(seven_games()));
        let started = tokio::time::Instant::now();

        // when
        reader.get_all_games().await;

        // then
        assert_eq!(started.elapsed(), 2 * BATCH_PAUSE);
    }

    #[tokio::test(start_paused = true)]
    async fn get_all_games__omits_failed_game_without_failing() {
        // given
        let chain = FakeChain::with_games(seven_games());
        chain.fail_game(4);
        let reader = reader(chain);

        // when
        let games = reader.get_all_games().await;

        // then
        let ids: Vec<_> = games.iter().map(|game| game.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 5, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn get_all_games__degrades_to_empty_when_count_fails() {
        // given
        let chain = FakeChain::with_games(seven_games());
        chain.fail_count(true);
        let reader = reader(chain);

        // when
        let degraded = reader.get_all_games().await;
        let checked = reader.get_all_games_checked().await;

        // then
        assert!(degraded.is_empty());
        assert!(matches!(checked, Err(ChainQueryError::Status { status: 503, .. })));
        assert!(reader.caller().game_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn get_all_games__serves_listing_from_cache_within_ttl() {
        // given
        let reader = reader(FakeChain::with_games(seven_games()));
        reader.get_all_games().await;
        reader.caller().insert_game(&open_game(7, address(2)));

        // when
        tokio::time::advance(CACHE_TTL - 2 * BATCH_PAUSE).await;
        let cached = reader.get_all_games().await;

        // then
        assert_eq!(cached.len(), 7);
        assert_eq!(reader.caller().count_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh__clears_cache_and_sees_new_games() {
        // given
        let reader = reader(FakeChain::with_games(seven_games()));
        reader.get_all_games().await;
        reader.caller().insert_game(&open_game(7, address(2)));

        // when
        let refreshed = reader.refresh().await.unwrap();

        // then
        assert_eq!(refreshed.len(), 8);
        assert_eq!(reader.caller().count_calls(), 2);
        assert_eq!(reader.caller().game_calls().len(), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn get_game__caches_absent_game() {
        // given
        let reader = reader(FakeChain::new());

        // when
        let first = reader.get_game(3).await.unwrap();
        let second = reader.get_game(3).await.unwrap();

        // then
        assert_eq!(first, None);
        assert_eq!(second, None);
        assert_eq!(reader.caller().game_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn get_game__requeries_after_ttl() {
        // given
        let reader = reader(FakeChain::new());
        reader.get_game(3).await.unwrap();
        reader
            .caller()
            .insert_game(&in_progress_game(3, address(1), address(2)));

        // when
        tokio::time::advance(CACHE_TTL + Duration::from_millis(1)).await;
        let game = reader.get_game(3).await.unwrap();

        // then
        assert_eq!(game.map(|g| g.player_two), Some(Some(address(2))));
        assert_eq!(reader.caller().game_calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn get_game__does_not_cache_failures() {
        // given
        let chain = FakeChain::with_games([ended_game(
            0,
            address(1),
            address(2),
            address(1),
        )]);
        chain.fail_game(0);
        let reader = reader(chain);

        // when
        let failed = reader.get_game(0).await;
        reader.caller().heal_game(0);
        let recovered = reader.get_game(0).await.unwrap();

        // then
        assert!(failed.is_err());
        assert_eq!(recovered.and_then(|g| g.winner), Some(address(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn get_game__treats_malformed_record_as_absent_and_caches_it() {
        // given
        let chain = FakeChain::new();
        chain.set_raw_game(1, ClarityValue::some(ClarityValue::Bool(true)));
        let reader = reader(chain);

        // when
        let first = reader.get_game(1).await.unwrap();
        let second = reader.get_game(1).await.unwrap();

        // then
        assert_eq!(first, None);
        assert_eq!(second, None);
        assert_eq!(reader.caller().game_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn calls__use_contract_address_as_sender() {
        let reader = reader(FakeChain::new());
        reader.get_latest_game_count().await.unwrap();
        let calls = reader.caller().calls();
        assert_eq!(calls[0].sender, test_contract().address);
    }
}
