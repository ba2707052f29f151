use crate::ui;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use deployments::{
    DeploymentStore,
    record_deployment,
};
use std::{
    sync::Arc,
    time::Duration,
};
use tictactoe_client::{
    Game,
    Move,
    actions::{
        CallSigner,
        GameActions,
        HandoffError,
    },
    categorize,
    chain::ReadOnlyCaller,
    config::{
        AppConfig,
        ContractRef,
    },
    game::format_stx,
    hiro_client::HiroClient,
    intent::ContractCallRequest,
    reader::ChainStateReader,
    session::{
        FileSessionStore,
        NetworkAddresses,
        SESSION_KEY,
        SessionIdentity,
        SessionResolver,
        encode_session_blob,
    },
};
use tokio::{
    sync::mpsc,
    time::{
        self,
        Instant,
    },
};
use tracing::{
    info,
    warn,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Games,
    Watch {
        interval: Duration,
    },
    Create {
        bet_amount: u64,
        move_index: usize,
        mark: Move,
    },
    Join {
        game_id: u64,
        move_index: usize,
        mark: Move,
    },
    Play {
        game_id: u64,
        move_index: usize,
        mark: Option<Move>,
    },
    Session,
    Connect {
        identity_address: String,
        network_addresses: Option<NetworkAddresses>,
    },
    Disconnect,
    Contract {
        contract: ContractRef,
    },
}

/// Prints call requests as JSON for an external wallet to sign.
struct StdoutSigner;

impl CallSigner for StdoutSigner {
    fn hand_off(&mut self, request: &ContractCallRequest) -> Result<(), HandoffError> {
        println!("{}", serde_json::to_string_pretty(request)?);
        Ok(())
    }
}

struct App {
    config: AppConfig,
    reader: Arc<ChainStateReader<HiroClient>>,
    session: SessionResolver<FileSessionStore>,
}

impl App {
    fn new(config: AppConfig) -> Result<Self> {
        let hiro = HiroClient::new(&config.api_url)
            .wrap_err("failed to build HTTP client for the Stacks API")?;
        let reader = Arc::new(ChainStateReader::new(
            hiro,
            config.contract.clone(),
            config.network,
        ));
        let mut session = SessionResolver::new(
            FileSessionStore::new(config.session_dir.clone()),
            config.network,
        );
        session.load();
        Ok(Self {
            config,
            reader,
            session,
        })
    }

    fn viewer(&self) -> Option<String> {
        self.session.viewer_address()
    }

    fn print_listing(&self, games: &[Game]) {
        let viewer = self.viewer();
        let views = categorize(games, viewer.as_deref());
        print!("{}", ui::render_views(&views, viewer.is_some(), games.len()));
    }

    async fn games(&self) -> Result<()> {
        let games = self
            .reader
            .get_all_games_checked()
            .await
            .wrap_err("Error loading games; run `tictactoe games` again to retry")?;
        self.print_listing(&games);
        Ok(())
    }

    async fn watch(&self, interval: Duration) -> Result<()> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(snapshot_worker(
            interval,
            Arc::clone(&self.reader),
            cmd_rx,
            event_tx,
        ));
        let _ = cmd_tx.send(SnapshotWorkerCommand::FetchNow);

        loop {
            tokio::select! {
                maybe_event = event_rx.recv() => {
                    match maybe_event {
                        Some(SnapshotWorkerEvent::Loaded(games)) => {
                            println!("--- {} games ---", games.len());
                            self.print_listing(&games);
                        }
                        Some(SnapshotWorkerEvent::Unavailable(reason)) => {
                            println!("Error loading games: {reason} (retrying)");
                        }
                        None => {
                            warn!("snapshot worker channel closed");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    let _ = cmd_tx.send(SnapshotWorkerCommand::Shutdown);
                    break;
                }
            }
        }
        handle.await.wrap_err("snapshot worker panicked")?
    }

    async fn play(&self, game_id: u64, move_index: usize, mark: Option<Move>) -> Result<()> {
        let mark = match mark {
            Some(mark) => mark,
            None => {
                let game = self
                    .reader
                    .get_game(game_id)
                    .await?
                    .ok_or_else(|| eyre!("game {game_id} does not exist"))?;
                game.next_mark()
            }
        };
        let actions = GameActions::new(&self.config, &*self.reader, &self.session);
        actions.play(game_id, move_index, mark, &mut StdoutSigner)?;
        eprintln!("Sent play game request");
        Ok(())
    }

    async fn show_session(&self) -> Result<()> {
        let Some(identity) = self.session.identity() else {
            println!("Not connected. Use `tictactoe connect <address>`.");
            return Ok(());
        };
        let address = identity.resolve_address(self.config.network);
        println!("identity: {}", identity.identity_address);
        println!("{} address: {address}", self.config.network);
        match self.reader.caller().stx_balance(address).await {
            Ok(balance) => {
                let balance = u64::try_from(balance).map_or_else(
                    |_| format!("{balance} micro-STX"),
                    |micro| format!("{} STX", format_stx(micro)),
                );
                println!("balance: {balance}");
            }
            Err(err) => warn!(%err, "balance lookup failed"),
        }
        println!("explorer: {}", self.config.explorer_address_url(address));
        Ok(())
    }

    fn connect(
        &mut self,
        identity_address: String,
        network_addresses: Option<NetworkAddresses>,
    ) -> Result<()> {
        let identity = SessionIdentity {
            identity_address,
            decentralized_id: None,
            network_addresses,
        };
        identity
            .resolve_address(self.config.network)
            .parse::<clarity_codec::StandardPrincipal>()
            .wrap_err("session address is not a valid Stacks address")?;
        let blob = encode_session_blob(&identity)?;
        self.session.store().save(SESSION_KEY, &blob)?;
        self.session.load();
        info!("session connected");
        println!(
            "Connected as {}",
            self.viewer().unwrap_or_else(|| identity.identity_address.clone())
        );
        Ok(())
    }

    fn record_contract(&self, contract: ContractRef) -> Result<()> {
        let store = DeploymentStore::new(self.config.network.deployment_env())
            .map_err(|e| eyre!(e))?;
        let record = record_deployment(
            &store,
            &contract.address,
            &contract.name,
            Some(&self.config.api_url),
        )
        .map_err(|e| eyre!(e))?;
        println!(
            "Recorded {} for {} at {}",
            record.contract_identifier(),
            self.config.network,
            store.path().display()
        );
        Ok(())
    }
}

pub async fn run_app(config: AppConfig, command: Command) -> Result<()> {
    info!(network = %config.network, contract = %config.contract, "starting tictactoe client");
    let mut app = App::new(config)?;

    match command {
        Command::Games => app.games().await,
        Command::Watch { interval } => app.watch(interval).await,
        Command::Create {
            bet_amount,
            move_index,
            mark,
        } => {
            GameActions::new(&app.config, &*app.reader, &app.session).create_game(
                bet_amount,
                move_index,
                mark,
                &mut StdoutSigner,
            )?;
            eprintln!("Sent create game request");
            Ok(())
        }
        Command::Join {
            game_id,
            move_index,
            mark,
        } => {
            GameActions::new(&app.config, &*app.reader, &app.session).join_game(
                game_id,
                move_index,
                mark,
                &mut StdoutSigner,
            )?;
            eprintln!("Sent join game request");
            Ok(())
        }
        Command::Play {
            game_id,
            move_index,
            mark,
        } => app.play(game_id, move_index, mark).await,
        Command::Session => app.show_session().await,
        Command::Connect {
            identity_address,
            network_addresses,
        } => app.connect(identity_address, network_addresses),
        Command::Disconnect => {
            app.session.disconnect()?;
            println!("Disconnected");
            Ok(())
        }
        Command::Contract { contract } => app.record_contract(contract),
    }
}

enum SnapshotWorkerCommand {
    FetchNow,
    Shutdown,
}

#[derive(Debug)]
enum SnapshotWorkerEvent {
    Loaded(Vec<Game>),
    Unavailable(String),
}

async fn snapshot_worker<C>(
    poll_interval: Duration,
    reader: Arc<ChainStateReader<C>>,
    mut cmd_rx: mpsc::UnboundedReceiver<SnapshotWorkerCommand>,
    snapshot_tx: mpsc::UnboundedSender<SnapshotWorkerEvent>,
) -> Result<()>
where
    C: ReadOnlyCaller + 'static,
{
    async fn fetch_snapshot<C: ReadOnlyCaller>(
        reader: &ChainStateReader<C>,
        snapshot_tx: &mpsc::UnboundedSender<SnapshotWorkerEvent>,
    ) -> Result<()> {
        let event = match reader.refresh().await {
            Ok(games) => SnapshotWorkerEvent::Loaded(games),
            Err(err) => {
                warn!(%err, "game listing unavailable");
                SnapshotWorkerEvent::Unavailable(err.to_string())
            }
        };
        snapshot_tx
            .send(event)
            .map_err(|_| eyre!("snapshot receiver dropped"))
    }

    let mut ticker = time::interval_at(Instant::now() + poll_interval, poll_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if fetch_snapshot(&reader, &snapshot_tx).await.is_err() {
                    break;
                }
            }
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                match cmd {
                    SnapshotWorkerCommand::FetchNow => {
                        if fetch_snapshot(&reader, &snapshot_tx).await.is_err() {
                            break;
                        }
                    }
                    SnapshotWorkerCommand::Shutdown => break,
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use tictactoe_client::{
        config::Network,
        test_helpers::{
            FakeChain,
            address,
            open_game,
            test_contract,
        },
    };

    fn reader(chain: FakeChain) -> Arc<ChainStateReader<FakeChain>> {
        Arc::new(ChainStateReader::new(chain, test_contract(), Network::Testnet))
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_worker__polls_on_demand_and_on_interval() {
        // given
        let reader = reader(FakeChain::with_games([open_game(0, address(1))]));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(snapshot_worker(
            DEFAULT_POLL_INTERVAL,
            Arc::clone(&reader),
            cmd_rx,
            event_tx,
        ));

        // when
        cmd_tx.send(SnapshotWorkerCommand::FetchNow).unwrap();
        let first = event_rx.recv().await.unwrap();
        reader.caller().insert_game(&open_game(1, address(2)));
        let second = event_rx.recv().await.unwrap();
        cmd_tx.send(SnapshotWorkerCommand::Shutdown).unwrap();

        // then
        assert!(matches!(first, SnapshotWorkerEvent::Loaded(ref games) if games.len() == 1));
        assert!(matches!(second, SnapshotWorkerEvent::Loaded(ref games) if games.len() == 2));
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_worker__reports_unavailable_listing() {
        // given
        let chain = FakeChain::new();
        chain.fail_count(true);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(snapshot_worker(
            DEFAULT_POLL_INTERVAL,
            reader(chain),
            cmd_rx,
            event_tx,
        ));

        // when
        cmd_tx.send(SnapshotWorkerCommand::FetchNow).unwrap();
        let event = event_rx.recv().await.unwrap();
        drop(cmd_tx);

        // then
        assert!(matches!(event, SnapshotWorkerEvent::Unavailable(_)));
        handle.await.unwrap().unwrap();
    }
}
