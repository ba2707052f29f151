use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    fmt::Display,
    path::Path,
    str::FromStr,
    time::Duration,
};
use tictactoe_client::{
    Move,
    config::{
        AppConfig,
        ConfigOverrides,
        ContractRef,
        Network,
    },
    session::NetworkAddresses,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod ui;

const DEFAULT_LOG_DIR: &str = "~/.tictactoe/logs";
const ENV_LOG_DIR: &str = "TICTACTOE_LOG_DIR";

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: tictactoe [--testnet | --mainnet] [--api-url <url>] [--contract <address.name>]\n\
         [--session-dir <path>] <command> [args]\n\
         \n\
         Commands:\n\
           games                            List active, joinable and ended games\n\
           watch [--interval <secs>]        Re-list games every interval (default {}s) until Ctrl-C\n\
           create <bet> <cell> [x|o]        Request a new game staking <bet> micro-STX (mark defaults to X)\n\
           join <game-id> <cell> [x|o]      Request to take the second seat (mark defaults to O)\n\
           play <game-id> <cell> [x|o]      Request a move (mark defaults to the side whose turn it is)\n\
           session                          Show the connected identity and its balance\n\
           connect <address> [--testnet-address <a>] [--mainnet-address <a>]\n\
                                            Store a wallet session\n\
           disconnect                       Forget the stored session\n\
           contract <address.name>          Record the game contract for the selected network\n\
         \n\
         Call requests are printed as JSON for an external wallet to sign and broadcast.\n\
         Cells are numbered 0-8, row by row.",
        client::DEFAULT_POLL_INTERVAL.as_secs(),
    );
    std::process::exit(0);
}

struct Cli {
    overrides: ConfigOverrides,
    command: client::Command,
}

fn parse_value<T>(value: Option<String>, what: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let value = value.ok_or_else(|| eyre!("missing {what}"))?;
    value
        .parse()
        .map_err(|err| eyre!("invalid {what} {value:?}: {err}"))
}

fn parse_mark(value: Option<String>) -> Result<Option<Move>> {
    value
        .map(|raw| raw.parse::<Move>().map_err(|err| eyre!(err)))
        .transpose()
}

fn parse_command(name: &str, args: Vec<String>) -> Result<client::Command> {
    let mut args = args.into_iter();
    let command = match name {
        "games" => client::Command::Games,
        "watch" => {
            let mut interval = client::DEFAULT_POLL_INTERVAL;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--interval" => {
                        let secs: u64 = parse_value(args.next(), "interval")?;
                        if secs == 0 {
                            return Err(eyre!("--interval must be at least one second"));
                        }
                        interval = Duration::from_secs(secs);
                    }
                    other => return Err(eyre!("Unknown argument for watch: {other}")),
                }
            }
            client::Command::Watch { interval }
        }
        "create" => client::Command::Create {
            bet_amount: parse_value(args.next(), "bet amount")?,
            move_index: parse_value(args.next(), "cell")?,
            mark: parse_mark(args.next())?.unwrap_or(Move::X),
        },
        "join" => client::Command::Join {
            game_id: parse_value(args.next(), "game id")?,
            move_index: parse_value(args.next(), "cell")?,
            mark: parse_mark(args.next())?.unwrap_or(Move::O),
        },
        "play" => client::Command::Play {
            game_id: parse_value(args.next(), "game id")?,
            move_index: parse_value(args.next(), "cell")?,
            mark: parse_mark(args.next())?,
        },
        "session" => client::Command::Session,
        "disconnect" => client::Command::Disconnect,
        "connect" => {
            let identity_address: String = parse_value(args.next(), "address")?;
            let mut testnet: Option<String> = None;
            let mut mainnet: Option<String> = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--testnet-address" => {
                        testnet = Some(parse_value(args.next(), "testnet address")?)
                    }
                    "--mainnet-address" => {
                        mainnet = Some(parse_value(args.next(), "mainnet address")?)
                    }
                    other => return Err(eyre!("Unknown argument for connect: {other}")),
                }
            }
            let network_addresses = match (testnet, mainnet) {
                (None, None) => None,
                (testnet, mainnet) => Some(NetworkAddresses {
                    testnet: testnet.unwrap_or_else(|| identity_address.clone()),
                    mainnet: mainnet.unwrap_or_else(|| identity_address.clone()),
                }),
            };
            client::Command::Connect {
                identity_address,
                network_addresses,
            }
        }
        "contract" => client::Command::Contract {
            contract: parse_value(args.next(), "contract")?,
        },
        other => return Err(eyre!("Unknown command: {other}")),
    };
    if let Some(extra) = args.next() {
        return Err(eyre!("Unexpected argument for {name}: {extra}"));
    }
    Ok(command)
}

fn parse_cli_args(args: impl IntoIterator<Item = String>) -> Result<Cli> {
    let mut args = args.into_iter();
    let mut overrides = ConfigOverrides::default();
    let mut command_name: Option<String> = None;
    let mut command_args = Vec::new();

    while let Some(arg) = args.next() {
        if command_name.is_some() {
            command_args.push(arg);
            continue;
        }
        match arg.as_str() {
            "--testnet" | "--mainnet" => {
                if overrides.network.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --testnet/--mainnet"
                    ));
                }
                overrides.network = Some(if arg == "--testnet" {
                    Network::Testnet
                } else {
                    Network::Mainnet
                });
            }
            "--api-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--api-url requires a URL argument"))?;
                if overrides.api_url.is_some() {
                    return Err(eyre!("--api-url may only be specified once"));
                }
                overrides.api_url = Some(url);
            }
            "--contract" => {
                let contract: ContractRef = parse_value(args.next(), "--contract")?;
                if overrides.contract.is_some() {
                    return Err(eyre!("--contract may only be specified once"));
                }
                overrides.contract = Some(contract);
            }
            "--session-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--session-dir requires a path argument"))?;
                if overrides.session_dir.is_some() {
                    return Err(eyre!("--session-dir may only be specified once"));
                }
                overrides.session_dir = Some(dir);
            }
            "--help" | "-h" => print_usage_and_exit(),
            flag if flag.starts_with('-') => return Err(eyre!("Unknown argument: {flag}")),
            _ => command_name = Some(arg),
        }
    }

    let name = command_name.ok_or_else(|| eyre!("No command given; try --help"))?;
    let command = parse_command(&name, command_args)?;
    Ok(Cli { overrides, command })
}

fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let appender = rolling::daily(log_dir, "tictactoe.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = parse_cli_args(std::env::args().skip(1))?;

    let log_dir = std::env::var(ENV_LOG_DIR).unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
    let log_dir = shellexpand::tilde(&log_dir).into_owned();
    let _guard = init_tracing(Path::new(&log_dir));

    let config = AppConfig::from_env(cli.overrides).wrap_err("invalid configuration")?;
    client::run_app(config, cli.command).await
}
