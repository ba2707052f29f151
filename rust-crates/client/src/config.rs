use clarity_codec::StandardPrincipal;
use deployments::{
    DeploymentEnv,
    DeploymentRecord,
    DeploymentStore,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    path::PathBuf,
    str::FromStr,
};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_TESTNET_API_URL: &str = "https://api.testnet.hiro.so";
pub const DEFAULT_MAINNET_API_URL: &str = "https://api.hiro.so";
pub const DEFAULT_CONTRACT_ADDRESS: &str = "ST3P49R8XXQWG69S66MZASYPTTGNDKK0WW32RRJDN";
pub const DEFAULT_CONTRACT_NAME: &str = "tic-tac-toe";
pub const DEFAULT_APP_NAME: &str = "Tic Tac Toe";
pub const DEFAULT_APP_ICON: &str = "https://cryptologos.cc/logos/stacks-stx-logo.png";
pub const DEFAULT_EXPLORER_URL: &str = "https://explorer.hiro.so";
pub const DEFAULT_SESSION_DIR: &str = "~/.tictactoe/session";

pub const ENV_NETWORK: &str = "TICTACTOE_NETWORK";
pub const ENV_API_URL: &str = "TICTACTOE_API_URL";
pub const ENV_CONTRACT_ADDRESS: &str = "TICTACTOE_CONTRACT_ADDRESS";
pub const ENV_CONTRACT_NAME: &str = "TICTACTOE_CONTRACT_NAME";
pub const ENV_APP_NAME: &str = "TICTACTOE_APP_NAME";
pub const ENV_APP_ICON: &str = "TICTACTOE_APP_ICON";
pub const ENV_EXPLORER_URL: &str = "TICTACTOE_EXPLORER_URL";
pub const ENV_SESSION_DIR: &str = "TICTACTOE_SESSION_DIR";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown network {0:?}; expected testnet or mainnet")]
    InvalidNetwork(String),
    #[error("invalid contract {value:?}: {reason}")]
    InvalidContract { value: String, reason: String },
    #[error("no game contract configured for {0}; set {ENV_CONTRACT_ADDRESS} or record one")]
    MissingContract(Network),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }

    /// c32 version byte of single-signature addresses on this network.
    pub fn address_version(self) -> u8 {
        match self {
            Network::Testnet => 26,
            Network::Mainnet => 22,
        }
    }

    pub fn default_api_url(self) -> &'static str {
        match self {
            Network::Testnet => DEFAULT_TESTNET_API_URL,
            Network::Mainnet => DEFAULT_MAINNET_API_URL,
        }
    }

    pub fn deployment_env(self) -> DeploymentEnv {
        match self {
            Network::Testnet => DeploymentEnv::Test,
            Network::Mainnet => DeploymentEnv::Main,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            _ => Err(ConfigError::InvalidNetwork(s.to_string())),
        }
    }
}

/// A deployed contract: issuing address plus contract name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRef {
    pub address: String,
    pub name: String,
}

impl ContractRef {
    pub fn new(
        address: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let address = address.into();
        let name = name.into();
        if let Err(err) = address.parse::<StandardPrincipal>() {
            return Err(ConfigError::InvalidContract {
                value: address,
                reason: err.to_string(),
            });
        }
        if name.is_empty() {
            return Err(ConfigError::InvalidContract {
                value: address,
                reason: "empty contract name".to_string(),
            });
        }
        Ok(Self { address, name })
    }
}

impl fmt::Display for ContractRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.name)
    }
}

impl FromStr for ContractRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, name) =
            s.split_once('.')
                .ok_or_else(|| ConfigError::InvalidContract {
                    value: s.to_string(),
                    reason: "expected <address>.<name>".to_string(),
                })?;
        Self::new(address, name)
    }
}

/// Shown to the signer alongside every call request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppDetails {
    pub name: String,
    pub icon: String,
}

/// Values given on the command line; they win over everything else.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub network: Option<Network>,
    pub api_url: Option<String>,
    pub contract: Option<ContractRef>,
    pub session_dir: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub network: Network,
    pub api_url: String,
    pub contract: ContractRef,
    pub app: AppDetails,
    pub explorer_url: String,
    pub session_dir: PathBuf,
}

impl AppConfig {
    /// Resolves from the process environment and the `.deployments` records.
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve(
            overrides,
            |key| std::env::var(key).ok(),
            load_deployment_record,
        )
    }

    /// Precedence: override, then environment, then deployment record, then
    /// built-in default.
    pub fn resolve(
        overrides: ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
        deployment: impl FnOnce(Network) -> Option<DeploymentRecord>,
    ) -> Result<Self, ConfigError> {
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let network = match overrides.network {
            Some(network) => network,
            None => env(ENV_NETWORK)
                .map(|raw| raw.parse::<Network>())
                .transpose()?
                .unwrap_or_default(),
        };
        let record = deployment(network);

        let contract = match overrides.contract {
            Some(contract) => contract,
            None => {
                let address = env(ENV_CONTRACT_ADDRESS)
                    .or_else(|| record.as_ref().map(|r| r.contract_address.clone()));
                let name = env(ENV_CONTRACT_NAME)
                    .or_else(|| record.as_ref().map(|r| r.contract_name.clone()));
                match (address, network) {
                    (Some(address), _) => ContractRef::new(
                        address,
                        name.unwrap_or_else(|| DEFAULT_CONTRACT_NAME.to_string()),
                    )?,
                    (None, Network::Testnet) => ContractRef::new(
                        DEFAULT_CONTRACT_ADDRESS,
                        name.unwrap_or_else(|| DEFAULT_CONTRACT_NAME.to_string()),
                    )?,
                    (None, Network::Mainnet) => {
                        return Err(ConfigError::MissingContract(network));
                    }
                }
            }
        };

        let api_url = overrides
            .api_url
            .or_else(|| env(ENV_API_URL))
            .or_else(|| record.as_ref().and_then(|r| r.api_url.clone()))
            .unwrap_or_else(|| network.default_api_url().to_string());

        let session_dir = overrides
            .session_dir
            .or_else(|| env(ENV_SESSION_DIR))
            .unwrap_or_else(|| DEFAULT_SESSION_DIR.to_string());

        Ok(Self {
            network,
            api_url: api_url.trim_end_matches('/').to_string(),
            contract,
            app: AppDetails {
                name: env(ENV_APP_NAME).unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
                icon: env(ENV_APP_ICON).unwrap_or_else(|| DEFAULT_APP_ICON.to_string()),
            },
            explorer_url: env(ENV_EXPLORER_URL)
                .unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            session_dir: PathBuf::from(shellexpand::tilde(&session_dir).into_owned()),
        })
    }

    pub fn explorer_address_url(&self, address: &str) -> String {
        format!(
            "{}/address/{address}?chain={}",
            self.explorer_url, self.network
        )
    }

    pub fn explorer_tx_url(&self, txid: &str) -> String {
        format!("{}/txid/{txid}?chain={}", self.explorer_url, self.network)
    }
}

fn load_deployment_record(network: Network) -> Option<DeploymentRecord> {
    let loaded =
        DeploymentStore::new(network.deployment_env()).and_then(|store| store.load());
    match loaded {
        Ok(record) => record,
        Err(err) => {
            warn!(%network, error = %err, "ignoring unreadable deployment record");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use std::collections::HashMap;

    const OTHER_ADDRESS: &str = "ST000000000000000000002AMW42H";

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn record(address: &str, name: &str, api_url: Option<&str>) -> DeploymentRecord {
        DeploymentRecord {
            recorded_at: "2026-01-01T00:00:00Z".to_string(),
            contract_address: address.to_string(),
            contract_name: name.to_string(),
            api_url: api_url.map(str::to_string),
            deployment_block_height: None,
        }
    }

    #[test]
    fn resolve__uses_testnet_defaults_without_any_input() {
        // when
        let config =
            AppConfig::resolve(ConfigOverrides::default(), env_from(&[]), |_| None)
                .unwrap();

        // then
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.api_url, DEFAULT_TESTNET_API_URL);
        assert_eq!(
            config.contract.to_string(),
            format!("{DEFAULT_CONTRACT_ADDRESS}.{DEFAULT_CONTRACT_NAME}")
        );
        assert_eq!(config.app.name, DEFAULT_APP_NAME);
        assert!(!config.session_dir.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn resolve__prefers_environment_over_deployment_record() {
        // given
        let env = env_from(&[
            (ENV_CONTRACT_ADDRESS, OTHER_ADDRESS),
            (ENV_API_URL, "http://localhost:3999/"),
        ]);

        // when
        let config = AppConfig::resolve(ConfigOverrides::default(), env, |_| {
            Some(record(DEFAULT_CONTRACT_ADDRESS, "recorded", Some("http://rec")))
        })
        .unwrap();

        // then
        assert_eq!(config.contract.address, OTHER_ADDRESS);
        assert_eq!(config.contract.name, "recorded");
        assert_eq!(config.api_url, "http://localhost:3999");
    }

    #[test]
    fn resolve__prefers_overrides_over_environment() {
        // given
        let env = env_from(&[(ENV_NETWORK, "testnet"), (ENV_SESSION_DIR, "/env")]);
        let overrides = ConfigOverrides {
            network: Some(Network::Mainnet),
            contract: Some(ContractRef::new(OTHER_ADDRESS, "game").unwrap()),
            session_dir: Some("/flag".to_string()),
            ..Default::default()
        };

        // when
        let config = AppConfig::resolve(overrides, env, |_| None).unwrap();

        // then
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.api_url, DEFAULT_MAINNET_API_URL);
        assert_eq!(config.contract.name, "game");
        assert_eq!(config.session_dir, PathBuf::from("/flag"));
    }

    #[test]
    fn resolve__reads_deployment_record_for_selected_network() {
        // given
        let env = env_from(&[(ENV_NETWORK, "Mainnet")]);

        // when
        let config = AppConfig::resolve(ConfigOverrides::default(), env, |network| {
            assert_eq!(network, Network::Mainnet);
            Some(record(OTHER_ADDRESS, "ttt-v2", Some("https://node.example")))
        })
        .unwrap();

        // then
        assert_eq!(config.contract.to_string(), format!("{OTHER_ADDRESS}.ttt-v2"));
        assert_eq!(config.api_url, "https://node.example");
    }

    #[test]
    fn resolve__requires_explicit_contract_on_mainnet() {
        let env = env_from(&[(ENV_NETWORK, "mainnet")]);
        let result = AppConfig::resolve(ConfigOverrides::default(), env, |_| None);
        assert_eq!(result, Err(ConfigError::MissingContract(Network::Mainnet)));
    }

    #[test]
    fn resolve__rejects_unknown_network_and_bad_address() {
        let bad_network = AppConfig::resolve(
            ConfigOverrides::default(),
            env_from(&[(ENV_NETWORK, "devnet")]),
            |_| None,
        );
        assert_eq!(
            bad_network,
            Err(ConfigError::InvalidNetwork("devnet".to_string()))
        );

        let bad_address = AppConfig::resolve(
            ConfigOverrides::default(),
            env_from(&[(ENV_CONTRACT_ADDRESS, "not-an-address")]),
            |_| None,
        );
        assert!(matches!(
            bad_address,
            Err(ConfigError::InvalidContract { .. })
        ));
    }

    #[test]
    fn explorer_links__carry_network_as_chain() {
        let config =
            AppConfig::resolve(ConfigOverrides::default(), env_from(&[]), |_| None)
                .unwrap();
        assert_eq!(
            config.explorer_tx_url("0xabc"),
            "https://explorer.hiro.so/txid/0xabc?chain=testnet"
        );
        assert_eq!(
            config.explorer_address_url(OTHER_ADDRESS),
            format!("https://explorer.hiro.so/address/{OTHER_ADDRESS}?chain=testnet")
        );
    }

    #[test]
    fn contract_ref__parses_identifier() {
        let contract: ContractRef = format!("{OTHER_ADDRESS}.tic-tac-toe").parse().unwrap();
        assert_eq!(contract.address, OTHER_ADDRESS);
        assert!("no-dot".parse::<ContractRef>().is_err());
    }
}
