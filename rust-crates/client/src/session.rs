use crate::config::Network;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashMap,
    fs,
    io,
    path::PathBuf,
    sync::{
        Arc,
        Mutex,
        PoisonError,
    },
};
use thiserror::Error;
use tracing::{
    info,
    warn,
};

/// Key under which a wallet connect persists its session blob.
pub const SESSION_KEY: &str = "blockstack-session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed session blob: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAddresses {
    pub testnet: String,
    pub mainnet: String,
}

impl NetworkAddresses {
    pub fn for_network(&self, network: Network) -> &str {
        match network {
            Network::Testnet => &self.testnet,
            Network::Mainnet => &self.mainnet,
        }
    }
}

/// The wallet identity a session was connected with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub identity_address: String,
    #[serde(rename = "decentralizedID", default, skip_serializing_if = "Option::is_none")]
    pub decentralized_id: Option<String>,
    /// Older sessions only carry `identity_address`.
    #[serde(rename = "addresses", default, skip_serializing_if = "Option::is_none")]
    pub network_addresses: Option<NetworkAddresses>,
}

impl SessionIdentity {
    pub fn resolve_address(&self, network: Network) -> &str {
        match &self.network_addresses {
            Some(addresses) if !addresses.for_network(network).is_empty() => {
                addresses.for_network(network)
            }
            _ => &self.identity_address,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SessionBlob {
    #[serde(rename = "userData", default)]
    user_data: Option<SessionIdentity>,
}

/// Parses a persisted blob. A blob without `userData` holds no identity.
pub fn decode_session_blob(raw: &str) -> Result<Option<SessionIdentity>, SessionError> {
    let blob: SessionBlob = serde_json::from_str(raw)?;
    Ok(blob.user_data)
}

pub fn encode_session_blob(identity: &SessionIdentity) -> Result<String, SessionError> {
    let blob = SessionBlob {
        user_data: Some(identity.clone()),
    };
    Ok(serde_json::to_string(&blob)?)
}

/// String store holding persisted session blobs.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Clone, Debug)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn save(&self, key: &str, blob: &str) -> Result<(), SessionError> {
        fs::create_dir_all(&self.dir).map_err(|source| SessionError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path_for(key);
        fs::write(&path, blob).map_err(|source| SessionError::Io { path, source })
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SessionError::Io { path, source }),
        }
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io { path, source }),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemorySessionStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, blob: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), blob.into());
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Holds the connected identity for the process and maps it to the address
/// used on the configured network.
pub struct SessionResolver<S> {
    store: S,
    network: Network,
    identity: Option<SessionIdentity>,
}

impl<S: SessionStore> SessionResolver<S> {
    pub fn new(store: S, network: Network) -> Self {
        Self {
            store,
            network,
            identity: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the persisted session. Anything unreadable counts as no session.
    pub fn load(&mut self) -> Option<&SessionIdentity> {
        self.identity = match self.store.get(SESSION_KEY) {
            Ok(Some(raw)) => decode_session_blob(&raw).unwrap_or_else(|err| {
                warn!(%err, "ignoring stored session");
                None
            }),
            Ok(None) => None,
            Err(err) => {
                warn!(%err, "session store unreadable");
                None
            }
        };
        self.identity.as_ref()
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    pub fn resolve_address(identity: &SessionIdentity, network: Network) -> String {
        identity.resolve_address(network).to_string()
    }

    pub fn viewer_address(&self) -> Option<String> {
        self.identity
            .as_ref()
            .map(|identity| Self::resolve_address(identity, self.network))
    }

    /// Forgets the identity in memory and in the store.
    pub fn disconnect(&mut self) -> Result<(), SessionError> {
        self.identity = None;
        self.store.remove(SESSION_KEY)?;
        info!("session disconnected");
        Ok(())
    }
}
