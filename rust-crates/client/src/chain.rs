use crate::config::{
    ContractRef,
    Network,
};
use clarity_codec::{
    ClarityValue,
    CodecError,
};
use std::future::Future;
use thiserror::Error;

pub const GET_LATEST_GAME_ID: &str = "get-latest-game-id";
pub const GET_GAME: &str = "get-game";

#[derive(Debug, Error)]
pub enum ChainQueryError {
    #[error("chain query transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("chain api responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("read-only call rejected: {cause}")]
    Rejected { cause: String },
    #[error("undecodable clarity value: {0}")]
    Codec(#[from] CodecError),
    #[error("{function} returned unexpected {found}")]
    UnexpectedShape {
        function: &'static str,
        found: &'static str,
    },
}

/// One read-only contract call. Never changes chain state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadOnlyCall {
    pub contract: ContractRef,
    pub function_name: &'static str,
    pub arguments: Vec<ClarityValue>,
    pub sender: String,
    pub network: Network,
}

/// Chain query collaborator used by the reader.
pub trait ReadOnlyCaller: Send + Sync {
    fn call_read_only(
        &self,
        call: ReadOnlyCall,
    ) -> impl Future<Output = Result<ClarityValue, ChainQueryError>> + Send;
}
