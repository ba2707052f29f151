//! Clarity values as they cross the wire between a Stacks node and a client.
//!
//! Read-only calls answer with a consensus-serialized value (hex encoded by
//! the HTTP API) and take their arguments in the same encoding. This crate owns
//! that tagged value model, the byte codec, and the c32check principal format.

pub mod c32;
mod codec;
mod error;
mod value;

pub use c32::StandardPrincipal;
pub use error::CodecError;
pub use value::{
    ClarityValue,
    Principal,
};

pub type Result<T, E = CodecError> = std::result::Result<T, E>;
