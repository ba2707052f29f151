//! Read and write model for the on-chain tic-tac-toe contract.
//!
//! [`reader::ChainStateReader`] turns the contract's read-only functions into
//! a cached game listing, [`categorize()`] splits that listing per viewer,
//! [`session::SessionResolver`] supplies the viewer and
//! [`intent::IntentBuilder`] describes the calls a player can sign.

pub mod actions;
pub mod cache;
pub mod categorize;
pub mod chain;
pub mod config;
pub mod decode;
pub mod game;
pub mod hiro_client;
pub mod intent;
pub mod reader;
pub mod session;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use categorize::{
    GameViews,
    categorize,
};
pub use game::{
    Game,
    GameStatus,
    Move,
};
