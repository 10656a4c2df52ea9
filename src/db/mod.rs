//! Persistence layer for cached OAuth tokens.

pub mod token_store;

pub use token_store::{FileTokenStore, InMemoryTokenStore, TokenStore};
