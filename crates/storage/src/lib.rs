//! Persistence for the registration token issued during enrollment

pub mod token_store;

pub use token_store::{FileTokenStore, InMemoryTokenStore};
