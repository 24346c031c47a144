pub mod models;
pub mod error;
pub mod config;
pub mod logging;

pub use error::{Error, Result};
pub use models::{ProximityKey, RegistrationToken};
