//! Submission of locally recorded proximity keys and retrieval of the
//! diagnostic test result.
//!
//! [`ExposureSubmissionService`] sequences the [`KeyRetriever`],
//! [`TokenStore`] and [`SubmissionClient`] collaborators and folds their
//! failures into the three-way [`SubmissionError`] taxonomy.

pub mod client;
pub mod error;
pub mod mock;
pub mod result;
pub mod retrieval;
pub mod service;
pub mod store;

pub use client::{SubmissionClient, TransportError};
pub use error::{SubmissionError, SubmissionErrorKind, UnknownTestResultCode};
pub use mock::{MockKeyRetriever, MockSubmissionClient, MockTokenStore};
pub use result::TestResult;
pub use retrieval::{InMemoryKeyRetriever, KeyRetrievalError, KeyRetriever};
pub use service::ExposureSubmissionService;
pub use store::TokenStore;
