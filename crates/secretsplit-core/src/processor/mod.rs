//! Splitting secrets out of documents and hydrating them back
//!
//! - `SecretsSplitter`: raw document → pointer-only document (+ secret store writes)
//! - `SecretsHydrator`: pointer-only document → raw document (secret store reads only)

mod error;
pub mod pointer;
mod splitter;
mod hydrator;

pub use error::{SecretsError, SecretsResult};
pub use splitter::{SecretsSplitter, SplitOutcome};
pub use hydrator::SecretsHydrator;
