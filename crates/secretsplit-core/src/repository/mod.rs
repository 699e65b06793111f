//! Coordinating writer and reader
//!
//! The writer is the only path by which configurations reach the metadata
//! store, which is what keeps plaintext secrets out of it. The reader loads
//! pointer-only records and hydrates them.

mod locks;
mod reader;
mod writer;

pub use locks::{EntityGuard, EntityLocks};
pub use reader::SecretsRepositoryReader;
pub use writer::SecretsRepositoryWriter;
