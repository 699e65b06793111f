//! Metadata store abstractions
//!
//! The metadata store holds pointer-only entity records:
//! - `MemoryMetadataStore`: In-memory for testing
//! - `FileMetadataStore`: YAML file-based

mod traits;
mod memory;
mod file;

pub use traits::{MetadataStore, MetadataError, MetadataResult};
pub use memory::MemoryMetadataStore;
pub use file::{FileMetadataStore, MetadataFile};
