//! Logging abstractions for runtime-agnostic logging

mod traits;
mod console;
pub mod file_logger;

pub use traits::{Logger, SharedLogger, NoOpLogger};
pub use console::{ConsoleLogger, MemoryLogger};

// Re-export file logger functions for convenience
pub use file_logger::{
    log, trace, debug, info, warn, error,
    log_file_path, clear_log, LogLevel,
};
