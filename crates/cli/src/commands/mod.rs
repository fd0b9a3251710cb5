//! Command handlers for the clibars CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod add;
pub mod completion;
pub mod list;
pub mod remove;
pub mod run;

// Re-export command types for convenience
pub use add::AddCommand;
pub use completion::CompletionCommand;
pub use list::ListCommand;
pub use remove::RemoveCommand;
pub use run::RunCommand;
pub use test::TestCommand;

use std::path::{Path, PathBuf};

/// Treat a missing path or `-` as a standard stream.
pub(crate) fn stream_path(path: Option<&PathBuf>) -> Option<&Path> {
    path.map(PathBuf::as_path)
        .filter(|p| p.as_os_str() != "-")
}
