//! Storage abstractions for scooped pages.
//!
//! ## Directory Structure
//!
//! ```text
//! {output_dir}/
//! └── {hostname}/
//!     ├── index.md
//!     └── guide/
//!         ├── index.md
//!         └── install.md
//! ```

pub mod local;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for page storage backends.
#[async_trait]
pub trait PageStorage: Send + Sync {
    /// Create a directory and its parents. Succeeds if it already exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()>;

    /// Write a page, creating parent directories as needed.
    async fn write_file(&self, path: &Path, content: &str) -> Result<()>;

    async fn exists(&self, path: &Path) -> bool;
}
