//! Utility functions and helpers.

pub mod fs;
pub mod url;

pub use fs::{map_to_path, sanitize_segment};
pub use url::{UrlFilter, UrlPattern, dedupe, is_same_domain, normalize};
