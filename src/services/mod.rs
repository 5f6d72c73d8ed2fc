//! Service layer for the scooping application.
//!
//! This module contains:
//! - Page renderers (`HttpRenderer`, and `BrowserRenderer` with the `browser` feature)
//! - HTML to Markdown conversion (`MarkdownConverter`)

#[cfg(feature = "browser")]
mod browser;
mod converter;
mod renderer;

#[cfg(feature = "browser")]
pub use browser::{BrowserLauncher, BrowserRenderer};
pub use converter::{MarkdownConverter, collapse_newlines, detect_language, with_frontmatter};
pub use renderer::{HttpLauncher, HttpRenderer, Renderer, RendererLauncher, extract_page};
