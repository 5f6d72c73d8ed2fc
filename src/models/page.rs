//! Page-level data exchanged between the renderer, the pipeline and the frontier.

use serde::{Deserialize, Serialize};

/// A hyperlink discovered on a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub href: String,
    pub text: String,
}

impl PageLink {
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: text.into(),
        }
    }
}

/// Content and links produced by one successful render.
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    /// Inner HTML of the main content element
    pub content: String,
    /// Links in document order
    pub links: Vec<PageLink>,
    pub title: String,
}

/// A queued URL and the depth at which it was discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: u32,
}

impl FrontierEntry {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}
