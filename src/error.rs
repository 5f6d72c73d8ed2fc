// src/error.rs

//! Unified error handling for the scooping application.

use std::fmt;

use thiserror::Error;

/// Result type alias for scoopi operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The page did not finish loading within the page timeout
    #[error("Page load timeout after {timeout_ms}ms: {url}")]
    PageTimeout { url: String, timeout_ms: u64 },

    /// Navigation or HTTP failure other than a timeout
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// HTML to Markdown conversion failed
    #[error("Failed to convert HTML to Markdown: {0}")]
    Conversion(String),

    /// The renderer could not be started at all
    #[error("Failed to initialize renderer: {0}")]
    RendererInit(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a page timeout error.
    pub fn timeout(url: impl Into<String>, timeout_ms: u64) -> Self {
        Self::PageTimeout {
            url: url.into(),
            timeout_ms,
        }
    }

    /// Create a fetch error with context.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a conversion error carrying the original message.
    pub fn conversion(message: impl fmt::Display) -> Self {
        Self::Conversion(message.to_string())
    }

    /// Create a renderer initialization error.
    pub fn renderer_init(message: impl fmt::Display) -> Self {
        Self::RendererInit(message.to_string())
    }

    /// Whether this error is a page load timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::PageTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_keeps_original_message() {
        let err = AppError::conversion("unbalanced table");
        assert_eq!(
            err.to_string(),
            "Failed to convert HTML to Markdown: unbalanced table"
        );
    }

    #[test]
    fn test_is_timeout() {
        assert!(AppError::timeout("https://example.com/", 30000).is_timeout());
        assert!(!AppError::fetch("https://example.com/", "404 Not Found").is_timeout());
    }
}
