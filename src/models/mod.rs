// src/models/mod.rs

//! Domain models for the scooping application.

mod config;
mod page;

// Re-export all public types
pub use config::{
    CrawlConfig, RendererOptions, SETTING_KEYS, Settings, SettingsLayer, Viewport, parse_list,
};
pub use page::{FrontierEntry, PageLink, PageResult};
