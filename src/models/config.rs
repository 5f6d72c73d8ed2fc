//! Application configuration structures.
//!
//! Settings are resolved from three layers, lowest precedence first:
//! built-in defaults, persisted user settings, invocation overrides.
//! The merged result is validated once, before any crawl starts.

use std::path::PathBuf;
use std::time::Duration;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Known setting keys grouped by category, in display order.
pub const SETTING_KEYS: &[(&str, &[&str])] = &[
    ("crawling", &["max_depth", "delay_ms", "timeout_ms"]),
    ("output", &["output_dir", "verbose"]),
    (
        "browser",
        &["headless", "user_agent", "viewport_width", "viewport_height"],
    ),
    (
        "filtering",
        &["include_patterns", "exclude_patterns", "strip_selectors"],
    ),
];

/// Fully resolved application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Maximum link depth followed from the seed page
    #[serde(default = "defaults::max_depth")]
    pub max_depth: u32,

    /// Politeness delay between page fetches in milliseconds
    #[serde(default = "defaults::delay_ms")]
    pub delay_ms: u64,

    /// Page load timeout in milliseconds
    #[serde(default = "defaults::timeout_ms")]
    pub timeout_ms: u64,

    /// Root directory for generated Markdown files
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    /// Run the browser renderer without a window
    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// User-Agent sent by the renderer
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    #[serde(default = "defaults::viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "defaults::viewport_height")]
    pub viewport_height: u32,

    /// URL patterns a link must match (empty = everything)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// URL patterns that reject a link
    #[serde(default = "defaults::exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Extra CSS selectors removed before conversion
    #[serde(default)]
    pub strip_selectors: Vec<String>,

    /// Log full error detail
    #[serde(default)]
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_depth: defaults::max_depth(),
            delay_ms: defaults::delay_ms(),
            timeout_ms: defaults::timeout_ms(),
            output_dir: defaults::output_dir(),
            headless: defaults::headless(),
            user_agent: defaults::user_agent(),
            viewport_width: defaults::viewport_width(),
            viewport_height: defaults::viewport_height(),
            include_patterns: Vec::new(),
            exclude_patterns: defaults::exclude_patterns(),
            strip_selectors: Vec::new(),
            verbose: false,
        }
    }
}

impl Settings {
    /// Merge layers over the defaults and validate the result.
    ///
    /// Later layers win, so pass `[&user, &overrides]`.
    pub fn resolve(layers: &[&SettingsLayer]) -> Result<Self> {
        let mut settings = Self::default();
        for layer in layers {
            layer.apply_to(&mut settings);
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth > 10 {
            return Err(AppError::validation("max_depth must be between 0 and 10"));
        }
        if self.delay_ms > 10_000 {
            return Err(AppError::validation(
                "delay_ms must be between 0 and 10000 ms",
            ));
        }
        if !(1_000..=120_000).contains(&self.timeout_ms) {
            return Err(AppError::validation(
                "timeout_ms must be between 1000 and 120000 ms",
            ));
        }
        if self.output_dir.as_os_str().is_empty()
            || self.output_dir.to_string_lossy().trim().is_empty()
        {
            return Err(AppError::validation("output_dir cannot be empty"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(AppError::validation("user_agent cannot be empty"));
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(AppError::validation("viewport dimensions must be > 0"));
        }
        for (name, patterns) in [
            ("include_patterns", &self.include_patterns),
            ("exclude_patterns", &self.exclude_patterns),
        ] {
            if patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(AppError::validation(format!(
                    "{name} must not contain empty patterns"
                )));
            }
        }
        for selector in &self.strip_selectors {
            Selector::parse(selector)
                .map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        }
        Ok(())
    }

    /// Display form of a single setting, `None` for unknown keys.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "max_depth" => self.max_depth.to_string(),
            "delay_ms" => self.delay_ms.to_string(),
            "timeout_ms" => self.timeout_ms.to_string(),
            "output_dir" => self.output_dir.display().to_string(),
            "headless" => self.headless.to_string(),
            "user_agent" => self.user_agent.clone(),
            "viewport_width" => self.viewport_width.to_string(),
            "viewport_height" => self.viewport_height.to_string(),
            "include_patterns" => format!("[{}]", self.include_patterns.join(", ")),
            "exclude_patterns" => format!("[{}]", self.exclude_patterns.join(", ")),
            "strip_selectors" => format!("[{}]", self.strip_selectors.join(", ")),
            "verbose" => self.verbose.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Immutable snapshot handed to the crawler.
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            max_depth: self.max_depth,
            output_dir: self.output_dir.clone(),
            include_patterns: self.include_patterns.clone(),
            exclude_patterns: self.exclude_patterns.clone(),
            strip_selectors: self.strip_selectors.clone(),
            delay: Duration::from_millis(self.delay_ms),
            timeout: Duration::from_millis(self.timeout_ms),
            verbose: self.verbose,
            renderer: RendererOptions {
                user_agent: self.user_agent.clone(),
                viewport: Viewport {
                    width: self.viewport_width,
                    height: self.viewport_height,
                },
                headless: self.headless,
            },
        }
    }
}

/// A partial settings layer: persisted user settings or invocation overrides.
///
/// `None` means the layer does not set that key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_patterns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_patterns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_selectors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
}

impl SettingsLayer {
    /// Overwrite every key this layer sets.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(v) = self.max_depth {
            settings.max_depth = v;
        }
        if let Some(v) = self.delay_ms {
            settings.delay_ms = v;
        }
        if let Some(v) = self.timeout_ms {
            settings.timeout_ms = v;
        }
        if let Some(v) = &self.output_dir {
            settings.output_dir = v.clone();
        }
        if let Some(v) = self.headless {
            settings.headless = v;
        }
        if let Some(v) = &self.user_agent {
            settings.user_agent = v.clone();
        }
        if let Some(v) = self.viewport_width {
            settings.viewport_width = v;
        }
        if let Some(v) = self.viewport_height {
            settings.viewport_height = v;
        }
        if let Some(v) = &self.include_patterns {
            settings.include_patterns = v.clone();
        }
        if let Some(v) = &self.exclude_patterns {
            settings.exclude_patterns = v.clone();
        }
        if let Some(v) = &self.strip_selectors {
            settings.strip_selectors = v.clone();
        }
        if let Some(v) = self.verbose {
            settings.verbose = v;
        }
    }

    /// Whether this layer customizes `key`.
    pub fn is_set(&self, key: &str) -> bool {
        match key {
            "max_depth" => self.max_depth.is_some(),
            "delay_ms" => self.delay_ms.is_some(),
            "timeout_ms" => self.timeout_ms.is_some(),
            "output_dir" => self.output_dir.is_some(),
            "headless" => self.headless.is_some(),
            "user_agent" => self.user_agent.is_some(),
            "viewport_width" => self.viewport_width.is_some(),
            "viewport_height" => self.viewport_height.is_some(),
            "include_patterns" => self.include_patterns.is_some(),
            "exclude_patterns" => self.exclude_patterns.is_some(),
            "strip_selectors" => self.strip_selectors.is_some(),
            "verbose" => self.verbose.is_some(),
            _ => false,
        }
    }

    /// Number of keys this layer customizes.
    pub fn len(&self) -> usize {
        SETTING_KEYS
            .iter()
            .flat_map(|(_, keys)| keys.iter())
            .filter(|key| self.is_set(key))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse `raw` according to the type of `key` and store it.
    ///
    /// Lists are comma-separated. Range checks are left to
    /// [`Settings::validate`].
    pub fn set_raw(&mut self, key: &str, raw: &str) -> Result<()> {
        let raw = raw.trim();
        match key {
            "max_depth" => self.max_depth = Some(parse_number(key, raw)?),
            "delay_ms" => self.delay_ms = Some(parse_number(key, raw)?),
            "timeout_ms" => self.timeout_ms = Some(parse_number(key, raw)?),
            "output_dir" => self.output_dir = Some(PathBuf::from(raw)),
            "headless" => self.headless = Some(parse_bool(key, raw)?),
            "user_agent" => self.user_agent = Some(raw.to_string()),
            "viewport_width" => self.viewport_width = Some(parse_number(key, raw)?),
            "viewport_height" => self.viewport_height = Some(parse_number(key, raw)?),
            "include_patterns" => self.include_patterns = Some(parse_list(raw)),
            "exclude_patterns" => self.exclude_patterns = Some(parse_list(raw)),
            "strip_selectors" => self.strip_selectors = Some(parse_list(raw)),
            "verbose" => self.verbose = Some(parse_bool(key, raw)?),
            _ => {
                return Err(AppError::config(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse().map_err(|_| {
        AppError::config(format!(
            "Invalid value for {key} (expected number): {raw}"
        ))
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(AppError::config(format!(
            "Invalid value for {key} (expected 'true' or 'false'): {raw}"
        ))),
    }
}

/// Split a comma-separated list, dropping blank items.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Browser viewport in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Options passed to a renderer when it is launched.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererOptions {
    pub user_agent: String,
    pub viewport: Viewport,
    pub headless: bool,
}

/// Immutable per-run crawl configuration.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub max_depth: u32,
    pub output_dir: PathBuf,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub strip_selectors: Vec<String>,
    pub delay: Duration,
    pub timeout: Duration,
    pub verbose: bool,
    pub renderer: RendererOptions,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Settings::default().crawl_config()
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn max_depth() -> u32 {
        3
    }
    pub fn delay_ms() -> u64 {
        1000
    }
    pub fn timeout_ms() -> u64 {
        30_000
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from("./docs")
    }
    pub fn headless() -> bool {
        true
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; scoopi/1.0; +https://github.com/user/scoopi)".into()
    }
    pub fn viewport_width() -> u32 {
        1200
    }
    pub fn viewport_height() -> u32 {
        800
    }
    pub fn exclude_patterns() -> Vec<String> {
        [
            "*.pdf$", "*.zip$", "*.exe$", "*.jpg$", "*.jpeg$", "*.png$", "*.gif$", "*.svg$",
            "*.ico$", "*.css$", "*.js$", "*/api/*", "*/login$", "*/login/*", "*/register$",
            "*/register/*", "*/auth$", "*/auth/*",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}
