//! File system utilities: output path mapping and TOML persistence.

use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::Result;

/// Replace filesystem-hostile characters in a single path segment.
///
/// `< > : " / \ | ? *` and whitespace runs become `-`, dash runs collapse,
/// and leading/trailing dashes are trimmed.
pub fn sanitize_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        let c = if c.is_whitespace()
            || matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
        {
            '-'
        } else {
            c
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('-').to_string()
}

/// Map a page URL to its Markdown file under `output_root`.
///
/// The layout is `<root>/<host>/<dir segments...>/<last segment>.md`. A
/// path that is empty or ends in `/` maps to `index.md`. Unparsable URLs
/// map to `<root>/unknown.md`.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use scoopi::utils::fs::map_to_path;
///
/// assert_eq!(
///     map_to_path(Path::new("docs"), "https://example.com/guide/intro.html"),
///     Path::new("docs/example.com/guide/intro.md")
/// );
/// ```
pub fn map_to_path(output_root: &Path, url: &str) -> PathBuf {
    let fallback = || output_root.join("unknown.md");

    let Ok(parsed) = Url::parse(url) else {
        return fallback();
    };
    let Some(host) = parsed.host_str().filter(|h| !h.is_empty()) else {
        return fallback();
    };

    let path = parsed.path();
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let file_stem = if path.ends_with('/') {
        "index"
    } else {
        segments.pop().unwrap_or("index")
    };

    let mut out = output_root.join(sanitize_segment(host));
    for dir in segments {
        let dir = sanitize_segment(dir);
        if !dir.is_empty() {
            out.push(dir);
        }
    }

    let stem = sanitize_segment(strip_html_extension(file_stem));
    let stem = if stem.is_empty() { "index".to_string() } else { stem };
    out.push(format!("{stem}.md"));
    out
}

fn strip_html_extension(name: &str) -> &str {
    name.strip_suffix(".html")
        .or_else(|| name.strip_suffix(".htm"))
        .unwrap_or(name)
}

/// Load TOML data from a file
pub fn load_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    let data: T = toml::from_str(&content)?;
    Ok(data)
}

/// Save data to a TOML file, creating parent directories
pub fn save_toml<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let text = toml::to_string_pretty(data)?;
    fs::write(path, text)?;
    Ok(())
}

/// Ensure a directory exists
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}
