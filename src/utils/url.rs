// src/utils/url.rs

//! URL governance: normalization, domain scoping, pattern filtering and
//! link deduplication.

use std::collections::HashSet;

use regex::Regex;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::PageLink;

/// Query parameters that only carry tracking state.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "ref",
    "_ga",
];

/// Resolve `href` against `base` and reduce it to its canonical form.
///
/// Returns `None` when the URL cannot be parsed. The `url` crate already
/// lower-cases hostnames and drops default ports while parsing, so the
/// remaining work is the fragment, tracking parameters and trailing slash.
///
/// # Examples
/// ```
/// use scoopi::utils::url::normalize;
///
/// assert_eq!(
///     normalize("/guide/?utm_source=x#intro", "https://Example.COM:443/"),
///     Some("https://example.com/guide".to_string())
/// );
/// ```
pub fn normalize(href: &str, base: &str) -> Option<String> {
    let base = Url::parse(base).ok();
    let mut url = Url::options().base_url(base.as_ref()).parse(href).ok()?;

    url.set_fragment(None);
    strip_tracking_params(&mut url);

    let path = url.path();
    if path != "/" && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        url.set_path(&trimmed);
    }

    Some(url.to_string())
}

fn strip_tracking_params(url: &mut Url) {
    let has_tracking = url
        .query_pairs()
        .any(|(key, _)| TRACKING_PARAMS.contains(&key.as_ref()));

    if has_tracking {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    } else if url.query() == Some("") {
        url.set_query(None);
    }
}

/// Extract the lower-cased hostname from a URL string.
pub fn get_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Whether both URLs share the same hostname. Parse failures yield `false`.
pub fn is_same_domain(a: &str, b: &str) -> bool {
    match (get_domain(a), get_domain(b)) {
        (Some(a), Some(b)) => !a.is_empty() && a == b,
        _ => false,
    }
}

/// A user-supplied URL pattern.
///
/// `*` matches zero or more characters; every other character is literal.
/// Matching is a substring search over the whole URL, unless the pattern
/// ends in `$`: then it must match up to the end of the URL path, so
/// `*.js$` rejects `/app.js?v=2` but not `https://vitest.js.org/guide`.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    raw: String,
    regex: Regex,
    anchored: bool,
}

impl UrlPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let (body, anchored) = match pattern.strip_suffix('$') {
            Some(body) => (body, true),
            None => (pattern, false),
        };
        let mut translated = body
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        if anchored {
            translated.push('$');
        }
        let regex = Regex::new(&translated)
            .map_err(|e| AppError::config(format!("Invalid URL pattern '{pattern}': {e}")))?;

        Ok(Self {
            raw: pattern.to_string(),
            regex,
            anchored,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, url: &str) -> bool {
        if self.anchored {
            let path_end = url.find(['?', '#']).unwrap_or(url.len());
            self.regex.is_match(&url[..path_end])
        } else {
            self.regex.is_match(url)
        }
    }
}

/// Compile a list of raw patterns.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<UrlPattern>> {
    patterns.iter().map(|p| UrlPattern::new(p)).collect()
}

/// Link admission rules for a single crawl, anchored to the seed hostname.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    seed_host: String,
    include: Vec<UrlPattern>,
    exclude: Vec<UrlPattern>,
}

impl UrlFilter {
    /// Build a filter for the hostname of `seed`.
    pub fn new(seed: &str, include: &[String], exclude: &[String]) -> Result<Self> {
        let seed_host = get_domain(seed)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AppError::validation(format!("Seed URL has no hostname: {seed}")))?;

        Ok(Self {
            seed_host,
            include: compile_patterns(include)?,
            exclude: compile_patterns(exclude)?,
        })
    }

    pub fn seed_host(&self) -> &str {
        &self.seed_host
    }

    /// Whether an absolute URL may be crawled.
    ///
    /// Exclusion is checked first and always wins; an empty include list
    /// admits everything that survives exclusion.
    pub fn accept(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        if parsed.host_str() != Some(self.seed_host.as_str()) {
            return false;
        }
        if self.exclude.iter().any(|p| p.is_match(url)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.is_match(url))
    }

    /// Normalize, filter and deduplicate the links found on `base`.
    ///
    /// Returned links carry canonical hrefs in first-seen order.
    pub fn filter_links(&self, links: &[PageLink], base: &str) -> Vec<PageLink> {
        let accepted: Vec<PageLink> = links
            .iter()
            .filter_map(|link| match normalize(&link.href, base) {
                Some(href) => Some(PageLink::new(href, link.text.clone())),
                None => {
                    log::debug!("Dropping malformed link '{}' on {}", link.href, base);
                    None
                }
            })
            .filter(|link| self.accept(&link.href))
            .collect();

        let filtered = dedupe(accepted);
        log::debug!("Filtered to {} valid links on {}", filtered.len(), base);
        filtered
    }
}

/// Resolve `href` against `base` and apply the admission rules of a filter
/// anchored at `base`'s hostname.
pub fn accept(href: &str, base: &str, include: &[String], exclude: &[String]) -> bool {
    let Some(url) = normalize(href, base) else {
        return false;
    };
    match UrlFilter::new(base, include, exclude) {
        Ok(filter) => filter.accept(&url),
        Err(e) => {
            log::debug!("Rejecting {url}: {e}");
            false
        }
    }
}

/// Remove repeated hrefs, keeping the first occurrence of each.
pub fn dedupe(links: Vec<PageLink>) -> Vec<PageLink> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.href.clone()))
        .collect()
}
