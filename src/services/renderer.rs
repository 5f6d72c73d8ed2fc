// src/services/renderer.rs

//! Page renderers.
//!
//! A renderer fetches one URL and hands back the page's primary content,
//! its outgoing links and its title. The crawler only sees the
//! [`Renderer`] and [`RendererLauncher`] traits, so the HTTP renderer and
//! the headless-browser renderer are interchangeable.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{PageLink, PageResult, RendererOptions};

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector is valid"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector is valid"));
static H1_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("h1 selector is valid"));

static BOILERPLATE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "nav, header, footer, .nav, .navigation, .navbar, .sidebar, .breadcrumb, \
         .advertisement, .ads, script, style, noscript, \
         [class*=\"cookie\"], [class*=\"consent\"], .social-share, .share-buttons",
    )
    .expect("boilerplate selector is valid")
});

/// Candidates for the primary content element, in priority order.
static CONTENT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "main",
        "[role=\"main\"]",
        ".content",
        ".main-content",
        "#content",
        "#main",
        "article",
        "body",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("content selector is valid"))
    .collect()
});

/// Href prefixes that never lead to a crawlable page.
const SKIPPED_HREF_PREFIXES: &[&str] = &["#", "mailto:", "javascript:", "tel:"];

/// A launched page renderer.
#[async_trait]
pub trait Renderer: Send {
    /// Load `url` and extract its content, bounded by `timeout`.
    ///
    /// A load that exceeds `timeout` fails with [`AppError::PageTimeout`].
    async fn fetch(&mut self, url: &str, timeout: Duration) -> Result<PageResult>;

    /// Release the renderer's resources.
    async fn close(&mut self) -> Result<()>;
}

/// Starts renderers. A launch failure is fatal to a crawl.
#[async_trait]
pub trait RendererLauncher: Send + Sync {
    async fn launch(&self, options: &RendererOptions) -> Result<Box<dyn Renderer>>;
}

/// Launcher for [`HttpRenderer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpLauncher;

#[async_trait]
impl RendererLauncher for HttpLauncher {
    async fn launch(&self, options: &RendererOptions) -> Result<Box<dyn Renderer>> {
        Ok(Box::new(HttpRenderer::new(options)?))
    }
}

/// Renderer backed by a plain HTTP client and the HTML parser.
///
/// Pages are not executed, so script-rendered documentation needs the
/// `browser` feature. The viewport option has no meaning here.
#[derive(Debug)]
pub struct HttpRenderer {
    client: reqwest::Client,
    closed: bool,
}

impl HttpRenderer {
    pub fn new(options: &RendererOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&options.user_agent)
            .build()
            .map_err(AppError::renderer_init)?;
        log::debug!("HTTP renderer ready (user agent: {})", options.user_agent);
        Ok(Self {
            client,
            closed: false,
        })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn fetch(&mut self, url: &str, timeout: Duration) -> Result<PageResult> {
        if self.closed {
            return Err(AppError::fetch(url, "renderer is closed"));
        }

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("HTTP {status}")));
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        Ok(extract_page(&body, &final_url))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

fn request_error(url: &str, timeout: Duration, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::timeout(url, duration_ms(timeout))
    } else {
        AppError::fetch(url, err)
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Extract content, links and title from a full HTML document.
///
/// Links are collected before boilerplate is removed so that navigation
/// menus still feed the crawl frontier.
pub fn extract_page(html: &str, page_url: &str) -> PageResult {
    let mut document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    let links = collect_links(&document, base.as_ref());
    let title = extract_title(&document);

    remove_boilerplate(&mut document);
    let content = CONTENT_SELECTORS
        .iter()
        .find_map(|selector| document.select(selector).next())
        .map(|el| el.inner_html())
        .unwrap_or_default();

    PageResult {
        content,
        links,
        title,
    }
}

fn collect_links(document: &Html, base: Option<&Url>) -> Vec<PageLink> {
    document
        .select(&LINK_SELECTOR)
        .filter_map(|a| {
            let raw = a.value().attr("href")?.trim();
            let lower = raw.to_ascii_lowercase();
            if raw.is_empty() || SKIPPED_HREF_PREFIXES.iter().any(|p| lower.starts_with(p)) {
                return None;
            }

            let href = base
                .and_then(|b| b.join(raw).ok())
                .map(String::from)
                .unwrap_or_else(|| raw.to_string());
            let text = a.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

            Some(PageLink::new(href, text))
        })
        .collect()
}

fn extract_title(document: &Html) -> String {
    let text_of = |selector: &Selector| {
        document
            .select(selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    };
    text_of(&TITLE_SELECTOR)
        .or_else(|| text_of(&H1_SELECTOR))
        .unwrap_or_default()
}

fn remove_boilerplate(document: &mut Html) {
    let doomed: Vec<_> = document
        .select(&BOILERPLATE_SELECTOR)
        .map(|el| el.id())
        .collect();
    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}
