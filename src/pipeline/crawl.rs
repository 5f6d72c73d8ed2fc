// src/pipeline/crawl.rs

//! Breadth-first crawl of a single documentation host.
//!
//! One page is in flight at a time. Each run owns its own frontier, so a
//! [`Crawler`] can be reused for several seeds.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CrawlConfig, FrontierEntry, PageResult};
use crate::pipeline::CancellationToken;
use crate::services::{MarkdownConverter, Renderer, RendererLauncher};
use crate::storage::PageStorage;
use crate::utils::{UrlFilter, map_to_path, normalize};

/// Lifecycle of one crawl run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    Running,
    Completed,
    Interrupted,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        };
        f.write_str(name)
    }
}

/// Terminal state reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    Completed,
    Interrupted,
}

/// Summary of a finished crawl run.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub status: CrawlStatus,
    pub pages_written: usize,
    pub pages_failed: usize,
    /// Entries dropped for exceeding the depth bound.
    pub pages_skipped: usize,
    pub links_queued: usize,
    /// Written files, in crawl order.
    pub written: Vec<PathBuf>,
    /// Canonical URLs that were written, in crawl order.
    pub visited: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlOutcome {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn is_interrupted(&self) -> bool {
        self.status == CrawlStatus::Interrupted
    }
}

/// Frontier and bookkeeping for a single `crawl` invocation.
struct CrawlRun {
    phase: CrawlPhase,
    queue: VecDeque<FrontierEntry>,
    pending: HashSet<String>,
    visited: HashSet<String>,
    abandoned: HashSet<String>,
    visited_order: Vec<String>,
    written: Vec<PathBuf>,
    failed: usize,
    skipped: usize,
    links_queued: usize,
}

impl CrawlRun {
    fn new(seed: &str) -> Self {
        let mut run = Self {
            phase: CrawlPhase::Idle,
            queue: VecDeque::new(),
            pending: HashSet::new(),
            visited: HashSet::new(),
            abandoned: HashSet::new(),
            visited_order: Vec::new(),
            written: Vec::new(),
            failed: 0,
            skipped: 0,
            links_queued: 0,
        };
        run.enqueue(seed.to_string(), 0);
        run
    }

    fn transition(&mut self, to: CrawlPhase) {
        log::debug!("Crawl phase: {} -> {}", self.phase, to);
        self.phase = to;
    }

    /// Whether `url` has already been seen in any form.
    fn is_known(&self, url: &str) -> bool {
        self.visited.contains(url) || self.pending.contains(url) || self.abandoned.contains(url)
    }

    fn enqueue(&mut self, url: String, depth: u32) -> bool {
        if self.is_known(&url) {
            return false;
        }
        self.pending.insert(url.clone());
        self.queue.push_back(FrontierEntry::new(url, depth));
        true
    }

    fn dequeue(&mut self) -> Option<FrontierEntry> {
        let entry = self.queue.pop_front()?;
        self.pending.remove(&entry.url);
        Some(entry)
    }

    fn mark_written(&mut self, url: &str, path: PathBuf) {
        self.visited.insert(url.to_string());
        self.visited_order.push(url.to_string());
        self.written.push(path);
    }

    fn abandon(&mut self, url: &str) {
        self.abandoned.insert(url.to_string());
        self.failed += 1;
    }

    fn finish(self, started_at: DateTime<Utc>) -> CrawlOutcome {
        let status = if self.phase == CrawlPhase::Interrupted {
            CrawlStatus::Interrupted
        } else {
            CrawlStatus::Completed
        };
        CrawlOutcome {
            status,
            pages_written: self.written.len(),
            pages_failed: self.failed,
            pages_skipped: self.skipped,
            links_queued: self.links_queued,
            written: self.written,
            visited: self.visited_order,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Crawl orchestrator.
pub struct Crawler {
    config: Arc<CrawlConfig>,
    launcher: Arc<dyn RendererLauncher>,
    storage: Arc<dyn PageStorage>,
    converter: MarkdownConverter,
}

impl Crawler {
    /// Create a crawler. Fails if a configured strip selector is invalid.
    pub fn new(
        config: CrawlConfig,
        launcher: Arc<dyn RendererLauncher>,
        storage: Arc<dyn PageStorage>,
    ) -> Result<Self> {
        let converter = MarkdownConverter::with_strip_selectors(&config.strip_selectors)?;
        Ok(Self {
            config: Arc::new(config),
            launcher,
            storage,
            converter,
        })
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl from `start_url` until the frontier is empty or `cancel` fires.
    ///
    /// Only setup failures are returned as errors: an unusable seed, an
    /// output directory that cannot be created, or a renderer that cannot
    /// be launched. Failures of individual pages are logged and counted.
    pub async fn crawl(&self, start_url: &str, cancel: &CancellationToken) -> Result<CrawlOutcome> {
        let started_at = Utc::now();
        let seed = canonical_seed(start_url)?;
        let filter = UrlFilter::new(
            &seed,
            &self.config.include_patterns,
            &self.config.exclude_patterns,
        )?;

        self.storage.ensure_dir(&self.config.output_dir).await?;

        log::info!("Starting crawl: {seed}");
        log::info!(
            "Max depth: {}, output: {}",
            self.config.max_depth,
            self.config.output_dir.display()
        );

        let mut renderer = self.launcher.launch(&self.config.renderer).await?;

        let mut run = CrawlRun::new(&seed);
        run.transition(CrawlPhase::Running);
        self.drain(renderer.as_mut(), &filter, &mut run, cancel)
            .await;

        if let Err(e) = renderer.close().await {
            log::warn!("Failed to close renderer: {e}");
        }

        let outcome = run.finish(started_at);
        log::info!(
            "Crawl {}: {} written, {} failed, {} skipped in {:.1}s",
            if outcome.is_interrupted() {
                "interrupted"
            } else {
                "completed"
            },
            outcome.pages_written,
            outcome.pages_failed,
            outcome.pages_skipped,
            outcome.duration().num_milliseconds() as f64 / 1000.0
        );
        Ok(outcome)
    }

    /// Process queue entries until the frontier empties or a stop is requested.
    async fn drain(
        &self,
        renderer: &mut dyn Renderer,
        filter: &UrlFilter,
        run: &mut CrawlRun,
        cancel: &CancellationToken,
    ) {
        loop {
            if cancel.is_cancelled() {
                log::info!("Crawl interrupted, {} entries left in queue", run.queue.len());
                run.transition(CrawlPhase::Interrupted);
                return;
            }
            let Some(entry) = run.dequeue() else {
                run.transition(CrawlPhase::Completed);
                return;
            };

            if run.visited.contains(&entry.url) {
                continue;
            }
            if entry.depth > self.config.max_depth {
                log::debug!("Skipping {} (depth {})", entry.url, entry.depth);
                run.skipped += 1;
                continue;
            }

            log::info!("Crawling [depth {}]: {}", entry.depth, entry.url);
            let page = match renderer.fetch(&entry.url, self.config.timeout).await {
                Ok(page) => page,
                Err(e) => {
                    self.report_failure(&entry.url, &e);
                    run.abandon(&entry.url);
                    continue;
                }
            };

            match self.persist(&entry.url, &page).await {
                Ok(path) => {
                    log::info!("Saved: {}", path.display());
                    run.mark_written(&entry.url, path);
                    if entry.depth < self.config.max_depth {
                        self.enqueue_links(&page, &entry, filter, run);
                    }
                }
                Err(e) => {
                    self.report_failure(&entry.url, &e);
                    run.abandon(&entry.url);
                }
            }

            if !self.config.delay.is_zero() {
                tokio::time::sleep(self.config.delay).await;
            }
        }
    }

    /// Convert a rendered page and write it to its mapped path.
    async fn persist(&self, url: &str, page: &PageResult) -> Result<PathBuf> {
        let markdown = self.converter.convert(&page.content, url)?;
        let path = map_to_path(&self.config.output_dir, url);
        if let Some(parent) = path.parent() {
            self.storage.ensure_dir(parent).await?;
        }
        self.storage.write_file(&path, &markdown).await?;
        Ok(path)
    }

    fn enqueue_links(
        &self,
        page: &PageResult,
        entry: &FrontierEntry,
        filter: &UrlFilter,
        run: &mut CrawlRun,
    ) {
        let mut queued = 0;
        for link in filter.filter_links(&page.links, &entry.url) {
            if run.enqueue(link.href, entry.depth + 1) {
                queued += 1;
            }
        }
        run.links_queued += queued;
        log::debug!("Queued {queued} new links from {}", entry.url);
    }

    fn report_failure(&self, url: &str, err: &AppError) {
        if err.is_timeout() {
            log::error!("Timeout loading {url}: {err}");
        } else {
            log::error!("Failed to process {url}: {err}");
        }
        if self.config.verbose {
            log::error!("{err:?}");
        }
    }
}

/// Canonical form of a seed URL, which must be absolute http(s) with a host.
fn canonical_seed(start_url: &str) -> Result<String> {
    let invalid = || AppError::validation(format!("Invalid start URL: {start_url}"));

    let parsed = Url::parse(start_url.trim()).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }
    normalize(parsed.as_str(), parsed.as_str()).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::models::{PageLink, RendererOptions};
    use crate::storage::LocalStorage;

    #[derive(Clone)]
    enum Script {
        Page(PageResult),
        Timeout,
        Fail,
    }

    /// In-memory site served by a scripted renderer.
    #[derive(Clone, Default)]
    struct ScriptedSite {
        pages: HashMap<String, Script>,
        fetched: Arc<Mutex<Vec<String>>>,
        launches: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
        cancel_after: Option<(usize, CancellationToken)>,
        fail_launch: bool,
    }

    impl ScriptedSite {
        fn page(mut self, url: &str, heading: &str, links: &[&str]) -> Self {
            let result = PageResult {
                content: format!("<h1>{heading}</h1><p>Body of {heading}</p>"),
                links: links.iter().map(|href| PageLink::new(*href, "")).collect(),
                title: heading.to_string(),
            };
            self.pages.insert(url.to_string(), Script::Page(result));
            self
        }

        fn script(mut self, url: &str, script: Script) -> Self {
            self.pages.insert(url.to_string(), script);
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    struct ScriptedRenderer {
        site: ScriptedSite,
    }

    #[async_trait]
    impl Renderer for ScriptedRenderer {
        async fn fetch(&mut self, url: &str, timeout: Duration) -> Result<PageResult> {
            let count = {
                let mut fetched = self.site.fetched.lock().unwrap();
                fetched.push(url.to_string());
                fetched.len()
            };
            if let Some((after, token)) = &self.site.cancel_after {
                if count == *after {
                    token.cancel();
                }
            }

            match self.site.pages.get(url) {
                Some(Script::Page(page)) => Ok(page.clone()),
                Some(Script::Timeout) => Err(AppError::timeout(url, timeout.as_millis() as u64)),
                Some(Script::Fail) | None => Err(AppError::fetch(url, "HTTP 404 Not Found")),
            }
        }

        async fn close(&mut self) -> Result<()> {
            self.site.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl RendererLauncher for ScriptedSite {
        async fn launch(&self, _options: &RendererOptions) -> Result<Box<dyn Renderer>> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            if self.fail_launch {
                return Err(AppError::renderer_init("no browser available"));
            }
            Ok(Box::new(ScriptedRenderer { site: self.clone() }))
        }
    }

    fn config(tmp: &TempDir, max_depth: u32) -> CrawlConfig {
        CrawlConfig {
            max_depth,
            output_dir: tmp.path().join("out"),
            delay: Duration::ZERO,
            ..CrawlConfig::default()
        }
    }

    fn crawler(site: &ScriptedSite, config: CrawlConfig) -> Crawler {
        let storage = Arc::new(LocalStorage::new(config.output_dir.clone()));
        Crawler::new(config, Arc::new(site.clone()), storage).unwrap()
    }

    fn count_files(dir: &Path) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return 0;
        };
        entries
            .flatten()
            .map(|e| {
                let path = e.path();
                if path.is_dir() { count_files(&path) } else { 1 }
            })
            .sum()
    }

    #[tokio::test]
    async fn test_depth_zero_writes_only_seed() {
        let tmp = TempDir::new().unwrap();
        let site = ScriptedSite::default().page("https://example.com/", "Home", &["/a", "/b"]);
        let crawler = crawler(&site, config(&tmp, 0));

        let outcome = crawler
            .crawl("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, CrawlStatus::Completed);
        assert_eq!(outcome.pages_written, 1);
        assert_eq!(outcome.links_queued, 0);
        assert_eq!(site.fetched(), vec!["https://example.com/"]);

        let index = tmp.path().join("out/example.com/index.md");
        assert_eq!(outcome.written, vec![index.clone()]);
        assert_eq!(count_files(&tmp.path().join("out")), 1);

        let text = std::fs::read_to_string(index).unwrap();
        assert!(text.starts_with("---\nsource: https://example.com/\ncrawled_at: "));
        assert!(text.contains("# Home"));
    }

    #[tokio::test]
    async fn test_breadth_first_order_and_depth_bound() {
        let tmp = TempDir::new().unwrap();
        let site = ScriptedSite::default()
            .page("https://example.com/", "Home", &["/a", "/b"])
            .page("https://example.com/a", "A", &["/a/deep", "/b"])
            .page("https://example.com/b", "B", &["/a", "/#top", "/"])
            .page("https://example.com/a/deep", "Deep", &["/a/deep/deeper"])
            .page("https://example.com/a/deep/deeper", "Deeper", &[]);
        let crawler = crawler(&site, config(&tmp, 2));

        let outcome = crawler
            .crawl("https://example.com", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            site.fetched(),
            vec![
                "https://example.com/",
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/a/deep",
            ]
        );
        assert_eq!(outcome.visited, site.fetched());
        assert_eq!(outcome.pages_written, 4);
        assert_eq!(outcome.links_queued, 3);
        assert!(
            tmp.path()
                .join("out/example.com/a/deep.md")
                .exists()
        );
        assert!(
            !tmp.path()
                .join("out/example.com/a/deep/deeper.md")
                .exists()
        );
    }

    #[tokio::test]
    async fn test_no_url_fetched_twice() {
        let tmp = TempDir::new().unwrap();
        let site = ScriptedSite::default()
            .page(
                "https://example.com/",
                "Home",
                &["/a", "/a/", "/a#intro", "/a?utm_source=x", "https://EXAMPLE.com:443/a"],
            )
            .page("https://example.com/a", "A", &["/", "/a"]);
        let crawler = crawler(&site, config(&tmp, 3));

        let outcome = crawler
            .crawl("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            site.fetched(),
            vec!["https://example.com/", "https://example.com/a"]
        );
        assert_eq!(outcome.pages_written, 2);
        assert_eq!(count_files(&tmp.path().join("out")), 2);
    }

    #[tokio::test]
    async fn test_interrupt_after_two_pages() {
        let tmp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        let mut site = ScriptedSite::default()
            .page("https://example.com/", "Home", &["/1", "/2", "/3", "/4"])
            .page("https://example.com/1", "One", &[])
            .page("https://example.com/2", "Two", &[])
            .page("https://example.com/3", "Three", &[])
            .page("https://example.com/4", "Four", &[]);
        site.cancel_after = Some((2, token.clone()));
        let crawler = crawler(&site, config(&tmp, 1));

        let outcome = crawler.crawl("https://example.com/", &token).await.unwrap();

        assert_eq!(outcome.status, CrawlStatus::Interrupted);
        assert!(outcome.is_interrupted());
        assert_eq!(outcome.pages_written, 2);
        assert_eq!(count_files(&tmp.path().join("out")), 2);
        assert_eq!(site.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let site = ScriptedSite::default().page("https://example.com/", "Home", &[]);
        let crawler = crawler(&site, config(&tmp, 1));

        let outcome = crawler.crawl("https://example.com/", &token).await.unwrap();

        assert_eq!(outcome.status, CrawlStatus::Interrupted);
        assert_eq!(outcome.pages_written, 0);
        assert!(site.fetched().is_empty());
        assert_eq!(site.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_does_not_abort_crawl() {
        let tmp = TempDir::new().unwrap();
        let site = ScriptedSite::default()
            .page("https://example.com/", "Home", &["/slow", "/ok"])
            .script("https://example.com/slow", Script::Timeout)
            .page("https://example.com/ok", "Ok", &[]);
        let crawler = crawler(&site, config(&tmp, 1));

        let outcome = crawler
            .crawl("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, CrawlStatus::Completed);
        assert_eq!(outcome.pages_written, 2);
        assert_eq!(outcome.pages_failed, 1);
        assert!(tmp.path().join("out/example.com/ok.md").exists());
        assert!(!tmp.path().join("out/example.com/slow.md").exists());
    }

    #[tokio::test]
    async fn test_failed_page_is_not_retried() {
        let tmp = TempDir::new().unwrap();
        let site = ScriptedSite::default()
            .page("https://example.com/", "Home", &["/broken", "/a"])
            .script("https://example.com/broken", Script::Fail)
            .page("https://example.com/a", "A", &["/broken"]);
        let crawler = crawler(&site, config(&tmp, 3));

        let outcome = crawler
            .crawl("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();

        let broken_fetches = site
            .fetched()
            .iter()
            .filter(|u| u.ends_with("/broken"))
            .count();
        assert_eq!(broken_fetches, 1);
        assert_eq!(outcome.pages_failed, 1);
        assert_eq!(outcome.pages_written, 2);
    }

    #[tokio::test]
    async fn test_scope_and_patterns_filter_links() {
        let tmp = TempDir::new().unwrap();
        let site = ScriptedSite::default()
            .page(
                "https://example.com/",
                "Home",
                &[
                    "https://other.org/x",
                    "https://docs.example.com/y",
                    "/login/reset",
                    "/docs/x",
                    "/manual.pdf",
                ],
            )
            .page("https://example.com/docs/x", "X", &[]);
        let mut config = config(&tmp, 1);
        config.exclude_patterns = vec!["*/login*".to_string(), "*.pdf".to_string()];
        let crawler = crawler(&site, config);

        let outcome = crawler
            .crawl("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            site.fetched(),
            vec!["https://example.com/", "https://example.com/docs/x"]
        );
        let host_root = tmp.path().join("out/example.com");
        assert!(outcome.written.iter().all(|p| p.starts_with(&host_root)));
    }

    #[tokio::test]
    async fn test_include_patterns_limit_followed_links() {
        let tmp = TempDir::new().unwrap();
        let site = ScriptedSite::default()
            .page("https://example.com/", "Home", &["/docs/a", "/blog/b"])
            .page("https://example.com/docs/a", "A", &[]);
        let mut config = config(&tmp, 1);
        config.include_patterns = vec!["*/docs/*".to_string()];
        let crawler = crawler(&site, config);

        crawler
            .crawl("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            site.fetched(),
            vec!["https://example.com/", "https://example.com/docs/a"]
        );
    }

    #[tokio::test]
    async fn test_launch_failure_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let site = ScriptedSite {
            fail_launch: true,
            ..ScriptedSite::default()
        };
        let crawler = crawler(&site, config(&tmp, 1));

        let err = crawler
            .crawl("https://example.com/", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RendererInit(_)));
        assert!(site.fetched().is_empty());
        assert_eq!(site.closes.load(Ordering::SeqCst), 0);
        assert_eq!(count_files(&tmp.path().join("out")), 0);
    }

    #[tokio::test]
    async fn test_invalid_seed_rejected_before_launch() {
        let tmp = TempDir::new().unwrap();
        let site = ScriptedSite::default();
        let crawler = crawler(&site, config(&tmp, 1));

        for seed in ["not a url", "ftp://example.com/", "mailto:a@example.com"] {
            let err = crawler
                .crawl(seed, &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "seed {seed}");
        }
        assert_eq!(site.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_renderer_closed_once_on_completion() {
        let tmp = TempDir::new().unwrap();
        let site = ScriptedSite::default()
            .page("https://example.com/", "Home", &["/a"])
            .script("https://example.com/a", Script::Fail);
        let crawler = crawler(&site, config(&tmp, 1));

        crawler
            .crawl("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(site.launches.load(Ordering::SeqCst), 1);
        assert_eq!(site.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_follows_every_rendered_page() {
        let tmp = TempDir::new().unwrap();
        let site = ScriptedSite::default()
            .page(
                "https://example.com/",
                "Home",
                &["/ok", "/missing", "/broken/page", "/slow"],
            )
            .page("https://example.com/ok", "Ok", &[])
            .page("https://example.com/broken/page", "Broken", &[])
            .script("https://example.com/slow", Script::Timeout);

        // a file where the page's parent directory should go makes the write fail
        let blocker = tmp.path().join("out/example.com/broken");
        std::fs::create_dir_all(blocker.parent().unwrap()).unwrap();
        std::fs::write(&blocker, "").unwrap();

        let mut config = config(&tmp, 1);
        config.delay = Duration::from_millis(1000);
        let crawler = crawler(&site, config);

        let start = tokio::time::Instant::now();
        let outcome = crawler
            .crawl("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(site.fetched().len(), 5);
        assert_eq!(outcome.pages_written, 2);
        assert_eq!(outcome.pages_failed, 3);
        // home, ok and broken/page rendered; missing and slow did not
        assert!(elapsed >= Duration::from_millis(3000), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(4000), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_delay_after_failed_render() {
        let tmp = TempDir::new().unwrap();
        let site = ScriptedSite::default().script("https://example.com/", Script::Timeout);
        let mut config = config(&tmp, 1);
        config.delay = Duration::from_secs(5);
        let crawler = crawler(&site, config);

        let start = tokio::time::Instant::now();
        let outcome = crawler
            .crawl("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.pages_failed, 1);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_strip_selector_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut config = config(&tmp, 1);
        config.strip_selectors = vec!["<<".to_string()];
        let site = ScriptedSite::default();
        let storage = Arc::new(LocalStorage::new(config.output_dir.clone()));

        assert!(Crawler::new(config, Arc::new(site), storage).is_err());
    }

    #[test]
    fn test_canonical_seed() {
        assert_eq!(
            canonical_seed("https://Example.com/docs/#top").unwrap(),
            "https://example.com/docs"
        );
        assert_eq!(
            canonical_seed("https://example.com").unwrap(),
            "https://example.com/"
        );
    }
}
