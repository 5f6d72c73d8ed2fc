// src/services/browser.rs

//! Headless Chromium renderer.
//!
//! Pages are rendered in a real browser so script-built documentation
//! sites produce their final DOM. Extraction then goes through the same
//! [`extract_page`] as the HTTP renderer.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::renderer::{Renderer, RendererLauncher, duration_ms, extract_page};
use crate::error::{AppError, Result};
use crate::models::{PageResult, RendererOptions, Viewport};

/// Interval between network state checks.
const IDLE_POLL: Duration = Duration::from_millis(100);
/// How long the resource count must hold still before the page counts as settled.
const IDLE_QUIET: Duration = Duration::from_millis(500);

const NETWORK_STATE_SCRIPT: &str = r#"
    (() => ({
        readyState: document.readyState,
        resources: performance.getEntriesByType('resource').length
    }))()
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkState {
    ready_state: String,
    resources: u64,
}

/// Launcher for [`BrowserRenderer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserLauncher;

#[async_trait]
impl RendererLauncher for BrowserLauncher {
    async fn launch(&self, options: &RendererOptions) -> Result<Box<dyn Renderer>> {
        Ok(Box::new(BrowserRenderer::launch(options).await?))
    }
}

/// A Chromium instance plus the task driving its CDP connection.
pub struct BrowserRenderer {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    viewport: Viewport,
}

impl BrowserRenderer {
    pub async fn launch(options: &RendererOptions) -> Result<Self> {
        log::info!(
            "Launching {} browser ({}x{})",
            if options.headless { "headless" } else { "headed" },
            options.viewport.width,
            options.viewport.height
        );

        let mut builder = BrowserConfigBuilder::default()
            .window_size(options.viewport.width, options.viewport.height)
            .arg(format!("--user-agent={}", options.user_agent))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--mute-audio");
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(AppError::renderer_init)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::renderer_init(format!("could not start Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("Browser handler error: {e:?}");
                }
            }
            log::debug!("Browser event handler finished");
        });

        Ok(Self {
            browser: Some(browser),
            handler: Some(handler),
            viewport: options.viewport,
        })
    }
}

#[async_trait]
impl Renderer for BrowserRenderer {
    async fn fetch(&mut self, url: &str, timeout: Duration) -> Result<PageResult> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| AppError::fetch(url, "browser is closed"))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::fetch(url, e))?;

        let loaded = tokio::time::timeout(timeout, load(&page, url, self.viewport)).await;

        if let Err(e) = page.close().await {
            log::debug!("Failed to close page for {url}: {e}");
        }

        match loaded {
            Ok(result) => result,
            Err(_) => Err(AppError::timeout(url, duration_ms(timeout))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut browser) = self.browser.take() {
            log::debug!("Closing browser");
            if let Err(e) = browser.close().await {
                log::warn!("Failed to close browser cleanly: {e}");
            }
            if let Err(e) = browser.wait().await {
                log::warn!("Failed to wait for browser exit: {e}");
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        Ok(())
    }
}

impl Drop for BrowserRenderer {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

async fn load(page: &Page, url: &str, viewport: Viewport) -> Result<PageResult> {
    let metrics = SetDeviceMetricsOverrideParams::builder()
        .width(i64::from(viewport.width))
        .height(i64::from(viewport.height))
        .device_scale_factor(1.0)
        .mobile(false)
        .build()
        .map_err(|e| AppError::fetch(url, e))?;
    page.execute(metrics)
        .await
        .map_err(|e| AppError::fetch(url, e))?;

    page.goto(url).await.map_err(|e| AppError::fetch(url, e))?;
    page.wait_for_navigation()
        .await
        .map_err(|e| AppError::fetch(url, e))?;
    wait_for_network_idle(page).await;

    let html = page.content().await.map_err(|e| AppError::fetch(url, e))?;
    let final_url = page
        .url()
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| url.to_string());

    Ok(extract_page(&html, &final_url))
}

/// Wait until the document is complete and no new resources have started
/// loading for [`IDLE_QUIET`].
///
/// Unbounded on its own; `fetch` runs it under the page timeout.
async fn wait_for_network_idle(page: &Page) {
    let mut tracker = IdleTracker::new(IDLE_QUIET, Instant::now());

    loop {
        match page.evaluate(NETWORK_STATE_SCRIPT).await {
            Ok(result) => match result.into_value::<NetworkState>() {
                Ok(state) => {
                    if tracker.observe(&state, Instant::now()) {
                        log::debug!("Network idle with {} resources", state.resources);
                        return;
                    }
                }
                Err(e) => log::debug!("Unreadable network state: {e}"),
            },
            Err(e) => log::debug!("Network state check failed: {e}"),
        }
        tokio::time::sleep(IDLE_POLL).await;
    }
}

/// Decides when a sequence of network state samples has gone quiet.
#[derive(Debug)]
struct IdleTracker {
    quiet: Duration,
    last_count: Option<u64>,
    quiet_since: Instant,
}

impl IdleTracker {
    fn new(quiet: Duration, now: Instant) -> Self {
        Self {
            quiet,
            last_count: None,
            quiet_since: now,
        }
    }

    /// Record a sample; `true` once the page has been settled for `quiet`.
    fn observe(&mut self, state: &NetworkState, now: Instant) -> bool {
        if state.ready_state != "complete" || self.last_count != Some(state.resources) {
            self.last_count = Some(state.resources);
            self.quiet_since = now;
            return false;
        }
        now.duration_since(self.quiet_since) >= self.quiet
    }
}
