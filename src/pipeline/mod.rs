//! Crawl orchestration.
//!
//! - `Crawler`: breadth-first frontier over one host
//! - `CancellationToken`: cooperative stop signal polled between pages

pub mod cancel;
pub mod crawl;

pub use cancel::CancellationToken;
pub use crawl::{CrawlOutcome, CrawlPhase, CrawlStatus, Crawler};
