//! Page cache and downloader for the content service.
//!
//! Pages are fetched through a [`PageSource`] (the REST client in
//! production, a mock in tests), stored as one JSON file per page, and
//! re-read from disk by every build. Images referenced from pages are
//! cached next to them under `img/`.

pub mod cache;
pub mod client;
pub mod convert;
pub mod downloader;
pub mod error;
pub mod http_cache;
pub mod images;

pub use cache::PageCache;
pub use client::NotionClient;
pub use downloader::{CachePolicy, Download, Downloader, ImportStats};
pub use error::NotionError;
pub use http_cache::HttpDownloadCache;
pub use images::{ImageCache, ImageStats};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notiblog_core::{Page, Result};

/// Where pages come from when the cache cannot answer.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Download a page with its full block tree.
    async fn fetch_page(&self, id: &str) -> Result<Page>;

    /// Last edit time of a page, without downloading its blocks.
    async fn last_edited(&self, id: &str) -> Result<DateTime<Utc>>;
}
