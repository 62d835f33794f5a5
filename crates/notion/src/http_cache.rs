//! In-memory cache of HTTP GET responses with time-based expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::error::NotionError;

pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(24 * 60 * 60);
const SWEEP_SLACK: Duration = Duration::from_secs(4 * 60);

/// Body and content type of a downloaded resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

struct Entry {
    response: HttpResponse,
    downloaded_on: Instant,
}

pub struct HttpDownloadCache {
    client: reqwest::Client,
    expiration: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl HttpDownloadCache {
    pub fn new(client: reqwest::Client, expiration: Duration) -> Arc<Self> {
        Arc::new(Self {
            client,
            expiration,
            entries: Mutex::new(HashMap::new()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Spawn a task that drops expired entries every `expiration + 4min`.
    ///
    /// The task ends once the cache itself is dropped.
    pub fn start_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.expiration + SWEEP_SLACK;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                let removed = cache.remove_expired();
                if removed > 0 {
                    tracing::debug!("http cache: dropped {} expired entries", removed);
                }
            }
        })
    }

    /// Remove every expired entry, returning how many were removed.
    pub fn remove_expired(&self) -> usize {
        let expiration = self.expiration;
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| e.downloaded_on.elapsed() < expiration);
        before - entries.len()
    }

    /// Unexpired cached response for `url`.
    pub fn get(&self, url: &str) -> Option<HttpResponse> {
        self.lock()
            .get(url)
            .filter(|e| e.downloaded_on.elapsed() < self.expiration)
            .map(|e| e.response.clone())
    }

    pub fn insert(&self, url: &str, response: HttpResponse) {
        self.lock().insert(
            url.to_string(),
            Entry {
                response,
                downloaded_on: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// GET `url`, served from memory when a fresh copy exists.
    ///
    /// The second value is true when the response came from the cache.
    pub async fn download(&self, url: &str) -> Result<(HttpResponse, bool), NotionError> {
        if let Some(hit) = self.get(url) {
            return Ok((hit, true));
        }

        let response = self.client.get(url).send().await?.error_for_status()?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = response.bytes().await?.to_vec();

        let downloaded = HttpResponse { data, content_type };
        self.insert(url, downloaded.clone());
        Ok((downloaded, false))
    }
}
