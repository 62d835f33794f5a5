use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notiblog_core::ids::dashed_id;
use notiblog_core::{Page, normalize_id};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::PageSource;
use crate::convert::{RawBlock, RawList, RawPage, assemble_page};
use crate::error::NotionError;

pub const DEFAULT_API_URL: &str = "https://api.notion.com/v1";
const API_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// REST client for the content service.
#[derive(Clone)]
pub struct NotionClient {
    client: reqwest::Client,
    base_url: String,
}

impl NotionClient {
    /// Create a client authenticated with an integration token.
    pub fn new(token: &str) -> Result<Self, NotionError> {
        Self::with_base_url(token, DEFAULT_API_URL)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, NotionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| NotionError::InvalidToken)?,
        );
        headers.insert("notion-version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, NotionError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::trace!("GET {}", url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err: ApiError = serde_json::from_str(&body).unwrap_or(ApiError {
                code: String::new(),
                message: body,
            });
            return Err(NotionError::Api {
                status: status.as_u16(),
                code: err.code,
                message: err.message,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| NotionError::Decode(e.to_string()))
    }

    /// Page metadata, without blocks.
    pub async fn get_page(&self, id: &str) -> Result<RawPage, NotionError> {
        self.get_json(&format!("/pages/{}", dashed_id(id))).await
    }

    /// All direct children of a block, following pagination cursors.
    pub async fn get_children(&self, block_id: &str) -> Result<Vec<RawBlock>, NotionError> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut path = format!(
                "/blocks/{}/children?page_size={}",
                dashed_id(block_id),
                PAGE_SIZE
            );
            if let Some(c) = &cursor {
                path.push_str("&start_cursor=");
                path.push_str(c);
            }
            let list: RawList<RawBlock> = self.get_json(&path).await?;
            blocks.extend(list.results);
            match list.next_cursor {
                Some(next) if list.has_more => cursor = Some(next),
                _ => break,
            }
        }
        Ok(blocks)
    }
}

#[async_trait]
impl PageSource for NotionClient {
    async fn fetch_page(&self, id: &str) -> notiblog_core::Result<Page> {
        let page_id = normalize_id(id);
        let meta = self.get_page(&page_id).await?;

        let mut children: HashMap<String, Vec<RawBlock>> = HashMap::new();
        let mut queue = VecDeque::from([page_id.clone()]);
        while let Some(block_id) = queue.pop_front() {
            if children.contains_key(&block_id) {
                continue;
            }
            let kids = self.get_children(&block_id).await?;
            for kid in &kids {
                if kid.needs_children() {
                    queue.push_back(normalize_id(&kid.id));
                }
            }
            children.insert(block_id, kids);
        }

        tracing::debug!(
            "fetched page {} ({} blocks with children)",
            page_id,
            children.len()
        );
        Ok(assemble_page(&meta, &children))
    }

    async fn last_edited(&self, id: &str) -> notiblog_core::Result<DateTime<Utc>> {
        Ok(self.get_page(id).await?.last_edited_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_trimmed() {
        let client = NotionClient::with_base_url("secret", "http://localhost:9999/v1/").unwrap();
        assert_eq!(client.base_url, "http://localhost:9999/v1");
    }

    #[test]
    fn test_rejects_token_with_newline() {
        assert!(matches!(
            NotionClient::new("bad\ntoken"),
            Err(NotionError::InvalidToken)
        ));
    }
}
