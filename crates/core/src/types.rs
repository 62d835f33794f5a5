use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ids::{image_key, normalize_id, urlify};

/// Kind of a content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// A page; the root block of every [`Page`] and a link to a sub-page elsewhere.
    Page,
    Text,
    Header,
    SubHeader,
    SubSubHeader,
    BulletedList,
    NumberedList,
    Todo,
    Toggle,
    Quote,
    Callout,
    Code,
    Divider,
    Image,
    Bookmark,
    ColumnList,
    Column,
    /// Anything the renderer does not know about; rendered as nothing.
    Unsupported(String),
}

/// One node of a page's block tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    /// Block text as inline Markdown. For pages, the page title.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub parent_id: String,
    /// Code language for code blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Source URL for images and bookmarks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Block>,
}

impl Block {
    pub fn new(id: &str, block_type: BlockType, title: &str, parent_id: &str) -> Self {
        Self {
            id: id.to_string(),
            block_type,
            title: title.to_string(),
            parent_id: parent_id.to_string(),
            language: None,
            source: None,
            checked: None,
            content: Vec::new(),
        }
    }

    pub fn is_page(&self) -> bool {
        self.block_type == BlockType::Page
    }

    /// Visit this block and all descendants without recursion, parents first.
    pub fn walk(&self) -> BlockWalk<'_> {
        BlockWalk { stack: vec![self] }
    }
}

/// Depth-first pre-order iterator over a block tree.
pub struct BlockWalk<'a> {
    stack: Vec<&'a Block>,
}

impl<'a> Iterator for BlockWalk<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<&'a Block> {
        let block = self.stack.pop()?;
        self.stack.extend(block.content.iter().rev());
        Some(block)
    }
}

/// A page downloaded from the content service. Read-only to the site builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub created_time: DateTime<Utc>,
    pub last_edited_time: DateTime<Utc>,
    pub root: Block,
}

impl Page {
    pub fn root(&self) -> &Block {
        &self.root
    }

    pub fn title(&self) -> &str {
        &self.root.title
    }

    /// Normalized id, the key used by the cache and every index.
    pub fn normalized_id(&self) -> String {
        normalize_id(&self.id)
    }

    /// Ids of sub-pages linked from this page's block tree.
    pub fn sub_page_ids(&self) -> Vec<String> {
        self.root
            .walk()
            .skip(1)
            .filter(|b| b.is_page())
            .map(|b| normalize_id(&b.id))
            .collect()
    }

    /// Source URLs of every image block.
    pub fn image_urls(&self) -> Vec<String> {
        self.root
            .walk()
            .filter(|b| b.block_type == BlockType::Image)
            .filter_map(|b| b.source.clone())
            .collect()
    }
}

/// One breadcrumb entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPath {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArticleType {
    Post,
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Normal,
    NotImportant,
    Hidden,
    Draft,
    Deleted,
}

/// Image referenced by an article body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub source_url: String,
    /// `/img/<file>` when the image is in the local cache.
    pub local_url: Option<String>,
}

/// Site-model representation of one published page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    /// Normalized id of the page this article was built from.
    pub page_id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub published_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub article_type: ArticleType,
    pub status: Status,
    pub description: Option<String>,
    pub header_image: Option<String>,
    pub collection: Option<String>,
    pub url_override: Option<String>,
    pub body_html: String,
    pub paths: Vec<UrlPath>,
    pub images: Vec<ImageRef>,
}

impl Article {
    /// Canonical URL: the override if present, else `/article/<id>/<slug>`.
    pub fn url(&self) -> String {
        if let Some(url) = &self.url_override {
            return url.clone();
        }
        format!("/article/{}/{}", self.id, urlify(&self.title))
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self.status, Status::Hidden | Status::Draft | Status::Deleted)
    }

    pub fn is_blog(&self) -> bool {
        self.article_type == ArticleType::Post
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "no title"
        } else {
            &self.title
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whole days between the last update and `now`.
    pub fn updated_age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.updated_on).num_days()
    }
}

/// Lookup of cached images by [`image_key`].
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    by_key: HashMap<String, String>,
}

impl ImageIndex {
    /// Build from cached file names of the form `<key><ext>`.
    pub fn from_file_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut by_key = HashMap::new();
        for name in names {
            let name = name.into();
            let key = name.split('.').next().unwrap_or_default().to_string();
            if !key.is_empty() {
                by_key.insert(key, name);
            }
        }
        Self { by_key }
    }

    pub fn file_name(&self, source_url: &str) -> Option<&str> {
        self.by_key.get(&image_key(source_url)).map(String::as_str)
    }

    /// Site URL of the cached copy of `source_url`.
    pub fn local_url(&self, source_url: &str) -> Option<String> {
        self.file_name(source_url).map(|f| format!("/img/{}", f))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
