//! Leading `key: value` metadata blocks of a page.
//!
//! A page may start with text blocks such as `tags: rust, web` or
//! `publishedon: 2024-03-01`. They are scanned in order until the first
//! block that is not a recognized `key: value` line; that block and
//! everything after it is the article body.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use notiblog_core::{ArticleType, Block, BlockType, Error, Result, Status};

const KEYS: &[&str] = &[
    "tags",
    "id",
    "publishedon",
    "date",
    "createdat",
    "updatedon",
    "status",
    "headerimage",
    "collection",
    "description",
    "type",
    "url",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub id: Option<String>,
    pub tags: Vec<String>,
    pub published_on: Option<DateTime<Utc>>,
    pub date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
    pub status: Status,
    pub header_image: Option<String>,
    pub collection: Option<String>,
    pub description: Option<String>,
    pub article_type: Option<ArticleType>,
    pub url: Option<String>,
    /// Number of leading blocks that held metadata.
    pub consumed: usize,
}

impl Metadata {
    /// Publish date by key precedence: `publishedon`, `date`, `createdat`.
    pub fn publish_date(&self) -> Option<DateTime<Utc>> {
        self.published_on.or(self.date).or(self.created_at)
    }
}

/// Split `key: value`. The key must be a single word.
fn split_line(text: &str) -> Option<(String, &str)> {
    let (key, value) = text.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some((key.to_ascii_lowercase(), value.trim()))
}

/// Rich text turns bare links into `[text](url)`; keep the target.
fn unlink(value: &str) -> &str {
    if let Some(rest) = value.strip_prefix('[')
        && let Some(idx) = rest.find("](")
        && let Some(url) = rest[idx + 2..].strip_suffix(')')
    {
        return url;
    }
    value
}

/// Parse a metadata date: `YYYY-MM-DD`, `YYYY-MM-DD HH:MM` or RFC 3339.
pub fn parse_date(page_id: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M") {
        return Ok(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        && let Some(dt) = d.and_hms_opt(0, 0, 0)
    {
        return Ok(dt.and_utc());
    }
    Err(Error::Date {
        page_id: page_id.to_string(),
        value: value.to_string(),
    })
}

/// Split on whitespace and commas, lowercase, drop `#` and duplicates.
pub fn parse_tags(value: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for raw in value.split(|c: char| c.is_whitespace() || c == ',') {
        let tag = raw.trim_start_matches('#').to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn parse_status(page_id: &str, value: &str) -> Result<Status> {
    match value.to_lowercase().as_str() {
        "" | "normal" => Ok(Status::Normal),
        "notimportant" => Ok(Status::NotImportant),
        "hidden" => Ok(Status::Hidden),
        "draft" => Ok(Status::Draft),
        "deleted" => Ok(Status::Deleted),
        other => Err(Error::Metadata {
            page_id: page_id.to_string(),
            message: format!("unknown status '{}'", other),
        }),
    }
}

fn parse_type(page_id: &str, value: &str) -> Result<ArticleType> {
    match value.to_lowercase().as_str() {
        "post" => Ok(ArticleType::Post),
        "page" => Ok(ArticleType::Page),
        other => Err(Error::Metadata {
            page_id: page_id.to_string(),
            message: format!("unknown type '{}'", other),
        }),
    }
}

fn parse_id(page_id: &str, value: &str) -> Result<String> {
    let id = value.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(Error::Metadata {
            page_id: page_id.to_string(),
            message: format!("invalid id '{}'", value),
        });
    }
    Ok(id.to_string())
}

fn some_nonempty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Scan the leading metadata blocks of a page's top-level content.
pub fn parse_metadata(page_id: &str, blocks: &[Block]) -> Result<Metadata> {
    let mut meta = Metadata::default();

    for block in blocks {
        if block.block_type != BlockType::Text {
            break;
        }
        let Some((key, value)) = split_line(&block.title) else {
            break;
        };
        if !KEYS.contains(&key.as_str()) {
            tracing::debug!("page {}: metadata stops at unknown key '{}'", page_id, key);
            break;
        }

        match key.as_str() {
            "tags" => {
                for tag in parse_tags(value) {
                    if !meta.tags.contains(&tag) {
                        meta.tags.push(tag);
                    }
                }
            }
            "id" => meta.id = Some(parse_id(page_id, value)?),
            "publishedon" => meta.published_on = Some(parse_date(page_id, value)?),
            "date" => meta.date = Some(parse_date(page_id, value)?),
            "createdat" => meta.created_at = Some(parse_date(page_id, value)?),
            "updatedon" => meta.updated_on = Some(parse_date(page_id, value)?),
            "status" => meta.status = parse_status(page_id, value)?,
            "headerimage" => meta.header_image = some_nonempty(unlink(value)),
            "collection" => meta.collection = some_nonempty(value),
            "description" => meta.description = some_nonempty(value),
            "type" => meta.article_type = Some(parse_type(page_id, value)?),
            "url" => {
                let url = unlink(value);
                if !url.starts_with('/') {
                    return Err(Error::Metadata {
                        page_id: page_id.to_string(),
                        message: format!("url override '{}' must start with '/'", url),
                    });
                }
                meta.url = Some(url.to_string());
            }
            _ => {}
        }
        meta.consumed += 1;
    }

    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn text(s: &str) -> Block {
        Block::new("b", BlockType::Text, s, "p")
    }

    #[test]
    fn test_parse_all_keys() {
        let blocks = vec![
            text("Tags: Rust, web #Go rust"),
            text("id: 1s0a"),
            text("publishedOn: 2024-03-01"),
            text("updatedon: 2024-04-02 10:30"),
            text("status: notimportant"),
            text("headerimage: [https://x.org/h.png](https://x.org/h.png)"),
            text("collection: Go Cookbook"),
            text("description: A short one"),
            text("type: page"),
            text("url: /software/"),
            text("Body starts here: not metadata"),
        ];
        let meta = parse_metadata("p", &blocks).unwrap();
        assert_eq!(meta.tags, vec!["rust", "web", "go"]);
        assert_eq!(meta.id.as_deref(), Some("1s0a"));
        assert_eq!(meta.publish_date().unwrap().day(), 1);
        assert_eq!(meta.updated_on.unwrap().hour(), 10);
        assert_eq!(meta.status, Status::NotImportant);
        assert_eq!(meta.header_image.as_deref(), Some("https://x.org/h.png"));
        assert_eq!(meta.collection.as_deref(), Some("Go Cookbook"));
        assert_eq!(meta.article_type, Some(ArticleType::Page));
        assert_eq!(meta.url.as_deref(), Some("/software/"));
        assert_eq!(meta.consumed, 10);
    }

    #[test]
    fn test_unknown_key_stops_scan() {
        let blocks = vec![text("tags: a"), text("author: me"), text("status: hidden")];
        let meta = parse_metadata("p", &blocks).unwrap();
        assert_eq!(meta.consumed, 1);
        assert_eq!(meta.status, Status::Normal);
    }

    #[test]
    fn test_non_text_block_stops_scan() {
        let blocks = vec![
            Block::new("h", BlockType::Header, "tags: a", "p"),
            text("tags: b"),
        ];
        let meta = parse_metadata("p", &blocks).unwrap();
        assert_eq!(meta.consumed, 0);
        assert!(meta.tags.is_empty());
    }

    #[test]
    fn test_publish_date_precedence() {
        let blocks = vec![
            text("date: 2020-01-01"),
            text("createdat: 2019-01-01"),
            text("publishedon: 2021-06-15"),
        ];
        let meta = parse_metadata("p", &blocks).unwrap();
        assert_eq!(meta.publish_date().unwrap().year(), 2021);

        let meta = parse_metadata("p", &blocks[..2]).unwrap();
        assert_eq!(meta.publish_date().unwrap().year(), 2020);
    }

    #[test]
    fn test_malformed_date_is_an_error() {
        let err = parse_metadata("abc", &[text("date: yesterday")]).unwrap_err();
        assert!(matches!(err, Error::Date { ref page_id, ref value } if page_id == "abc" && value == "yesterday"));
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(parse_date("p", "2024-03-01").unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(parse_date("p", "2024-03-01 08:15").unwrap().minute(), 15);
        assert_eq!(parse_date("p", "2024-03-01T10:00:00+02:00").unwrap().hour(), 8);
    }

    #[test]
    fn test_bad_status_and_type() {
        assert!(matches!(
            parse_metadata("p", &[text("status: archived")]),
            Err(Error::Metadata { .. })
        ));
        assert!(matches!(
            parse_metadata("p", &[text("type: essay")]),
            Err(Error::Metadata { .. })
        ));
        assert!(matches!(
            parse_metadata("p", &[text("url: software")]),
            Err(Error::Metadata { .. })
        ));
    }

    #[test]
    fn test_parse_tags_dedup() {
        assert_eq!(parse_tags(" #A,a  b,,"), vec!["a", "b"]);
        assert!(parse_tags("").is_empty());
    }
}
