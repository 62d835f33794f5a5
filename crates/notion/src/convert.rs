//! Conversion from REST API payloads to the [`Page`]/[`Block`] model.
//!
//! Rich text is flattened to inline Markdown so the renderer only has to
//! deal with one format.

use chrono::{DateTime, Utc};
use notiblog_core::{Block, BlockType, Page, normalize_id};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};

/// `GET /v1/pages/{id}` response, reduced to what the site needs.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPage {
    pub id: String,
    pub created_time: DateTime<Utc>,
    pub last_edited_time: DateTime<Utc>,
    #[serde(default)]
    pub parent: Value,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// One entry of `GET /v1/blocks/{id}/children`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl RawBlock {
    /// Blocks whose children belong to another page are not expanded.
    pub fn needs_children(&self) -> bool {
        self.has_children && self.kind != "child_page" && self.kind != "child_database"
    }

    fn payload(&self) -> Option<&Value> {
        self.body.get(&self.kind)
    }
}

/// Paginated list envelope.
#[derive(Debug, Deserialize)]
pub struct RawList<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RichText {
    #[serde(default)]
    plain_text: String,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    annotations: Annotations,
}

#[derive(Debug, Default, Deserialize)]
struct Annotations {
    #[serde(default)]
    bold: bool,
    #[serde(default)]
    italic: bool,
    #[serde(default)]
    strikethrough: bool,
    #[serde(default)]
    code: bool,
}

fn parse_rich_text(value: Option<&Value>) -> Vec<RichText> {
    value
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

/// Flatten a rich text array to inline Markdown.
pub fn rich_text_to_markdown(value: Option<&Value>) -> String {
    let mut out = String::new();
    for span in parse_rich_text(value) {
        if span.plain_text.is_empty() {
            continue;
        }
        let a = &span.annotations;
        let mut text = if a.code {
            format!("`{}`", span.plain_text)
        } else {
            span.plain_text.clone()
        };
        if a.bold {
            text = format!("**{}**", text);
        }
        if a.italic {
            text = format!("*{}*", text);
        }
        if a.strikethrough {
            text = format!("~~{}~~", text);
        }
        if let Some(href) = &span.href {
            text = format!("[{}]({})", text, href);
        }
        out.push_str(&text);
    }
    out
}

fn plain_text(value: Option<&Value>) -> String {
    parse_rich_text(value)
        .into_iter()
        .map(|s| s.plain_text)
        .collect()
}

/// Title of a page: the property of type `title`.
pub fn page_title(page: &RawPage) -> String {
    page.properties
        .values()
        .find(|p| p.get("type").and_then(Value::as_str) == Some("title"))
        .map(|p| plain_text(p.get("title")))
        .unwrap_or_default()
}

fn parent_id(parent: &Value) -> String {
    let Some(kind) = parent.get("type").and_then(Value::as_str) else {
        return String::new();
    };
    parent
        .get(kind)
        .and_then(Value::as_str)
        .map(normalize_id)
        .unwrap_or_default()
}

fn file_url(payload: &Value) -> Option<String> {
    let kind = payload.get("type")?.as_str()?;
    payload
        .get(kind)?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

/// Convert one API block, without children.
pub fn convert_block(raw: &RawBlock, parent: &str) -> Block {
    let block_type = match raw.kind.as_str() {
        "paragraph" => BlockType::Text,
        "heading_1" => BlockType::Header,
        "heading_2" => BlockType::SubHeader,
        "heading_3" => BlockType::SubSubHeader,
        "bulleted_list_item" => BlockType::BulletedList,
        "numbered_list_item" => BlockType::NumberedList,
        "to_do" => BlockType::Todo,
        "toggle" => BlockType::Toggle,
        "quote" => BlockType::Quote,
        "callout" => BlockType::Callout,
        "code" => BlockType::Code,
        "divider" => BlockType::Divider,
        "image" => BlockType::Image,
        "bookmark" | "embed" | "link_preview" => BlockType::Bookmark,
        "column_list" => BlockType::ColumnList,
        "column" => BlockType::Column,
        "child_page" => BlockType::Page,
        other => BlockType::Unsupported(other.to_string()),
    };

    let payload = raw.payload();
    let title = match &block_type {
        BlockType::Page => payload
            .and_then(|p| p.get("title"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        BlockType::Code => plain_text(payload.and_then(|p| p.get("rich_text"))),
        BlockType::Image => plain_text(payload.and_then(|p| p.get("caption"))),
        _ => rich_text_to_markdown(payload.and_then(|p| p.get("rich_text"))),
    };

    let mut block = Block::new(&normalize_id(&raw.id), block_type, &title, parent);
    if let Some(payload) = payload {
        match block.block_type {
            BlockType::Code => {
                block.language = payload
                    .get("language")
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
            BlockType::Todo => {
                block.checked = payload.get("checked").and_then(Value::as_bool);
            }
            BlockType::Image => block.source = file_url(payload),
            BlockType::Bookmark => {
                block.source = payload
                    .get("url")
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
            _ => {}
        }
    }
    block
}

/// Build a [`Page`] from its metadata and the children of every expanded block.
///
/// `children` is keyed by normalized parent id. Assembly is iterative so
/// deeply nested pages cannot overflow the stack.
pub fn assemble_page(meta: &RawPage, children: &HashMap<String, Vec<RawBlock>>) -> Page {
    let page_id = normalize_id(&meta.id);

    // breadth-first flattening: (parent id, block)
    let mut order: Vec<(String, Block)> = Vec::new();
    let mut queue = VecDeque::from([page_id.clone()]);
    while let Some(parent) = queue.pop_front() {
        let Some(kids) = children.get(&parent) else {
            continue;
        };
        for raw in kids {
            let block = convert_block(raw, &parent);
            if raw.needs_children() {
                queue.push_back(block.id.clone());
            }
            order.push((parent.clone(), block));
        }
    }

    // children always come after their parent, so a reverse pass sees them first
    let mut done: HashMap<String, Vec<Block>> = HashMap::new();
    for (parent, mut block) in order.into_iter().rev() {
        if let Some(mut kids) = done.remove(&block.id) {
            kids.reverse();
            block.content = kids;
        }
        done.entry(parent).or_default().push(block);
    }

    let mut root = Block::new(&page_id, BlockType::Page, &page_title(meta), &parent_id(&meta.parent));
    if let Some(mut kids) = done.remove(&page_id) {
        kids.reverse();
        root.content = kids;
    }

    Page {
        id: page_id,
        created_time: meta.created_time,
        last_edited_time: meta.last_edited_time,
        root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_block(id: &str, kind: &str, payload: Value, has_children: bool) -> RawBlock {
        let mut value = json!({
            "object": "block",
            "id": id,
            "type": kind,
            "has_children": has_children,
        });
        value[kind] = payload;
        serde_json::from_value(value).unwrap()
    }

    fn text(s: &str) -> Value {
        json!({ "rich_text": [{ "plain_text": s, "annotations": {} }] })
    }

    fn raw_page() -> RawPage {
        serde_json::from_value(json!({
            "id": "AAAAAAAA-0000-0000-0000-000000000001",
            "created_time": "2024-01-02T03:04:05.000Z",
            "last_edited_time": "2024-02-03T04:05:06.000Z",
            "parent": { "type": "page_id", "page_id": "BBBBBBBB-0000-0000-0000-000000000002" },
            "properties": {
                "title": { "id": "title", "type": "title", "title": [{ "plain_text": "My " }, { "plain_text": "Page" }] }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_rich_text_annotations() {
        let value = json!([
            { "plain_text": "plain " },
            { "plain_text": "bold", "annotations": { "bold": true } },
            { "plain_text": " and " },
            { "plain_text": "code", "annotations": { "code": true } },
            { "plain_text": " " },
            { "plain_text": "link", "href": "https://example.com" }
        ]);
        assert_eq!(
            rich_text_to_markdown(Some(&value)),
            "plain **bold** and `code` [link](https://example.com)"
        );
        assert_eq!(rich_text_to_markdown(None), "");
    }

    #[test]
    fn test_page_title_and_parent() {
        let page = assemble_page(&raw_page(), &HashMap::new());
        assert_eq!(page.title(), "My Page");
        assert_eq!(page.id, "aaaaaaaa000000000000000000000001");
        assert_eq!(page.root.parent_id, "bbbbbbbb000000000000000000000002");
        assert!(page.root.content.is_empty());
    }

    #[test]
    fn test_convert_special_blocks() {
        let code = raw_block(
            "c1",
            "code",
            json!({ "rich_text": [{ "plain_text": "let x = 1;" }], "language": "rust" }),
            false,
        );
        let b = convert_block(&code, "p");
        assert_eq!(b.block_type, BlockType::Code);
        assert_eq!(b.language.as_deref(), Some("rust"));
        assert_eq!(b.title, "let x = 1;");

        let img = raw_block(
            "i1",
            "image",
            json!({ "type": "external", "external": { "url": "https://x.org/a.png" }, "caption": [] }),
            false,
        );
        assert_eq!(convert_block(&img, "p").source.as_deref(), Some("https://x.org/a.png"));

        let todo = raw_block("t1", "to_do", json!({ "rich_text": [], "checked": true }), false);
        assert_eq!(convert_block(&todo, "p").checked, Some(true));

        let sub = raw_block("S-1", "child_page", json!({ "title": "Child" }), true);
        let b = convert_block(&sub, "p");
        assert!(b.is_page());
        assert_eq!(b.title, "Child");
        assert_eq!(b.id, "s1");
        assert!(!sub.needs_children());

        let odd = raw_block("o1", "synced_block", json!({}), false);
        assert_eq!(
            convert_block(&odd, "p").block_type,
            BlockType::Unsupported("synced_block".to_string())
        );
    }

    #[test]
    fn test_assemble_nested_tree_in_order() {
        let page_id = "aaaaaaaa000000000000000000000001".to_string();
        let mut children = HashMap::new();
        children.insert(
            page_id.clone(),
            vec![
                raw_block("t1", "paragraph", text("first"), false),
                raw_block("l1", "column_list", json!({}), true),
                raw_block("t2", "paragraph", text("last"), false),
            ],
        );
        children.insert(
            "l1".to_string(),
            vec![
                raw_block("c1", "column", json!({}), true),
                raw_block("c2", "column", json!({}), true),
            ],
        );
        children.insert("c1".to_string(), vec![raw_block("x1", "paragraph", text("left"), false)]);
        children.insert(
            "c2".to_string(),
            vec![raw_block("s1", "child_page", json!({ "title": "Sub" }), true)],
        );

        let page = assemble_page(&raw_page(), &children);
        let ids: Vec<&str> = page.root.walk().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec![page_id.as_str(), "t1", "l1", "c1", "x1", "c2", "s1", "t2"]);
        assert_eq!(page.sub_page_ids(), vec!["s1".to_string()]);
        assert_eq!(page.root.content[1].content[1].content[0].parent_id, "c2");
    }
}
