//! Block tree to HTML.

use notiblog_core::ids::is_normalized_id;
use notiblog_core::{Block, BlockType, ImageIndex, ImageRef, normalize_id, urlify};
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};
use std::collections::HashMap;

use crate::templates::html_escape;

/// Lookups needed while rendering one article body.
pub struct RenderContext<'a> {
    /// Normalized page id to article URL.
    pub page_urls: &'a HashMap<String, String>,
    pub images: &'a ImageIndex,
}

impl RenderContext<'_> {
    /// URL of a linked page, falling back to the canonical article form.
    pub fn page_url(&self, id: &str, title: &str) -> String {
        let id = normalize_id(id);
        match self.page_urls.get(&id) {
            Some(url) => url.clone(),
            None => format!("/article/{}/{}", id, urlify(title)),
        }
    }

    /// Article URL for a link into the content service, if it points at a known page.
    fn rewrite_link(&self, url: &str) -> Option<String> {
        let id = linked_page_id(url)?;
        self.page_urls.get(&id).cloned()
    }
}

/// Page id at the end of a content-service URL (`https://www.notion.so/Title-<id>`
/// or `/<id>`).
pub fn linked_page_id(url: &str) -> Option<String> {
    let is_notion = url.starts_with('/')
        || url.contains("notion.so/")
        || url.contains(".notion.site/");
    if !is_notion {
        return None;
    }
    let path = url.split(['?', '#']).next()?;
    let last = path.trim_end_matches('/').rsplit('/').next()?;
    let normalized = normalize_id(last);
    let start = normalized.len().checked_sub(32)?;
    let id = &normalized[start..];
    is_normalized_id(id).then(|| id.to_string())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedBody {
    pub html: String,
    pub images: Vec<ImageRef>,
}

/// Escape a leading character that would start a block-level Markdown
/// construct, so block text stays inline.
fn guard_block_syntax(line: &str) -> String {
    let trimmed = line.trim_start();
    let mut chars = trimmed.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let second = chars.next();
    let only_marker = trimmed.chars().all(|c| c == first || c == ' ');
    let needs_escape = match first {
        '#' | '>' => true,
        '=' => only_marker,
        '-' | '+' | '*' | '_' => second.is_none_or(char::is_whitespace) || only_marker,
        '`' | '~' => trimmed.starts_with(&first.to_string().repeat(3)),
        c if c.is_ascii_digit() => {
            let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
            matches!(trimmed[digits..].chars().next(), Some('.') | Some(')'))
        }
        _ => false,
    };
    if !needs_escape {
        return trimmed.to_string();
    }
    if first.is_ascii_digit() {
        let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
        return format!("{}\\{}", &trimmed[..digits], &trimmed[digits..]);
    }
    format!("\\{}", trimmed)
}

/// Render inline Markdown to HTML without the wrapping paragraph.
pub fn inline_html(text: &str, ctx: &RenderContext) -> String {
    if text.is_empty() {
        return String::new();
    }
    let guarded: Vec<String> = text.lines().map(guard_block_syntax).collect();
    let source = guarded.join("\n");

    let mut events = Vec::new();
    let mut seen_paragraph = false;
    for event in Parser::new_ext(&source, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(Tag::Paragraph) => {
                if seen_paragraph {
                    events.push(Event::HardBreak);
                }
                seen_paragraph = true;
            }
            Event::End(pulldown_cmark::TagEnd::Paragraph) => {}
            Event::SoftBreak => events.push(Event::HardBreak),
            // raw HTML in page text is shown, never interpreted
            Event::Html(s) | Event::InlineHtml(s) => events.push(Event::Text(s)),
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let dest_url = match ctx.rewrite_link(&dest_url) {
                    Some(url) => CowStr::from(url),
                    None => dest_url,
                };
                events.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }));
            }
            other => events.push(other),
        }
    }

    let mut out = String::with_capacity(source.len() + 16);
    html::push_html(&mut out, events.into_iter());
    out.trim_end().to_string()
}

struct BodyRenderer<'a, 'b> {
    ctx: &'a RenderContext<'b>,
    html: String,
    images: Vec<ImageRef>,
}

impl BodyRenderer<'_, '_> {
    fn render_blocks(&mut self, blocks: &[Block]) {
        let mut i = 0;
        while i < blocks.len() {
            let kind = &blocks[i].block_type;
            if matches!(kind, BlockType::BulletedList | BlockType::NumberedList) {
                // group consecutive items of the same list type
                let end = blocks[i..]
                    .iter()
                    .position(|b| &b.block_type != kind)
                    .map_or(blocks.len(), |n| i + n);
                self.render_list(&blocks[i..end]);
                i = end;
                continue;
            }
            self.render_block(&blocks[i]);
            i += 1;
        }
    }

    fn render_list(&mut self, items: &[Block]) {
        let tag = if items[0].block_type == BlockType::NumberedList {
            "ol"
        } else {
            "ul"
        };
        self.html.push_str(&format!("<{}>\n", tag));
        for item in items {
            self.html.push_str("<li>");
            self.html.push_str(&inline_html(&item.title, self.ctx));
            if !item.content.is_empty() {
                self.html.push('\n');
                self.render_blocks(&item.content);
            }
            self.html.push_str("</li>\n");
        }
        self.html.push_str(&format!("</{}>\n", tag));
    }

    fn render_children(&mut self, block: &Block) {
        if !block.content.is_empty() {
            self.render_blocks(&block.content);
        }
    }

    fn render_block(&mut self, block: &Block) {
        let ctx = self.ctx;
        match &block.block_type {
            BlockType::Text => {
                if block.title.is_empty() {
                    self.html.push_str("<p class=\"empty\"></p>\n");
                } else {
                    self.html
                        .push_str(&format!("<p>{}</p>\n", inline_html(&block.title, ctx)));
                }
                if !block.content.is_empty() {
                    self.html.push_str("<div class=\"indent\">\n");
                    self.render_blocks(&block.content);
                    self.html.push_str("</div>\n");
                }
            }
            BlockType::Header | BlockType::SubHeader | BlockType::SubSubHeader => {
                let level = match block.block_type {
                    BlockType::Header => 2,
                    BlockType::SubHeader => 3,
                    _ => 4,
                };
                self.html.push_str(&format!(
                    "<h{} id=\"{}\">{}</h{}>\n",
                    level,
                    urlify(&block.title),
                    inline_html(&block.title, ctx),
                    level
                ));
                self.render_children(block);
            }
            BlockType::Todo => {
                let checked = if block.checked == Some(true) {
                    " checked"
                } else {
                    ""
                };
                self.html.push_str(&format!(
                    "<div class=\"todo\"><input type=\"checkbox\" disabled{}> {}</div>\n",
                    checked,
                    inline_html(&block.title, ctx)
                ));
                self.render_children(block);
            }
            BlockType::Toggle => {
                self.html.push_str(&format!(
                    "<details>\n<summary>{}</summary>\n",
                    inline_html(&block.title, ctx)
                ));
                self.render_children(block);
                self.html.push_str("</details>\n");
            }
            BlockType::Quote => {
                self.html.push_str(&format!(
                    "<blockquote>{}\n",
                    inline_html(&block.title, ctx)
                ));
                self.render_children(block);
                self.html.push_str("</blockquote>\n");
            }
            BlockType::Callout => {
                self.html.push_str(&format!(
                    "<div class=\"callout\">{}\n",
                    inline_html(&block.title, ctx)
                ));
                self.render_children(block);
                self.html.push_str("</div>\n");
            }
            BlockType::Code => {
                let lang = block.language.as_deref().unwrap_or("plain text");
                self.html.push_str(&format!(
                    "<pre class=\"code\"><code class=\"language-{}\">{}</code></pre>\n",
                    html_escape(&urlify(lang)),
                    html_escape(&block.title)
                ));
            }
            BlockType::Divider => self.html.push_str("<hr>\n"),
            BlockType::Image => self.render_image(block),
            BlockType::Bookmark => {
                let Some(url) = &block.source else {
                    return;
                };
                let text = if block.title.is_empty() {
                    html_escape(url)
                } else {
                    inline_html(&block.title, ctx)
                };
                self.html.push_str(&format!(
                    "<div class=\"bookmark\"><a href=\"{}\">{}</a></div>\n",
                    html_escape(url),
                    text
                ));
            }
            BlockType::ColumnList => {
                self.html.push_str("<div class=\"column-list\">\n");
                self.render_children(block);
                self.html.push_str("</div>\n");
            }
            BlockType::Column => {
                self.html.push_str("<div class=\"column\">\n");
                self.render_children(block);
                self.html.push_str("</div>\n");
            }
            BlockType::Page => {
                self.html.push_str(&format!(
                    "<div class=\"page-link\"><a href=\"{}\">{}</a></div>\n",
                    html_escape(&ctx.page_url(&block.id, &block.title)),
                    html_escape(if block.title.is_empty() {
                        "no title"
                    } else {
                        &block.title
                    })
                ));
            }
            BlockType::BulletedList | BlockType::NumberedList => {
                self.render_list(std::slice::from_ref(block));
            }
            BlockType::Unsupported(kind) => {
                tracing::debug!("skipping unsupported block {} ({})", block.id, kind);
            }
        }
    }

    fn render_image(&mut self, block: &Block) {
        let Some(source) = &block.source else {
            return;
        };
        let local = self.ctx.images.local_url(source);
        let src = local.clone().unwrap_or_else(|| source.clone());
        let caption = html_escape(&block.title);
        if caption.is_empty() {
            self.html.push_str(&format!(
                "<figure><img src=\"{}\" alt=\"\"></figure>\n",
                html_escape(&src)
            ));
        } else {
            self.html.push_str(&format!(
                "<figure><img src=\"{}\" alt=\"{}\"><figcaption>{}</figcaption></figure>\n",
                html_escape(&src),
                caption,
                caption
            ));
        }
        self.images.push(ImageRef {
            source_url: source.clone(),
            local_url: local,
        });
    }
}

/// Render a list of top-level blocks, collecting every image it references.
pub fn render_body(blocks: &[Block], ctx: &RenderContext) -> RenderedBody {
    let mut renderer = BodyRenderer {
        ctx,
        html: String::new(),
        images: Vec::new(),
    };
    renderer.render_blocks(blocks);
    RenderedBody {
        html: renderer.html,
        images: renderer.images,
    }
}
