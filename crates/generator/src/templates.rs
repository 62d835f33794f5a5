//! HTML page templates.
//!
//! Every page goes through [`layout`] so the preview server and the static
//! tree share one rendering path.

use chrono::{DateTime, Utc};
use notiblog_core::config::SiteInfo;
use notiblog_core::Article;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::index::{TagInfo, Year, tag_url};

/// HTML-escape a string to prevent XSS attacks
///
/// Escapes: & < > " '
pub fn html_escape(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#x27;".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Absolute URL of an article on the public host.
pub fn absolute_url(site: &SiteInfo, path: &str) -> String {
    format!("{}{}", site.host_url, path)
}

pub struct ShareUrls {
    pub twitter: String,
    pub facebook: String,
    pub linkedin: String,
}

pub fn share_urls(site: &SiteInfo, article: &Article) -> ShareUrls {
    let url = encode(&absolute_url(site, &article.url()));
    ShareUrls {
        twitter: format!(
            "https://twitter.com/intent/tweet?text={}&url={}",
            encode(&article.title),
            url
        ),
        facebook: format!("https://www.facebook.com/sharer/sharer.php?u={}", url),
        linkedin: format!("https://www.linkedin.com/shareArticle?mini=true&url={}", url),
    }
}

/// Edit link for the page an article was built from.
pub fn edit_url(article: &Article) -> String {
    format!("https://www.notion.so/{}", article.page_id)
}

fn layout(site: &SiteInfo, title: &str, head_extra: &str, body: &str) -> String {
    let site_title = html_escape(&site.title);
    let page_title = if title.is_empty() || title == site.title {
        site_title.clone()
    } else {
        format!("{} - {}", html_escape(title), site_title)
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{}</title>
<link rel="alternate" type="application/atom+xml" title="{}" href="/atom.xml">
<link rel="stylesheet" href="/css/main.css">
{}</head>
<body>
<header class="site-header">
<a class="site-title" href="/">{}</a>
<nav><a href="/archives.html">Archives</a> <a href="/changelog.html">Changelog</a> <a href="/atom.xml">Feed</a></nav>
</header>
<main>
{}</main>
<footer class="site-footer">{}</footer>
</body>
</html>
"#,
        page_title,
        site_title,
        head_extra,
        site_title,
        body,
        html_escape(&site.author)
    )
}

fn article_list_item(article: &Article) -> String {
    format!(
        "<li><a href=\"{}\">{}</a> <span class=\"date\">{}</span></li>\n",
        html_escape(&article.url()),
        html_escape(article.display_title()),
        format_date(article.published_on)
    )
}

fn tag_links(tags: &[String]) -> String {
    tags.iter()
        .map(|t| {
            format!(
                "<a class=\"tag\" href=\"{}\">{}</a>",
                html_escape(&tag_url(t)),
                html_escape(t)
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Main page: blog posts and site pages.
pub fn render_index(site: &SiteInfo, posts: &[&Article], pages: &[&Article]) -> String {
    let mut body = format!("<h1>{}</h1>\n", html_escape(&site.title));
    body.push_str(&format!(
        "<section class=\"posts\">\n<h2>Posts ({})</h2>\n<ul>\n",
        posts.len()
    ));
    for article in posts {
        body.push_str(&article_list_item(article));
    }
    body.push_str("</ul>\n</section>\n");

    if !pages.is_empty() {
        body.push_str("<section class=\"pages\">\n<h2>Pages</h2>\n<ul>\n");
        for article in pages {
            body.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                html_escape(&article.url()),
                html_escape(article.display_title())
            ));
        }
        body.push_str("</ul>\n</section>\n");
    }
    layout(site, "", "", &body)
}

/// Archive of all posts, or of the posts carrying `tag`.
pub fn render_archive(
    site: &SiteInfo,
    tag: Option<&str>,
    post_count: usize,
    years: &[Year],
    tags: &[TagInfo],
) -> String {
    let heading = match tag {
        Some(tag) => format!("Articles tagged <em>{}</em>", html_escape(tag)),
        None => "Archives".to_string(),
    };
    let mut body = format!(
        "<h1>{}</h1>\n<p class=\"count\">{} articles</p>\n",
        heading, post_count
    );

    body.push_str("<nav class=\"tags\">\n");
    for info in tags {
        let current = tag.map_or(info.name == crate::index::ALL_TAG, |t| t == info.name);
        body.push_str(&format!(
            "<a href=\"{}\"{}>{} ({})</a>\n",
            html_escape(&info.url),
            if current { " class=\"current\"" } else { "" },
            html_escape(&info.name),
            info.count
        ));
    }
    body.push_str("</nav>\n");

    for year in years {
        body.push_str(&format!(
            "<section class=\"year\">\n<h2>{}</h2>\n<table>\n",
            html_escape(&year.name)
        ));
        for entry in &year.articles {
            body.push_str(&format!(
                "<tr><td class=\"month\">{}</td><td><a href=\"{}\">{}</a></td></tr>\n",
                html_escape(&entry.display_month),
                html_escape(&entry.article.url()),
                html_escape(entry.article.display_title())
            ));
        }
        body.push_str("</table>\n</section>\n");
    }

    let title = match tag {
        Some(tag) => format!("Tag: {}", tag),
        None => "Archives".to_string(),
    };
    layout(site, &title, "", &body)
}

/// One changelog row; `age` is only set when it differs from the row above.
pub struct ChangelogEntry<'a> {
    pub article: &'a Article,
    pub age: Option<String>,
}

pub fn render_changelog(site: &SiteInfo, entries: &[ChangelogEntry]) -> String {
    let mut body = String::from("<h1>Recently updated</h1>\n<table class=\"changelog\">\n");
    for entry in entries {
        body.push_str(&format!(
            "<tr><td class=\"age\">{}</td><td><a href=\"{}\">{}</a></td><td class=\"date\">{}</td></tr>\n",
            html_escape(entry.age.as_deref().unwrap_or("")),
            html_escape(&entry.article.url()),
            html_escape(entry.article.display_title()),
            format_date(entry.article.updated_on)
        ));
    }
    body.push_str("</table>\n");
    layout(site, "Changelog", "", &body)
}

pub fn render_article(site: &SiteInfo, article: &Article) -> String {
    let canonical = absolute_url(site, &article.url());
    let mut head = format!(
        "<link rel=\"canonical\" href=\"{}\">\n<meta property=\"og:title\" content=\"{}\">\n",
        html_escape(&canonical),
        html_escape(article.display_title())
    );
    if let Some(description) = &article.description {
        head.push_str(&format!(
            "<meta name=\"description\" content=\"{}\">\n<meta property=\"og:description\" content=\"{}\">\n",
            html_escape(description),
            html_escape(description)
        ));
    }
    if let Some(image) = &article.header_image {
        let image = if image.starts_with('/') {
            absolute_url(site, image)
        } else {
            image.clone()
        };
        head.push_str(&format!(
            "<meta property=\"og:image\" content=\"{}\">\n",
            html_escape(&image)
        ));
    }

    let mut body = String::new();
    body.push_str("<nav class=\"breadcrumb\"><a href=\"/\">Home</a>");
    for path in &article.paths {
        body.push_str(&format!(
            " / <a href=\"{}\">{}</a>",
            html_escape(&path.url),
            html_escape(&path.name)
        ));
    }
    body.push_str("</nav>\n<article>\n");

    if let Some(image) = &article.header_image {
        body.push_str(&format!(
            "<img class=\"header-image\" src=\"{}\" alt=\"\">\n",
            html_escape(image)
        ));
    }
    body.push_str(&format!(
        "<h1>{}</h1>\n",
        html_escape(article.display_title())
    ));
    if article.is_blog() {
        body.push_str(&format!(
            "<div class=\"meta\">Published on {}",
            format_date(article.published_on)
        ));
        if article.updated_on.date_naive() != article.published_on.date_naive() {
            body.push_str(&format!(", updated {}", format_date(article.updated_on)));
        }
        if !article.tags.is_empty() {
            body.push_str(&format!(" in {}", tag_links(&article.tags)));
        }
        body.push_str("</div>\n");
    }
    body.push_str(&article.body_html);
    body.push_str("</article>\n");

    if article.is_blog() {
        let share = share_urls(site, article);
        body.push_str(&format!(
            "<div class=\"share\">Share on <a href=\"{}\">Twitter</a> <a href=\"{}\">Facebook</a> <a href=\"{}\">LinkedIn</a></div>\n",
            html_escape(&share.twitter),
            html_escape(&share.facebook),
            html_escape(&share.linkedin)
        ));
    }
    body.push_str(&format!(
        "<div class=\"edit\"><a href=\"{}\">Edit</a></div>\n",
        html_escape(&edit_url(article))
    ));

    layout(site, article.display_title(), &head, &body)
}

pub fn render_404(site: &SiteInfo) -> String {
    layout(
        site,
        "Page not found",
        "",
        "<h1>Page not found</h1>\n<p>The page you were looking for does not exist. Try the <a href=\"/archives.html\">archives</a>.</p>\n",
    )
}

/// Small tool page that generates random base-36 ids for new articles.
pub fn render_unique_id_tool(site: &SiteInfo) -> String {
    let body = r#"<h1>Generate unique id</h1>
<p>Unique id: <code id="uid"></code> <button id="again">Generate</button></p>
<script>
function genId() {
  var chars = "0123456789abcdefghijklmnopqrstuvwxyz";
  var res = "";
  for (var i = 0; i < 8; i++) {
    res += chars[Math.floor(Math.random() * chars.length)];
  }
  document.getElementById("uid").textContent = res;
}
document.getElementById("again").addEventListener("click", genId);
genId();
</script>
"#;
    layout(site, "Generate unique id", "", body)
}
