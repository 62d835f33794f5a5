//! Atom feeds and sitemap.

use atom_syndication::{
    ContentBuilder, Entry, EntryBuilder, Feed, FeedBuilder, FixedDateTime, Link, LinkBuilder,
    PersonBuilder, Text,
};
use chrono::{DateTime, Utc};
use notiblog_core::config::SiteInfo;
use notiblog_core::Article;
use std::borrow::Cow;

/// Posts per feed.
pub const FEED_SIZE: usize = 25;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

fn fixed(date: DateTime<Utc>) -> FixedDateTime {
    date.fixed_offset()
}

fn article_entry(site: &SiteInfo, article: &Article) -> Entry {
    let link = format!("{}{}", site.host_url, article.url());
    let entry_link: Link = LinkBuilder::default()
        .href(&link)
        .rel("alternate".to_string())
        .build();
    let content = ContentBuilder::default()
        .value(Some(article.body_html.clone()))
        .content_type(Some("html".to_string()))
        .build();

    EntryBuilder::default()
        .title(Text::plain(article.display_title().to_string()))
        .id(&link)
        .updated(fixed(article.updated_on))
        .published(Some(fixed(article.published_on)))
        .links(vec![entry_link])
        .summary(article.description.clone().map(Text::plain))
        .content(Some(content))
        .build()
}

/// Atom feed of the newest [`FEED_SIZE`] articles.
///
/// `articles` must be sorted newest first. The feed's update time is the
/// newest publish date, so the output depends only on the articles.
pub fn gen_atom(site: &SiteInfo, feed_path: &str, articles: &[&Article]) -> String {
    let latest: Vec<&Article> = articles.iter().copied().take(FEED_SIZE).collect();
    let updated = latest
        .iter()
        .map(|a| a.published_on)
        .max()
        .unwrap_or(DateTime::UNIX_EPOCH);

    let author = PersonBuilder::default()
        .name(site.author.clone())
        .email(site.author_email.clone())
        .build();
    let self_link: Link = LinkBuilder::default()
        .href(format!("{}{}", site.host_url, feed_path))
        .rel("self".to_string())
        .mime_type(Some("application/atom+xml".to_string()))
        .build();
    let alternate_link: Link = LinkBuilder::default()
        .href(format!("{}/", site.host_url))
        .rel("alternate".to_string())
        .build();

    let feed: Feed = FeedBuilder::default()
        .title(Text::plain(site.title.clone()))
        .id(format!("{}{}", site.host_url, feed_path))
        .updated(fixed(updated))
        .authors(vec![author])
        .links(vec![self_link, alternate_link])
        .entries(latest.iter().map(|a| article_entry(site, a)).collect::<Vec<_>>())
        .build();
    feed.to_string()
}

fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}

/// One `<url>` of the sitemap.
pub struct SitemapEntry {
    pub url: String,
    pub last_modified: Option<DateTime<Utc>>,
}

pub fn gen_sitemap(host_url: &str, entries: &[SitemapEntry]) -> String {
    let mut xml = String::with_capacity(4096);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"");
    xml.push_str(SITEMAP_NS);
    xml.push_str("\">\n");
    for entry in entries {
        xml.push_str("  <url>\n    <loc>");
        xml.push_str(&escape_xml(&format!("{}{}", host_url, entry.url)));
        xml.push_str("</loc>\n");
        if let Some(date) = entry.last_modified {
            xml.push_str("    <lastmod>");
            xml.push_str(&date.format("%Y-%m-%d").to_string());
            xml.push_str("</lastmod>\n");
        }
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use notiblog_core::{ArticleType, Status};

    fn site() -> SiteInfo {
        SiteInfo {
            title: "Blog".to_string(),
            host_url: "https://example.com".to_string(),
            author: "Jane".to_string(),
            author_email: Some("jane@example.com".to_string()),
        }
    }

    fn article(id: &str, day: u32) -> Article {
        let date = Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap();
        Article {
            id: id.to_string(),
            page_id: id.to_string(),
            title: format!("Post {}", id),
            tags: vec![],
            published_on: date,
            updated_on: date,
            article_type: ArticleType::Post,
            status: Status::Normal,
            description: None,
            header_image: None,
            collection: None,
            url_override: None,
            body_html: "<p>hi</p>".to_string(),
            paths: vec![],
            images: vec![],
        }
    }

    #[test]
    fn test_atom_limits_and_dates() {
        let owned: Vec<Article> = (1..=28).rev().map(|d| article(&format!("a{}", d), d)).collect();
        let refs: Vec<&Article> = owned.iter().collect();
        let xml = gen_atom(&site(), "/atom.xml", &refs);
        let feed: Feed = xml.parse().unwrap();
        assert_eq!(feed.entries().len(), FEED_SIZE);
        assert_eq!(feed.entries()[0].title().as_str(), "Post a28");
        assert!(feed.updated().to_rfc3339().starts_with("2024-05-28"));
        assert_eq!(feed.entries()[0].id(), "https://example.com/article/a28/post-a28");
    }

    #[test]
    fn test_empty_atom_is_deterministic() {
        let a = gen_atom(&site(), "/atom.xml", &[]);
        let b = gen_atom(&site(), "/atom.xml", &[]);
        assert_eq!(a, b);
        assert!(a.contains("1970-01-01T00:00:00"));
    }

    #[test]
    fn test_sitemap() {
        let xml = gen_sitemap(
            "https://example.com",
            &[
                SitemapEntry {
                    url: "/".to_string(),
                    last_modified: None,
                },
                SitemapEntry {
                    url: "/a?x=1&y=2".to_string(),
                    last_modified: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
                },
            ],
        );
        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(xml.contains("<loc>https://example.com/a?x=1&amp;y=2</loc>"));
        assert!(xml.contains("<lastmod>2024-01-02</lastmod>"));
    }
}
