//! Article model builder: one [`Article`] per downloaded [`Page`].

use notiblog_core::config::SiteRoots;
use notiblog_core::{
    Article, ArticleType, ImageIndex, Page, Result, UrlPath, normalize_id,
};
use std::collections::HashMap;

use crate::index::tag_url;
use crate::metadata::parse_metadata;
use crate::navigation::build_articles_navigation;
use crate::render::{RenderContext, render_body};

/// Build the article for one page, without body or breadcrumb.
///
/// Returns the article and the number of leading metadata blocks, which
/// are not part of the body.
pub fn article_from_page(page: &Page, roots: &SiteRoots) -> Result<(Article, usize)> {
    let page_id = page.normalized_id();
    let meta = parse_metadata(&page_id, &page.root.content)?;

    let article_type = meta.article_type.unwrap_or_else(|| {
        if normalize_id(&page.root.parent_id) == roots.blog_root {
            ArticleType::Post
        } else {
            ArticleType::Page
        }
    });

    let mut tags = meta.tags.clone();
    let mut paths = Vec::new();
    if let Some(collection) = &meta.collection {
        let tag = collection.to_lowercase();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
        paths.push(UrlPath {
            name: collection.clone(),
            url: tag_url(collection),
        });
    }

    let article = Article {
        id: meta.id.clone().unwrap_or_else(|| page_id.clone()),
        page_id,
        title: page.title().to_string(),
        tags,
        published_on: meta.publish_date().unwrap_or(page.created_time),
        updated_on: meta.updated_on.unwrap_or(page.last_edited_time),
        article_type,
        status: meta.status,
        description: meta.description.clone(),
        header_image: meta.header_image.clone(),
        collection: meta.collection.clone(),
        url_override: meta.url.clone(),
        body_html: String::new(),
        paths,
        images: Vec::new(),
    };
    Ok((article, meta.consumed))
}

/// Image URLs a page needs: image blocks plus a metadata header image.
pub fn referenced_image_urls(page: &Page) -> Vec<String> {
    let mut urls = page.image_urls();
    if let Ok(meta) = parse_metadata(&page.id, &page.root.content)
        && let Some(header) = meta.header_image
        && header.starts_with("http")
        && !urls.contains(&header)
    {
        urls.push(header);
    }
    urls
}

/// Build every article: metadata, rendered body, images and breadcrumbs.
///
/// Fails on the first malformed metadata block or date.
pub fn build_articles(pages: &[Page], roots: &SiteRoots, images: &ImageIndex) -> Result<Vec<Article>> {
    let mut drafts = Vec::with_capacity(pages.len());
    for page in pages {
        let (article, body_start) = article_from_page(page, roots)?;
        drafts.push((article, page, body_start));
    }

    let page_urls: HashMap<String, String> = drafts
        .iter()
        .map(|(article, _, _)| (article.page_id.clone(), article.url()))
        .collect();

    let ctx = RenderContext {
        page_urls: &page_urls,
        images,
    };
    let mut articles = Vec::with_capacity(drafts.len());
    for (mut article, page, body_start) in drafts {
        let body = render_body(&page.root.content[body_start..], &ctx);
        article.body_html = body.html;
        article.images = body.images;
        if let Some(header) = &article.header_image
            && let Some(local) = images.local_url(header)
        {
            article.header_image = Some(local);
        }
        tracing::debug!("article {} => {} ({})", article.id, article.url(), article.title);
        articles.push(article);
    }

    let by_page: HashMap<String, &Page> = pages.iter().map(|p| (p.normalized_id(), p)).collect();
    build_articles_navigation(&mut articles, &by_page, roots, &page_urls);
    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use notiblog_core::{Block, BlockType, Error, Status, image_key};

    fn roots() -> SiteRoots {
        SiteRoots {
            start_page: "root".to_string(),
            blog_root: "blog".to_string(),
            website_root: "root".to_string(),
            book_root: None,
        }
    }

    fn page(id: &str, title: &str, parent: &str, lines: &[&str]) -> Page {
        let date = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
        let mut root = Block::new(id, BlockType::Page, title, parent);
        for line in lines {
            root.content.push(Block::new("t", BlockType::Text, line, id));
        }
        Page {
            id: id.to_string(),
            created_time: date,
            last_edited_time: date,
            root,
        }
    }

    #[test]
    fn test_defaults_from_page() {
        let p = page("post1", "First Post", "blog", &["Hello"]);
        let (article, start) = article_from_page(&p, &roots()).unwrap();
        assert_eq!(start, 0);
        assert_eq!(article.id, "post1");
        assert_eq!(article.article_type, ArticleType::Post);
        assert_eq!(article.published_on, p.created_time);
        assert_eq!(article.url(), "/article/post1/first-post");

        let p = page("about", "About", "root", &[]);
        let (article, _) = article_from_page(&p, &roots()).unwrap();
        assert_eq!(article.article_type, ArticleType::Page);
    }

    #[test]
    fn test_metadata_overrides() {
        let p = page(
            "post2",
            "Second",
            "root",
            &["id: 1s", "type: post", "status: draft", "collection: Go Cookbook", "Body"],
        );
        let (article, start) = article_from_page(&p, &roots()).unwrap();
        assert_eq!(start, 4);
        assert_eq!(article.id, "1s");
        assert_eq!(article.article_type, ArticleType::Post);
        assert_eq!(article.status, Status::Draft);
        assert!(article.is_hidden());
        assert_eq!(article.tags, vec!["go cookbook"]);
        assert_eq!(
            article.paths,
            vec![UrlPath {
                name: "Go Cookbook".to_string(),
                url: "/tag/go-cookbook".to_string(),
            }]
        );
    }

    #[test]
    fn test_build_articles_renders_body_after_metadata() {
        let pages = vec![
            page("blog", "Blog", "root", &[]),
            page("p1", "One", "blog", &["tags: rust", "visible body"]),
        ];
        let articles = build_articles(&pages, &roots(), &ImageIndex::default()).unwrap();
        let one = articles.iter().find(|a| a.id == "p1").unwrap();
        assert_eq!(one.body_html, "<p>visible body</p>\n");
        assert_eq!(one.paths.len(), 1);
        assert_eq!(one.paths[0].url, "/article/blog/blog");
    }

    #[test]
    fn test_header_image_uses_local_copy() {
        let url = "https://x.org/h.png";
        let images = ImageIndex::from_file_names(vec![format!("{}.png", image_key(url))]);
        let pages = vec![page("p1", "One", "blog", &["headerimage: https://x.org/h.png"])];
        let articles = build_articles(&pages, &roots(), &images).unwrap();
        assert_eq!(
            articles[0].header_image,
            Some(format!("/img/{}.png", image_key(url)))
        );
        assert_eq!(referenced_image_urls(&pages[0]), vec![url.to_string()]);
    }

    #[test]
    fn test_bad_date_fails_build() {
        let pages = vec![page("p1", "One", "blog", &["date: someday"])];
        assert!(matches!(
            build_articles(&pages, &roots(), &ImageIndex::default()),
            Err(Error::Date { .. })
        ));
    }
}
