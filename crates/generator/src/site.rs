//! The site model: everything a request or a static build needs, built once.

use chrono::{DateTime, Utc};
use notiblog_core::config::{Config, SiteInfo};
use notiblog_core::{Article, ArticleType, ImageIndex, Page, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::article::build_articles;
use crate::articles::Articles;
use crate::feeds::{SitemapEntry, gen_atom, gen_sitemap};
use crate::index::{ALL_TAG, TagInfo, build_tags, build_years, filter_articles_by_tag, tag_file_url, tag_slug, tag_url};
use crate::redirects::{LegacyRedirect, RedirectCode, Redirects, STATIC_REDIRECTS};
use crate::routes::{FIXED_URLS, url_to_file_path};
use crate::templates::{self, ChangelogEntry};

/// Articles on the changelog page.
pub const CHANGELOG_SIZE: usize = 64;

/// Tag excluded from the main Atom feed.
pub const NOTE_TAG: &str = "note";

/// URL serving an article by id whatever its title.
pub fn article_id_url(id: &str) -> String {
    format!("/article/{}.html", id)
}

/// Inputs to [`SiteModel::build`] beyond the configuration and pages.
#[derive(Debug, Clone)]
pub struct SiteOptions {
    /// Static content served as-is.
    pub www_dir: PathBuf,
    /// Cached images, served under `/img/`.
    pub image_dir: PathBuf,
    pub legacy_redirects: Vec<LegacyRedirect>,
    /// Reference time for relative dates, captured once per build.
    pub generated_at: DateTime<Utc>,
}

/// Explicit build context shared by the preview server and the static writer.
///
/// Never mutated after [`SiteModel::build`].
pub struct SiteModel {
    config: Config,
    articles: Articles,
    tags: Vec<TagInfo>,
    tag_by_slug: HashMap<String, String>,
    article_by_url: HashMap<String, String>,
    redirects: Redirects,
    generated: Vec<String>,
    file_owner: HashMap<PathBuf, String>,
    www_dir: PathBuf,
    image_dir: PathBuf,
    generated_at: DateTime<Utc>,
}

impl SiteModel {
    pub fn build(
        config: Config,
        pages: &[Page],
        images: &ImageIndex,
        options: SiteOptions,
    ) -> Result<Self> {
        let articles = Articles::new(build_articles(pages, &config.roots, images)?)?;
        let tags = build_tags(&articles.blog_not_hidden());

        let mut tag_by_slug = HashMap::new();
        for info in tags.iter().filter(|t| t.name != ALL_TAG) {
            let slug = tag_slug(&info.name);
            if let Some(existing) = tag_by_slug.get(&slug) {
                tracing::warn!(
                    "tags '{}' and '{}' share the url {}",
                    existing,
                    info.name,
                    tag_url(&info.name)
                );
                continue;
            }
            tag_by_slug.insert(slug, info.name.clone());
        }

        let mut article_by_url = HashMap::new();
        for article in articles.all() {
            let url = article.url();
            if let Some(existing) = article_by_url.get(&url) {
                tracing::warn!("articles {} and {} share the url {}", existing, article.id, url);
                continue;
            }
            article_by_url.insert(url, article.id.clone());
        }

        let redirects = build_redirects(&config, &articles, &tags, &options.legacy_redirects);

        tracing::info!(
            "site model: {} articles, {} tags, {} redirects",
            articles.len(),
            tags.len().saturating_sub(1),
            redirects.len()
        );

        let mut model = Self {
            config,
            articles,
            tags,
            tag_by_slug,
            article_by_url,
            redirects,
            generated: Vec::new(),
            file_owner: HashMap::new(),
            www_dir: options.www_dir,
            image_dir: options.image_dir,
            generated_at: options.generated_at,
        };
        model.claim_output_files();
        Ok(model)
    }

    /// Assign every generated page its output file. The first page to claim
    /// a file keeps it.
    fn claim_output_files(&mut self) {
        let mut candidates: Vec<String> = FIXED_URLS.iter().map(|u| u.to_string()).collect();
        for article in self.articles.all() {
            let url = article.url();
            if self.article_by_url.get(&url) == Some(&article.id) {
                candidates.push(url);
            }
        }
        for article in self.articles.all() {
            if article.url_override.is_none() {
                candidates.push(article_id_url(&article.id));
            }
        }
        candidates.extend(self.tag_urls());

        let mut generated = Vec::with_capacity(candidates.len());
        let mut file_owner: HashMap<PathBuf, String> = HashMap::new();
        for url in candidates {
            let file = url_to_file_path(&url);
            if let Some(owner) = file_owner.get(&file) {
                tracing::warn!("{} and {} both write {}; keeping {}", owner, url, file.display(), owner);
                continue;
            }
            file_owner.insert(file, url.clone());
            generated.push(url);
        }
        self.generated = generated;
        self.file_owner = file_owner;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn site(&self) -> &SiteInfo {
        &self.config.site
    }

    pub fn articles(&self) -> &Articles {
        &self.articles
    }

    /// Tag list with the synthetic `all` entry first.
    pub fn tags(&self) -> &[TagInfo] {
        &self.tags
    }

    pub fn redirects(&self) -> &Redirects {
        &self.redirects
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn www_dir(&self) -> &Path {
        &self.www_dir
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Tag whose archive lives at `/tag/<slug>`.
    pub fn tag_for_slug(&self, slug: &str) -> Option<&str> {
        self.tag_by_slug.get(slug).map(String::as_str)
    }

    /// Article served at exactly `url`.
    pub fn article_by_url(&self, url: &str) -> Option<&Article> {
        self.article_by_url
            .get(url)
            .and_then(|id| self.articles.get(id))
    }

    /// Generated pages in output order. Each writes a distinct file.
    pub fn generated_urls(&self) -> &[String] {
        &self.generated
    }

    /// Generated URL that writes `file`, relative to the output directory.
    pub fn file_owner(&self, file: &Path) -> Option<&str> {
        self.file_owner.get(file).map(String::as_str)
    }

    /// URLs of every tag archive file, in tag order.
    pub fn tag_urls(&self) -> Vec<String> {
        self.tags
            .iter()
            .filter(|t| t.name != ALL_TAG)
            .filter(|t| self.tag_for_slug(&tag_slug(&t.name)) == Some(t.name.as_str()))
            .map(|t| tag_file_url(&t.name))
            .collect()
    }

    pub fn gen_index(&self) -> String {
        let posts = self.articles.blog_not_hidden();
        let mut pages: Vec<&Article> = self
            .articles
            .not_hidden()
            .into_iter()
            .filter(|a| a.article_type == ArticleType::Page)
            .collect();
        pages.sort_by_key(|a| a.display_title().to_lowercase());
        templates::render_index(self.site(), &posts, &pages)
    }

    /// Archive of all posts, or of the posts tagged `tag`. Unknown tags give
    /// an empty archive.
    pub fn gen_archive(&self, tag: Option<&str>) -> String {
        let posts = match tag {
            Some(tag) => self.articles.by_tag(tag),
            None => self.articles.blog_not_hidden(),
        };
        let years = build_years(&posts);
        templates::render_archive(self.site(), tag, posts.len(), &years, &self.tags)
    }

    pub fn gen_changelog(&self) -> String {
        let mut articles = self.articles.not_hidden();
        articles.sort_by(|a, b| {
            b.updated_on
                .cmp(&a.updated_on)
                .then_with(|| a.id.cmp(&b.id))
        });
        articles.truncate(CHANGELOG_SIZE);

        let mut prev_age = None;
        let entries: Vec<ChangelogEntry> = articles
            .into_iter()
            .map(|article| {
                let age = article.updated_age_days(self.generated_at);
                let label = (prev_age != Some(age)).then(|| format!("{} d", age));
                prev_age = Some(age);
                ChangelogEntry {
                    article,
                    age: label,
                }
            })
            .collect();
        templates::render_changelog(self.site(), &entries)
    }

    /// Atom feed of blog posts; `exclude_notes` drops posts tagged `note`.
    pub fn gen_atom(&self, feed_path: &str, exclude_notes: bool) -> String {
        let mut posts = self.articles.blog_not_hidden();
        if exclude_notes {
            posts = filter_articles_by_tag(&posts, NOTE_TAG, false);
        }
        gen_atom(self.site(), feed_path, &posts)
    }

    pub fn gen_sitemap(&self) -> String {
        let mut entries = vec![
            SitemapEntry {
                url: "/".to_string(),
                last_modified: None,
            },
            SitemapEntry {
                url: "/archives.html".to_string(),
                last_modified: None,
            },
        ];
        entries.extend(self.articles.not_hidden().into_iter().map(|a| SitemapEntry {
            url: a.url(),
            last_modified: Some(a.updated_on),
        }));
        gen_sitemap(&self.site().host_url, &entries)
    }

    pub fn gen_article(&self, article: &Article) -> String {
        templates::render_article(self.site(), article)
    }

    pub fn gen_404(&self) -> String {
        templates::render_404(self.site())
    }

    pub fn gen_unique_id_tool(&self) -> String {
        templates::render_unique_id_tool(self.site())
    }
}

/// Static table, configured rules, legacy ids, tag rewrites and article id
/// urls, in that order.
///
/// No rule's target matches its own pattern, so hosts that apply redirects
/// before files never loop.
fn build_redirects(
    config: &Config,
    articles: &Articles,
    tags: &[TagInfo],
    legacy: &[LegacyRedirect],
) -> Redirects {
    let mut redirects = Redirects::new();
    for (from, to) in STATIC_REDIRECTS {
        redirects.add_temp(from, to);
    }

    for rule in &config.redirects {
        match RedirectCode::from_u16(rule.code) {
            Some(code) => redirects.add(&rule.from, &rule.to, code),
            None => tracing::warn!("ignoring redirect {} with code {}", rule.from, rule.code),
        }
    }

    for entry in legacy {
        let id = entry.article_id();
        match articles.get(&id) {
            Some(article) => redirects.add_temp(&entry.from_path(), &article.url()),
            None => tracing::debug!("legacy redirect {}: no article {}", entry.url, id),
        }
    }

    for info in tags.iter().filter(|t| t.name != ALL_TAG) {
        redirects.add_rewrite(&tag_url(&info.name), &tag_file_url(&info.name));
    }

    for article in articles.all() {
        let pattern = format!("/article/{}/*", article.id);
        let id_url = article_id_url(&article.id);
        if article.url_override.is_none() {
            redirects.add_rewrite(&pattern, &id_url);
            continue;
        }
        let canonical = article.url();
        if canonical.starts_with(&format!("/article/{}/", article.id)) || canonical == id_url {
            tracing::debug!("article {}: custom url {} stays under its id", article.id, canonical);
            continue;
        }
        redirects.add_temp(&pattern, &canonical);
        redirects.add_temp(&id_url, &canonical);
    }
    redirects
}
