//! Breadcrumbs from the block parent chain.

use notiblog_core::config::SiteRoots;
use notiblog_core::{Article, Block, Page, UrlPath, normalize_id, urlify};
use std::collections::{HashMap, HashSet};

/// Non-owning `normalized block id -> block` lookup over every page.
///
/// A sub-page appears twice: as the root block of its own page and as a
/// link block inside its parent. The root block is preferred since its
/// parent id comes straight from the content service.
pub struct BlockIndex<'a> {
    by_id: HashMap<String, &'a Block>,
}

impl<'a> BlockIndex<'a> {
    pub fn build<I>(pages: I) -> Self
    where
        I: IntoIterator<Item = &'a Page>,
        I::IntoIter: Clone,
    {
        let pages = pages.into_iter();
        let mut by_id: HashMap<String, &'a Block> = HashMap::new();
        for page in pages.clone() {
            by_id.insert(normalize_id(&page.root.id), &page.root);
        }
        for page in pages {
            for block in page.root.walk().skip(1) {
                by_id.entry(normalize_id(&block.id)).or_insert(block);
            }
        }
        Self { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&'a Block> {
        self.by_id.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Breadcrumb for the page rooted at `root`, root-to-leaf.
///
/// Walks parent ids through `index`, skipping non-page blocks such as
/// columns, and stops after a recognized root page or when a parent is not
/// known. The article's own page is not part of the trail.
pub fn build_breadcrumb(
    root: &Block,
    index: &BlockIndex,
    roots: &SiteRoots,
    page_urls: &HashMap<String, String>,
) -> Vec<UrlPath> {
    let mut paths = Vec::new();
    let mut seen = HashSet::new();
    let mut curr = normalize_id(&root.parent_id);

    while !curr.is_empty() && seen.insert(curr.clone()) {
        let Some(block) = index.get(&curr) else {
            break;
        };
        if block.is_page() {
            let url = page_urls
                .get(&curr)
                .cloned()
                .unwrap_or_else(|| format!("/article/{}/{}", curr, urlify(&block.title)));
            paths.push(UrlPath {
                name: block.title.clone(),
                url,
            });
        }
        if roots.is_root(&curr) {
            break;
        }
        curr = normalize_id(&block.parent_id);
    }

    paths.reverse();
    paths
}

/// Attach breadcrumbs to every article that has none yet.
///
/// `pages` maps normalized page ids to pages; articles whose page is
/// missing keep empty paths.
pub fn build_articles_navigation(
    articles: &mut [Article],
    pages: &HashMap<String, &Page>,
    roots: &SiteRoots,
    page_urls: &HashMap<String, String>,
) {
    let index = BlockIndex::build(pages.values().copied());
    tracing::debug!("block index: {} blocks", index.len());

    for article in articles.iter_mut() {
        // precomputed paths (collections) win
        if !article.paths.is_empty() {
            continue;
        }
        if let Some(page) = pages.get(&article.page_id) {
            article.paths = build_breadcrumb(&page.root, &index, roots, page_urls);
        }
    }
}
