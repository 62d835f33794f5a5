use notiblog_core::{Article, Error, Result, normalize_id};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Every article of a build, newest first.
///
/// The backing list is fixed at construction, so the derived views are
/// computed once on first use and never invalidated.
#[derive(Debug, Default)]
pub struct Articles {
    articles: Vec<Article>,
    by_id: HashMap<String, usize>,
    not_hidden: OnceLock<Vec<usize>>,
    blog_not_hidden: OnceLock<Vec<usize>>,
    by_tag: OnceLock<HashMap<String, Vec<usize>>>,
}

impl Articles {
    /// Sort by publish date (newest first, then id) and index by id.
    ///
    /// Each article is reachable by its article id and by its page id. Two
    /// different articles claiming the same id is an error.
    pub fn new(mut articles: Vec<Article>) -> Result<Self> {
        articles.sort_by(|a, b| {
            b.published_on
                .cmp(&a.published_on)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut by_id: HashMap<String, usize> = HashMap::new();
        for (idx, article) in articles.iter().enumerate() {
            if article.id.is_empty() {
                return Err(Error::InvalidData(format!(
                    "article for page {} has an empty id",
                    article.page_id
                )));
            }
            for key in [article.id.clone(), normalize_id(&article.page_id)] {
                if let Some(&other) = by_id.get(&key)
                    && other != idx
                {
                    return Err(Error::InvalidData(format!(
                        "duplicate article id '{}' (pages {} and {})",
                        key, articles[other].page_id, article.page_id
                    )));
                }
                by_id.insert(key, idx);
            }
        }

        Ok(Self {
            articles,
            by_id,
            ..Default::default()
        })
    }

    pub fn all(&self) -> &[Article] {
        &self.articles
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Look up by article id or page id.
    pub fn get(&self, id: &str) -> Option<&Article> {
        self.by_id
            .get(id)
            .or_else(|| self.by_id.get(&normalize_id(id)))
            .map(|&idx| &self.articles[idx])
    }

    fn pick(&self, indices: &[usize]) -> Vec<&Article> {
        indices.iter().map(|&i| &self.articles[i]).collect()
    }

    pub fn not_hidden(&self) -> Vec<&Article> {
        let indices = self.not_hidden.get_or_init(|| {
            (0..self.articles.len())
                .filter(|&i| !self.articles[i].is_hidden())
                .collect()
        });
        self.pick(indices)
    }

    pub fn blog_not_hidden(&self) -> Vec<&Article> {
        let indices = self.blog_not_hidden.get_or_init(|| {
            (0..self.articles.len())
                .filter(|&i| self.articles[i].is_blog() && !self.articles[i].is_hidden())
                .collect()
        });
        self.pick(indices)
    }

    /// Non-hidden blog posts carrying `tag`. Unknown tags give an empty list.
    pub fn by_tag(&self, tag: &str) -> Vec<&Article> {
        let map = self.by_tag.get_or_init(|| {
            let mut map: HashMap<String, Vec<usize>> = HashMap::new();
            for (i, article) in self.articles.iter().enumerate() {
                if !article.is_blog() || article.is_hidden() {
                    continue;
                }
                for tag in &article.tags {
                    map.entry(tag.clone()).or_default().push(i);
                }
            }
            map
        });
        map.get(tag).map(|v| self.pick(v)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use notiblog_core::{ArticleType, Status};

    fn article(id: &str, page_id: &str, day: u32, kind: ArticleType, status: Status) -> Article {
        let date = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        Article {
            id: id.to_string(),
            page_id: page_id.to_string(),
            title: id.to_string(),
            tags: vec!["rust".to_string()],
            published_on: date,
            updated_on: date,
            article_type: kind,
            status,
            description: None,
            header_image: None,
            collection: None,
            url_override: None,
            body_html: String::new(),
            paths: vec![],
            images: vec![],
        }
    }

    fn sample() -> Articles {
        Articles::new(vec![
            article("p1", "aaa", 1, ArticleType::Post, Status::Normal),
            article("p2", "bbb", 5, ArticleType::Post, Status::Hidden),
            article("x9", "ccc", 3, ArticleType::Page, Status::Normal),
            article("p3", "ddd", 3, ArticleType::Post, Status::NotImportant),
        ])
        .unwrap()
    }

    #[test]
    fn test_sorted_newest_first_then_id() {
        let articles = sample();
        let ids: Vec<&str> = articles.all().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p3", "x9", "p1"]);
    }

    #[test]
    fn test_lookup_by_article_and_page_id() {
        let articles = sample();
        for a in articles.all() {
            assert_eq!(articles.get(&a.id).map(|x| &x.id), Some(&a.id));
            assert_eq!(articles.get(&a.page_id).map(|x| &x.id), Some(&a.id));
        }
        assert!(articles.get("nope").is_none());
    }

    #[test]
    fn test_views() {
        let articles = sample();
        let ids = |v: Vec<&Article>| v.iter().map(|a| a.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(articles.not_hidden()), vec!["p3", "x9", "p1"]);
        assert_eq!(ids(articles.blog_not_hidden()), vec!["p3", "p1"]);
        assert_eq!(ids(articles.by_tag("rust")), vec!["p3", "p1"]);
        assert!(articles.by_tag("unknown").is_empty());
        // memoized views stay identical
        assert_eq!(ids(articles.not_hidden()), vec!["p3", "x9", "p1"]);
    }

    #[test]
    fn test_duplicate_id_is_an_error() {
        let res = Articles::new(vec![
            article("same", "aaa", 1, ArticleType::Post, Status::Normal),
            article("same", "bbb", 2, ArticleType::Post, Status::Normal),
        ]);
        assert!(matches!(res, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_id_equal_to_own_page_id_is_fine() {
        let res = Articles::new(vec![article("aaa", "aaa", 1, ArticleType::Post, Status::Normal)]);
        assert_eq!(res.unwrap().len(), 1);
    }
}
