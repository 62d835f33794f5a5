//! Site index: tag aggregation, year/month grouping and tag filtering.

use chrono::Datelike;
use notiblog_core::{Article, short_hash, urlify};
use std::collections::BTreeMap;

/// Synthetic tag for the full archive.
pub const ALL_TAG: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub name: String,
    pub url: String,
    pub count: usize,
}

/// URL slug of a tag. Tags with no ASCII letters or digits get a hash.
pub fn tag_slug(tag: &str) -> String {
    let slug = urlify(tag);
    if slug.is_empty() {
        format!("t-{}", short_hash(tag))
    } else {
        slug
    }
}

/// Public URL of a tag archive.
pub fn tag_url(tag: &str) -> String {
    format!("/tag/{}", tag_slug(tag))
}

/// URL of the generated file behind [`tag_url`].
pub fn tag_file_url(tag: &str) -> String {
    format!("{}.html", tag_url(tag))
}

/// Tag list for `articles`: `all` first, then every tag sorted by name.
pub fn build_tags(articles: &[&Article]) -> Vec<TagInfo> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for article in articles {
        for tag in &article.tags {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }

    let mut res = Vec::with_capacity(counts.len() + 1);
    res.push(TagInfo {
        name: ALL_TAG.to_string(),
        url: "/archives.html".to_string(),
        count: articles.len(),
    });
    res.extend(counts.into_iter().map(|(tag, count)| TagInfo {
        name: tag.to_string(),
        url: tag_url(tag),
        count,
    }));
    res
}

/// Articles that do (`include`) or do not carry `tag`, in input order.
pub fn filter_articles_by_tag<'a>(
    articles: &[&'a Article],
    tag: &str,
    include: bool,
) -> Vec<&'a Article> {
    articles
        .iter()
        .copied()
        .filter(|a| a.has_tag(tag) == include)
        .collect()
}

/// Article in an archive listing with its month label.
#[derive(Debug, Clone)]
pub struct MonthArticle<'a> {
    pub article: &'a Article,
    /// `"March 4"` on the first article of a month, `"4"` after that.
    pub display_month: String,
}

#[derive(Debug, Clone)]
pub struct Year<'a> {
    pub name: String,
    pub articles: Vec<MonthArticle<'a>>,
}

/// Group articles already sorted by publish date, newest first, into years.
pub fn build_years<'a>(articles: &[&'a Article]) -> Vec<Year<'a>> {
    let mut res: Vec<Year<'a>> = Vec::new();
    let mut curr_month: Option<u32> = None;

    for &article in articles {
        let date = article.published_on;
        let year_name = date.year().to_string();
        if res.last().is_none_or(|y| y.name != year_name) {
            res.push(Year {
                name: year_name,
                articles: Vec::new(),
            });
            curr_month = None;
        }

        let display_month = if curr_month == Some(date.month()) {
            date.format("%-d").to_string()
        } else {
            date.format("%B %-d").to_string()
        };
        curr_month = Some(date.month());

        if let Some(year) = res.last_mut() {
            year.articles.push(MonthArticle {
                article,
                display_month,
            });
        }
    }
    res
}
