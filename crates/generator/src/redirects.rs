//! Redirect table shared by the preview server and the `_redirects` file.

use notiblog_core::{Error, Result, encode_base36};
use std::collections::HashMap;
use std::fmt;

/// Fixed legacy URLs that moved.
pub const STATIC_REDIRECTS: &[(&str, &str)] = &[
    ("/index.html", "/"),
    ("/blog", "/"),
    ("/blog/", "/"),
    ("/feed/rss2/atom.xml", "/atom.xml"),
    ("/feed/rss2/", "/atom.xml"),
    ("/feed/rss2", "/atom.xml"),
    ("/feed/", "/atom.xml"),
    ("/feed", "/atom.xml"),
    ("/feedburner.xml", "/atom.xml"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectCode {
    /// 200: served transparently from the target.
    Rewrite,
    Permanent,
    Temporary,
    NotFound,
}

impl RedirectCode {
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            200 => Some(Self::Rewrite),
            301 => Some(Self::Permanent),
            302 => Some(Self::Temporary),
            404 => Some(Self::NotFound),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            Self::Rewrite => 200,
            Self::Permanent => 301,
            Self::Temporary => 302,
            Self::NotFound => 404,
        }
    }
}

impl fmt::Display for RedirectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub from: String,
    pub to: String,
    pub code: RedirectCode,
}

/// Ordered redirect rules with at most one rule per `from`.
///
/// Registering a `from` twice replaces the earlier rule in place and logs
/// a warning; the position of the first registration is kept.
#[derive(Debug, Clone, Default)]
pub struct Redirects {
    rules: Vec<Redirect>,
    index: HashMap<String, usize>,
}

impl Redirects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, from: &str, to: &str, code: RedirectCode) {
        let rule = Redirect {
            from: from.to_string(),
            to: to.to_string(),
            code,
        };
        if let Some(&idx) = self.index.get(from) {
            let old = &self.rules[idx];
            if old.to != rule.to || old.code != rule.code {
                tracing::warn!(
                    "redirect {} registered twice: {} ({}) replaced by {} ({})",
                    from,
                    old.to,
                    old.code,
                    rule.to,
                    rule.code
                );
            }
            self.rules[idx] = rule;
            return;
        }
        self.index.insert(rule.from.clone(), self.rules.len());
        self.rules.push(rule);
    }

    pub fn add_rewrite(&mut self, from: &str, to: &str) {
        self.add(from, to, RedirectCode::Rewrite);
    }

    pub fn add_temp(&mut self, from: &str, to: &str) {
        self.add(from, to, RedirectCode::Temporary);
    }

    pub fn get(&self, from: &str) -> Option<&Redirect> {
        self.index.get(from).map(|&idx| &self.rules[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Redirect> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// `_redirects` file for static hosts: one `from\tto\tcode` line per rule.
    pub fn to_redirects_file(&self) -> String {
        self.rules
            .iter()
            .map(|r| format!("{}\t{}\t{}\n", r.from, r.to, r.code))
            .collect()
    }
}

/// One line of the legacy mapping file: `<numeric id>|<old url>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRedirect {
    pub legacy_id: u64,
    pub url: String,
}

impl LegacyRedirect {
    /// Short article id the numeric id maps to.
    pub fn article_id(&self) -> String {
        encode_base36(self.legacy_id)
    }

    /// Old URL as an absolute path.
    pub fn from_path(&self) -> String {
        format!("/{}", self.url.trim_start_matches('/'))
    }
}

/// Parse the legacy mapping file. Blank lines are skipped; anything else
/// that is not `number|url` is an error.
pub fn parse_legacy_redirects(text: &str) -> Result<Vec<LegacyRedirect>> {
    let mut res = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() != 2 {
            return Err(Error::InvalidData(format!(
                "malformed legacy redirect on line {}: expected 2 fields, got {}",
                lineno + 1,
                parts.len()
            )));
        }
        let legacy_id = parts[0].trim().parse::<u64>().map_err(|e| {
            Error::InvalidData(format!(
                "malformed legacy redirect on line {}: '{}': {}",
                lineno + 1,
                line,
                e
            ))
        })?;
        let url = parts[1].trim();
        if url.is_empty() {
            return Err(Error::InvalidData(format!(
                "malformed legacy redirect on line {}: empty url",
                lineno + 1
            )));
        }
        res.push(LegacyRedirect {
            legacy_id,
            url: url.to_string(),
        });
    }
    Ok(res)
}
