use crate::error::{Error, Result};
use crate::ids::{is_normalized_id, normalize_id};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Raw TOML configuration structure
/// This matches the site.toml file structure exactly
#[derive(Debug, Deserialize)]
struct RawConfig {
    site: RawSite,
    notion: RawNotion,
    #[serde(default)]
    paths: RawPaths,
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    redirect: Vec<RawRedirect>,
}

#[derive(Debug, Deserialize)]
struct RawSite {
    title: String,
    host_url: String,
    author: String,
    author_email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawNotion {
    start_page: Option<String>,
    blog_root: String,
    website_root: String,
    book_root: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPaths {
    cache_dir: Option<String>,
    www_dir: Option<String>,
    output_dir: Option<String>,
    legacy_redirects: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawServer {
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct RawRedirect {
    from: String,
    to: String,
    code: Option<u16>,
}

/// Complete site configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub site: SiteInfo,
    pub roots: SiteRoots,
    pub paths: SitePaths,
    pub port: u16,
    pub redirects: Vec<RedirectRule>,
}

/// Public identity of the site
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub title: String,
    /// Absolute base URL without trailing slash
    pub host_url: String,
    pub author: String,
    pub author_email: Option<String>,
}

/// Recognized root pages of the content tree (normalized ids)
#[derive(Debug, Clone)]
pub struct SiteRoots {
    pub start_page: String,
    pub blog_root: String,
    pub website_root: String,
    pub book_root: Option<String>,
}

impl SiteRoots {
    /// True if `id` (dashed or not) is one of the recognized roots.
    pub fn is_root(&self, id: &str) -> bool {
        let id = normalize_id(id);
        id == self.blog_root
            || id == self.website_root
            || self.book_root.as_deref() == Some(id.as_str())
    }
}

/// Directories used by the generator, relative to the working directory
#[derive(Debug, Clone)]
pub struct SitePaths {
    pub cache_dir: PathBuf,
    pub www_dir: PathBuf,
    pub output_dir: PathBuf,
    pub legacy_redirects: Option<PathBuf>,
}

impl SitePaths {
    /// Cached images live under `<cache_dir>/img`.
    pub fn image_dir(&self) -> PathBuf {
        self.cache_dir.join("img")
    }
}

/// Extra redirect declared in site.toml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRule {
    pub from: String,
    pub to: String,
    pub code: u16,
}

const DEFAULT_PORT: u16 = 8080;
const VALID_REDIRECT_CODES: &[u16] = &[200, 301, 302, 404];

/// Parse site.toml from a file path
pub fn parse_site_toml<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_site_toml_str(&content)
}

/// Parse site.toml from a string (useful for testing)
pub fn parse_site_toml_str(content: &str) -> Result<Config> {
    let raw: RawConfig = toml::from_str(content)?;

    let host_url = raw.site.host_url.trim_end_matches('/').to_string();
    if !host_url.starts_with("http://") && !host_url.starts_with("https://") {
        return Err(Error::ConfigParse(format!(
            "site.host_url must be an absolute http(s) URL, got '{}'",
            raw.site.host_url
        )));
    }

    let site = SiteInfo {
        title: raw.site.title,
        host_url,
        author: raw.site.author,
        author_email: raw.site.author_email,
    };

    let blog_root = validate_id(&raw.notion.blog_root, "notion.blog_root")?;
    let website_root = validate_id(&raw.notion.website_root, "notion.website_root")?;
    let book_root = match raw.notion.book_root {
        Some(id) => Some(validate_id(&id, "notion.book_root")?),
        None => None,
    };
    let start_page = match raw.notion.start_page {
        Some(id) => validate_id(&id, "notion.start_page")?,
        None => website_root.clone(),
    };

    let roots = SiteRoots {
        start_page,
        blog_root,
        website_root,
        book_root,
    };

    let paths = SitePaths {
        cache_dir: path_or_default(raw.paths.cache_dir, "notion_cache", "paths.cache_dir")?,
        www_dir: path_or_default(raw.paths.www_dir, "www", "paths.www_dir")?,
        output_dir: path_or_default(raw.paths.output_dir, "www_generated", "paths.output_dir")?,
        legacy_redirects: match raw.paths.legacy_redirects {
            Some(p) => Some(validate_path(&p, "paths.legacy_redirects")?),
            None => None,
        },
    };

    let redirects: Result<Vec<RedirectRule>> = raw
        .redirect
        .into_iter()
        .map(|r| {
            let code = r.code.unwrap_or(302);
            if !VALID_REDIRECT_CODES.contains(&code) {
                return Err(Error::ConfigParse(format!(
                    "Invalid redirect code {} for '{}', expected one of 200, 301, 302, 404",
                    code, r.from
                )));
            }
            if !r.from.starts_with('/') {
                return Err(Error::ConfigParse(format!(
                    "Redirect source must start with '/': '{}'",
                    r.from
                )));
            }
            Ok(RedirectRule {
                from: r.from,
                to: r.to,
                code,
            })
        })
        .collect();

    Ok(Config {
        site,
        roots,
        paths,
        port: raw.server.port.unwrap_or(DEFAULT_PORT),
        redirects: redirects?,
    })
}

/// Normalize a content-service id and check it is 32 hex digits.
fn validate_id(id: &str, field_name: &str) -> Result<String> {
    let normalized = normalize_id(id);
    if !is_normalized_id(&normalized) {
        return Err(Error::ConfigParse(format!(
            "Invalid page id in '{}': '{}'. Expected 32 hex digits (dashes allowed).",
            field_name, id
        )));
    }
    Ok(normalized)
}

fn path_or_default(value: Option<String>, default: &str, field_name: &str) -> Result<PathBuf> {
    match value {
        Some(p) => validate_path(&p, field_name),
        None => Ok(PathBuf::from(default)),
    }
}

/// Site directories are resolved against the directory holding the config
/// file, so they must stay inside it: `notion_cache` is accepted while
/// `/srv/www` and `../out` are not.
fn validate_path(path_str: &str, field_name: &str) -> Result<PathBuf> {
    if path_str.trim().is_empty() {
        return Err(Error::ConfigParse(format!("Empty path in '{}' field", field_name)));
    }
    let path = PathBuf::from(path_str);
    if path.is_absolute() || path.has_root() {
        return Err(Error::ConfigParse(format!(
            "Absolute paths not allowed in '{}': '{}'. Paths are relative to the config file.",
            field_name, path_str
        )));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(Error::ConfigParse(format!(
            "Parent directory references (..) not allowed in '{}': '{}'",
            field_name, path_str
        )));
    }
    Ok(path)
}
