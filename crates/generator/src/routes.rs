//! URL resolution and rendering, shared by the preview server and the
//! static writer so both modes serve identical bytes.

use notiblog_core::{Article, Error, Result};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::redirects::RedirectCode;
use crate::site::SiteModel;

/// Bytes escaped in file names listed as URLs.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const HTML: &str = "text/html; charset=utf-8";
const ATOM: &str = "application/atom+xml; charset=utf-8";
const XML: &str = "text/xml; charset=utf-8";

/// Chained rewrites followed before giving up.
const MAX_REWRITES: usize = 3;

/// Generated pages that always exist, in the order [`SiteModel::urls`] lists them.
pub(crate) const FIXED_URLS: &[&str] = &[
    "/index.html",
    "/archives.html",
    "/changelog.html",
    "/sitemap.xml",
    "/atom.xml",
    "/atom-all.xml",
    "/404.html",
    "/tools/generate-unique-id.html",
];

/// Something the site can serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Index,
    Archives,
    TagArchive(String),
    Changelog,
    Atom,
    AtomAll,
    Sitemap,
    NotFoundPage,
    UniqueIdTool,
    /// Article by id.
    Article(String),
    /// File under the www directory.
    WwwFile(PathBuf),
    /// Cached image.
    Image(PathBuf),
}

/// Outcome of resolving a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Serve(Route),
    Redirect { to: String, code: u16 },
    NotFound,
}

#[derive(Debug, Clone)]
pub struct Rendered {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Rendered {
    fn text(content_type: &str, body: String) -> Self {
        Self {
            content_type: content_type.to_string(),
            body: body.into_bytes(),
        }
    }
}

fn fixed_route(url: &str) -> Option<Route> {
    let route = match url {
        "/index.html" => Route::Index,
        "/archives.html" => Route::Archives,
        "/changelog.html" => Route::Changelog,
        "/sitemap.xml" => Route::Sitemap,
        "/atom.xml" => Route::Atom,
        "/atom-all.xml" => Route::AtomAll,
        "/404.html" => Route::NotFoundPage,
        "/tools/generate-unique-id.html" => Route::UniqueIdTool,
        _ => return None,
    };
    Some(route)
}

/// File under `dir` addressed by `url`; a directory maps to its index.html.
/// Paths escaping `dir` never match.
fn static_file(dir: &Path, url: &str) -> Option<PathBuf> {
    let rel = url.trim_start_matches('/');
    if rel.split('/').any(|seg| seg == "..") || rel.contains('\\') {
        return None;
    }
    let mut path = dir.join(rel);
    if url.ends_with('/') || path.is_dir() {
        path = path.join("index.html");
    }
    path.is_file().then_some(path)
}

fn has_extension(url: &str) -> bool {
    url.rsplit('/').next().is_some_and(|last| last.contains('.'))
}

/// Output file for `url`, relative to the output directory.
///
/// `/` and `/dir/` map to `index.html`, names with an extension are kept and
/// anything else gets `.html` appended.
pub fn url_to_file_path(url: &str) -> PathBuf {
    let rel = url.trim_start_matches('/');
    if rel.is_empty() || rel.ends_with('/') {
        return PathBuf::from(format!("{}index.html", rel));
    }
    if has_extension(rel) {
        PathBuf::from(rel)
    } else {
        PathBuf::from(format!("{}.html", rel))
    }
}

/// Percent-decode a request path.
pub fn decode_path(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

/// Every file under `dir`, sorted, as `(encoded url, output file)`.
fn dir_urls(dir: &Path, prefix: &str) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut urls = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let segments: Vec<String> = rel
            .components()
            .map(|c| utf8_percent_encode(&c.as_os_str().to_string_lossy(), PATH_SEGMENT).to_string())
            .collect();
        let file = Path::new(prefix.trim_start_matches('/')).join(rel);
        urls.push((format!("{}/{}", prefix, segments.join("/")), file));
    }
    Ok(urls)
}

impl SiteModel {
    /// Route serving exactly `url`, with no redirects applied.
    pub fn route_for(&self, url: &str) -> Option<Route> {
        self.route_exact(url).or_else(|| {
            if url.ends_with('/') || has_extension(url) {
                return None;
            }
            self.route_exact(&format!("{}.html", url))
        })
    }

    fn route_exact(&self, url: &str) -> Option<Route> {
        let normalized = if url == "/" { "/index.html" } else { url };
        if let Some(route) = fixed_route(normalized) {
            return Some(route);
        }
        if let Some(article) = self.article_by_url(url) {
            return Some(Route::Article(article.id.clone()));
        }
        if let Some(article) = self.article_by_id_url(url)
            && article.url_override.is_none()
        {
            return Some(Route::Article(article.id.clone()));
        }
        if let Some(rest) = url.strip_prefix("/tag/") {
            let slug = rest.strip_suffix(".html").unwrap_or(rest);
            if !slug.is_empty() && !slug.contains('/') {
                let tag = self.tag_for_slug(slug).unwrap_or(slug);
                return Some(Route::TagArchive(tag.to_string()));
            }
        }
        // a generated page owns its output file under every url that maps to it
        if let Some(owner) = self.file_owner(&url_to_file_path(url))
            && owner != url
        {
            return self.route_exact(owner);
        }
        if let Some(path) = static_file(self.www_dir(), url) {
            if let Some(owner) = path
                .strip_prefix(self.www_dir())
                .ok()
                .and_then(|rel| self.file_owner(rel))
                && owner != url
            {
                return self.route_exact(owner);
            }
            return Some(Route::WwwFile(path));
        }
        if let Some(rest) = url.strip_prefix("/img/")
            && let Some(path) = static_file(self.image_dir(), rest)
        {
            return Some(Route::Image(path));
        }
        None
    }

    /// Article addressed by id alone: `/article/<id>.html` or
    /// `/article/<id>/<any slug>`.
    fn article_by_id_url(&self, url: &str) -> Option<&Article> {
        let rest = url.strip_prefix("/article/")?;
        let id = match rest.split_once('/') {
            Some((id, _)) => id,
            None => rest.strip_suffix(".html")?,
        };
        self.articles().get(id).filter(|a| a.id == id)
    }

    /// Resolve a request path the way the static host would.
    ///
    /// Redirects are matched against the raw path first, so `/index.html`
    /// redirects to `/` while `/` itself serves the index.
    pub fn resolve(&self, path: &str) -> Resolution {
        let mut url = decode_path(path);

        for _ in 0..MAX_REWRITES {
            let Some(redirect) = self.redirects().get(&url) else {
                break;
            };
            match redirect.code {
                RedirectCode::Rewrite => url = redirect.to.clone(),
                RedirectCode::NotFound => return Resolution::NotFound,
                code => {
                    return Resolution::Redirect {
                        to: redirect.to.clone(),
                        code: code.as_u16(),
                    };
                }
            }
        }

        if let Some(route) = self.route_for(&url) {
            return Resolution::Serve(route);
        }
        // id urls of articles with a custom url
        if let Some(article) = self.article_by_id_url(&url) {
            return Resolution::Redirect {
                to: article.url(),
                code: RedirectCode::Temporary.as_u16(),
            };
        }
        Resolution::NotFound
    }

    pub fn render(&self, route: &Route) -> Result<Rendered> {
        let rendered = match route {
            Route::Index => Rendered::text(HTML, self.gen_index()),
            Route::Archives => Rendered::text(HTML, self.gen_archive(None)),
            Route::TagArchive(tag) => Rendered::text(HTML, self.gen_archive(Some(tag))),
            Route::Changelog => Rendered::text(HTML, self.gen_changelog()),
            Route::Atom => Rendered::text(ATOM, self.gen_atom("/atom.xml", true)),
            Route::AtomAll => Rendered::text(ATOM, self.gen_atom("/atom-all.xml", false)),
            Route::Sitemap => Rendered::text(XML, self.gen_sitemap()),
            Route::NotFoundPage => Rendered::text(HTML, self.gen_404()),
            Route::UniqueIdTool => Rendered::text(HTML, self.gen_unique_id_tool()),
            Route::Article(id) => {
                let article = self.articles().get(id).ok_or_else(|| Error::Render {
                    url: format!("/article/{}", id),
                    message: "no such article".to_string(),
                })?;
                Rendered::text(HTML, self.gen_article(article))
            }
            Route::WwwFile(path) | Route::Image(path) => {
                let body = std::fs::read(path)?;
                let mime = mime_guess::from_path(path).first_or_octet_stream();
                let content_type = if mime.type_() == mime_guess::mime::TEXT {
                    format!("{}; charset=utf-8", mime.essence_str())
                } else {
                    mime.essence_str().to_string()
                };
                Rendered { content_type, body }
            }
        };
        Ok(rendered)
    }

    /// File under the output directory that `route` is written to.
    pub fn output_path(&self, url: &str, route: &Route) -> PathBuf {
        let rel = match route {
            Route::WwwFile(path) => path.strip_prefix(self.www_dir()).ok().map(Path::to_path_buf),
            Route::Image(path) => path
                .strip_prefix(self.image_dir())
                .ok()
                .map(|rel| Path::new("img").join(rel)),
            _ => None,
        };
        rel.unwrap_or_else(|| url_to_file_path(url))
    }

    /// Every URL the site serves, in a stable order. No two URLs map to the
    /// same output file; files shadowed by a generated page are left out.
    pub fn urls(&self) -> Result<Vec<String>> {
        let mut urls = self.generated_urls().to_vec();
        let mut files: HashSet<PathBuf> = urls.iter().map(|u| url_to_file_path(u)).collect();
        let www = dir_urls(self.www_dir(), "")?;
        let images = dir_urls(self.image_dir(), "/img")?;
        for (url, file) in www.into_iter().chain(images) {
            if files.insert(file) {
                urls.push(url);
            } else {
                tracing::debug!("{} is shadowed by a generated page", url);
            }
        }
        Ok(urls)
    }
}
