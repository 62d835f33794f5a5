//! Site model and renderers for notiblog.
//!
//! [`SiteModel`] is built once from cached pages. The preview server and
//! [`write_site`] both go through [`SiteModel::resolve`] and
//! [`SiteModel::render`], so a URL renders the same bytes in either mode.

pub mod article;
pub mod articles;
pub mod feeds;
pub mod index;
pub mod metadata;
pub mod navigation;
pub mod redirects;
pub mod render;
pub mod routes;
pub mod site;
pub mod static_site;
pub mod templates;

pub use articles::Articles;
pub use redirects::{LegacyRedirect, RedirectCode, Redirects, parse_legacy_redirects};
pub use routes::{Rendered, Resolution, Route, decode_path, url_to_file_path};
pub use site::{SiteModel, SiteOptions};
pub use static_site::{REDIRECTS_FILE, WriteStats, write_site};
