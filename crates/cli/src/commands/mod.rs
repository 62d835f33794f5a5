pub mod import;
pub mod preview;
pub mod rebuild;
pub mod serve;
pub mod wc;

use anyhow::{Context, Result};
use chrono::Utc;
use notiblog_core::config::{Config, parse_site_toml};
use notiblog_core::Page;
use notiblog_generator::{LegacyRedirect, SiteModel, SiteOptions, parse_legacy_redirects};
use notiblog_notion::images::load_index;
use notiblog_notion::{CachePolicy, Downloader, PageCache};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the content-service API token.
pub const TOKEN_ENV: &str = "NOTION_TOKEN";

/// A loaded site.toml plus the directory its relative paths start from.
pub struct Project {
    pub config: Config,
    root: PathBuf,
}

impl Project {
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            anyhow::bail!(
                "{} not found\nCreate one or pass --config <path>",
                config_path.display()
            );
        }
        let config = parse_site_toml(config_path)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        let root = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self { config, root })
    }

    pub fn path(&self, rel: &Path) -> PathBuf {
        self.root.join(rel)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.path(&self.config.paths.cache_dir)
    }

    pub fn image_dir(&self) -> PathBuf {
        self.path(&self.config.paths.image_dir())
    }

    pub fn www_dir(&self) -> PathBuf {
        self.path(&self.config.paths.www_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path(&self.config.paths.output_dir)
    }

    pub fn legacy_redirects(&self) -> Result<Vec<LegacyRedirect>> {
        let Some(rel) = &self.config.paths.legacy_redirects else {
            return Ok(Vec::new());
        };
        let path = self.path(rel);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        parse_legacy_redirects(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Every page reachable from the start page, from the cache only.
    pub async fn load_cached_pages(&self) -> Result<Vec<Page>> {
        let downloader = Downloader::new(PageCache::new(self.cache_dir()), None, CachePolicy::CacheOnly);
        let (pages, _) = downloader
            .download_pages_recursively(&self.config.roots.start_page)
            .await
            .context("Failed to load pages from cache (run 'notiblog import' first)")?;
        Ok(pages)
    }

    pub fn build_model(&self, pages: &[Page]) -> Result<SiteModel> {
        let images = load_index(&self.image_dir()).context("Failed to index cached images")?;
        let options = SiteOptions {
            www_dir: self.www_dir(),
            image_dir: self.image_dir(),
            legacy_redirects: self.legacy_redirects()?,
            generated_at: Utc::now(),
        };
        let model = SiteModel::build(self.config.clone(), pages, &images, options)
            .context("Failed to build site")?;
        Ok(model)
    }

    /// Cache-only load followed by a model build, with progress output.
    pub async fn load_model(&self) -> Result<SiteModel> {
        let pages = self.load_cached_pages().await?;
        println!("   ✓ Loaded {} pages from {}", pages.len(), self.cache_dir().display());
        let model = self.build_model(&pages)?;
        println!(
            "   ✓ {} articles, {} tags, {} redirects",
            model.articles().len(),
            model.tags().len().saturating_sub(1),
            model.redirects().len()
        );
        Ok(model)
    }
}

/// API token from the environment.
pub fn notion_token() -> Result<String> {
    std::env::var(TOKEN_ENV)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .with_context(|| format!("{} is not set", TOKEN_ENV))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) const SITE_TOML: &str = r##"
[site]
title = "Test Blog"
host_url = "https://blog.example.com"
author = "Test Author"

[notion]
blog_root = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
website_root = "00000000000000000000000000000000"

[paths]
legacy_redirects = "redirects.txt"
"##;

    #[test]
    fn test_paths_are_relative_to_config() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("site.toml");
        fs::write(&config_path, SITE_TOML).unwrap();
        let project = Project::load(&config_path).unwrap();
        assert_eq!(project.cache_dir(), dir.path().join("notion_cache"));
        assert_eq!(project.image_dir(), dir.path().join("notion_cache").join("img"));
        assert_eq!(project.output_dir(), dir.path().join("www_generated"));
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(Project::load(&dir.path().join("nope.toml")).is_err());
    }

    #[test]
    fn test_legacy_redirects_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("site.toml");
        fs::write(&config_path, SITE_TOML).unwrap();
        fs::write(dir.path().join("redirects.txt"), "64|articles/old.html\n").unwrap();
        let project = Project::load(&config_path).unwrap();
        let legacy = project.legacy_redirects().unwrap();
        assert_eq!(legacy.len(), 1);
        assert_eq!(legacy[0].article_id(), "1s");

        fs::write(dir.path().join("redirects.txt"), "garbage\n").unwrap();
        assert!(project.legacy_redirects().is_err());
    }
}
