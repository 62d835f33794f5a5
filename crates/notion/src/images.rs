//! Image cache: `<cache>/img/<image_key><ext>`.

use notiblog_core::pool::for_each_bounded;
use notiblog_core::{Error, ImageIndex, Result, image_key};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::http_cache::HttpDownloadCache;

const IMAGE_EXTS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".bmp", ".tiff", ".svg"];

/// File extension for an image, from its URL path or its content type.
pub fn guess_ext(url: &str, content_type: Option<&str>) -> Option<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or_default().to_lowercase();
    if let Some(ext) = IMAGE_EXTS.iter().copied().find(|ext| path.ends_with(ext)) {
        return Some(ext);
    }
    let content_type = content_type?.split(';').next()?.trim().to_lowercase();
    match content_type.as_str() {
        "image/png" => Some(".png"),
        "image/jpeg" => Some(".jpg"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        "image/svg+xml" => Some(".svg"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageStats {
    pub cached: usize,
    pub downloaded: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ImageCache {
    dir: PathBuf,
    http: Arc<HttpDownloadCache>,
}

impl ImageCache {
    pub fn new<P: AsRef<Path>>(dir: P, http: Arc<HttpDownloadCache>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            http,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Index of every image currently on disk.
    pub fn index(&self) -> Result<ImageIndex> {
        load_index(&self.dir)
    }

    /// Path of the cached copy of `url`, if any.
    pub fn find(&self, url: &str) -> Option<PathBuf> {
        let key = image_key(url);
        fs::read_dir(&self.dir)
            .ok()?
            .filter_map(|e| e.ok())
            .find(|e| e.file_name().to_string_lossy().starts_with(&key))
            .map(|e| e.path())
    }

    /// Write downloaded image bytes under their cache name.
    pub fn store(&self, url: &str, data: &[u8], content_type: Option<&str>) -> Result<PathBuf> {
        let ext = guess_ext(url, content_type).ok_or_else(|| {
            Error::InvalidData(format!(
                "no image extension for '{}' (content type {:?})",
                url, content_type
            ))
        })?;
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}{}", image_key(url), ext));
        fs::write(&path, data)?;
        Ok(path)
    }

    /// Download `url` unless it is already cached. Returns the path and
    /// whether the file was already on disk.
    pub async fn download(&self, url: &str) -> Result<(PathBuf, bool)> {
        if let Some(path) = self.find(url) {
            tracing::trace!("image {} already cached as {}", url, path.display());
            return Ok((path, true));
        }
        let (response, _) = self.http.download(url).await?;
        let path = self.store(url, &response.data, response.content_type.as_deref())?;
        tracing::info!("downloaded image {} as {}", url, path.display());
        Ok((path, false))
    }

    /// Download every URL through a bounded pool. Failures are logged and skipped.
    pub async fn download_all(&self, urls: Vec<String>, parallelism: usize) -> ImageStats {
        let this = self.clone();
        let results = for_each_bounded(urls, parallelism, move |url| {
            let this = this.clone();
            async move {
                let res = this.download(&url).await;
                (url, res)
            }
        })
        .await;

        let mut stats = ImageStats::default();
        for (url, res) in results {
            match res {
                Ok((_, true)) => stats.cached += 1,
                Ok((_, false)) => stats.downloaded += 1,
                Err(err) => {
                    tracing::warn!("failed to download image {}: {}", url, err);
                    stats.failed += 1;
                }
            }
        }
        stats
    }
}

/// Index the image files in `dir`. A missing directory is an empty index.
pub fn load_index(dir: &Path) -> Result<ImageIndex> {
    if !dir.is_dir() {
        return Ok(ImageIndex::default());
    }
    let names = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned());
    Ok(ImageIndex::from_file_names(names))
}
