//! On-disk page cache: one `<normalized id>.json` file per page.

use notiblog_core::{Error, Page, Result, normalize_id};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", normalize_id(id)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.path_for(id).is_file()
    }

    /// Cached copy of a page, or `None` if it was never downloaded.
    pub fn load(&self, id: &str) -> Result<Option<Page>> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        let page = serde_json::from_slice(&data).map_err(|e| {
            Error::InvalidData(format!("corrupt cache file {}: {}", path.display(), e))
        })?;
        Ok(Some(page))
    }

    pub fn store(&self, page: &Page) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_vec_pretty(page)?;
        fs::write(self.path_for(&page.id), data)?;
        Ok(())
    }

    /// Ids of every cached page, sorted.
    pub fn ids(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.strip_suffix(".json").map(str::to_string)
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Every cached page, in id order.
    pub fn load_all(&self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        for id in self.ids()? {
            if let Some(page) = self.load(&id)? {
                pages.push(page);
            }
        }
        Ok(pages)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use notiblog_core::{Block, BlockType};
    use tempfile::TempDir;

    pub(crate) fn page(id: &str, title: &str, subpages: &[&str]) -> Page {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut root = Block::new(id, BlockType::Page, title, "");
        for sub in subpages {
            root.content.push(Block::new(sub, BlockType::Page, "", id));
        }
        Page {
            id: id.to_string(),
            created_time: date,
            last_edited_time: date,
            root,
        }
    }

    #[test]
    fn test_store_and_load() {
        let temp = TempDir::new().unwrap();
        let cache = PageCache::new(temp.path().join("cache"));
        assert_eq!(cache.load("abc").unwrap(), None);

        let p = page("abc", "Hello", &["def"]);
        cache.store(&p).unwrap();
        assert!(cache.contains("ABC"));
        assert_eq!(cache.load("abc").unwrap(), Some(p));
    }

    #[test]
    fn test_load_all_sorted_and_skips_other_files() {
        let temp = TempDir::new().unwrap();
        let cache = PageCache::new(temp.path());
        cache.store(&page("bbb", "B", &[])).unwrap();
        cache.store(&page("aaa", "A", &[])).unwrap();
        fs::create_dir_all(temp.path().join("img")).unwrap();
        fs::write(temp.path().join("notes.txt"), "x").unwrap();

        assert_eq!(cache.ids().unwrap(), vec!["aaa", "bbb"]);
        let titles: Vec<String> = cache
            .load_all()
            .unwrap()
            .iter()
            .map(|p| p.title().to_string())
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_corrupt_file_is_invalid_data() {
        let temp = TempDir::new().unwrap();
        let cache = PageCache::new(temp.path());
        fs::write(temp.path().join("abc.json"), "{not json").unwrap();
        assert!(matches!(cache.load("abc"), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let cache = PageCache::new(temp.path().join("nope"));
        assert!(cache.load_all().unwrap().is_empty());
    }
}
