use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::Project;

/// Extensions counted as source code.
const SOURCE_EXTS: &[&str] = &["rs", "go", "js", "ts", "css", "html", "toml", "md", "sh"];

/// Directory names never descended into.
const SKIP_DIRS: &[&str] = &["target", ".git", "node_modules"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Count {
    pub files: usize,
    pub lines: usize,
}

fn is_skipped(entry: &DirEntry, skip: &[PathBuf]) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    SKIP_DIRS.contains(&name.as_ref()) || skip.iter().any(|p| entry.path() == p)
}

/// Line counts per extension under `root`, skipping `skip` directories.
/// Relative and absolute spellings of the same directory are equivalent.
pub fn count_lines(root: &Path, skip: &[PathBuf]) -> Result<BTreeMap<String, Count>> {
    let root = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", root.display()))?;
    // missing directories have nothing to skip
    let skip: Vec<PathBuf> = skip.iter().filter_map(|p| p.canonicalize().ok()).collect();
    let mut counts: BTreeMap<String, Count> = BTreeMap::new();
    let walker = WalkDir::new(&root)
        .into_iter()
        .filter_entry(|e| !is_skipped(e, &skip));
    for entry in walker {
        let entry = entry.context("Failed to walk directory")?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !SOURCE_EXTS.contains(&ext) {
            continue;
        }
        let Ok(text) = fs::read_to_string(entry.path()) else {
            tracing::debug!("skipping non-utf8 file {}", entry.path().display());
            continue;
        };
        let count = counts.entry(ext.to_string()).or_default();
        count.files += 1;
        count.lines += text.lines().count();
    }
    Ok(counts)
}

/// Print line counts for the current directory. The cache and output
/// directories from site.toml are skipped when the config exists.
pub fn run(config_path: &Path) -> Result<()> {
    let root = PathBuf::from(".");
    let skip = if config_path.exists() {
        let project = Project::load(config_path)?;
        vec![project.cache_dir(), project.output_dir()]
    } else {
        Vec::new()
    };

    let counts = count_lines(&root, &skip)?;
    let mut total = Count::default();
    println!("{:>8} {:>8}  ext", "files", "lines");
    for (ext, count) in &counts {
        println!("{:>8} {:>8}  {}", count.files, count.lines, ext);
        total.files += count.files;
        total.lines += count.lines;
    }
    println!("{:>8} {:>8}  total", total.files, total.lines);
    Ok(())
}
