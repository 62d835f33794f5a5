//! Materialize the site model into a directory of files.

use notiblog_core::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::routes::decode_path;
use crate::site::SiteModel;

/// Redirect file understood by Netlify-style static hosts.
pub const REDIRECTS_FILE: &str = "_redirects";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    pub files: usize,
    pub bytes: u64,
}

/// Replace `out_dir` with one file per URL plus the `_redirects` file.
pub fn write_site(model: &SiteModel, out_dir: &Path) -> Result<WriteStats> {
    if out_dir.as_os_str().is_empty() || out_dir == Path::new(".") || out_dir.parent().is_none() {
        return Err(Error::InvalidData(format!(
            "refusing to use {} as the output directory",
            out_dir.display()
        )));
    }
    if out_dir.exists() {
        fs::remove_dir_all(out_dir)?;
    }
    fs::create_dir_all(out_dir)?;

    let mut stats = WriteStats::default();
    let mut written = HashSet::new();
    for url in model.urls()? {
        let path = decode_path(&url);
        let route = model.route_for(&path).ok_or_else(|| Error::Render {
            url: url.clone(),
            message: "no route".to_string(),
        })?;
        let rel = model.output_path(&path, &route);
        if !written.insert(rel.clone()) {
            return Err(Error::Render {
                url,
                message: format!("{} was already written for another url", rel.display()),
            });
        }
        let rendered = model.render(&route)?;
        write_file(&out_dir.join(rel), &rendered.body)?;
        stats.files += 1;
        stats.bytes += rendered.body.len() as u64;
        tracing::debug!("wrote {}", url);
    }

    let redirects = model.redirects().to_redirects_file();
    write_file(&out_dir.join(REDIRECTS_FILE), redirects.as_bytes())?;
    stats.files += 1;
    stats.bytes += redirects.len() as u64;

    tracing::info!(
        "wrote {} files ({} bytes) to {}",
        stats.files,
        stats.bytes,
        out_dir.display()
    );
    Ok(stats)
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)?;
    Ok(())
}
