use anyhow::{Context, Result};
use notiblog_generator::write_site;
use std::path::PathBuf;

use super::Project;

/// Generate the static site from the page cache.
pub async fn run(project: &Project, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| project.output_dir());
    println!("🔨 Building static site...");
    println!("   Cache: {}", project.cache_dir().display());
    println!("   Output: {}", output.display());
    println!();

    let model = project.load_model().await?;

    println!("📄 Writing pages...");
    let stats = write_site(&model, &output)
        .with_context(|| format!("Failed to write site to {}", output.display()))?;
    println!("   ✓ Wrote {} files ({} KB)", stats.files, stats.bytes / 1024);

    println!();
    println!("✅ Build complete!");
    println!("   Output: {}", output.display());
    println!();
    println!("To test locally:");
    println!("   notiblog serve --dir {}", output.display());
    println!();
    Ok(())
}
