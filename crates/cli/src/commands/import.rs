use anyhow::{Context, Result};
use notiblog_core::Page;
use notiblog_core::pool::default_parallelism;
use notiblog_generator::article::referenced_image_urls;
use notiblog_notion::http_cache::DEFAULT_EXPIRATION;
use notiblog_notion::{
    CachePolicy, Downloader, HttpDownloadCache, ImageCache, NotionClient, PageCache, PageSource,
};
use std::collections::HashSet;
use std::sync::Arc;

use super::{Project, notion_token};

fn downloader(project: &Project, policy: CachePolicy) -> Result<Downloader> {
    let token = notion_token()?;
    let client = NotionClient::new(&token).context("Failed to create Notion client")?;
    let source: Arc<dyn PageSource> = Arc::new(client);
    Ok(Downloader::new(PageCache::new(project.cache_dir()), Some(source), policy)
        .with_parallelism(default_parallelism()))
}

/// Image URLs referenced by `pages`, first occurrence order.
fn image_urls(pages: &[Page]) -> Vec<String> {
    let mut seen = HashSet::new();
    pages
        .iter()
        .flat_map(referenced_image_urls)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

async fn download_images(project: &Project, pages: &[Page]) -> Result<()> {
    let urls = image_urls(pages);
    if urls.is_empty() {
        return Ok(());
    }
    println!("🖼  Downloading {} images...", urls.len());
    let http = HttpDownloadCache::new(reqwest::Client::new(), DEFAULT_EXPIRATION);
    let sweeper = http.start_sweeper();
    let images = ImageCache::new(project.image_dir(), http);
    let stats = images.download_all(urls, default_parallelism()).await;
    sweeper.abort();

    println!(
        "   ✓ {} cached, {} downloaded, {} failed",
        stats.cached, stats.downloaded, stats.failed
    );
    if stats.failed > 0 {
        eprintln!("   ⚠ Warning: some images failed to download, see log for details");
    }
    Ok(())
}

/// Recursive import from the start page.
pub async fn run(project: &Project, no_cache: bool) -> Result<()> {
    let policy = if no_cache {
        CachePolicy::DownloadAlways
    } else {
        CachePolicy::DownloadNewer
    };
    println!("📥 Importing from Notion...");
    println!("   Start page: {}", project.config.roots.start_page);
    println!("   Cache: {}", project.cache_dir().display());
    println!();

    let downloader = downloader(project, policy)?;
    let (pages, stats) = downloader
        .download_pages_recursively(&project.config.roots.start_page)
        .await
        .context("Import failed")?;
    println!(
        "   ✓ {} pages ({} from cache, {} downloaded)",
        stats.total(),
        stats.from_cache,
        stats.downloaded
    );

    download_images(project, &pages).await?;

    // surface metadata errors now rather than at rebuild time
    let model = project.build_model(&pages)?;
    println!();
    println!("✅ Import complete!");
    println!("   Articles: {}", model.articles().len());
    Ok(())
}

/// Re-download a single page, ignoring the cache.
pub async fn run_one(project: &Project, id: &str) -> Result<()> {
    println!("📥 Importing page {}...", id);
    let downloader = downloader(project, CachePolicy::DownloadAlways)?;
    let download = downloader
        .download_page(id)
        .await
        .with_context(|| format!("Failed to import page {}", id))?;
    println!("   ✓ {}", download.page.title());

    download_images(project, std::slice::from_ref(&download.page)).await?;
    println!("✅ Done");
    Ok(())
}
