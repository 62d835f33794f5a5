use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use super::Project;
use super::preview::shutdown_signal;

/// Serve a generated site directory, falling back to its 404 page.
pub async fn run(project: &Project, dir: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let dir = dir.unwrap_or_else(|| project.output_dir());
    if !dir.is_dir() {
        anyhow::bail!(
            "Site directory does not exist: {}\nRun 'notiblog rebuild' first",
            dir.display()
        );
    }
    let port = port.unwrap_or(project.config.port);

    println!("🌐 Serving {}", dir.display());
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("\n🚀 Site ready at: http://localhost:{}", port);
    println!("   Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to port")?;
    axum::serve(listener, router(&dir))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

pub fn router(dir: &Path) -> Router {
    let files = ServeDir::new(dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(dir.join("404.html")));
    Router::new()
        .fallback_service(files)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_serves_files_and_404_page() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "home").unwrap();
        fs::write(dir.path().join("404.html"), "missing").unwrap();

        let res = router(dir.path())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = router(dir.path())
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"missing");
    }
}
