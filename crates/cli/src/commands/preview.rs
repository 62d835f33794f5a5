use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use notiblog_generator::{Resolution, Route, SiteModel};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::Project;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Serve the site, rendering each page on request from the page cache.
pub async fn run(project: &Project, port: Option<u16>) -> Result<()> {
    println!("🔍 Starting preview server...");
    let model = Arc::new(project.load_model().await?);
    let port = port.unwrap_or(project.config.port);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("\n🚀 Preview ready at: http://localhost:{}", port);
    println!("   Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to port")?;
    axum::serve(listener, router(model))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

pub fn router(model: Arc<SiteModel>) -> Router {
    with_layers(Router::new().fallback(site_handler).with_state(model))
}

/// Timeout, panic recovery and request tracing around `app`.
fn with_layers(app: Router) -> Router {
    app.layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

/// Wait for Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received, stopping server");
}

async fn site_handler(State(model): State<Arc<SiteModel>>, uri: Uri) -> Response {
    match model.resolve(uri.path()) {
        Resolution::Serve(route) => render(&model, &route, StatusCode::OK),
        Resolution::Redirect { to, code } => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::FOUND);
            (status, [(header::LOCATION, to)]).into_response()
        }
        Resolution::NotFound => render(&model, &Route::NotFoundPage, StatusCode::NOT_FOUND),
    }
}

fn render(model: &SiteModel, route: &Route, status: StatusCode) -> Response {
    match model.render(route) {
        Ok(rendered) => (
            status,
            [(header::CONTENT_TYPE, rendered.content_type)],
            rendered.body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to render {:?}: {}", route, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("request handler panicked: {}", message);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use axum::routing;
    use chrono::Utc;
    use notiblog_core::config::parse_site_toml_str;
    use notiblog_core::{Block, BlockType, ImageIndex, Page};
    use notiblog_generator::SiteOptions;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BLOG: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const POST: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn page(id: &str, title: &str, parent: &str) -> Page {
        let now = Utc::now();
        let mut root = Block::new(id, BlockType::Page, title, parent);
        root.content
            .push(Block::new("t", BlockType::Text, "Some text", id));
        Page {
            id: id.to_string(),
            created_time: now,
            last_edited_time: now,
            root,
        }
    }

    fn model(dir: &TempDir) -> Arc<SiteModel> {
        let config = parse_site_toml_str(crate::commands::tests::SITE_TOML).unwrap();
        let pages = vec![page(BLOG, "Blog", ""), page(POST, "Hello Preview", BLOG)];
        let options = SiteOptions {
            www_dir: dir.path().join("www"),
            image_dir: dir.path().join("img"),
            legacy_redirects: vec![],
            generated_at: Utc::now(),
        };
        Arc::new(SiteModel::build(config, &pages, &ImageIndex::default(), options).unwrap())
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_serves_index() {
        let dir = TempDir::new().unwrap();
        let res = get(router(model(&dir)), "/").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_redirects_index_html() {
        let dir = TempDir::new().unwrap();
        let res = get(router(model(&dir)), "/index.html").await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/");
    }

    #[tokio::test]
    async fn test_serves_article_by_url() {
        let dir = TempDir::new().unwrap();
        let model = model(&dir);
        let url = model.articles().get(POST).unwrap().url();
        let res = get(router(model), &url).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("Hello Preview"));
    }

    #[tokio::test]
    async fn test_unknown_path_gets_404_page() {
        let dir = TempDir::new().unwrap();
        let res = get(router(model(&dir)), "/no/such/page").await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(!body.is_empty());
    }

    async fn exploding_page() -> &'static str {
        panic!("template blew up")
    }

    #[tokio::test]
    async fn test_panicking_handler_returns_500() {
        let app = with_layers(Router::new().route("/boom", routing::get(exploding_page)));
        let res = get(app, "/boom").await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Internal server error");
    }

    #[tokio::test]
    async fn test_server_keeps_serving_after_panic() {
        let dir = TempDir::new().unwrap();
        let app = with_layers(
            Router::new()
                .route("/boom", routing::get(exploding_page))
                .fallback(site_handler)
                .with_state(model(&dir)),
        );
        let res = get(app.clone(), "/boom").await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let res = get(app, "/").await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}
