use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{auth, error::AppError, returns, state::AppState};

pub fn build_app(state: AppState) -> Router {
    let max_body = state.config.uploads.max_body_bytes;
    let uploads = ServeDir::new(&state.config.uploads.dir);

    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(returns::router(max_body))
                .method_not_allowed_fallback(|| async { AppError::MethodNotAllowed }),
        )
        .nest_service("/uploads", uploads)
        .route("/health", get(|| async { "ok" }))
        .fallback(|| async { AppError::NotFound("Resource not found".into()) })
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
