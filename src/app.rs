use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    http::{HeaderValue, Request, Response},
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{auth, config::AppConfig, meta, state::AppState, users};

pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(meta::meta_routes())
        .merge(auth::router())
        .merge(users::router());

    let mut app = Router::new()
        .route("/", get(meta::welcome))
        .nest(&state.config.api_prefix, api);

    if let Some(cors) = cors_layer(&state.config.cors_origins) {
        app = app.layer(cors);
    }

    app.with_state(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<_>| {
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
                |res: &Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                    let status = res.status();
                    span.record("status", tracing::field::display(status));
                    if status.is_server_error() {
                        tracing::error!(%status, ?latency, "response");
                    } else {
                        tracing::info!(%status, ?latency, "response");
                    }
                },
            ),
    )
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(%origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        info!("CORS not configured");
        return None;
    }
    info!(origins = ?origins, "CORS enabled");
    Some(
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_credentials(true)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request()),
    )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("parse listen address")?;

    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
