/*
 * Responsibility
 * - Config読み込み → 依存生成 (GraphClient / Gatekeeper) → Router 組み立て
 * - Middleware の適用 (http / security headers / canvas gate)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::services::canvas::Gatekeeper;
use crate::services::graph::GraphClient;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,canvas_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: crash loudly. Production: default hook, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<(), AppError> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting canvas gate in {:?} mode on {}",
        config.app_env,
        config.addr
    );
    if config.canvas.skip_auth_check {
        tracing::warn!("CANVAS_SKIP_AUTH_CHECK is on: granted permissions are not checked");
    }

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, addr = %config.addr, "failed to bind");
            AppError::Internal
        })?;
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!(error = %e, "server error");
        AppError::Internal
    })?;

    Ok(())
}

fn build_state(config: &Config) -> Result<AppState, AppError> {
    let canvas = Arc::new(config.canvas.clone());

    let graph = GraphClient::new(&canvas.graph_base_url, canvas.graph_timeout).map_err(|e| {
        tracing::error!(error = %e, "failed to build graph client");
        AppError::Internal
    })?;

    let gatekeeper = Arc::new(Gatekeeper::new(canvas.clone(), Arc::new(graph.clone())));

    Ok(AppState::new(canvas, gatekeeper, graph, config.http))
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .nest("/api/v1", api::v1::routes(state.clone()))
        .with_state(state);

    let router = middleware::security_headers::apply(router, &config.frame_ancestors);
    middleware::http::apply(router, &config.http)
}
