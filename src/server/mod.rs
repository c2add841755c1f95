pub mod api;
pub mod dtos;
pub mod error;
pub mod resolvers;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use axum::{Extension, Router, ServiceExt, extract::Request, routing::get};
use once_cell::sync::Lazy;
use tower::Layer as _;
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::server::api::channel_controller::ChannelController;
use crate::server::api::extract_controller::ExtractController;
use crate::server::api::health_controller;
use crate::server::api::playlist_controller::PlaylistController;
use crate::server::api::segment_controller::SegmentController;
use crate::server::api::subtitle_controller::SubtitleController;
use crate::server::services::AppServices;

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

pub fn get_app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn get_uptime_seconds() -> u64 {
    START_TIME.elapsed().as_secs()
}

pub struct ApplicationServer;

impl ApplicationServer {
    pub async fn serve(config: Arc<AppConfig>) -> anyhow::Result<()> {
        // pin the start time before the first health request can ask for it
        Lazy::force(&START_TIME);

        let address = format!("0.0.0.0:{}", config.port);
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .context("Failed to bind server address")?;

        let services = AppServices::new(config.clone());

        let cors = if config.cors_origin == "*" {
            CorsLayer::new()
                .allow_methods(Any)
                .allow_origin(Any)
                .allow_headers(Any)
        } else {
            let origins = config
                .cors_origin
                .split(',')
                .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
                .collect::<Vec<_>>();

            CorsLayer::new()
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_origin(origins)
                .allow_headers(Any)
        };

        let router = Router::new()
            .nest("/api/v1/playlist", PlaylistController::app())
            .nest("/api/v1/segment", SegmentController::app())
            .nest("/api/v1/channel", ChannelController::app())
            .nest("/api/v1/extract", ExtractController::app())
            .nest("/api/v1/subtitle", SubtitleController::app())
            .route("/api/v1/health", get(health_controller::health_endpoint))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(Extension(services));

        // players are sloppy about trailing slashes on playlist urls
        let app = NormalizePathLayer::trim_trailing_slash().layer(router);

        info!("relay listening on {}", address);

        axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
            .with_graceful_shutdown(Self::shutdown_signal())
            .await
            .context("Failed to start server")?;

        Ok(())
    }

    async fn shutdown_signal() {
        tokio::signal::ctrl_c()
            .await
            .expect("Ctrl+C handler should install");

        info!("shutdown signal received, draining...");
    }
}
