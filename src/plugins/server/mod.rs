mod handlers;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use axum::{
  Router,
  routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(app.config.rate_limit_per_second)
        .burst_size(app.config.rate_limit_burst)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let governor_limiter = governor_conf.limiter().clone();

    tokio::spawn(async move {
      loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
        governor_limiter.retain_recent();
      }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.port));

    let router = routes()
      .layer(
        ServiceBuilder::new()
          .layer(TraceLayer::new_for_http())
          .layer(GovernorLayer::new(governor_conf))
          .layer(
            CorsLayer::new()
              .allow_origin(Any)
              .allow_methods(Any)
              .allow_headers(Any),
          ),
      )
      .with_state(app)
      .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;

    info!("HTTP Server listening on {addr}");

    axum::serve(listener, router).await.context("HTTP server stopped")
  }
}

pub fn routes() -> Router<Arc<AppState>> {
  Router::new()
    .route("/health", get(handlers::health))
    .route("/webhook", post(handlers::webhook))
    .route("/api/merchant/order-stats", get(handlers::order_stats))
    .route(
      "/api/merchants",
      post(handlers::register_merchant).get(handlers::find_merchant),
    )
    .route("/api/merchants/{id}", put(handlers::update_merchant))
    .route(
      "/api/merchants/{id}/affiliates",
      post(handlers::register_affiliate),
    )
    .route("/api/affiliates/{id}/payout", post(handlers::payout))
    .route("/api/orders/{id}", get(handlers::get_order))
}
