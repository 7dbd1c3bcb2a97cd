use anyhow::Context;
use sea_orm::ConnectOptions;

use crate::{
  config::Config,
  prelude::*,
  sv::{
    self,
    gateway::{
      DiscountCodeIssuer, HttpGateway, LogGateway, PayoutGateway, UuidIssuer,
    },
    notify::{LogNotifier, Notifier},
    queue::{RetryPolicy, TaskQueue, TokioQueue},
  },
};

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
  pub issuer: Arc<dyn DiscountCodeIssuer>,
  pub notifier: Arc<dyn Notifier>,
  pub queue: Arc<dyn TaskQueue>,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    let db = Database::connect(connect_options(&config.database_url))
      .await
      .with_context(|| {
        format!("Failed to connect to {}", config.database_url)
      })?;

    Migrator::up(&db, None).await.context("Failed to run migrations")?;

    let gateway: Arc<dyn PayoutGateway> = match &config.payout_gateway_url {
      Some(url) => {
        info!("payouts go to {}", url);
        Arc::new(HttpGateway::new(
          url.clone(),
          config.payout_gateway_token.clone(),
        ))
      }
      None => {
        warn!("PAYOUT_GATEWAY_URL not set, payouts are only logged");
        Arc::new(LogGateway)
      }
    };

    Ok(Self::with_parts(
      db,
      config,
      gateway,
      Arc::new(UuidIssuer),
      Arc::new(LogNotifier),
    ))
  }

  /// Wires the payout queue around already built collaborators.
  pub fn with_parts(
    db: DatabaseConnection,
    config: Config,
    gateway: Arc<dyn PayoutGateway>,
    issuer: Arc<dyn DiscountCodeIssuer>,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    let queue = Arc::new(TokioQueue::new(
      db.clone(),
      gateway,
      config.payout_workers,
      RetryPolicy {
        max_attempts: config.payout_max_attempts,
        delay: config.payout_retry_delay,
      },
    ));

    Self { db, config, issuer, notifier, queue }
  }

  pub fn sv(&self) -> sv::Services<'_> {
    let affiliates = || {
      sv::Affiliates::new(
        &self.db,
        self.issuer.as_ref(),
        self.notifier.as_ref(),
      )
    };

    sv::Services {
      affiliate: affiliates(),
      merchant: sv::Merchants::new(&self.db),
      order: sv::Orders::new(&self.db, affiliates()),
      payout: sv::Payouts::new(&self.db, self.queue.as_ref()),
    }
  }
}

/// SQLite runs on a single pooled connection; transactions serialize on it.
fn connect_options(url: &str) -> ConnectOptions {
  let mut options = ConnectOptions::new(url);
  if url.starts_with("sqlite:") {
    options.max_connections(1);
  }
  options
}
