mod config;
mod entity;
mod error;
mod plugins;
mod prelude;
mod repo;
mod state;
mod sv;
mod utils;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{config::Config, plugins::App, prelude::*, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "affiliate=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  info!("Starting Affiliate Server v{}", env!("CARGO_PKG_VERSION"));

  let config = Config::from_env()?;
  let app = Arc::new(AppState::new(config).await?);

  let plugins = App::new()
    .register(plugins::server::Plugin)
    .register(plugins::cron::PayoutSweep);

  tokio::select! {
    _ = plugins.run(app) => warn!("all plugins stopped"),
    res = tokio::signal::ctrl_c() => {
      res?;
      info!("Shutting down");
    }
  }

  Ok(())
}
