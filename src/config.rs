use std::{env, str::FromStr};

use anyhow::Context;

use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  pub payout_gateway_url: Option<String>,
  pub payout_gateway_token: Option<String>,
  pub payout_workers: usize,
  pub payout_max_attempts: u32,
  pub payout_retry_delay: Duration,
  /// Zero disables the periodic payout sweep.
  pub payout_sweep_interval: Duration,
  pub rate_limit_per_second: u64,
  pub rate_limit_burst: u32,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: "sqlite:affiliate.db?mode=rwc".into(),
      port: 3000,
      payout_gateway_url: None,
      payout_gateway_token: None,
      payout_workers: 4,
      payout_max_attempts: 3,
      payout_retry_delay: Duration::from_secs(30),
      payout_sweep_interval: Duration::from_secs(3600),
      rate_limit_per_second: 2,
      rate_limit_burst: 100,
    }
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let defaults = Self::default();

    Ok(Self {
      database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
      port: parse_var("PORT")?.unwrap_or(defaults.port),
      payout_gateway_url: non_empty("PAYOUT_GATEWAY_URL"),
      payout_gateway_token: non_empty("PAYOUT_GATEWAY_TOKEN"),
      payout_workers: parse_var("PAYOUT_WORKERS")?
        .unwrap_or(defaults.payout_workers)
        .max(1),
      payout_max_attempts: parse_var("PAYOUT_MAX_ATTEMPTS")?
        .unwrap_or(defaults.payout_max_attempts)
        .max(1),
      payout_retry_delay: duration_var("PAYOUT_RETRY_DELAY")?
        .unwrap_or(defaults.payout_retry_delay),
      payout_sweep_interval: duration_var("PAYOUT_SWEEP_INTERVAL")?
        .unwrap_or(defaults.payout_sweep_interval),
      rate_limit_per_second: parse_var("RATE_LIMIT_PER_SECOND")?
        .unwrap_or(defaults.rate_limit_per_second),
      rate_limit_burst: parse_var("RATE_LIMIT_BURST")?
        .unwrap_or(defaults.rate_limit_burst),
    })
  }
}

fn non_empty(key: &str) -> Option<String> {
  env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str) -> anyhow::Result<Option<T>>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  non_empty(key)
    .map(|v| v.trim().parse::<T>().with_context(|| format!("invalid {key}")))
    .transpose()
}

fn duration_var(key: &str) -> anyhow::Result<Option<Duration>> {
  non_empty(key)
    .map(|v| {
      humantime::parse_duration(v.trim())
        .with_context(|| format!("invalid {key}: expected e.g. `30s`, `1h`"))
    })
    .transpose()
}
