use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::time;

use crate::{
  plugins::Plugin,
  prelude::*,
  state::AppState,
  sv::{payout::PayoutOutcome, queue::TaskHandle},
};

/// Periodically queues payouts for every affiliate with unpaid orders.
pub struct PayoutSweep;

#[async_trait]
impl Plugin for PayoutSweep {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let period = app.config.payout_sweep_interval;
    if period.is_zero() {
      info!("Payout sweep disabled via config (0 interval)");
      return Ok(());
    }

    info!(
      "Payout sweep started (interval: {})",
      humantime::format_duration(period)
    );

    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
      interval.tick().await;

      match app.sv().payout.sweep().await {
        Ok(handles) if handles.is_empty() => debug!("Nothing to pay out"),
        Ok(handles) => {
          let (paid, failed) = settle(handles).await;
          info!("Payout sweep done: {} paid, {} failed", paid, failed);
        }
        Err(err) => error!("Payout sweep failed: {}", err),
      }
    }
  }
}

/// Waits for the queued tasks; a sweep finishes before the next one starts.
async fn settle(handles: Vec<TaskHandle>) -> (usize, usize) {
  let outcomes = join_all(handles.into_iter().map(TaskHandle::join)).await;

  outcomes.iter().fold((0, 0), |(paid, failed), outcome| match outcome {
    Ok(PayoutOutcome::Paid { .. }) => (paid + 1, failed),
    Ok(PayoutOutcome::AlreadyPaid) => (paid, failed),
    Err(_) => (paid, failed + 1),
  })
}
