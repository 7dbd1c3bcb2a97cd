use crate::{
  entity::affiliate,
  prelude::*,
  repo,
  sv::{
    gateway::PayoutGateway,
    queue::{PayoutTask, TaskHandle, TaskQueue},
  },
  utils,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutOutcome {
  Paid { amount: i64 },
  /// Another attempt settled the order first; the gateway was not called.
  AlreadyPaid,
}

/// Pays out the commission of a single order.
///
/// The order is claimed (UNPAID -> PAID) inside a transaction before the
/// gateway is called, and the claim only commits once the gateway accepted
/// the payout. Concurrent attempts on the same order queue behind the claim
/// and find it already paid. A gateway failure rolls the claim back and is
/// returned as a retryable [`Error::Payout`].
pub async fn payout_order(
  db: &DatabaseConnection,
  gateway: &dyn PayoutGateway,
  order_id: i32,
) -> Result<PayoutOutcome> {
  let txn = db.begin().await?;
  let orders = repo::Orders::new(&txn);

  let order = orders.by_id(order_id).await?.ok_or(Error::OrderNotFound)?;

  if !orders.claim_unpaid(order.id).await? {
    txn.rollback().await?;
    debug!("order {} is already paid", order.id);
    return Ok(PayoutOutcome::AlreadyPaid);
  }

  let affiliate_id = order.affiliate_id.ok_or_else(|| {
    Error::InvalidArgs(format!("Order {} has no affiliate", order.id))
  })?;
  let email = repo::Affiliates::new(&txn).payout_email(affiliate_id).await?;

  if let Err(err) = gateway.send_payout(&email, order.commission_owed).await {
    error!("Payout failed for order {}: {}", order.id, err);
    txn.rollback().await?;
    return Err(match err {
      Error::Payout(_) => err,
      other => Error::Payout(other.to_string()),
    });
  }

  if let Err(err) = txn.commit().await {
    // the money left but the status did not stick
    error!(
      "Order {} was paid out to {} but could not be marked paid: {}",
      order.id, email, err
    );
    return Err(err.into());
  }

  info!(
    "order {} paid out: {} to {}",
    order.id,
    utils::format_fixed(order.commission_owed, 2),
    email
  );
  Ok(PayoutOutcome::Paid { amount: order.commission_owed })
}

pub struct Payouts<'a> {
  db: &'a DatabaseConnection,
  queue: &'a dyn TaskQueue,
}

impl<'a> Payouts<'a> {
  pub fn new(db: &'a DatabaseConnection, queue: &'a dyn TaskQueue) -> Self {
    Self { db, queue }
  }

  /// Queues one payout task per unpaid order of the affiliate.
  pub async fn payout(
    &self,
    affiliate: &affiliate::Model,
  ) -> Result<Vec<TaskHandle>> {
    let unpaid =
      repo::Orders::new(self.db).unpaid_for_affiliate(affiliate.id).await?;

    if !unpaid.is_empty() {
      info!(
        "queueing {} payout(s) for affiliate {}",
        unpaid.len(),
        affiliate.id
      );
    }

    Ok(
      unpaid
        .into_iter()
        .map(|order| self.queue.submit(PayoutTask { order_id: order.id }))
        .collect(),
    )
  }

  /// Queues payouts for every affiliate with unpaid orders.
  pub async fn sweep(&self) -> Result<Vec<TaskHandle>> {
    let affiliates = repo::Affiliates::new(self.db).with_unpaid_orders().await?;

    let mut handles = Vec::new();
    for affiliate in &affiliates {
      handles.extend(self.payout(affiliate).await?);
    }
    Ok(handles)
  }
}
