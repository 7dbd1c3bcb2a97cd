//! Shared test utilities for database setup

#[cfg(test)]
pub mod test_db {
  use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DbBackend, Schema,
  };

  use crate::entity::*;

  /// Creates an in-memory SQLite database with all required tables
  pub async fn setup() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let schema = Schema::new(DbBackend::Sqlite);

    let stmt = schema.create_table_from_entity(user::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    let stmt = schema.create_table_from_entity(merchant::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    let stmt = schema.create_table_from_entity(affiliate::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    let stmt = schema.create_table_from_entity(order::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    db
  }
}

/// Rows inserted straight through the repositories. Amounts are whole
/// currency units.
#[cfg(test)]
pub mod fixtures {
  use sea_orm::DatabaseConnection;

  use crate::{
    entity::{UserType, affiliate, merchant, order},
    repo,
    utils::MICRO,
  };

  pub async fn merchant(
    db: &DatabaseConnection,
    domain: &str,
  ) -> merchant::Model {
    let user = repo::Users::new(db)
      .create(
        domain,
        &format!("owner@{domain}"),
        "hash".into(),
        UserType::Merchant,
      )
      .await
      .unwrap();

    repo::Merchants::new(db).create(user.id, domain, domain).await.unwrap()
  }

  /// Affiliate with a rate given in percent.
  pub async fn affiliate(
    db: &DatabaseConnection,
    merchant: &merchant::Model,
    email: &str,
    rate_percent: i64,
  ) -> affiliate::Model {
    let user = repo::Users::new(db)
      .create(email, email, "hash".into(), UserType::Affiliate)
      .await
      .unwrap();

    repo::Affiliates::new(db)
      .create(
        user.id,
        merchant.id,
        rate_percent * MICRO / 100,
        &format!("CODE-{email}"),
      )
      .await
      .unwrap()
  }

  pub async fn order(
    db: &DatabaseConnection,
    merchant: &merchant::Model,
    affiliate: Option<&affiliate::Model>,
    external_id: &str,
    subtotal: i64,
    commission: i64,
  ) -> order::Model {
    repo::Orders::new(db)
      .create(repo::NewOrder {
        external_order_id: external_id.into(),
        merchant_id: merchant.id,
        affiliate_id: affiliate.map(|a| a.id),
        subtotal: subtotal * MICRO,
        commission_owed: commission * MICRO,
        discount_code: None,
      })
      .await
      .unwrap()
  }
}

/// Recording doubles for the external collaborators.
#[cfg(test)]
pub mod mocks {
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use async_trait::async_trait;

  use crate::{
    entity::merchant,
    prelude::*,
    sv::{
      gateway::{DiscountCode, DiscountCodeIssuer, PayoutGateway},
      notify::{AffiliateCreated, Notifier},
    },
  };

  #[derive(Default)]
  pub struct MockGateway {
    pub calls: Mutex<Vec<(String, i64)>>,
    /// Number of leading calls that fail before the gateway recovers.
    pub failures: AtomicUsize,
    pub delay: Duration,
  }

  impl MockGateway {
    pub fn failing(times: usize) -> Self {
      Self { failures: AtomicUsize::new(times), ..Default::default() }
    }

    pub fn slow(delay: Duration) -> Self {
      Self { delay, ..Default::default() }
    }

    pub fn call_count(&self) -> usize {
      self.calls.lock().unwrap().len()
    }
  }

  #[async_trait]
  impl PayoutGateway for MockGateway {
    async fn send_payout(&self, email: &str, amount: i64) -> Result<()> {
      self.calls.lock().unwrap().push((email.to_string(), amount));
      if !self.delay.is_zero() {
        tokio::time::sleep(self.delay).await;
      }

      let failed = self
        .failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();

      if failed {
        Err(Error::Payout("gateway unavailable".into()))
      } else {
        Ok(())
      }
    }
  }

  #[derive(Default)]
  pub struct MockIssuer {
    pub issued: AtomicUsize,
  }

  #[async_trait]
  impl DiscountCodeIssuer for MockIssuer {
    async fn create_discount_code(
      &self,
      merchant: &merchant::Model,
    ) -> Result<DiscountCode> {
      let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
      Ok(DiscountCode {
        id: n as i64,
        code: format!("{}-{n}", merchant.domain),
      })
    }
  }

  #[derive(Default)]
  pub struct MockNotifier {
    pub sent: Mutex<Vec<AffiliateCreated>>,
    pub fail: bool,
  }

  #[async_trait]
  impl Notifier for MockNotifier {
    async fn affiliate_created(&self, message: AffiliateCreated) -> Result<()> {
      self.sent.lock().unwrap().push(message);
      if self.fail {
        Err(Error::Internal("smtp down".into()))
      } else {
        Ok(())
      }
    }
  }
}
