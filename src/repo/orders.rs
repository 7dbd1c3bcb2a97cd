use sea_orm::{
  ActiveEnum, DbErr, QuerySelect,
  sea_query::{Alias, Expr, SimpleExpr},
};

use crate::{
  entity::{PayoutStatus, order},
  prelude::*,
};

pub struct Orders<'a, C> {
  conn: &'a C,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
  pub external_order_id: String,
  pub merchant_id: i32,
  pub affiliate_id: Option<i32>,
  pub subtotal: i64,
  pub commission_owed: i64,
  pub discount_code: Option<String>,
}

/// Raw sums over a range of orders, in micro units.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
  pub count: u64,
  pub subtotal: i64,
  pub commission_owed: i64,
  pub unattributed_commission: i64,
}

impl<'a, C: ConnectionTrait> Orders<'a, C> {
  pub fn new(conn: &'a C) -> Self {
    Self { conn }
  }

  pub async fn by_id(&self, id: i32) -> Result<Option<order::Model>> {
    Ok(order::Entity::find_by_id(id).one(self.conn).await?)
  }

  pub async fn by_external_id(
    &self,
    external_order_id: &str,
  ) -> Result<Option<order::Model>> {
    Ok(
      order::Entity::find()
        .filter(order::Column::ExternalOrderId.eq(external_order_id))
        .one(self.conn)
        .await?,
    )
  }

  pub async fn create(
    &self,
    new: NewOrder,
  ) -> std::result::Result<order::Model, DbErr> {
    order::ActiveModel {
      id: sea_orm::NotSet,
      external_order_id: Set(new.external_order_id),
      merchant_id: Set(new.merchant_id),
      affiliate_id: Set(new.affiliate_id),
      subtotal: Set(new.subtotal),
      commission_owed: Set(new.commission_owed),
      discount_code: Set(new.discount_code),
      payout_status: Set(PayoutStatus::Unpaid),
      created_at: Set(Utc::now().naive_utc()),
    }
    .insert(self.conn)
    .await
  }

  pub async fn unpaid_for_affiliate(
    &self,
    affiliate_id: i32,
  ) -> Result<Vec<order::Model>> {
    Ok(
      order::Entity::find()
        .filter(order::Column::AffiliateId.eq(affiliate_id))
        .filter(order::Column::PayoutStatus.eq(PayoutStatus::Unpaid))
        .order_by_asc(order::Column::Id)
        .all(self.conn)
        .await?,
    )
  }

  /// Flips UNPAID to PAID in a single conditional write. Returns `false`
  /// when the order was already paid (or does not exist). The write holds
  /// the row lock until the surrounding transaction ends.
  pub async fn claim_unpaid(&self, id: i32) -> Result<bool> {
    let result = order::Entity::update_many()
      .col_expr(
        order::Column::PayoutStatus,
        Expr::value(PayoutStatus::Paid.to_value()),
      )
      .filter(order::Column::Id.eq(id))
      .filter(order::Column::PayoutStatus.eq(PayoutStatus::Unpaid))
      .exec(self.conn)
      .await?;

    Ok(result.rows_affected == 1)
  }

  /// Sums orders created within `[from, to]`, both ends inclusive. The
  /// database does the aggregation; a sum past the `i64` range is reported
  /// by the backend as an error.
  pub async fn totals_between(
    &self,
    from: DateTime,
    to: DateTime,
  ) -> Result<OrderTotals> {
    let in_range = order::Column::CreatedAt.between(from, to);

    type TotalsRow = (i64, Option<i64>, Option<i64>);
    let (count, subtotal, commission_owed): TotalsRow = order::Entity::find()
      .select_only()
      .column_as(Expr::col(order::Column::Id).count(), "count")
      .column_as(sum(order::Column::Subtotal), "subtotal")
      .column_as(sum(order::Column::CommissionOwed), "commission_owed")
      .filter(in_range.clone())
      .into_tuple()
      .one(self.conn)
      .await?
      .unwrap_or_default();

    let unattributed: Option<i64> = order::Entity::find()
      .select_only()
      .column_as(sum(order::Column::CommissionOwed), "commission_owed")
      .filter(in_range)
      .filter(order::Column::AffiliateId.is_null())
      .into_tuple()
      .one(self.conn)
      .await?
      .flatten();

    Ok(OrderTotals {
      count: u64::try_from(count).unwrap_or_default(),
      subtotal: subtotal.unwrap_or_default(),
      commission_owed: commission_owed.unwrap_or_default(),
      unattributed_commission: unattributed.unwrap_or_default(),
    })
  }
}

/// `SUM(col)` kept as a 64-bit integer on every backend.
fn sum(column: order::Column) -> SimpleExpr {
  Expr::col(column).sum().cast_as(Alias::new("BIGINT"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    sv::test_utils::{fixtures, test_db},
    utils::MICRO,
  };

  #[tokio::test]
  async fn claim_flips_status_once() {
    let db = test_db::setup().await;
    let merchant = fixtures::merchant(&db, "shop.test").await;
    let order = fixtures::order(&db, &merchant, None, "ext-1", 100, 10).await;

    let repo = Orders::new(&db);
    assert!(repo.claim_unpaid(order.id).await.unwrap());
    assert!(!repo.claim_unpaid(order.id).await.unwrap());

    let stored = repo.by_id(order.id).await.unwrap().unwrap();
    assert_eq!(stored.payout_status, PayoutStatus::Paid);
  }

  #[tokio::test]
  async fn claim_of_missing_order_is_noop() {
    let db = test_db::setup().await;
    assert!(!Orders::new(&db).claim_unpaid(404).await.unwrap());
  }

  #[tokio::test]
  async fn external_id_is_unique() {
    let db = test_db::setup().await;
    let merchant = fixtures::merchant(&db, "shop.test").await;
    fixtures::order(&db, &merchant, None, "ext-1", 100, 10).await;

    let err = Orders::new(&db)
      .create(NewOrder {
        external_order_id: "ext-1".into(),
        merchant_id: merchant.id,
        affiliate_id: None,
        subtotal: 1,
        commission_owed: 0,
        discount_code: None,
      })
      .await
      .unwrap_err();

    assert!(matches!(
      err.sql_err(),
      Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    ));
  }

  fn whole_day() -> (DateTime, DateTime) {
    let today = Utc::now().date_naive();
    let end = today.and_hms_opt(23, 59, 59).unwrap();
    (today.and_hms_opt(0, 0, 0).unwrap(), end)
  }

  #[tokio::test]
  async fn totals_are_aggregated() {
    let db = test_db::setup().await;
    let merchant = fixtures::merchant(&db, "shop.test").await;
    let aff = fixtures::affiliate(&db, &merchant, "aff@x.test", 10).await;
    fixtures::order(&db, &merchant, Some(&aff), "a", 100, 10).await;
    fixtures::order(&db, &merchant, Some(&aff), "b", 20, 2).await;
    fixtures::order(&db, &merchant, None, "c", 50, 5).await;

    let (from, to) = whole_day();
    let totals = Orders::new(&db).totals_between(from, to).await.unwrap();

    assert_eq!(
      totals,
      OrderTotals {
        count: 3,
        subtotal: 170 * MICRO,
        commission_owed: 17 * MICRO,
        unattributed_commission: 5 * MICRO,
      }
    );
  }

  #[tokio::test]
  async fn totals_of_empty_range_are_zero() {
    let db = test_db::setup().await;
    let (from, to) = whole_day();
    let totals = Orders::new(&db).totals_between(from, to).await.unwrap();
    assert_eq!(totals, OrderTotals::default());
  }

  #[tokio::test]
  async fn totals_report_overflow() {
    let db = test_db::setup().await;
    let merchant = fixtures::merchant(&db, "shop.test").await;
    for id in ["a", "b"] {
      Orders::new(&db)
        .create(NewOrder {
          external_order_id: id.into(),
          merchant_id: merchant.id,
          affiliate_id: None,
          subtotal: i64::MAX / 2 + 1,
          commission_owed: 0,
          discount_code: None,
        })
        .await
        .unwrap();
    }

    let (from, to) = whole_day();
    let result = Orders::new(&db).totals_between(from, to).await;
    assert!(matches!(result, Err(Error::Db(_))));
  }
}
