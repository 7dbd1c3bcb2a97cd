use chrono::NaiveTime;
use sea_orm::SqlErr;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
  entity::order,
  prelude::*,
  repo,
  sv::affiliate::{AffiliateDetails, Affiliates},
  utils::{self, MICRO},
};

/// Rate seeded into affiliates created from an order: 10% of the subtotal,
/// rounded to cents.
pub const NEW_AFFILIATE_RATE: i64 = MICRO / 10;

/// Incoming order notification from a merchant storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWebhook {
  #[serde(deserialize_with = "string_or_number")]
  pub order_id: String,
  #[serde(deserialize_with = "amount")]
  pub subtotal_price: f64,
  pub merchant_domain: String,
  #[serde(default)]
  pub discount_code: Option<String>,
  pub customer_email: String,
  #[serde(default)]
  pub customer_name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
  Text(String),
  Int(i64),
  Float(f64),
}

fn string_or_number<'de, D: Deserializer<'de>>(
  d: D,
) -> Result<String, D::Error> {
  Ok(match Scalar::deserialize(d)? {
    Scalar::Text(s) => s,
    Scalar::Int(n) => n.to_string(),
    Scalar::Float(f) => f.to_string(),
  })
}

fn amount<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
  match Scalar::deserialize(d)? {
    Scalar::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    Scalar::Int(n) => Ok(n as f64),
    Scalar::Float(f) => Ok(f),
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attribution {
  Created(order::Model),
  /// The external order id was seen before; nothing changed.
  Duplicate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStats {
  pub count: u64,
  pub revenue: f64,
  pub commissions_owed: String,
}

pub struct Orders<'a> {
  db: &'a DatabaseConnection,
  affiliates: Affiliates<'a>,
}

impl<'a> Orders<'a> {
  pub fn new(db: &'a DatabaseConnection, affiliates: Affiliates<'a>) -> Self {
    Self { db, affiliates }
  }

  /// Attributes an incoming order to the merchant's affiliate and stores it
  /// with the commission owed. Redelivered orders are reported as
  /// [`Attribution::Duplicate`].
  pub async fn process_order(
    &self,
    payload: &OrderWebhook,
  ) -> Result<Attribution> {
    let orders = repo::Orders::new(self.db);

    if orders.by_external_id(&payload.order_id).await?.is_some() {
      debug!("order {} already recorded", payload.order_id);
      return Ok(Attribution::Duplicate);
    }

    let merchant = repo::Merchants::new(self.db)
      .by_domain(&payload.merchant_domain)
      .await?
      .ok_or_else(|| {
        Error::MerchantNotFound(payload.merchant_domain.clone())
      })?;

    let subtotal = utils::to_micro(payload.subtotal_price)
      .ok()
      .filter(|subtotal| *subtotal >= 0)
      .ok_or_else(|| {
        Error::InvalidArgs(format!(
          "Invalid subtotal {} for order {}",
          payload.subtotal_price, payload.order_id
        ))
      })?;

    let affiliate = self
      .affiliates
      .find_or_create_affiliate(
        AffiliateDetails {
          name: payload.customer_name.clone(),
          email: payload.customer_email.clone(),
          commission_rate: utils::round_to(
            utils::apply_rate(subtotal, NEW_AFFILIATE_RATE)?,
            2,
          ),
          discount_code: payload.discount_code.clone(),
        },
        &merchant,
      )
      .await?;

    let commission_owed =
      utils::apply_rate(subtotal, affiliate.commission_rate).map_err(|_| {
        Error::InvalidArgs(format!(
          "Commission for order {} is out of range",
          payload.order_id
        ))
      })?;

    let created = orders
      .create(repo::NewOrder {
        external_order_id: payload.order_id.clone(),
        merchant_id: merchant.id,
        affiliate_id: Some(affiliate.id),
        subtotal,
        commission_owed,
        discount_code: payload.discount_code.clone(),
      })
      .await;

    match created {
      Ok(order) => {
        info!(
          "order {} for {} attributed to affiliate {} (commission {})",
          order.external_order_id,
          merchant.domain,
          affiliate.id,
          utils::format_fixed(commission_owed, 2)
        );
        Ok(Attribution::Created(order))
      }
      // a concurrent delivery of the same order won the insert
      Err(err)
        if matches!(
          err.sql_err(),
          Some(SqlErr::UniqueConstraintViolation(_))
        ) =>
      {
        debug!("order {} inserted concurrently", payload.order_id);
        Ok(Attribution::Duplicate)
      }
      Err(err) => Err(err.into()),
    }
  }

  pub async fn by_id(&self, id: i32) -> Result<order::Model> {
    repo::Orders::new(self.db).by_id(id).await?.ok_or(Error::OrderNotFound)
  }

  /// Order count, revenue and commissions owed for orders created within
  /// `[from, to]`. Commissions of orders without an affiliate are netted
  /// out; count and revenue cover every order.
  pub async fn stats(
    &self,
    from: DateTime,
    to: DateTime,
  ) -> Result<OrderStats> {
    if from > to {
      return Err(Error::BadRequest("`from` must not be after `to`".into()));
    }

    let totals = repo::Orders::new(self.db).totals_between(from, to).await?;

    let owed = utils::round_to(totals.commission_owed, 2)
      - utils::round_to(totals.unattributed_commission, 2);

    Ok(OrderStats {
      count: totals.count,
      revenue: utils::from_micro(utils::round_to(totals.subtotal, 2)),
      commissions_owed: utils::format_fixed(owed, 14),
    })
  }
}

/// Parses a stats range bound. Accepts a date or a date-time; a bare date
/// used as the upper bound covers the whole day.
pub fn parse_bound(value: &str, upper: bool) -> Result<DateTime> {
  let value = value.trim();

  for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
    if let Ok(at) = DateTime::parse_from_str(value, format) {
      return Ok(at);
    }
  }

  let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .map_err(|_| Error::BadRequest(format!("Invalid date `{value}`")))?;

  let time = if upper {
    NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)
  } else {
    Some(NaiveTime::MIN)
  };

  time
    .map(|t| date.and_time(t))
    .ok_or_else(|| Error::Internal("Invalid time of day".into()))
}
