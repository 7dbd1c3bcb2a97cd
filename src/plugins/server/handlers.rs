use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
  entity::{affiliate, merchant, order::Model as Order},
  prelude::*,
  state::AppState,
  sv::{
    merchant::{MerchantRegistration, MerchantUpdate},
    order::{self, Attribution, OrderStats, OrderWebhook},
  },
  utils,
};

#[derive(Serialize)]
pub struct Message {
  message: &'static str,
}

pub async fn health() -> &'static str {
  "ok"
}

/// Storefronts only need an acknowledgement; failures stay in the log.
pub async fn webhook(
  State(app): State<Arc<AppState>>,
  payload: std::result::Result<Json<OrderWebhook>, JsonRejection>,
) -> Json<Message> {
  let ack = Json(Message { message: "Order processed successfully" });

  let Json(payload) = match payload {
    Ok(payload) => payload,
    Err(rejection) => {
      warn!("Malformed order webhook: {}", rejection.body_text());
      return ack;
    }
  };

  match app.sv().order.process_order(&payload).await {
    Ok(Attribution::Created(order)) => {
      info!(
        "order {} from {} recorded as #{}",
        payload.order_id, payload.merchant_domain, order.id
      );
    }
    Ok(Attribution::Duplicate) => {
      debug!("order {} already recorded", payload.order_id);
    }
    Err(err) if err.is_rejection() => {
      warn!("Order {} rejected: {}", payload.order_id, err);
    }
    Err(err) => {
      error!("Failed to process order {}: {}", payload.order_id, err);
    }
  }

  ack
}

#[derive(Deserialize)]
pub struct StatsRange {
  from: String,
  to: String,
}

pub async fn order_stats(
  State(app): State<Arc<AppState>>,
  Query(range): Query<StatsRange>,
) -> Result<Json<OrderStats>> {
  let from = order::parse_bound(&range.from, false)?;
  let to = order::parse_bound(&range.to, true)?;

  Ok(Json(app.sv().order.stats(from, to).await?))
}

pub async fn register_merchant(
  State(app): State<Arc<AppState>>,
  Json(data): Json<MerchantRegistration>,
) -> Result<(StatusCode, Json<merchant::Model>)> {
  let merchant = app.sv().merchant.register(data).await?;
  Ok((StatusCode::CREATED, Json(merchant)))
}

pub async fn update_merchant(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i32>,
  Json(data): Json<MerchantUpdate>,
) -> Result<StatusCode> {
  let sv = app.sv();
  let user = sv.merchant.user(user_id).await?;
  sv.merchant.update_merchant(&user, data).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ByEmail {
  email: String,
}

pub async fn find_merchant(
  State(app): State<Arc<AppState>>,
  Query(query): Query<ByEmail>,
) -> Result<Json<merchant::Model>> {
  let found = app.sv().merchant.find_merchant_by_email(&query.email).await;
  found.map(Json).ok_or(Error::MerchantNotFound(query.email))
}

#[derive(Deserialize)]
pub struct NewAffiliate {
  email: String,
  #[serde(default)]
  name: String,
  /// Fraction of the subtotal, e.g. `0.1` for 10%.
  commission_rate: f64,
}

pub async fn register_affiliate(
  State(app): State<Arc<AppState>>,
  Path(merchant_id): Path<i32>,
  Json(data): Json<NewAffiliate>,
) -> Result<(StatusCode, Json<affiliate::Model>)> {
  let sv = app.sv();
  let merchant = sv.merchant.by_id(merchant_id).await?;
  let affiliate = sv
    .affiliate
    .register(
      &merchant,
      &data.email,
      &data.name,
      utils::to_micro(data.commission_rate)?,
    )
    .await?;
  Ok((StatusCode::CREATED, Json(affiliate)))
}

pub async fn get_order(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
) -> Result<Json<Order>> {
  Ok(Json(app.sv().order.by_id(id).await?))
}

#[derive(Serialize)]
pub struct Queued {
  queued: usize,
}

pub async fn payout(
  State(app): State<Arc<AppState>>,
  Path(affiliate_id): Path<i32>,
) -> Result<impl IntoResponse> {
  let sv = app.sv();
  let affiliate = sv.affiliate.by_id(affiliate_id).await?;
  let handles = sv.payout.payout(&affiliate).await?;

  Ok((StatusCode::ACCEPTED, Json(Queued { queued: handles.len() })))
}
