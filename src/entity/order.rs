use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{affiliate, merchant};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
  #[sea_orm(string_value = "unpaid")]
  #[default]
  Unpaid,
  #[sea_orm(string_value = "paid")]
  Paid,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  /// Order id assigned by the storefront; the webhook idempotency key.
  #[sea_orm(unique)]
  pub external_order_id: String,
  pub merchant_id: i32,
  pub affiliate_id: Option<i32>,
  pub subtotal: i64,
  pub commission_owed: i64,
  pub discount_code: Option<String>,
  pub payout_status: PayoutStatus,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "merchant::Entity",
    from = "Column::MerchantId",
    to = "merchant::Column::Id"
  )]
  Merchant,
  #[sea_orm(
    belongs_to = "affiliate::Entity",
    from = "Column::AffiliateId",
    to = "affiliate::Column::Id"
  )]
  Affiliate,
}

impl Related<merchant::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Merchant.def()
  }
}

impl Related<affiliate::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Affiliate.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
