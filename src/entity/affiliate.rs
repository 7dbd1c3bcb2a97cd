use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{merchant, order, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "affiliates")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(unique)]
  pub user_id: i32,
  pub merchant_id: i32,
  /// Fraction of the order subtotal, in micro units (100_000 == 10%).
  pub commission_rate: i64,
  #[sea_orm(unique)]
  pub discount_code: String,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::UserId",
    to = "user::Column::Id"
  )]
  User,
  #[sea_orm(
    belongs_to = "merchant::Entity",
    from = "Column::MerchantId",
    to = "merchant::Column::Id"
  )]
  Merchant,
  #[sea_orm(has_many = "order::Entity")]
  Orders,
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl Related<merchant::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Merchant.def()
  }
}

impl Related<order::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Orders.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
