use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{affiliate, order, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "merchants")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(unique)]
  pub user_id: i32,
  /// Storefront domain, used to route incoming order webhooks.
  #[sea_orm(unique)]
  pub domain: String,
  pub display_name: String,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::UserId",
    to = "user::Column::Id"
  )]
  Owner,
  #[sea_orm(has_many = "affiliate::Entity")]
  Affiliates,
  #[sea_orm(has_many = "order::Entity")]
  Orders,
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Owner.def()
  }
}

impl Related<affiliate::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Affiliates.def()
  }
}

impl Related<order::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Orders.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
