use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{affiliate, merchant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum UserType {
  #[sea_orm(string_value = "merchant")]
  Merchant,
  #[sea_orm(string_value = "affiliate")]
  Affiliate,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub name: String,
  #[sea_orm(unique)]
  pub email: String,
  #[serde(skip_serializing)]
  pub password: String,
  pub user_type: UserType,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_one = "merchant::Entity")]
  Merchant,
  #[sea_orm(has_many = "affiliate::Entity")]
  Affiliates,
}

impl Related<merchant::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Merchant.def()
  }
}

impl Related<affiliate::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Affiliates.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
