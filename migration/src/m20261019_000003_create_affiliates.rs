use sea_orm_migration::prelude::*;

use super::{
  m20261019_000001_create_users::Users,
  m20261019_000002_create_merchants::Merchants,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Affiliates::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Affiliates::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(Affiliates::UserId)
              .integer()
              .not_null()
              .unique_key(),
          )
          .col(ColumnDef::new(Affiliates::MerchantId).integer().not_null())
          .col(
            ColumnDef::new(Affiliates::CommissionRate)
              .big_integer()
              .not_null(),
          )
          .col(
            ColumnDef::new(Affiliates::DiscountCode)
              .string()
              .not_null()
              .unique_key(),
          )
          .col(ColumnDef::new(Affiliates::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_affiliates_user")
              .from(Affiliates::Table, Affiliates::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_affiliates_merchant")
              .from(Affiliates::Table, Affiliates::MerchantId)
              .to(Merchants::Table, Merchants::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_affiliates_merchant")
          .table(Affiliates::Table)
          .col(Affiliates::MerchantId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Affiliates::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum Affiliates {
  Table,
  Id,
  UserId,
  MerchantId,
  CommissionRate,
  DiscountCode,
  CreatedAt,
}
