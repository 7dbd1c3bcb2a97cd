use sea_orm_migration::prelude::*;

use super::{
  m20261019_000002_create_merchants::Merchants,
  m20261019_000003_create_affiliates::Affiliates,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Orders::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Orders::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(Orders::ExternalOrderId)
              .string()
              .not_null()
              .unique_key(),
          )
          .col(ColumnDef::new(Orders::MerchantId).integer().not_null())
          .col(ColumnDef::new(Orders::AffiliateId).integer().null())
          .col(ColumnDef::new(Orders::Subtotal).big_integer().not_null())
          .col(ColumnDef::new(Orders::CommissionOwed).big_integer().not_null())
          .col(ColumnDef::new(Orders::DiscountCode).string().null())
          .col(
            ColumnDef::new(Orders::PayoutStatus)
              .string()
              .not_null()
              .default("unpaid"),
          )
          .col(ColumnDef::new(Orders::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_orders_merchant")
              .from(Orders::Table, Orders::MerchantId)
              .to(Merchants::Table, Merchants::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_orders_affiliate")
              .from(Orders::Table, Orders::AffiliateId)
              .to(Affiliates::Table, Affiliates::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_orders_affiliate_status")
          .table(Orders::Table)
          .col(Orders::AffiliateId)
          .col(Orders::PayoutStatus)
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_orders_created_at")
          .table(Orders::Table)
          .col(Orders::CreatedAt)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Orders::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Orders {
  Table,
  Id,
  ExternalOrderId,
  MerchantId,
  AffiliateId,
  Subtotal,
  CommissionOwed,
  DiscountCode,
  PayoutStatus,
  CreatedAt,
}
