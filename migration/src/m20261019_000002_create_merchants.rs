use sea_orm_migration::prelude::*;

use super::m20261019_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Merchants::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Merchants::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(Merchants::UserId)
              .integer()
              .not_null()
              .unique_key(),
          )
          .col(
            ColumnDef::new(Merchants::Domain).string().not_null().unique_key(),
          )
          .col(ColumnDef::new(Merchants::DisplayName).string().not_null())
          .col(ColumnDef::new(Merchants::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_merchants_user")
              .from(Merchants::Table, Merchants::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Merchants::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Merchants {
  Table,
  Id,
  UserId,
  Domain,
  DisplayName,
  CreatedAt,
}
