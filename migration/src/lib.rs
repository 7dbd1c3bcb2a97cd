pub use sea_orm_migration::prelude::*;

mod m20261019_000001_create_users;
mod m20261019_000002_create_merchants;
mod m20261019_000003_create_affiliates;
mod m20261019_000004_create_orders;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20261019_000001_create_users::Migration),
      Box::new(m20261019_000002_create_merchants::Migration),
      Box::new(m20261019_000003_create_affiliates::Migration),
      Box::new(m20261019_000004_create_orders::Migration),
    ]
  }
}
