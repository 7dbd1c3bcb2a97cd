use crate::{entity::merchant, prelude::*};

pub struct Merchants<'a, C> {
  conn: &'a C,
}

impl<'a, C: ConnectionTrait> Merchants<'a, C> {
  pub fn new(conn: &'a C) -> Self {
    Self { conn }
  }

  pub async fn by_id(&self, id: i32) -> Result<Option<merchant::Model>> {
    Ok(merchant::Entity::find_by_id(id).one(self.conn).await?)
  }

  pub async fn by_user(
    &self,
    user_id: i32,
  ) -> Result<Option<merchant::Model>> {
    Ok(
      merchant::Entity::find()
        .filter(merchant::Column::UserId.eq(user_id))
        .one(self.conn)
        .await?,
    )
  }

  pub async fn by_domain(
    &self,
    domain: &str,
  ) -> Result<Option<merchant::Model>> {
    Ok(
      merchant::Entity::find()
        .filter(merchant::Column::Domain.eq(domain))
        .one(self.conn)
        .await?,
    )
  }

  pub async fn create(
    &self,
    user_id: i32,
    domain: &str,
    display_name: &str,
  ) -> std::result::Result<merchant::Model, sea_orm::DbErr> {
    merchant::ActiveModel {
      id: sea_orm::NotSet,
      user_id: Set(user_id),
      domain: Set(domain.to_string()),
      display_name: Set(display_name.to_string()),
      created_at: Set(Utc::now().naive_utc()),
    }
    .insert(self.conn)
    .await
  }

  pub async fn update(
    &self,
    merchant: merchant::Model,
    domain: &str,
    display_name: &str,
  ) -> std::result::Result<merchant::Model, sea_orm::DbErr> {
    merchant::ActiveModel {
      domain: Set(domain.to_string()),
      display_name: Set(display_name.to_string()),
      ..merchant.into()
    }
    .update(self.conn)
    .await
  }
}
