use crate::{
  entity::{UserType, user},
  prelude::*,
};

pub struct Users<'a, C> {
  conn: &'a C,
}

impl<'a, C: ConnectionTrait> Users<'a, C> {
  pub fn new(conn: &'a C) -> Self {
    Self { conn }
  }

  pub async fn by_id(&self, id: i32) -> Result<Option<user::Model>> {
    Ok(user::Entity::find_by_id(id).one(self.conn).await?)
  }

  pub async fn by_email(&self, email: &str) -> Result<Option<user::Model>> {
    Ok(
      user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(self.conn)
        .await?,
    )
  }

  /// Inserts a user. Unique violations on `email` surface as the raw
  /// `DbErr` so callers can decide how to classify them.
  pub async fn create(
    &self,
    name: &str,
    email: &str,
    password_hash: String,
    user_type: UserType,
  ) -> std::result::Result<user::Model, sea_orm::DbErr> {
    user::ActiveModel {
      id: sea_orm::NotSet,
      name: Set(name.to_string()),
      email: Set(email.to_string()),
      password: Set(password_hash),
      user_type: Set(user_type),
      created_at: Set(Utc::now().naive_utc()),
    }
    .insert(self.conn)
    .await
  }

  pub async fn update_profile(
    &self,
    user: user::Model,
    name: &str,
    email: &str,
  ) -> std::result::Result<user::Model, sea_orm::DbErr> {
    user::ActiveModel {
      name: Set(name.to_string()),
      email: Set(email.to_string()),
      ..user.into()
    }
    .update(self.conn)
    .await
  }
}
