use serde::Deserialize;

use crate::{
  entity::{UserType, merchant, user},
  prelude::*,
  repo, utils,
};

#[derive(Debug, Clone, Deserialize)]
pub struct MerchantRegistration {
  pub domain: String,
  pub name: String,
  pub email: String,
  pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MerchantUpdate {
  pub domain: String,
  pub name: String,
  pub email: String,
}

pub struct Merchants<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Merchants<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn by_id(&self, id: i32) -> Result<merchant::Model> {
    repo::Merchants::new(self.db)
      .by_id(id)
      .await?
      .ok_or_else(|| Error::MerchantNotFound(format!("id {id}")))
  }

  pub async fn user(&self, id: i32) -> Result<user::Model> {
    repo::Users::new(self.db).by_id(id).await?.ok_or(Error::UserNotFound)
  }

  pub async fn register(
    &self,
    data: MerchantRegistration,
  ) -> Result<merchant::Model> {
    let txn = self.db.begin().await?;

    let users = repo::Users::new(&txn);
    let merchants = repo::Merchants::new(&txn);

    let user = match users.by_email(&data.email).await? {
      Some(user) if user.user_type == UserType::Affiliate => {
        return Err(Error::DuplicateIdentity(
          "Email is already associated with an affiliate".into(),
        ));
      }
      Some(user) => {
        if merchants.by_user(user.id).await?.is_some() {
          return Err(Error::DuplicateIdentity(
            "Merchant with the same email already exists".into(),
          ));
        }
        user
      }
      None => users
        .create(
          &data.name,
          &data.email,
          utils::hash_secret(&data.api_key),
          UserType::Merchant,
        )
        .await
        .map_err(|e| Error::constraint(e, "merchant registration failed"))?,
    };

    let merchant = merchants
      .create(user.id, &data.domain, &data.name)
      .await
      .map_err(|e| Error::constraint(e, "merchant registration failed"))?;

    txn.commit().await?;

    info!("registered merchant {} ({})", merchant.domain, data.email);
    Ok(merchant)
  }

  /// Updates the owner's profile and the merchant it owns together.
  pub async fn update_merchant(
    &self,
    user: &user::Model,
    data: MerchantUpdate,
  ) -> Result<merchant::Model> {
    let txn = self.db.begin().await?;

    let merchants = repo::Merchants::new(&txn);
    let merchant = merchants.by_user(user.id).await?.ok_or_else(|| {
      Error::MerchantNotFound(format!("no merchant for user {}", user.id))
    })?;

    repo::Users::new(&txn)
      .update_profile(user.clone(), &data.name, &data.email)
      .await
      .map_err(|e| Error::constraint(e, "merchant update failed"))?;

    let merchant = merchants
      .update(merchant, &data.domain, &data.name)
      .await
      .map_err(|e| Error::constraint(e, "merchant update failed"))?;

    txn.commit().await?;

    debug!("updated merchant {} ({})", merchant.id, merchant.domain);
    Ok(merchant)
  }

  /// Lookup failures are swallowed: the caller only learns "not found".
  pub async fn find_merchant_by_email(
    &self,
    email: &str,
  ) -> Option<merchant::Model> {
    match self.lookup_by_email(email).await {
      Ok(found) => found,
      Err(err) => {
        debug!("merchant lookup for {} failed: {}", email, err);
        None
      }
    }
  }

  async fn lookup_by_email(
    &self,
    email: &str,
  ) -> Result<Option<merchant::Model>> {
    let Some(user) = repo::Users::new(self.db).by_email(email).await? else {
      return Ok(None);
    };
    if user.user_type != UserType::Merchant {
      return Ok(None);
    }
    repo::Merchants::new(self.db).by_user(user.id).await
  }
}
