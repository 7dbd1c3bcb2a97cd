use serde::Deserialize;
use uuid::Uuid;

use crate::{
  entity::{UserType, affiliate, merchant},
  prelude::*,
  repo,
  sv::{
    gateway::DiscountCodeIssuer,
    notify::{AffiliateCreated, Notifier},
  },
  utils,
};

/// Who an affiliate should be, as far as the caller knows.
#[derive(Debug, Clone, PartialEq)]
pub enum AffiliateInput {
  Email(String),
  Details(AffiliateDetails),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AffiliateDetails {
  #[serde(default)]
  pub name: String,
  pub email: String,
  /// Micro units, stored as given.
  pub commission_rate: i64,
  pub discount_code: Option<String>,
}

impl From<&str> for AffiliateInput {
  fn from(email: &str) -> Self {
    AffiliateInput::Email(email.to_string())
  }
}

impl From<AffiliateDetails> for AffiliateInput {
  fn from(details: AffiliateDetails) -> Self {
    AffiliateInput::Details(details)
  }
}

pub struct Affiliates<'a> {
  db: &'a DatabaseConnection,
  issuer: &'a dyn DiscountCodeIssuer,
  notifier: &'a dyn Notifier,
}

impl<'a> Affiliates<'a> {
  pub fn new(
    db: &'a DatabaseConnection,
    issuer: &'a dyn DiscountCodeIssuer,
    notifier: &'a dyn Notifier,
  ) -> Self {
    Self { db, issuer, notifier }
  }

  pub async fn by_id(&self, id: i32) -> Result<affiliate::Model> {
    repo::Affiliates::new(self.db)
      .by_id(id)
      .await?
      .ok_or(Error::AffiliateNotFound)
  }

  /// Enrolls `email` as an affiliate of `merchant` with a freshly issued
  /// discount code, then notifies the affiliate.
  pub async fn register(
    &self,
    merchant: &merchant::Model,
    email: &str,
    name: &str,
    commission_rate: i64,
  ) -> Result<affiliate::Model> {
    if commission_rate < 0 {
      return Err(Error::InvalidArgs(
        "Commission rate must not be negative".into(),
      ));
    }

    if let Some(user) = repo::Users::new(self.db).by_email(email).await? {
      if repo::Merchants::new(self.db).by_user(user.id).await?.is_some() {
        return Err(Error::DuplicateIdentity(
          "Email is already associated with a merchant".into(),
        ));
      }
      if repo::Affiliates::new(self.db).by_user(user.id).await?.is_some() {
        return Err(Error::DuplicateIdentity(
          "Affiliate with the same email already exists".into(),
        ));
      }
    }

    let code = self.issuer.create_discount_code(merchant).await?;

    let txn = self.db.begin().await?;

    let users = repo::Users::new(&txn);
    let user = match users.by_email(email).await? {
      Some(user) if user.user_type == UserType::Affiliate => user,
      Some(_) => {
        return Err(Error::DuplicateIdentity(
          "Email is already associated with a merchant".into(),
        ));
      }
      None => users
        .create(name, email, random_secret(), UserType::Affiliate)
        .await
        .map_err(|e| Error::unique_as_duplicate(e, "email"))?,
    };

    let affiliate = repo::Affiliates::new(&txn)
      .create(user.id, merchant.id, commission_rate, &code.code)
      .await
      .map_err(|e| Error::unique_as_duplicate(e, "affiliate"))?;

    txn.commit().await?;

    info!(
      "registered affiliate {} for merchant {} (code {})",
      affiliate.id, merchant.domain, affiliate.discount_code
    );

    let message = AffiliateCreated::new(&affiliate, name, email);
    if let Err(err) = self.notifier.affiliate_created(message).await {
      warn!("Failed to notify affiliate {}: {}", email, err);
    }

    Ok(affiliate)
  }

  /// Returns the merchant's affiliate, creating one from `input` when the
  /// merchant has none yet.
  ///
  /// A merchant with any affiliate gets that affiliate back no matter which
  /// email was asked for: the model tracks one affiliate per merchant.
  pub async fn find_or_create_affiliate(
    &self,
    input: impl Into<AffiliateInput>,
    merchant: &merchant::Model,
  ) -> Result<affiliate::Model> {
    if let Some(existing) =
      repo::Affiliates::new(self.db).first_for_merchant(merchant.id).await?
    {
      return Ok(existing);
    }

    let details = match input.into() {
      AffiliateInput::Details(details) => details,
      AffiliateInput::Email(email) => {
        return Err(Error::InvalidArgs(format!(
          "Cannot create affiliate {email} without commission rate and \
           discount code"
        )));
      }
    };

    let discount_code = details
      .discount_code
      .filter(|code| !code.trim().is_empty())
      .ok_or_else(|| {
        Error::InvalidArgs("Discount code is required".into())
      })?;

    let txn = self.db.begin().await?;

    let user = repo::Users::new(&txn)
      .create(
        &details.name,
        &details.email,
        random_secret(),
        UserType::Affiliate,
      )
      .await
      .map_err(|e| Error::unique_as_duplicate(e, "email"))?;

    let affiliate = repo::Affiliates::new(&txn)
      .create(user.id, merchant.id, details.commission_rate, &discount_code)
      .await
      .map_err(|e| Error::unique_as_duplicate(e, "discount code"))?;

    txn.commit().await?;

    debug!(
      "created affiliate {} ({}) for merchant {}",
      affiliate.id, details.email, merchant.domain
    );
    Ok(affiliate)
  }
}

fn random_secret() -> String {
  utils::hash_secret(&Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::Ordering;

  use super::*;
  use crate::{
    entity::user,
    sv::test_utils::{
      fixtures,
      mocks::{MockIssuer, MockNotifier},
      test_db,
    },
    utils::MICRO,
  };

  fn details(email: &str, rate: i64, code: &str) -> AffiliateDetails {
    AffiliateDetails {
      name: "Ann".into(),
      email: email.into(),
      commission_rate: rate,
      discount_code: Some(code.into()),
    }
  }

  #[tokio::test]
  async fn test_register_issues_code_and_notifies() {
    let db = test_db::setup().await;
    let merchant = fixtures::merchant(&db, "shop.test").await;
    let (issuer, notifier) = (MockIssuer::default(), MockNotifier::default());

    let affiliate = Affiliates::new(&db, &issuer, &notifier)
      .register(&merchant, "ann@x.test", "Ann", MICRO / 10)
      .await
      .unwrap();

    assert_eq!(affiliate.merchant_id, merchant.id);
    assert_eq!(affiliate.commission_rate, 100_000);
    assert_eq!(affiliate.discount_code, "shop.test-1");
    assert_eq!(issuer.issued.load(Ordering::SeqCst), 1);

    let user =
      user::Entity::find_by_id(affiliate.user_id).one(&db).await.unwrap();
    let user = user.unwrap();
    assert_eq!(user.email, "ann@x.test");
    assert_eq!(user.user_type, UserType::Affiliate);

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].email, "ann@x.test");
    assert_eq!(sent[0].commission_rate, "0.10");
  }

  #[tokio::test]
  async fn test_register_rejects_merchant_email() {
    let db = test_db::setup().await;
    let merchant = fixtures::merchant(&db, "shop.test").await;
    let (issuer, notifier) = (MockIssuer::default(), MockNotifier::default());

    let result = Affiliates::new(&db, &issuer, &notifier)
      .register(&merchant, "owner@shop.test", "Owner", MICRO / 10)
      .await;

    assert!(matches!(result, Err(Error::DuplicateIdentity(_))));
    assert_eq!(issuer.issued.load(Ordering::SeqCst), 0);
    assert!(notifier.sent.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_register_rejects_existing_affiliate() {
    let db = test_db::setup().await;
    let merchant = fixtures::merchant(&db, "shop.test").await;
    let other = fixtures::merchant(&db, "other.test").await;
    let (issuer, notifier) = (MockIssuer::default(), MockNotifier::default());
    let sv = Affiliates::new(&db, &issuer, &notifier);

    sv.register(&merchant, "ann@x.test", "Ann", MICRO / 10).await.unwrap();
    let result = sv.register(&other, "ann@x.test", "Ann", MICRO / 5).await;

    assert!(matches!(result, Err(Error::DuplicateIdentity(_))));
    assert_eq!(
      affiliate::Entity::find().all(&db).await.unwrap().len(),
      1,
      "no second affiliate row"
    );
  }

  #[tokio::test]
  async fn test_register_survives_notifier_failure() {
    let db = test_db::setup().await;
    let merchant = fixtures::merchant(&db, "shop.test").await;
    let issuer = MockIssuer::default();
    let notifier = MockNotifier { fail: true, ..Default::default() };

    let affiliate = Affiliates::new(&db, &issuer, &notifier)
      .register(&merchant, "ann@x.test", "Ann", MICRO / 10)
      .await
      .unwrap();

    assert!(
      affiliate::Entity::find_by_id(affiliate.id)
        .one(&db)
        .await
        .unwrap()
        .is_some()
    );
  }

  #[tokio::test]
  async fn test_find_or_create_uses_input_verbatim() {
    let db = test_db::setup().await;
    let merchant = fixtures::merchant(&db, "shop.test").await;
    let (issuer, notifier) = (MockIssuer::default(), MockNotifier::default());

    let affiliate = Affiliates::new(&db, &issuer, &notifier)
      .find_or_create_affiliate(
        details("ann@x.test", 10 * MICRO, "SAVE10"),
        &merchant,
      )
      .await
      .unwrap();

    assert_eq!(affiliate.commission_rate, 10 * MICRO);
    assert_eq!(affiliate.discount_code, "SAVE10");
    assert_eq!(issuer.issued.load(Ordering::SeqCst), 0);

    let user = user::Entity::find_by_id(affiliate.user_id)
      .one(&db)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(user.user_type, UserType::Affiliate);
    assert_eq!(user.name, "Ann");
  }

  #[tokio::test]
  async fn test_find_or_create_returns_existing_regardless_of_email() {
    let db = test_db::setup().await;
    let merchant = fixtures::merchant(&db, "shop.test").await;
    let (issuer, notifier) = (MockIssuer::default(), MockNotifier::default());
    let sv = Affiliates::new(&db, &issuer, &notifier);

    let first = sv
      .find_or_create_affiliate(details("ann@x.test", MICRO, "A"), &merchant)
      .await
      .unwrap();
    let bob = details("bob@x.test", 2 * MICRO, "B");
    let second =
      sv.find_or_create_affiliate(bob, &merchant).await.unwrap();
    let by_email = sv
      .find_or_create_affiliate("carol@x.test", &merchant)
      .await
      .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.id, by_email.id);
    assert_eq!(affiliate::Entity::find().all(&db).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_find_or_create_needs_details_to_create() {
    let db = test_db::setup().await;
    let merchant = fixtures::merchant(&db, "shop.test").await;
    let (issuer, notifier) = (MockIssuer::default(), MockNotifier::default());

    let result = Affiliates::new(&db, &issuer, &notifier)
      .find_or_create_affiliate("ann@x.test", &merchant)
      .await;

    assert!(matches!(result, Err(Error::InvalidArgs(_))));
  }

  #[tokio::test]
  async fn test_find_or_create_is_atomic() {
    let db = test_db::setup().await;
    let merchant = fixtures::merchant(&db, "shop.test").await;
    let other = fixtures::merchant(&db, "other.test").await;
    let (issuer, notifier) = (MockIssuer::default(), MockNotifier::default());
    let sv = Affiliates::new(&db, &issuer, &notifier);

    sv.find_or_create_affiliate(details("ann@x.test", MICRO, "TAKEN"), &other)
      .await
      .unwrap();

    // the user insert succeeds, the affiliate insert hits the code
    let result = sv
      .find_or_create_affiliate(
        details("bob@x.test", MICRO, "TAKEN"),
        &merchant,
      )
      .await;

    assert!(matches!(result, Err(Error::DuplicateIdentity(_))));
    let bob = repo::Users::new(&db).by_email("bob@x.test").await.unwrap();
    assert!(bob.is_none(), "user insert must roll back with the affiliate");
  }

  #[tokio::test]
  async fn test_find_or_create_rejects_taken_email() {
    let db = test_db::setup().await;
    let merchant = fixtures::merchant(&db, "shop.test").await;
    let (issuer, notifier) = (MockIssuer::default(), MockNotifier::default());

    let result = Affiliates::new(&db, &issuer, &notifier)
      .find_or_create_affiliate(
        details("owner@other.test", MICRO, "X"),
        &fixtures::merchant(&db, "other.test").await,
      )
      .await;
    assert!(matches!(result, Err(Error::DuplicateIdentity(_))));

    // the first merchant is untouched
    assert!(
      repo::Affiliates::new(&db)
        .first_for_merchant(merchant.id)
        .await
        .unwrap()
        .is_none()
    );
  }
}
