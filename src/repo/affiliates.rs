use sea_orm::{JoinType, QuerySelect, RelationTrait};

use crate::{
  entity::{PayoutStatus, affiliate, order, user},
  prelude::*,
};

pub struct Affiliates<'a, C> {
  conn: &'a C,
}

impl<'a, C: ConnectionTrait> Affiliates<'a, C> {
  pub fn new(conn: &'a C) -> Self {
    Self { conn }
  }

  pub async fn by_id(&self, id: i32) -> Result<Option<affiliate::Model>> {
    Ok(affiliate::Entity::find_by_id(id).one(self.conn).await?)
  }

  pub async fn by_user(
    &self,
    user_id: i32,
  ) -> Result<Option<affiliate::Model>> {
    Ok(
      affiliate::Entity::find()
        .filter(affiliate::Column::UserId.eq(user_id))
        .one(self.conn)
        .await?,
    )
  }

  /// Oldest affiliate of the merchant, if any.
  pub async fn first_for_merchant(
    &self,
    merchant_id: i32,
  ) -> Result<Option<affiliate::Model>> {
    Ok(
      affiliate::Entity::find()
        .filter(affiliate::Column::MerchantId.eq(merchant_id))
        .order_by_asc(affiliate::Column::Id)
        .one(self.conn)
        .await?,
    )
  }

  pub async fn create(
    &self,
    user_id: i32,
    merchant_id: i32,
    commission_rate: i64,
    discount_code: &str,
  ) -> std::result::Result<affiliate::Model, sea_orm::DbErr> {
    affiliate::ActiveModel {
      id: sea_orm::NotSet,
      user_id: Set(user_id),
      merchant_id: Set(merchant_id),
      commission_rate: Set(commission_rate),
      discount_code: Set(discount_code.to_string()),
      created_at: Set(Utc::now().naive_utc()),
    }
    .insert(self.conn)
    .await
  }

  /// Email of the user behind the affiliate, the payout destination.
  pub async fn payout_email(&self, affiliate_id: i32) -> Result<String> {
    let (_, user) = affiliate::Entity::find_by_id(affiliate_id)
      .find_also_related(user::Entity)
      .one(self.conn)
      .await?
      .ok_or(Error::AffiliateNotFound)?;

    user.map(|u| u.email).ok_or(Error::UserNotFound)
  }

  /// Affiliates holding at least one unpaid order.
  pub async fn with_unpaid_orders(&self) -> Result<Vec<affiliate::Model>> {
    Ok(
      affiliate::Entity::find()
        .join(JoinType::InnerJoin, affiliate::Relation::Orders.def())
        .filter(order::Column::PayoutStatus.eq(PayoutStatus::Unpaid))
        .distinct()
        .order_by_asc(affiliate::Column::Id)
        .all(self.conn)
        .await?,
    )
  }
}
