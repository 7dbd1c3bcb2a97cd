use async_trait::async_trait;
use serde::Serialize;

use crate::{entity::affiliate, prelude::*, utils};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffiliateCreated {
  pub affiliate_id: i32,
  pub name: String,
  pub email: String,
  pub discount_code: String,
  /// Commission rate rounded to two decimals, e.g. "0.10".
  pub commission_rate: String,
}

impl AffiliateCreated {
  pub fn new(affiliate: &affiliate::Model, name: &str, email: &str) -> Self {
    Self {
      affiliate_id: affiliate.id,
      name: name.to_string(),
      email: email.to_string(),
      discount_code: affiliate.discount_code.clone(),
      commission_rate: utils::format_fixed(affiliate.commission_rate, 2),
    }
  }
}

/// Outbound notifications, standing in for the mail subsystem.
#[async_trait]
pub trait Notifier: Send + Sync {
  async fn affiliate_created(&self, message: AffiliateCreated) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
  async fn affiliate_created(&self, message: AffiliateCreated) -> Result<()> {
    info!(
      to = %message.email,
      discount_code = %message.discount_code,
      commission_rate = %message.commission_rate,
      "affiliate created: welcome {}",
      message.name
    );
    Ok(())
  }
}
