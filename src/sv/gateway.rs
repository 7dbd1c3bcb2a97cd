use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entity::merchant, prelude::*, utils};

/// Outbound payout provider. An `Err` signals a transient failure; the
/// order stays unpaid and the task runner may retry.
#[async_trait]
pub trait PayoutGateway: Send + Sync {
  async fn send_payout(&self, email: &str, amount: i64) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
  pub id: i64,
  pub code: String,
}

#[async_trait]
pub trait DiscountCodeIssuer: Send + Sync {
  async fn create_discount_code(
    &self,
    merchant: &merchant::Model,
  ) -> Result<DiscountCode>;
}

/// Simulated gateway: records the payout in the log and always succeeds.
#[derive(Debug, Default, Clone)]
pub struct LogGateway;

#[async_trait]
impl PayoutGateway for LogGateway {
  async fn send_payout(&self, email: &str, amount: i64) -> Result<()> {
    info!("Payout of {} sent to {}", utils::format_fixed(amount, 2), email);
    Ok(())
  }
}

#[derive(Debug, Serialize)]
struct PayoutRequest<'a> {
  email: &'a str,
  /// Decimal string with six fractional digits.
  amount: String,
}

#[derive(Debug, Deserialize)]
struct PayoutResponse {
  #[serde(default = "default_ok")]
  ok: bool,
  error: Option<String>,
}

fn default_ok() -> bool {
  true
}

/// Payout provider reached over JSON/HTTP.
#[derive(Clone)]
pub struct HttpGateway {
  client: Client,
  url: String,
  token: Option<String>,
}

impl HttpGateway {
  pub fn new(url: String, token: Option<String>) -> Self {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .unwrap_or_default();

    Self { client, url, token }
  }
}

#[async_trait]
impl PayoutGateway for HttpGateway {
  async fn send_payout(&self, email: &str, amount: i64) -> Result<()> {
    let body = PayoutRequest { email, amount: utils::format_fixed(amount, 6) };

    let mut request = self.client.post(&self.url).json(&body);
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }

    let response = request
      .send()
      .await
      .map_err(|e| Error::Payout(format!("Request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
      return Err(Error::Payout(format!("Gateway responded with {status}")));
    }

    // an empty body counts as success
    let text = response
      .text()
      .await
      .map_err(|e| Error::Payout(format!("Failed to read response: {}", e)))?;
    if text.trim().is_empty() {
      return Ok(());
    }

    let parsed: PayoutResponse = json::from_str(&text).map_err(|e| {
      Error::Payout(format!("Failed to parse response: {}", e))
    })?;

    if parsed.ok {
      Ok(())
    } else {
      Err(Error::Payout(
        parsed.error.unwrap_or_else(|| "Unknown error".to_string()),
      ))
    }
  }
}

/// Issues globally unique codes from random v4 UUIDs.
#[derive(Debug, Default, Clone)]
pub struct UuidIssuer;

#[async_trait]
impl DiscountCodeIssuer for UuidIssuer {
  async fn create_discount_code(
    &self,
    merchant: &merchant::Model,
  ) -> Result<DiscountCode> {
    let uuid = Uuid::new_v4();
    let id = (uuid.as_u128() % 100_001) as i64;
    debug!("issued discount code {} for merchant {}", uuid, merchant.domain);
    Ok(DiscountCode { id, code: uuid.to_string() })
  }
}
