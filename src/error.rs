use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use tracing::error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("database error: {0}")]
  Db(#[from] DbErr),
  #[error("duplicate identity: {0}")]
  DuplicateIdentity(String),
  #[error("merchant not found: {0}")]
  MerchantNotFound(String),
  #[error("affiliate not found")]
  AffiliateNotFound,
  #[error("order not found")]
  OrderNotFound,
  #[error("user not found")]
  UserNotFound,
  #[error("payout failed: {0}")]
  Payout(String),
  #[error("{0}")]
  Constraint(String),
  #[error("invalid arguments: {0}")]
  InvalidArgs(String),
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("internal error: {0}")]
  Internal(String),
}

impl Error {
  /// Failures the payout runner should reschedule.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Error::Payout(_))
  }

  /// Business-rule rejections, as opposed to infrastructure failures.
  pub fn is_rejection(&self) -> bool {
    matches!(
      self,
      Error::DuplicateIdentity(_)
        | Error::MerchantNotFound(_)
        | Error::InvalidArgs(_)
        | Error::BadRequest(_)
    )
  }

  /// Maps unique-constraint violations into `DuplicateIdentity`, leaving
  /// every other database error untouched.
  pub fn unique_as_duplicate(err: DbErr, what: &str) -> Self {
    match err.sql_err() {
      Some(SqlErr::UniqueConstraintViolation(detail)) => {
        Error::DuplicateIdentity(format!("{what}: {detail}"))
      }
      _ => Error::Db(err),
    }
  }

  /// Wraps any constraint violation into a descriptive `Constraint` error.
  pub fn constraint(err: DbErr, context: &str) -> Self {
    match err.sql_err() {
      Some(
        SqlErr::UniqueConstraintViolation(detail)
        | SqlErr::ForeignKeyConstraintViolation(detail),
      ) => Error::Constraint(format!("{context}: {detail}")),
      _ => Error::Db(err),
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      Error::DuplicateIdentity(_) | Error::Constraint(_) => {
        StatusCode::CONFLICT
      }
      Error::MerchantNotFound(_)
      | Error::AffiliateNotFound
      | Error::OrderNotFound
      | Error::UserNotFound => StatusCode::NOT_FOUND,
      Error::InvalidArgs(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Error::BadRequest(_) => StatusCode::BAD_REQUEST,
      Error::Payout(_) => StatusCode::BAD_GATEWAY,
      Error::Db(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

#[derive(Serialize)]
struct ErrorBody {
  message: String,
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!("request failed: {self}");
    }
    let message = match &self {
      // don't leak driver details
      Error::Db(_) => "database error".to_string(),
      other => other.to_string(),
    };
    (status, axum::Json(ErrorBody { message })).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_payout_failures_retry() {
    assert!(Error::Payout("timeout".into()).is_retryable());
    assert!(!Error::OrderNotFound.is_retryable());
    assert!(!Error::DuplicateIdentity("x".into()).is_retryable());
  }

  #[test]
  fn status_mapping() {
    assert_eq!(
      Error::DuplicateIdentity("a".into()).into_response().status(),
      StatusCode::CONFLICT
    );
    assert_eq!(
      Error::MerchantNotFound("shop.test".into()).into_response().status(),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      Error::InvalidArgs("bad".into()).into_response().status(),
      StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
      Error::BadRequest("bad date".into()).into_response().status(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      Error::Db(DbErr::Custom("boom".into())).into_response().status(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }
}
