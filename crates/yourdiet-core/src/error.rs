//! Error types for `yourdiet-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Input failed a validation rule. `field` names the offending input using
  /// its wire name (e.g. `meals[0].ingredients`).
  #[error("{message}")]
  Validation { field: String, message: String },

  #[error("unknown role: {0:?}")]
  UnknownRole(String),
}

impl Error {
  pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Validation { field: field.into(), message: message.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
