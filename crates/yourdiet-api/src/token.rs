//! Signed identity tokens (HS256 JWTs).
//!
//! A token is issued at login and carries the user id plus the permission set
//! of the user's role at that moment. Tokens are immutable and never stored;
//! validity is decided purely by signature and expiry.

use chrono::{DateTime, Duration, TimeZone as _, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use yourdiet_core::{permission::Permission, user::User};

/// The verified payload of an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  /// Subject: the user id, hyphenated.
  pub sub:         String,
  pub user_id:     Uuid,
  pub permissions: Vec<Permission>,
  /// Issued-at, Unix seconds.
  pub iat:         i64,
  /// Expiry, Unix seconds.
  pub exp:         i64,
}

impl Claims {
  pub fn authorize(&self, permission: Permission) -> bool {
    self.permissions.contains(&permission)
  }

  pub fn expires_at(&self) -> Option<DateTime<Utc>> { Utc.timestamp_opt(self.exp, 0).single() }
}

#[derive(Debug, Error)]
pub enum TokenError {
  /// Bad signature, wrong algorithm, malformed, or expired.
  #[error("invalid or expired token")]
  Invalid(#[source] jsonwebtoken::errors::Error),

  #[error("failed to sign token: {0}")]
  Signing(#[source] jsonwebtoken::errors::Error),
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
  pub token:      String,
  pub expires_at: DateTime<Utc>,
  pub claims:     Claims,
}

/// Issues and validates tokens with one process-wide secret.
pub struct TokenService {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl:        Duration,
}

impl TokenService {
  pub fn new(secret: &[u8], ttl: Duration) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      ttl,
    }
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  pub fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
    self.issue_at(user, Utc::now())
  }

  /// Issue a token as if the current time were `now`.
  pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
    let expires_at = now + self.ttl;
    let claims = Claims {
      sub:         user.user_id.hyphenated().to_string(),
      user_id:     user.user_id,
      permissions: user.role.permissions().to_vec(),
      iat:         now.timestamp(),
      exp:         expires_at.timestamp(),
    };

    let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(TokenError::Signing)?;

    Ok(IssuedToken { token, expires_at, claims })
  }

  pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
    decode::<Claims>(token, &self.decoding, &self.validation)
      .map(|data| data.claims)
      .map_err(TokenError::Invalid)
  }
}
