//! Bearer-token extractor and password hashing.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use rand_core::OsRng;
use uuid::Uuid;
use yourdiet_core::{permission::Permission, store::Store};

use crate::{AppState, PermissionSource, error::ApiError, token::Claims};

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

/// `false` for a wrong password and for an unparseable stored hash alike.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

// ─── Bearer extractor ────────────────────────────────────────────────────────

/// The verified caller. Present in a handler means the request carried a
/// valid identity token.
#[derive(Debug, Clone)]
pub struct Authenticated {
  pub claims: Claims,
}

impl Authenticated {
  pub fn user_id(&self) -> Uuid { self.claims.user_id }

  pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
    if self.claims.authorize(permission) {
      Ok(())
    } else {
      Err(ApiError::Forbidden(format!("missing permission {permission}")))
    }
  }
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| ApiError::Unauthenticated("missing bearer token".into()))?;

  value
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| ApiError::Unauthenticated("malformed authorization header".into()))
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: Store + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)?;
    let mut claims = state.tokens.validate(token)?;

    if state.config.permission_source == PermissionSource::Role {
      let user = state
        .store
        .find_user_by_id(claims.user_id)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::Unauthenticated("token subject no longer exists".into()))?;
      claims.permissions = user.role.permissions().to_vec();
    }

    Ok(Authenticated { claims })
  }
}
