//! Handlers for `/v1/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/v1/users` | Registration; 409 on a taken email |
//! | `POST` | `/v1/users/login` | Returns a bearer token |

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use yourdiet_core::{
  permission::{Permission, Role},
  store::Store,
  user::{Gender, MacroTargets, NewUser},
  validate,
};

use crate::{
  AppState,
  auth::{hash_password, verify_password},
  error::ApiError,
};

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub email:           String,
  pub password:        String,
  pub age:             i64,
  pub gender:          String,
  #[serde(default)]
  pub is_nutritionist: bool,
  pub weight_kg:       Option<f64>,
  pub height_cm:       Option<f64>,
  pub goal:            Option<String>,
  pub macro_targets:   Option<MacroTargets>,
}

/// `POST /v1/users`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  payload: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + Clone + 'static,
{
  let Json(body) = payload?;

  validate::email("email", &body.email)?;
  validate::password(&body.password)?;
  let age = u32::try_from(body.age).unwrap_or(0);
  validate::age(age)?;
  let gender: Gender = body.gender.parse()?;

  let taken = || ApiError::Conflict("email already registered".into());

  // Skips the password hash for the common case; the insert is authoritative.
  let existing = state
    .store
    .find_user_by_email(&body.email)
    .await
    .map_err(ApiError::store)?;
  if existing.is_some() {
    return Err(taken());
  }

  let role = if body.is_nutritionist { Role::Nutritionist } else { Role::Default };
  let user = state
    .store
    .create_user(NewUser {
      email: body.email,
      password_hash: hash_password(&body.password)?,
      role,
      age,
      gender,
      weight_kg: body.weight_kg,
      height_cm: body.height_cm,
      goal: body.goal.filter(|g| !g.trim().is_empty()),
      macro_targets: body.macro_targets,
    })
    .await
    .map_err(ApiError::store)?
    .ok_or_else(taken)?;

  tracing::info!(user = %user.user_id, role = %user.role, "user registered");
  Ok((
    StatusCode::CREATED,
    Json(json!({ "message": "user created successfully", "user_id": user.user_id })),
  ))
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
  pub token:       String,
  pub expires_at:  DateTime<Utc>,
  pub user_id:     Uuid,
  pub email:       String,
  pub user_type:   Role,
  pub permissions: Vec<Permission>,
}

/// `POST /v1/users/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  payload: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError>
where
  S: Store + Clone + 'static,
{
  let Json(body) = payload?;
  let invalid = || ApiError::Unauthenticated("invalid email or password".into());

  let user = state
    .store
    .find_user_by_email(&body.email)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(invalid)?;

  if !verify_password(&body.password, &user.password_hash) {
    return Err(invalid());
  }

  let issued = state.tokens.issue(&user)?;
  tracing::info!(user = %user.user_id, "user logged in");

  Ok(Json(LoginResponse {
    token:       issued.token,
    expires_at:  issued.expires_at,
    user_id:     user.user_id,
    email:       user.email,
    user_type:   user.role,
    permissions: issued.claims.permissions,
  }))
}
