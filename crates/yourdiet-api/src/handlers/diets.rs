//! Handlers for `/v1/diets` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/v1/diets` | Optional `?userEmail=…&createdBySearch=true` |
//! | `POST` | `/v1/diets` | Requires `create_diet` |
//! | `PUT`  | `/v1/diets/{id}` | Requires `update_diet`; creator only |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use yourdiet_core::{
  diet::{Diet, DietPatch, DietStatus, Meal, NewDiet},
  listing::{ListQuery, diet_filter},
  merge::merge,
  permission::Permission,
  store::Store,
  validate,
};
use yourdiet_hub::Notification;

use crate::{AppState, auth::Authenticated, error::ApiError};

pub const DIET_CREATED: &str = "diet.created";
pub const DIET_UPDATED: &str = "diet.updated";

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  #[serde(rename = "userEmail")]
  pub user_email:        Option<String>,
  #[serde(rename = "createdBySearch")]
  pub created_by_search: Option<String>,
}

/// `GET /v1/diets`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  auth: Authenticated,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Diet>>, ApiError>
where
  S: Store + Clone + 'static,
{
  auth.require(Permission::ListDiet)?;
  let Query(params) = params?;

  let caller = state
    .store
    .find_user_by_id(auth.user_id())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {}", auth.user_id())))?;

  let query = ListQuery {
    user_email:        params.user_email,
    created_by_search: params.created_by_search.as_deref() == Some("true"),
  };
  let filter = diet_filter(&caller, &query);

  let diets = state.store.find_diets(&filter).await.map_err(ApiError::store)?;
  Ok(Json(diets))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub user_email:       String,
  pub name:             String,
  pub duration_in_days: u32,
  #[serde(default)]
  pub status:           Option<DietStatus>,
  pub meals:            Vec<Meal>,
  #[serde(default)]
  pub observations:     String,
}

/// `POST /v1/diets`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  auth: Authenticated,
  payload: Result<Json<CreateBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + Clone + 'static,
{
  auth.require(Permission::CreateDiet)?;
  let Json(body) = payload?;

  validate::email("user_email", &body.user_email)?;
  validate::diet_name(&body.name)?;
  validate::duration(body.duration_in_days)?;
  validate::meals(&body.meals)?;

  let diet = state
    .store
    .create_diet(NewDiet {
      user_email:       body.user_email,
      name:             body.name,
      duration_in_days: body.duration_in_days,
      status:           body.status.unwrap_or_default(),
      meals:            body.meals,
      observations:     body.observations,
      created_by:       auth.user_id(),
    })
    .await
    .map_err(ApiError::store)?;

  tracing::info!(diet = %diet.diet_id, creator = %diet.created_by, "diet created");
  notify_patient(&state, &diet, DIET_CREATED).await;

  Ok((StatusCode::CREATED, Json(diet)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  pub name:             Option<String>,
  pub duration_in_days: Option<u32>,
  pub status:           Option<DietStatus>,
  pub meals:            Option<Vec<Meal>>,
  pub observations:     Option<String>,
  /// The version the client last read. Omit to skip the staleness check.
  pub version:          Option<u64>,
}

/// `PUT /v1/diets/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  auth: Authenticated,
  id: Result<Path<Uuid>, PathRejection>,
  payload: Result<Json<UpdateBody>, JsonRejection>,
) -> Result<Json<Diet>, ApiError>
where
  S: Store + Clone + 'static,
{
  auth.require(Permission::UpdateDiet)?;
  let Path(id) = id?;
  let Json(body) = payload?;

  if let Some(name) = body.name.as_deref().filter(|n| !n.is_empty()) {
    validate::diet_name(name)?;
  }
  if let Some(meals) = body.meals.as_deref().filter(|m| !m.is_empty()) {
    validate::meals(meals)?;
  }

  let existing = state
    .store
    .get_diet(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("diet {id}")))?;

  let patch = DietPatch {
    created_by:       auth.user_id(),
    name:             body.name,
    duration_in_days: body.duration_in_days,
    status:           body.status,
    meals:            body.meals,
    observations:     body.observations,
    expected_version: body.version,
  };
  let merged = merge(&existing, &patch, Utc::now())?;

  let diet = state
    .store
    .update_diet(&merged)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::Conflict(format!("diet {id} was modified concurrently; reload and retry"))
    })?;

  tracing::info!(diet = %diet.diet_id, version = diet.version, "diet updated");
  notify_patient(&state, &diet, DIET_UPDATED).await;

  Ok(Json(diet))
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// Publish `kind` with the diet as payload to the patient, if registered.
/// Failures here never fail the request that triggered them.
async fn notify_patient<S>(state: &AppState<S>, diet: &Diet, kind: &str)
where
  S: Store + Clone + 'static,
{
  let patient = match state.store.find_user_by_email(&diet.user_email).await {
    Ok(Some(user)) => user,
    Ok(None) => return,
    Err(e) => {
      tracing::warn!(error = %e, diet = %diet.diet_id, "patient lookup failed; event skipped");
      return;
    }
  };

  let payload = match serde_json::to_value(diet) {
    Ok(v) => v,
    Err(e) => {
      tracing::warn!(error = %e, diet = %diet.diet_id, "diet not serialisable; event skipped");
      return;
    }
  };

  let delivered = state
    .hub
    .notify(&Notification::to_user(patient.user_id.to_string(), kind, payload));
  tracing::debug!(kind, diet = %diet.diet_id, delivered, "diet event published");
}
