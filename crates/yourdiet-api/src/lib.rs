//! JSON HTTP API for yourdiet.
//!
//! Exposes an axum [`Router`] backed by any [`Store`]: user registration and
//! login, bearer-authenticated diet management, and a server-sent event
//! stream fed by the [`NotificationHub`].

pub mod auth;
pub mod error;
pub mod handlers;
pub mod token;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post, put},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use yourdiet_core::store::Store;
use yourdiet_hub::{DeliveryPolicy, NotificationHub};

use handlers::{diets, events, users};
use token::TokenService;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Where the bearer extractor takes the caller's permissions from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionSource {
  /// Re-derive from the user's current role on every request.
  #[default]
  Role,
  /// Trust the set embedded in the token at login.
  Token,
}

/// Runtime server configuration, deserialised from `config.toml` and
/// `YOURDIET_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  pub jwt_secret:        String,
  #[serde(default = "default_token_ttl_minutes")]
  pub token_ttl_minutes: u32,
  #[serde(default)]
  pub permission_source: PermissionSource,
  /// 0 hands notifications only to subscribers waiting at that instant;
  /// n > 0 gives every subscriber a queue of n.
  #[serde(default)]
  pub hub_buffer:        usize,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("yourdiet.sqlite3") }
fn default_token_ttl_minutes() -> u32 { 1000 }

impl ServerConfig {
  pub fn token_ttl(&self) -> chrono::Duration {
    chrono::Duration::minutes(i64::from(self.token_ttl_minutes))
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: Store> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub tokens: Arc<TokenService>,
  pub hub:    NotificationHub,
}

impl<S: Store> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    let tokens = TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl());
    let hub = NotificationHub::new(DeliveryPolicy::from_buffer(config.hub_buffer));
    Self {
      store: Arc::new(store),
      config: Arc::new(config),
      tokens: Arc::new(tokens),
      hub,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the yourdiet API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: Store + Clone + 'static,
{
  Router::new()
    .route("/ping", get(handlers::ping))
    // Users
    .route("/v1/users", post(users::register::<S>))
    .route("/v1/users/login", post(users::login::<S>))
    // Diets
    .route("/v1/diets", get(diets::list::<S>).post(diets::create::<S>))
    .route("/v1/diets/{id}", put(diets::update::<S>))
    // Events
    .route("/v1/sse/events", get(events::stream::<S>))
    .route("/v1/sse/notify", post(events::publish::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::Utc;
  use futures::StreamExt as _;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;
  use yourdiet_core::{
    permission::{Permission, Role},
    user::{Gender, User},
  };
  use yourdiet_hub::Notification;
  use yourdiet_store_sqlite::SqliteStore;

  const PASSWORD: &str = "Secret1!";

  async fn make_state(source: PermissionSource, hub_buffer: usize) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    AppState::new(store, ServerConfig {
      host:              "127.0.0.1".to_string(),
      port:              8080,
      store_path:        PathBuf::from(":memory:"),
      jwt_secret:        "test-secret".to_string(),
      token_ttl_minutes: 60,
      permission_source: source,
      hub_buffer,
    })
  }

  async fn call(
    state:  &AppState<SqliteStore>,
    method: &str,
    uri:    &str,
    token:  Option<&str>,
    body:   Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = router(state.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
  }

  async fn register(state: &AppState<SqliteStore>, email: &str, nutritionist: bool) -> Uuid {
    let (status, body) = call(
      state,
      "POST",
      "/v1/users",
      None,
      Some(json!({
        "email": email,
        "password": PASSWORD,
        "age": 30,
        "gender": "male",
        "is_nutritionist": nutritionist,
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["user_id"].as_str().unwrap().parse().unwrap()
  }

  async fn login(state: &AppState<SqliteStore>, email: &str) -> String {
    let (status, body) = call(
      state,
      "POST",
      "/v1/users/login",
      None,
      Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
  }

  fn diet_body(patient: &str) -> Value {
    json!({
      "user_email": patient,
      "name": "Cutting plan",
      "duration_in_days": 30,
      "meals": [{
        "name": "Breakfast",
        "time": "breakfast",
        "ingredients": [{
          "description": "oats",
          "quantity": 50.0,
          "unit": "gram",
          "substitutes": [{ "description": "granola", "quantity": 40.0, "unit": "gram" }]
        }]
      }],
      "observations": "drink water"
    })
  }

  /// A token for a user that was never stored.
  fn phantom_token(state: &AppState<SqliteStore>, role: Role) -> String {
    let user = User {
      user_id:       Uuid::new_v4(),
      email:         "ghost@x.com".into(),
      password_hash: String::new(),
      role,
      age:           40,
      gender:        Gender::Other,
      weight_kg:     None,
      height_cm:     None,
      goal:          None,
      macro_targets: None,
      created_at:    Utc::now(),
    };
    state.tokens.issue(&user).unwrap().token
  }

  // ── Ping ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn ping_needs_no_token() {
    let state = make_state(PermissionSource::Role, 0).await;
    let (status, body) = call(&state, "GET", "/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong");
  }

  // ── Users ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn register_then_login_yields_list_only_token() {
    let state = make_state(PermissionSource::Role, 0).await;
    let user_id = register(&state, "a@x.com", false).await;

    let (status, body) = call(
      &state,
      "POST",
      "/v1/users/login",
      None,
      Some(json!({ "email": "a@x.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user_id.to_string());
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["user_type"], "DEFAULT");
    assert_eq!(body["permissions"], json!(["list_diet"]));
    assert!(body.get("password_hash").is_none());

    let claims = state.tokens.validate(body["token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.user_id, user_id);
    assert_eq!(claims.permissions, vec![Permission::ListDiet]);
  }

  #[tokio::test]
  async fn nutritionist_login_carries_full_permission_set() {
    let state = make_state(PermissionSource::Role, 0).await;
    register(&state, "n@x.com", true).await;
    let claims = state.tokens.validate(&login(&state, "n@x.com").await).unwrap();
    assert_eq!(claims.permissions, Role::Nutritionist.permissions());
  }

  #[tokio::test]
  async fn duplicate_email_is_conflict() {
    let state = make_state(PermissionSource::Role, 0).await;
    register(&state, "a@x.com", false).await;
    let (status, _) = call(
      &state,
      "POST",
      "/v1/users",
      None,
      Some(json!({ "email": "a@x.com", "password": PASSWORD, "age": 22, "gender": "female" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn concurrent_duplicate_registration_is_conflict() {
    let state = make_state(PermissionSource::Role, 0).await;
    let body = json!({ "email": "race@x.com", "password": PASSWORD, "age": 30, "gender": "male" });

    let ((a, body_a), (b, body_b)) = tokio::join!(
      call(&state, "POST", "/v1/users", None, Some(body.clone())),
      call(&state, "POST", "/v1/users", None, Some(body.clone())),
    );

    let mut statuses = [a, b];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT], "{body_a} {body_b}");

    let loser = if a == StatusCode::CONFLICT { body_a } else { body_b };
    assert_eq!(loser["error"], "email already registered");
  }

  #[tokio::test]
  async fn registration_rejects_bad_input() {
    let state = make_state(PermissionSource::Role, 0).await;
    let cases = [
      (json!({ "email": "nope", "password": PASSWORD, "age": 30, "gender": "male" }), "email"),
      (json!({ "email": "a@x.com", "password": "short", "age": 30, "gender": "male" }), "password"),
      (json!({ "email": "a@x.com", "password": "Secret12", "age": 30, "gender": "male" }), "password"),
      (json!({ "email": "a@x.com", "password": PASSWORD, "age": 0, "gender": "male" }), "age"),
      (json!({ "email": "a@x.com", "password": PASSWORD, "age": -4, "gender": "male" }), "age"),
      (json!({ "email": "a@x.com", "password": PASSWORD, "age": 30, "gender": "robot" }), "gender"),
      (json!({ "email": "a@x.com" }), "body"),
    ];
    for (body, field) in cases {
      let (status, resp) = call(&state, "POST", "/v1/users", None, Some(body)).await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "{resp}");
      assert_eq!(resp["field"], field, "{resp}");
    }
  }

  #[tokio::test]
  async fn login_failures_are_indistinguishable() {
    let state = make_state(PermissionSource::Role, 0).await;
    register(&state, "a@x.com", false).await;

    let (wrong_pw, body_a) = call(
      &state,
      "POST",
      "/v1/users/login",
      None,
      Some(json!({ "email": "a@x.com", "password": "Wrong12!" })),
    )
    .await;
    let (unknown, body_b) = call(
      &state,
      "POST",
      "/v1/users/login",
      None,
      Some(json!({ "email": "b@x.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(wrong_pw, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(body_a, body_b);
  }

  // ── Authentication ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn diets_require_a_valid_token() {
    let state = make_state(PermissionSource::Role, 0).await;

    let (status, _) = call(&state, "GET", "/v1/diets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&state, "GET", "/v1/diets", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user_id = register(&state, "a@x.com", false).await;
    let user = state.store.find_user_by_id(user_id).await.unwrap().unwrap();
    let expired = state
      .tokens
      .issue_at(&user, Utc::now() - chrono::Duration::minutes(120))
      .unwrap()
      .token;
    let (status, _) = call(&state, "GET", "/v1/diets", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn unauthorized_response_has_bearer_challenge() {
    let state = make_state(PermissionSource::Role, 0).await;
    let req = Request::builder().uri("/v1/diets").body(Body::empty()).unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
  }

  #[tokio::test]
  async fn role_source_rederives_permissions() {
    let state = make_state(PermissionSource::Role, 0).await;
    let user_id = register(&state, "a@x.com", false).await;
    let mut user = state.store.find_user_by_id(user_id).await.unwrap().unwrap();

    // A token claiming more than the stored role grants.
    user.role = Role::Nutritionist;
    let inflated = state.tokens.issue(&user).unwrap().token;
    let (status, _) = call(&state, "POST", "/v1/diets", Some(&inflated), Some(diet_body("p@x.com"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let ghost = phantom_token(&state, Role::Nutritionist);
    let (status, _) = call(&state, "GET", "/v1/diets", Some(&ghost), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn token_source_trusts_embedded_permissions() {
    let state = make_state(PermissionSource::Token, 0).await;
    let user_id = register(&state, "a@x.com", false).await;
    let mut user = state.store.find_user_by_id(user_id).await.unwrap().unwrap();

    user.role = Role::Nutritionist;
    let inflated = state.tokens.issue(&user).unwrap().token;
    let (status, _) = call(&state, "POST", "/v1/diets", Some(&inflated), Some(diet_body("p@x.com"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let ghost = phantom_token(&state, Role::Default);
    let (status, _) = call(&state, "GET", "/v1/diets", Some(&ghost), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Diets ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn default_user_cannot_create_diets() {
    let state = make_state(PermissionSource::Role, 0).await;
    register(&state, "a@x.com", false).await;
    let token = login(&state, "a@x.com").await;
    let (status, _) = call(&state, "POST", "/v1/diets", Some(&token), Some(diet_body("a@x.com"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn listing_by_role() {
    let state = make_state(PermissionSource::Role, 0).await;
    let nutritionist = register(&state, "n@x.com", true).await;
    register(&state, "p@x.com", false).await;
    register(&state, "a@x.com", false).await;
    let n_token = login(&state, "n@x.com").await;
    let p_token = login(&state, "p@x.com").await;
    let a_token = login(&state, "a@x.com").await;

    let (status, created) = call(&state, "POST", "/v1/diets", Some(&n_token), Some(diet_body("p@x.com"))).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["created_by"], nutritionist.to_string());
    assert_eq!(created["status"], "ENABLED");
    assert_eq!(created["version"], 1);
    assert_eq!(created["meals"][0]["ingredients"][0]["substitutes"][0]["description"], "granola");

    let (_, mine) = call(&state, "GET", "/v1/diets?createdBySearch=true", Some(&n_token), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["diet_id"], created["diet_id"]);

    let (_, narrowed) = call(
      &state,
      "GET",
      "/v1/diets?createdBySearch=true&userEmail=someone@else.com",
      Some(&n_token),
      None,
    )
    .await;
    assert_eq!(narrowed, json!([]));

    // The nutritionist's own default view is their own (empty) diet list.
    let (_, own) = call(&state, "GET", "/v1/diets", Some(&n_token), None).await;
    assert_eq!(own, json!([]));

    let (_, patient) = call(&state, "GET", "/v1/diets", Some(&p_token), None).await;
    assert_eq!(patient[0]["diet_id"], created["diet_id"]);

    let (status, unrelated) = call(&state, "GET", "/v1/diets?createdBySearch=true", Some(&a_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unrelated, json!([]));
  }

  #[tokio::test]
  async fn create_rejects_invalid_diets() {
    let state = make_state(PermissionSource::Role, 0).await;
    register(&state, "n@x.com", true).await;
    let token = login(&state, "n@x.com").await;

    let mut no_meals = diet_body("p@x.com");
    no_meals["meals"] = json!([]);
    let mut short_name = diet_body("p@x.com");
    short_name["name"] = json!("ab");
    let mut zero_days = diet_body("p@x.com");
    zero_days["duration_in_days"] = json!(0);
    let mut negative = diet_body("p@x.com");
    negative["meals"][0]["ingredients"][0]["substitutes"][0]["quantity"] = json!(-1.0);

    let cases = [
      (no_meals, "meals"),
      (short_name, "name"),
      (zero_days, "duration_in_days"),
      (negative, "meals[0].ingredients[0].substitutes[0].quantity"),
      (diet_body("not-an-email"), "user_email"),
    ];
    for (body, field) in cases {
      let (status, resp) = call(&state, "POST", "/v1/diets", Some(&token), Some(body)).await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "{resp}");
      assert_eq!(resp["field"], field);
    }
  }

  #[tokio::test]
  async fn update_rules() {
    let state = make_state(PermissionSource::Role, 0).await;
    register(&state, "n@x.com", true).await;
    register(&state, "m@x.com", true).await;
    let owner = login(&state, "n@x.com").await;
    let other = login(&state, "m@x.com").await;

    let (_, created) = call(&state, "POST", "/v1/diets", Some(&owner), Some(diet_body("p@x.com"))).await;
    let uri = format!("/v1/diets/{}", created["diet_id"].as_str().unwrap());

    let (status, updated) = call(
      &state,
      "PUT",
      &uri,
      Some(&owner),
      Some(json!({ "name": "Bulking plan", "observations": "", "version": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["name"], "Bulking plan");
    assert_eq!(updated["observations"], "drink water");
    assert_eq!(updated["version"], 2);
    assert_eq!(updated["meals"], created["meals"]);

    let (status, _) = call(&state, "PUT", &uri, Some(&other), Some(json!({ "name": "Hijacked" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&state, "PUT", &uri, Some(&owner), Some(json!({ "name": "Stale", "version": 1 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, resp) = call(
      &state,
      "PUT",
      &uri,
      Some(&owner),
      Some(json!({ "meals": [{ "name": "Lunch", "time": "lunch", "ingredients": [] }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["field"], "meals[0].ingredients");

    let (status, _) = call(
      &state,
      "PUT",
      &format!("/v1/diets/{}", Uuid::new_v4()),
      Some(&owner),
      Some(json!({ "name": "Anything" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&state, "PUT", "/v1/diets/not-a-uuid", Some(&owner), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = call(&state, "GET", "/v1/diets?createdBySearch=true", Some(&owner), None).await;
    assert_eq!(listed[0]["name"], "Bulking plan");
    assert_eq!(listed[0]["version"], 2);
  }

  // ── Events ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn diet_changes_notify_the_patient() {
    let state = make_state(PermissionSource::Role, 4).await;
    register(&state, "n@x.com", true).await;
    let patient = register(&state, "p@x.com", false).await;
    let token = login(&state, "n@x.com").await;

    let mut patient_sub = state.hub.subscribe(patient.to_string());
    let mut bystander = state.hub.subscribe(Uuid::new_v4().to_string());

    let (_, created) = call(&state, "POST", "/v1/diets", Some(&token), Some(diet_body("p@x.com"))).await;
    let event = tokio::time::timeout(Duration::from_secs(1), patient_sub.recv())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(event.kind, "diet.created");
    assert_eq!(event.target(), Some(patient.to_string().as_str()));
    assert_eq!(event.payload["diet_id"], created["diet_id"]);

    let uri = format!("/v1/diets/{}", created["diet_id"].as_str().unwrap());
    call(&state, "PUT", &uri, Some(&token), Some(json!({ "duration_in_days": 60 }))).await;
    let event = tokio::time::timeout(Duration::from_secs(1), patient_sub.recv())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(event.kind, "diet.updated");
    assert_eq!(event.payload["duration_in_days"], 60);

    assert!(
      tokio::time::timeout(Duration::from_millis(50), bystander.recv()).await.is_err(),
      "bystander must not receive patient events"
    );
  }

  #[tokio::test]
  async fn notify_endpoint_routes_by_target() {
    let state = make_state(PermissionSource::Role, 4).await;
    let alice = register(&state, "a@x.com", false).await;
    register(&state, "b@x.com", false).await;
    let token = login(&state, "b@x.com").await;

    let mut alice_sub = state.hub.subscribe(alice.to_string());
    let mut carol_sub = state.hub.subscribe("carol");

    let (status, _) = call(
      &state,
      "POST",
      "/v1/sse/notify",
      Some(&token),
      Some(json!({ "type": "nudge", "payload": { "n": 1 }, "userID": alice.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(
      &state,
      "POST",
      "/v1/sse/notify",
      Some(&token),
      Some(json!({ "type": "maintenance", "payload": null })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(alice_sub.recv().await.unwrap().kind, "nudge");
    assert_eq!(alice_sub.recv().await.unwrap().kind, "maintenance");
    assert_eq!(carol_sub.recv().await.unwrap().kind, "maintenance");

    let (status, _) = call(&state, "POST", "/v1/sse/notify", Some(&token), Some(json!({ "type": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&state, "POST", "/v1/sse/notify", None, Some(json!({ "type": "x" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn event_stream_delivers_and_unsubscribes_on_disconnect() {
    let state = make_state(PermissionSource::Role, 0).await;
    let user_id = register(&state, "a@x.com", false).await;
    let token = login(&state, "a@x.com").await;

    let req = Request::builder()
      .uri("/v1/sse/events")
      .header(header::AUTHORIZATION, format!("Bearer {token}"))
      .body(Body::empty())
      .unwrap();
    let resp = router(state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");
    assert_eq!(state.hub.subscriber_count(), 1);

    let mut body = resp.into_body().into_data_stream();
    let reader = tokio::spawn(async move { body.next().await.unwrap().unwrap() });

    // Rendezvous delivery only succeeds once the reader is parked.
    let hello = Notification::to_user(user_id.to_string(), "hello", json!({ "n": 1 }));
    let mut delivered = 0;
    for _ in 0..200 {
      delivered = state.hub.notify(&hello);
      if delivered == 1 {
        break;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(delivered, 1);

    let frame = tokio::time::timeout(Duration::from_secs(1), reader).await.unwrap().unwrap();
    let text = std::str::from_utf8(&frame).unwrap();
    assert!(text.starts_with("data: "), "{text}");
    assert!(text.contains(r#""type":"hello""#), "{text}");

    // The reader task owned the body; it is gone now.
    assert_eq!(state.hub.subscriber_count(), 0);
  }

  #[tokio::test]
  async fn event_stream_requires_a_token() {
    let state = make_state(PermissionSource::Role, 0).await;
    let (status, _) = call(&state, "GET", "/v1/sse/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(state.hub.subscriber_count(), 0);
  }
}
