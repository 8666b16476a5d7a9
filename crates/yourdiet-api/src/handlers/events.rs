//! Server-sent event stream and the publish endpoint that feeds it.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/v1/sse/events` | One subscriber per open stream |
//! | `POST` | `/v1/sse/notify` | Body: a notification; 204 |

use std::convert::Infallible;

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::{
    IntoResponse,
    sse::{Event, KeepAlive, Sse},
  },
};
use futures::StreamExt as _;
use yourdiet_core::store::Store;
use yourdiet_hub::Notification;

use crate::{AppState, auth::Authenticated, error::ApiError};

/// `GET /v1/sse/events`
///
/// The subscription lives inside the response stream. When the client goes
/// away axum drops the stream and the subscription unregisters itself.
pub async fn stream<S>(State(state): State<AppState<S>>, auth: Authenticated) -> impl IntoResponse
where
  S: Store + Clone + 'static,
{
  let subscription = state.hub.subscribe(auth.user_id().to_string());
  tracing::info!(
    subscriber = %subscription.id(),
    user = %auth.user_id(),
    "event stream opened"
  );

  let events = subscription
    .into_stream()
    .map(|notification| Ok::<_, Infallible>(to_event(&notification)));

  (
    [("x-accel-buffering", "no")],
    Sse::new(events).keep_alive(KeepAlive::default()),
  )
}

fn to_event(notification: &Notification) -> Event {
  match Event::default().json_data(notification) {
    Ok(event) => event,
    Err(e) => {
      tracing::warn!(error = %e, kind = %notification.kind, "notification not serialisable");
      Event::default().comment("dropped unserialisable notification")
    }
  }
}

/// `POST /v1/sse/notify`
pub async fn publish<S>(
  State(state): State<AppState<S>>,
  auth: Authenticated,
  payload: Result<Json<Notification>, JsonRejection>,
) -> Result<StatusCode, ApiError>
where
  S: Store + Clone + 'static,
{
  let Json(notification) = payload?;
  if notification.kind.trim().is_empty() {
    return Err(ApiError::validation("type", "notification type is required"));
  }

  let delivered = state.hub.notify(&notification);
  tracing::info!(
    sender = %auth.user_id(),
    kind = %notification.kind,
    target = notification.target().unwrap_or("*"),
    delivered,
    "notification published"
  );
  Ok(StatusCode::NO_CONTENT)
}
