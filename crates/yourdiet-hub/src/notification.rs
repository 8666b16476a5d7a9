use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A discrete event, targeted at one user or broadcast to everyone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  #[serde(rename = "type")]
  pub kind:    String,
  /// Opaque to the hub.
  #[serde(default)]
  pub payload: Value,
  /// Target user. Absent or empty means broadcast.
  #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
}

impl Notification {
  pub fn broadcast(kind: impl Into<String>, payload: Value) -> Self {
    Self { kind: kind.into(), payload, user_id: None }
  }

  pub fn to_user(user_id: impl Into<String>, kind: impl Into<String>, payload: Value) -> Self {
    Self { kind: kind.into(), payload, user_id: Some(user_id.into()) }
  }

  /// The target user, or `None` for a broadcast.
  pub fn target(&self) -> Option<&str> {
    self.user_id.as_deref().filter(|id| !id.is_empty())
  }

  /// Whether a subscriber belonging to `user_id` should receive this.
  pub fn is_for(&self, user_id: &str) -> bool {
    self.target().is_none_or(|target| target == user_id)
  }
}
