//! Diet update reconciliation.
//!
//! A patch is merged field by field with a replace-if-present policy: a value
//! only overwrites the stored one when it is non-empty (or non-zero) and
//! different. As a consequence a field cannot be cleared through an update.
//! The meal list is all-or-nothing: a non-empty proposed list replaces the
//! stored one wholesale.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::diet::{Diet, DietPatch};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
  /// The caller did not create the diet.
  #[error("user {caller} is not allowed to update diet {diet_id}")]
  NotOwner { caller: Uuid, diet_id: Uuid },

  #[error("diet {diet_id} is at version {actual}, update expected {expected}")]
  VersionMismatch { diet_id: Uuid, expected: u64, actual: u64 },
}

/// Compute the merged state of `existing` under `patch`, stamped at `now`.
///
/// `existing` is never modified; on error nothing has changed.
pub fn merge(
  existing: &Diet,
  patch: &DietPatch,
  now: DateTime<Utc>,
) -> Result<Diet, MergeError> {
  if patch.created_by != existing.created_by {
    return Err(MergeError::NotOwner {
      caller:  patch.created_by,
      diet_id: existing.diet_id,
    });
  }

  if let Some(expected) = patch.expected_version
    && expected != existing.version
  {
    return Err(MergeError::VersionMismatch {
      diet_id: existing.diet_id,
      expected,
      actual: existing.version,
    });
  }

  let mut merged = existing.clone();

  if let Some(name) = non_empty(&patch.name)
    && name != merged.name
  {
    merged.name = name.to_owned();
  }

  if let Some(days) = patch.duration_in_days.filter(|d| *d != 0) {
    merged.duration_in_days = days;
  }

  if let Some(status) = patch.status {
    merged.status = status;
  }

  if let Some(meals) = patch.meals.as_ref().filter(|m| !m.is_empty()) {
    merged.meals = meals.clone();
  }

  if let Some(observations) = non_empty(&patch.observations)
    && observations != merged.observations
  {
    merged.observations = observations.to_owned();
  }

  merged.updated_at = now;
  Ok(merged)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().filter(|s| !s.is_empty())
}
