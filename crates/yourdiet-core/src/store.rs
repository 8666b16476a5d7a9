//! The `Store` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `yourdiet-store-sqlite`).
//! Higher layers (`yourdiet-api`) depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  diet::{Diet, NewDiet},
  user::{NewUser, User},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`Store::find_diets`]. `None` fields do not constrain the
/// query; set fields are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DietFilter {
  pub user_email: Option<String>,
  pub created_by: Option<Uuid>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a yourdiet storage backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait Store: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user. `None` if the email is already registered; the
  /// check and the insert are one atomic step.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn find_user_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Diets ─────────────────────────────────────────────────────────────

  /// Persist a new diet at version 1. `created_at` and `updated_at` are set
  /// by the store.
  fn create_diet(
    &self,
    input: NewDiet,
  ) -> impl Future<Output = Result<Diet, Self::Error>> + Send + '_;

  fn get_diet(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Diet>, Self::Error>> + Send + '_;

  /// Diets matching `filter`, in insertion order.
  fn find_diets<'a>(
    &'a self,
    filter: &'a DietFilter,
  ) -> impl Future<Output = Result<Vec<Diet>, Self::Error>> + Send + 'a;

  /// Write the mutable fields of `diet` back, guarded on its id, creator and
  /// version. On success the stored row is at `diet.version + 1` and that row
  /// is returned; `None` means the guard did not match (the diet is gone, or
  /// someone else updated it first).
  fn update_diet<'a>(
    &'a self,
    diet: &'a Diet,
  ) -> impl Future<Output = Result<Option<Diet>, Self::Error>> + Send + 'a;
}
