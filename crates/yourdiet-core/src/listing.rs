//! Role-aware derivation of the diet listing filter.

use crate::{store::DietFilter, user::User};

/// What the caller asked to see.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
  /// Narrow a creator search to one patient.
  pub user_email:        Option<String>,
  /// List the diets the caller created instead of the caller's own diets.
  /// Only honoured for nutritionists.
  pub created_by_search: bool,
}

/// Build the storage filter for `caller` asking `query`.
///
/// A user always sees their own diets. A nutritionist running a creator
/// search sees the diets they created, optionally narrowed to one patient.
/// Anyone else asking for a creator search silently gets the default view.
pub fn diet_filter(caller: &User, query: &ListQuery) -> DietFilter {
  if query.created_by_search && caller.is_nutritionist() {
    return DietFilter {
      user_email: query
        .user_email
        .as_deref()
        .filter(|e| !e.is_empty())
        .map(str::to_owned),
      created_by: Some(caller.user_id),
    };
  }

  DietFilter {
    user_email: Some(caller.email.clone()),
    created_by: None,
  }
}
