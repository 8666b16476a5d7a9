//! Diets: the owned aggregate at the centre of the system.
//!
//! A diet strictly owns its meals, a meal strictly owns its ingredients, and
//! an ingredient strictly owns its substitutes. The structure is a tree of
//! plain owned values; there is no sharing and no way to form a cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DietStatus {
  #[default]
  Enabled,
  Disabled,
}

/// The time-of-day slot a meal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealTime {
  Breakfast,
  MorningSnack,
  Lunch,
  AfternoonSnack,
  Dinner,
  Supper,
}

/// Unit of measure for an ingredient quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
  Gram,
  Kilogram,
  Milliliter,
  Liter,
  Unit,
  Slice,
  Cup,
  Tablespoon,
  Teaspoon,
  Scoop,
}

// ─── Tree ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
  pub description: String,
  pub quantity:    f64,
  pub unit:        Unit,
  /// Alternatives to this ingredient; same shape, any depth.
  #[serde(default)]
  pub substitutes: Vec<Ingredient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
  pub name:        String,
  #[serde(default)]
  pub description: String,
  pub time:        MealTime,
  pub ingredients: Vec<Ingredient>,
}

// ─── Diet ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diet {
  pub diet_id:          Uuid,
  /// Email of the patient this diet was prescribed for.
  pub user_email:       String,
  pub name:             String,
  pub duration_in_days: u32,
  pub status:           DietStatus,
  pub meals:            Vec<Meal>,
  pub observations:     String,
  /// The user who created the diet. Fixed for the diet's lifetime.
  pub created_by:       Uuid,
  /// Starts at 1; the store bumps it on every successful update.
  pub version:          u64,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

/// Input to [`Store::create_diet`](crate::store::Store::create_diet).
#[derive(Debug, Clone)]
pub struct NewDiet {
  pub user_email:       String,
  pub name:             String,
  pub duration_in_days: u32,
  pub status:           DietStatus,
  pub meals:            Vec<Meal>,
  pub observations:     String,
  pub created_by:       Uuid,
}

/// A proposed partial update to a diet, reconciled by
/// [`merge`](crate::merge::merge).
#[derive(Debug, Clone, Default)]
pub struct DietPatch {
  /// The user proposing the change.
  pub created_by:       Uuid,
  pub name:             Option<String>,
  pub duration_in_days: Option<u32>,
  pub status:           Option<DietStatus>,
  pub meals:            Option<Vec<Meal>>,
  pub observations:     Option<String>,
  /// If set, the update only applies to this version of the diet.
  pub expected_version: Option<u64>,
}
