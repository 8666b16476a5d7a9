//! Users: the identity records that own credentials and a role.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, permission::Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
  Male,
  Female,
  Other,
}

impl Gender {
  pub fn as_str(self) -> &'static str {
    match self {
      Gender::Male => "male",
      Gender::Female => "female",
      Gender::Other => "other",
    }
  }
}

impl fmt::Display for Gender {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Gender {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "male" => Ok(Gender::Male),
      "female" => Ok(Gender::Female),
      "other" => Ok(Gender::Other),
      _ => Err(Error::validation("gender", "gender must be one of male, female, other")),
    }
  }
}

/// Daily macro-nutrient targets. Every component is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
  pub calories_kcal: Option<f64>,
  pub protein_g:     Option<f64>,
  pub carbs_g:       Option<f64>,
  pub fat_g:         Option<f64>,
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:       Uuid,
  pub email:         String,
  /// argon2 PHC string. Never sent to clients.
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub role:          Role,
  pub age:           u32,
  pub gender:        Gender,
  pub weight_kg:     Option<f64>,
  pub height_cm:     Option<f64>,
  pub goal:          Option<String>,
  pub macro_targets: Option<MacroTargets>,
  pub created_at:    DateTime<Utc>,
}

impl User {
  pub fn is_nutritionist(&self) -> bool { self.role == Role::Nutritionist }
}

/// Input to [`Store::create_user`](crate::store::Store::create_user). The
/// store assigns `user_id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:         String,
  pub password_hash: String,
  pub role:          Role,
  pub age:           u32,
  pub gender:        Gender,
  pub weight_kg:     Option<f64>,
  pub height_cm:     Option<f64>,
  pub goal:          Option<String>,
  pub macro_targets: Option<MacroTargets>,
}
