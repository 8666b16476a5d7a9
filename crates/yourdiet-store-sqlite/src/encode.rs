//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Structured fields (meals,
//! macro targets) are stored as compact JSON. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use yourdiet_core::{
  diet::{Diet, DietStatus, Meal},
  permission::Role,
  user::{Gender, MacroTargets, User},
};

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── Role / Gender ───────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str { r.as_str() }

pub fn decode_role(s: &str) -> Result<Role> { Ok(s.parse()?) }

pub fn encode_gender(g: Gender) -> &'static str { g.as_str() }

pub fn decode_gender(s: &str) -> Result<Gender> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown gender: {s:?}")))
}

// ─── DietStatus ──────────────────────────────────────────────────────────────

pub fn encode_status(s: DietStatus) -> &'static str {
  match s {
    DietStatus::Enabled => "ENABLED",
    DietStatus::Disabled => "DISABLED",
  }
}

pub fn decode_status(s: &str) -> Result<DietStatus> {
  match s {
    "ENABLED" => Ok(DietStatus::Enabled),
    "DISABLED" => Ok(DietStatus::Disabled),
    other => Err(Error::Decode(format!("unknown diet status: {other:?}"))),
  }
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_meals(meals: &[Meal]) -> Result<String> {
  Ok(serde_json::to_string(meals)?)
}

pub fn decode_meals(s: &str) -> Result<Vec<Meal>> { Ok(serde_json::from_str(s)?) }

pub fn encode_macro_targets(m: &MacroTargets) -> Result<String> {
  Ok(serde_json::to_string(m)?)
}

pub fn decode_macro_targets(s: &str) -> Result<MacroTargets> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, email, password_hash, role, age, gender, \
                                weight_kg, height_cm, goal, macro_targets, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub email:         String,
  pub password_hash: String,
  pub role:          String,
  pub age:           i64,
  pub gender:        String,
  pub weight_kg:     Option<f64>,
  pub height_cm:     Option<f64>,
  pub goal:          Option<String>,
  pub macro_targets: Option<String>,
  pub created_at:    String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawUser {
      user_id:       row.get(0)?,
      email:         row.get(1)?,
      password_hash: row.get(2)?,
      role:          row.get(3)?,
      age:           row.get(4)?,
      gender:        row.get(5)?,
      weight_kg:     row.get(6)?,
      height_cm:     row.get(7)?,
      goal:          row.get(8)?,
      macro_targets: row.get(9)?,
      created_at:    row.get(10)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       decode_uuid(&self.user_id)?,
      email:         self.email,
      password_hash: self.password_hash,
      role:          decode_role(&self.role)?,
      age:           u32::try_from(self.age)
        .map_err(|_| Error::Decode(format!("age out of range: {}", self.age)))?,
      gender:        decode_gender(&self.gender)?,
      weight_kg:     self.weight_kg,
      height_cm:     self.height_cm,
      goal:          self.goal,
      macro_targets: self
        .macro_targets
        .as_deref()
        .map(decode_macro_targets)
        .transpose()?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const DIET_COLUMNS: &str = "diet_id, user_email, name, duration_in_days, status, meals, \
                                observations, created_by, version, created_at, updated_at";

/// Raw values read directly from a `diets` row.
pub struct RawDiet {
  pub diet_id:          String,
  pub user_email:       String,
  pub name:             String,
  pub duration_in_days: i64,
  pub status:           String,
  pub meals:            String,
  pub observations:     String,
  pub created_by:       String,
  pub version:          i64,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawDiet {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawDiet {
      diet_id:          row.get(0)?,
      user_email:       row.get(1)?,
      name:             row.get(2)?,
      duration_in_days: row.get(3)?,
      status:           row.get(4)?,
      meals:            row.get(5)?,
      observations:     row.get(6)?,
      created_by:       row.get(7)?,
      version:          row.get(8)?,
      created_at:       row.get(9)?,
      updated_at:       row.get(10)?,
    })
  }

  pub fn into_diet(self) -> Result<Diet> {
    Ok(Diet {
      diet_id:          decode_uuid(&self.diet_id)?,
      user_email:       self.user_email,
      name:             self.name,
      duration_in_days: u32::try_from(self.duration_in_days).map_err(|_| {
        Error::Decode(format!("duration out of range: {}", self.duration_in_days))
      })?,
      status:           decode_status(&self.status)?,
      meals:            decode_meals(&self.meals)?,
      observations:     self.observations,
      created_by:       decode_uuid(&self.created_by)?,
      version:          u64::try_from(self.version)
        .map_err(|_| Error::Decode(format!("version out of range: {}", self.version)))?,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}
