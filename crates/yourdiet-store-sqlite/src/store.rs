//! [`SqliteStore`]: the SQLite implementation of [`Store`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{ErrorCode, OptionalExtension as _};
use uuid::Uuid;
use yourdiet_core::{
  diet::{Diet, NewDiet},
  store::{DietFilter, Store},
  user::{NewUser, User},
};

use crate::{
  Error, Result,
  encode::{
    DIET_COLUMNS, RawDiet, RawUser, USER_COLUMNS, encode_dt, encode_gender,
    encode_macro_targets, encode_meals, encode_role, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A yourdiet store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_user(&self, column: &'static str, value: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
              rusqlite::params![value],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
  )
}

// ─── Store impl ──────────────────────────────────────────────────────────────

impl Store for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<Option<User>> {
    let user = User {
      user_id:       Uuid::new_v4(),
      email:         input.email,
      password_hash: input.password_hash,
      role:          input.role,
      age:           input.age,
      gender:        input.gender,
      weight_kg:     input.weight_kg,
      height_cm:     input.height_cm,
      goal:          input.goal,
      macro_targets: input.macro_targets,
      created_at:    Utc::now(),
    };

    let id_str      = encode_uuid(user.user_id);
    let email       = user.email.clone();
    let hash        = user.password_hash.clone();
    let role_str    = encode_role(user.role);
    let age         = i64::from(user.age);
    let gender_str  = encode_gender(user.gender);
    let weight_kg   = user.weight_kg;
    let height_cm   = user.height_cm;
    let goal        = user.goal.clone();
    let macros_str  = user
      .macro_targets
      .as_ref()
      .map(encode_macro_targets)
      .transpose()?;
    let at_str      = encode_dt(user.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          &format!(
            "INSERT INTO users ({USER_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
          ),
          rusqlite::params![
            id_str, email, hash, role_str, age, gender_str,
            weight_kg, height_cm, goal, macros_str, at_str,
          ],
        );
        match result {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(inserted.then_some(user))
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    self.query_user("email", email.to_owned()).await
  }

  async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
    self.query_user("user_id", encode_uuid(id)).await
  }

  // ── Diets ─────────────────────────────────────────────────────────────────

  async fn create_diet(&self, input: NewDiet) -> Result<Diet> {
    let now = Utc::now();
    let diet = Diet {
      diet_id:          Uuid::new_v4(),
      user_email:       input.user_email,
      name:             input.name,
      duration_in_days: input.duration_in_days,
      status:           input.status,
      meals:            input.meals,
      observations:     input.observations,
      created_by:       input.created_by,
      version:          1,
      created_at:       now,
      updated_at:       now,
    };

    let id_str       = encode_uuid(diet.diet_id);
    let user_email   = diet.user_email.clone();
    let name         = diet.name.clone();
    let duration     = i64::from(diet.duration_in_days);
    let status_str   = encode_status(diet.status);
    let meals_str    = encode_meals(&diet.meals)?;
    let observations = diet.observations.clone();
    let creator_str  = encode_uuid(diet.created_by);
    let at_str       = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO diets ({DIET_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)"
          ),
          rusqlite::params![
            id_str, user_email, name, duration, status_str,
            meals_str, observations, creator_str, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(diet)
  }

  async fn get_diet(&self, id: Uuid) -> Result<Option<Diet>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDiet> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DIET_COLUMNS} FROM diets WHERE diet_id = ?1"),
              rusqlite::params![id_str],
              RawDiet::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDiet::into_diet).transpose()
  }

  async fn find_diets(&self, filter: &DietFilter) -> Result<Vec<Diet>> {
    let email_str   = filter.user_email.clone();
    let creator_str = filter.created_by.map(encode_uuid);

    let raws: Vec<RawDiet> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DIET_COLUMNS} FROM diets
           WHERE (?1 IS NULL OR user_email = ?1)
             AND (?2 IS NULL OR created_by = ?2)
           ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![email_str, creator_str], RawDiet::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDiet::into_diet).collect()
  }

  async fn update_diet(&self, diet: &Diet) -> Result<Option<Diet>> {
    let id_str       = encode_uuid(diet.diet_id);
    let creator_str  = encode_uuid(diet.created_by);
    let version      = i64::try_from(diet.version)
      .map_err(|_| Error::Decode(format!("version out of range: {}", diet.version)))?;
    let name         = diet.name.clone();
    let duration     = i64::from(diet.duration_in_days);
    let status_str   = encode_status(diet.status);
    let meals_str    = encode_meals(&diet.meals)?;
    let observations = diet.observations.clone();
    let at_str       = encode_dt(diet.updated_at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE diets
           SET name = ?1, duration_in_days = ?2, status = ?3, meals = ?4,
               observations = ?5, updated_at = ?6, version = version + 1
           WHERE diet_id = ?7 AND created_by = ?8 AND version = ?9",
          rusqlite::params![
            name, duration, status_str, meals_str, observations, at_str,
            id_str, creator_str, version,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }

    let mut stored = diet.clone();
    stored.version += 1;
    Ok(Some(stored))
  }
}
