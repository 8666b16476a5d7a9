//! SQL schema for the yourdiet SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id        TEXT PRIMARY KEY,
    email          TEXT NOT NULL UNIQUE,
    password_hash  TEXT NOT NULL,
    role           TEXT NOT NULL,   -- 'DEFAULT' | 'NUTRITIONIST'
    age            INTEGER NOT NULL,
    gender         TEXT NOT NULL,   -- 'male' | 'female' | 'other'
    weight_kg      REAL,
    height_cm      REAL,
    goal           TEXT,
    macro_targets  TEXT,            -- JSON-encoded MacroTargets or NULL
    created_at     TEXT NOT NULL
);

-- Meals are stored as one JSON document per diet; the tree is always read
-- and replaced as a whole.
CREATE TABLE IF NOT EXISTS diets (
    diet_id          TEXT PRIMARY KEY,
    user_email       TEXT NOT NULL,
    name             TEXT NOT NULL,
    duration_in_days INTEGER NOT NULL,
    status           TEXT NOT NULL,   -- 'ENABLED' | 'DISABLED'
    meals            TEXT NOT NULL,
    observations     TEXT NOT NULL DEFAULT '',
    created_by       TEXT NOT NULL,
    version          INTEGER NOT NULL DEFAULT 1,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS diets_user_email_idx ON diets(user_email);
CREATE INDEX IF NOT EXISTS diets_created_by_idx ON diets(created_by);

PRAGMA user_version = 1;
";
