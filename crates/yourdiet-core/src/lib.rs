//! Core types and rules for the yourdiet backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the domain model, the permission catalog, the diet merge and listing rules,
//! input validation, and the [`store::Store`] abstraction that storage
//! backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod diet;
pub mod error;
pub mod listing;
pub mod merge;
pub mod permission;
pub mod store;
pub mod user;
pub mod validate;

pub use error::{Error, Result};
