//! # Library Management Module
//!
//! Owns the catalog domain model and the repository layer used to persist it.
//!
//! ## Overview
//!
//! This module manages:
//! - Value objects ([`Genre`](models::Genre), [`Mood`](models::Mood)) and
//!   aggregates ([`Track`](models::Track), [`Album`](models::Album),
//!   [`Artist`](models::Artist), [`TrackPlayHistory`](models::TrackPlayHistory))
//! - Structural equality and hashing over a canonical dump of each aggregate
//! - The [`GenericRepository`](repositories::GenericRepository) contract and
//!   its SQLite implementations
//! - SQLite connection pooling and embedded migrations

pub mod canonical;
pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
