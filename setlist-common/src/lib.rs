//! # Setlist Common Library
//!
//! Shared code for the setlist services including:
//! - Error types
//! - Bootstrap configuration loading
//! - Database initialization, schema and settings access
//! - Tracklist and catalog record types
//! - Text normalization and time-code helpers

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod text;
pub mod time;

pub use error::{Error, Result};
pub use models::{CanonicalTrackEntry, EntryUpdate, NewTrackEntry, SourceTag};
