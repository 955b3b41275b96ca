//! Test Helper Utilities
//!
//! Shared utilities for testing setlist-ingest

#![allow(dead_code)]

pub mod db_utils;
pub mod fault_store;

pub use db_utils::{create_test_db, seed_entry, test_state};
pub use fault_store::FlakyStore;
