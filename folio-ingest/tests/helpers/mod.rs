//! Test Helper Utilities
//!
//! Shared utilities for testing folio-ingest

#![allow(dead_code)]

pub mod db_utils;
pub mod records;

pub use db_utils::{count_rows, create_test_db, memory_pool, test_ingester};
pub use records::{agent, instance, moby_dick};
