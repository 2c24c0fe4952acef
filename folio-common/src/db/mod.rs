//! Database initialization and catalog schema

pub mod init;

pub use init::*;
