//! Lodge Core - Shared types library.
//!
//! This crate provides the domain types used across all Lodge components:
//! - `site` - The public booking site and the staff admin console
//! - `cli` - Command-line tools for migrations, seeding and staff accounts
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, stay ranges and lookup enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
