//! Campus Hub Core - Shared types library.
//!
//! This crate provides common types used across all Campus Hub components:
//! - `admin` - Campus configuration reconciliation over the document store
//! - `cli` - Command-line tools for migrations and reconciliation runs
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no store access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed document IDs, emails, membership statuses, and pending identities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
