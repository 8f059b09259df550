//! Campus Hub Admin library.
//!
//! Keeps a campus's configuration, its dorm rows, and the clubs derived from
//! them consistent on every administrator save, over a document store with no
//! multi-document transactions.
//!
//! # Layers
//!
//! - [`store`] - Document and blob store ports with memory, `PostgreSQL`, and local-disk backends
//! - [`db`] - Repositories, including the dual-path campus resolver
//! - [`services`] - Club binding, reconciliation, the deletion gate, and edit sessions
//! - [`state`] - Shared backend handles built from [`config`]

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

pub use error::{ReconcileError, ReconcileStep, SessionError, ValidationError};
pub use state::AppState;
