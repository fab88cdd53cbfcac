//! Itemdeck Core - Shared domain types.
//!
//! This crate provides the types used across all Itemdeck components:
//! - `client` - Session and catalog stores plus their collaborators
//! - `cli` - Command-line front end driving the stores
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! This keeps it lightweight and lets front ends depend on it without
//! pulling in the async stack.
//!
//! # Modules
//!
//! - [`types`] - Users, items, session tokens, emails, prices and fetch statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
