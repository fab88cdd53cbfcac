//! Itemdeck client library.
//!
//! Session and catalog stores plus the collaborators they talk to: the
//! auth service, the posts API and session storage. Front ends (the
//! `itemdeck` CLI, tests) drive the stores and render their snapshots.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;
pub mod store;
