//! Command implementations.

pub mod items;
pub mod session;

use std::io::Write;

use serde::Serialize;
use thiserror::Error;

use itemdeck_client::api::ApiError;
use itemdeck_client::config::ConfigError;
use itemdeck_client::error::StoreError;
use itemdeck_client::state::AppState;
use itemdeck_core::{EmailError, User};

/// Errors that can end a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] ApiError),

    #[error("{0}")]
    Email(#[from] EmailError),

    #[error("Password is required")]
    MissingPassword,

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("Not logged in. Run `itemdeck login -e <email>` first.")]
    NotAuthenticated,

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Restore the persisted session before running a command.
///
/// A storage failure is logged and the command continues signed out.
pub async fn restore(state: &AppState) -> Option<User> {
    match state.session().restore_session().await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Could not restore session");
            None
        }
    }
}

/// The signed-in user, or `CliError::NotAuthenticated`.
pub fn require_user(state: &AppState) -> Result<User, CliError> {
    state.session().user().ok_or(CliError::NotAuthenticated)
}

/// Write `value` as pretty JSON to stdout.
pub fn write_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
