//! Session commands.
//!
//! # Usage
//!
//! ```bash
//! # Log in (prompts for the password on stdin when -p is omitted)
//! itemdeck login -e test@example.com -p password123
//!
//! # Show the current session
//! itemdeck session
//!
//! # Log out
//! itemdeck logout
//! ```

use std::io::{BufRead, Write};

use secrecy::SecretString;

use itemdeck_client::state::AppState;
use itemdeck_core::Email;

use super::{CliError, write_json};

/// Log in with an email and password.
pub async fn login(
    state: &AppState,
    email: &str,
    password: Option<String>,
) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };
    if password.is_empty() {
        return Err(CliError::MissingPassword);
    }

    let user = state
        .session()
        .login(email.as_str(), &SecretString::from(password))
        .await?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "Logged in as {} <{}>", user.display_name(), user.email)?;
    Ok(())
}

/// Log out and clear the persisted session.
pub async fn logout(state: &AppState) -> Result<(), CliError> {
    state.session().logout().await?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "Logged out")?;
    Ok(())
}

/// Print the current session.
pub fn show(state: &AppState, json: bool) -> Result<(), CliError> {
    let snapshot = state.session().snapshot();
    if json {
        return write_json(&snapshot);
    }

    let mut out = std::io::stdout().lock();
    match &snapshot.user {
        Some(user) => writeln!(
            out,
            "Logged in as {} <{}> (id {})",
            user.display_name(),
            user.email,
            user.id
        )?,
        None => writeln!(out, "Not logged in")?,
    }
    if let Some(error) = &snapshot.error {
        writeln!(out, "Last error: {error}")?;
    }
    Ok(())
}

fn read_password() -> Result<String, CliError> {
    {
        let mut out = std::io::stdout().lock();
        write!(out, "Password: ")?;
        out.flush()?;
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
