// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password acquisition via TTY prompt or `BLUECON_PASSWORD`.

use bluecon_core::BlueconError;
use secrecy::SecretString;

pub const PASSWORD_ENV_VAR: &str = "BLUECON_PASSWORD";

/// Account password from the environment, else an interactive prompt.
pub fn get_password(username: &str) -> Result<SecretString, BlueconError> {
    if let Ok(password) = std::env::var(PASSWORD_ENV_VAR)
        && !password.is_empty()
    {
        return Ok(SecretString::from(password));
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("Password for {username}: ");
        let password = rpassword::read_password()
            .map_err(|e| BlueconError::Config(format!("failed to read password: {e}")))?;
        if password.is_empty() {
            return Err(BlueconError::Config("empty password not allowed".to_string()));
        }
        return Ok(SecretString::from(password));
    }

    Err(BlueconError::Config(format!(
        "no password provided. Set {PASSWORD_ENV_VAR} or run interactively."
    )))
}
