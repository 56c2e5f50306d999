//! Sign-in, sign-out, and identity commands.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use crate::cli::App;

pub async fn login(app: &App, email: Option<String>, password: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    if email.is_empty() || password.is_empty() {
        anyhow::bail!("Email and password are required");
    }

    let user = app.auth.login(&email, &password).await?;
    println!("Signed in as {} ({})", user.display_name(), user.role);
    Ok(())
}

pub async fn logout(app: &App, all_devices: bool) -> Result<()> {
    let had_session = match app.client().store().restore() {
        Ok(session) => session.is_some(),
        Err(err) => {
            tracing::warn!("Could not read stored session: {err:#}");
            true
        }
    };

    app.auth.logout(all_devices).await?;

    if had_session {
        println!("Signed out");
    } else {
        println!("Not signed in");
    }
    Ok(())
}

pub async fn whoami(app: &App) -> Result<()> {
    app.require_session().await?;
    let Some(user) = app.auth.current_user() else {
        anyhow::bail!("Not signed in. Run `vitrine login` first.");
    };

    println!("{}", user.display_name());
    println!("email: {}", user.email);
    println!("role:  {}", user.role);
    Ok(())
}

/// Reads one trimmed line from stdin, printing the prompt to stderr.
fn prompt(label: &str) -> Result<String> {
    eprint!("{label}");
    io::stderr().flush().ok();

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read from stdin")?;
    Ok(line.trim().to_string())
}
