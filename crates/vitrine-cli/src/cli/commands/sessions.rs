//! Sign-in session management.

use anyhow::Result;

use crate::cli::App;
use crate::cli::output;

pub async fn list(app: &App) -> Result<()> {
    app.require_session().await?;
    let sessions = app.client().list_sessions().await?;
    output::sessions_table(&sessions);
    Ok(())
}

pub async fn revoke(app: &App, id: &str) -> Result<()> {
    app.require_session().await?;
    app.client().revoke_session(id).await?;
    println!("Revoked session {id}");
    Ok(())
}
