//! Customer listing.

use anyhow::Result;
use vitrine_core::api::UserQuery;
use vitrine_core::session::Role;

use crate::cli::App;
use crate::cli::output;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum RoleArg {
    Admin,
    Staff,
    Customer,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Admin => Role::Admin,
            RoleArg::Staff => Role::Staff,
            RoleArg::Customer => Role::Customer,
        }
    }
}

pub async fn list(
    app: &App,
    role: Option<RoleArg>,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Result<()> {
    app.require_session().await?;
    let query = UserQuery {
        role: role.map(Role::from),
        limit,
        offset,
    };
    let users = app.client().list_users(&query).await?;
    output::users_table(&users);
    Ok(())
}
