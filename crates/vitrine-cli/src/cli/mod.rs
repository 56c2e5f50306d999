//! CLI entry and dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use vitrine_core::config::{self, Config};
use vitrine_core::session::{FileBackend, SessionStore};
use vitrine_core::{ApiClient, AuthService, logging};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(version)]
#[command(about = "Storefront admin client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL (overrides config and VITRINE_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in as an admin or staff member
    Login {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
        /// Account password (read from stdin when omitted)
        #[arg(long, env = "VITRINE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and clear the stored session
    Logout {
        /// Revoke every session of this account, not only this one
        #[arg(long)]
        all_devices: bool,
    },
    /// Show the signed-in user
    Whoami,
    /// Manage products
    Products {
        #[command(subcommand)]
        command: ProductCommands,
    },
    /// List product categories
    Categories,
    /// List customer accounts
    Customers {
        /// Only accounts with this role
        #[arg(long, value_enum)]
        role: Option<commands::customers::RoleArg>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
    },
    /// Manage sign-in sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Upload product images and print their URLs
    Upload {
        /// Image files (png, jpg, webp, gif, avif)
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ProductCommands {
    /// List products
    List {
        /// Category ID
        #[arg(long)]
        category: Option<String>,
        /// Free-text search
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
    },
    /// Show one product
    Show {
        #[arg(value_name = "PRODUCT_ID")]
        id: String,
    },
    /// Create a product from a JSON file ("-" for stdin)
    Create {
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
    },
    /// Update a product with the fields in a JSON file ("-" for stdin)
    Update {
        #[arg(value_name = "PRODUCT_ID")]
        id: String,
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
    },
    /// Delete a product
    Delete {
        #[arg(value_name = "PRODUCT_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum SessionCommands {
    /// List active sessions of the signed-in account
    List,
    /// Revoke a session
    Revoke {
        #[arg(value_name = "SESSION_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

/// Everything a command needs to talk to the backend.
pub struct App {
    pub auth: AuthService,
}

impl App {
    fn new(config: &Config, base_url: Option<&str>) -> Result<Self> {
        let store = if config.persist_session {
            SessionStore::new(FileBackend::new(config::paths::session_path()))
        } else {
            SessionStore::in_memory()
        };

        let client = match base_url {
            Some(url) => ApiClient::new(
                &config::resolve_base_url(Some(url), Some(&config.base_url))?,
                config.request_timeout(),
                Arc::new(store),
            )?,
            None => ApiClient::from_config(config, Arc::new(store))?,
        };
        tracing::debug!(base_url = %client.base_url(), "Backend client ready");
        Ok(Self {
            auth: AuthService::new(client),
        })
    }

    pub fn client(&self) -> &ApiClient {
        self.auth.client()
    }

    /// Restores the stored session or fails with a sign-in hint.
    pub async fn require_session(&self) -> Result<()> {
        if self.auth.restore_session().await.is_none() {
            anyhow::bail!("Not signed in. Run `vitrine login` first.");
        }
        Ok(())
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init()?;

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load().context("load config")?;

    let Cli { command, base_url } = cli;

    if let Commands::Config { command } = &command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let app = App::new(&config, base_url.as_deref())?;

    match command {
        Commands::Login { email, password } => {
            commands::auth::login(&app, email, password).await
        }
        Commands::Logout { all_devices } => commands::auth::logout(&app, all_devices).await,
        Commands::Whoami => commands::auth::whoami(&app).await,

        Commands::Products { command } => match command {
            ProductCommands::List {
                category,
                search,
                limit,
                offset,
            } => {
                let query = vitrine_core::api::ProductQuery {
                    category,
                    search,
                    limit,
                    offset,
                };
                commands::products::list(&app, &query).await
            }
            ProductCommands::Show { id } => commands::products::show(&app, &id).await,
            ProductCommands::Create { file } => commands::products::create(&app, &file).await,
            ProductCommands::Update { id, file } => {
                commands::products::update(&app, &id, &file).await
            }
            ProductCommands::Delete { id } => commands::products::delete(&app, &id).await,
        },
        Commands::Categories => commands::products::categories(&app).await,

        Commands::Customers {
            role,
            limit,
            offset,
        } => commands::customers::list(&app, role, limit, offset).await,

        Commands::Sessions { command } => match command {
            SessionCommands::List => commands::sessions::list(&app).await,
            SessionCommands::Revoke { id } => commands::sessions::revoke(&app, &id).await,
        },

        Commands::Upload { files } => commands::upload::run(&app, &files).await,

        Commands::Config { .. } => Ok(()),
    }
}
