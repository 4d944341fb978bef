//! Directiva Agrícola server binary
//!
//! Multi-tenant membership management for agricultural organizations.
//! Each empresa owns an isolated SQLite datastore selected per request
//! from the authenticated session; logins enforce a single active
//! session per user.
//!
//! Usage:
//! ```bash
//! # With config file
//! directiva-server serve --config config.yaml
//!
//! # Create a user in the control database
//! directiva-server add-user --username tesorero --password 'semilla-maiz-2024'
//!
//! # One-shot expired-session sweep
//! directiva-server purge-sessions
//! ```

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use directiva_server::app::{AppState, build_router};
use directiva_server::config::{DEFAULT_CONFIG_PATH, ServerConfig};
use directiva_server::users::UserStore;
use directiva_session::SessionStore;
use directiva_session::cleanup::{purge_expired, spawn_cleanup_task};
use directiva_session_sqlite::SqliteSessionStore;
use directiva_tenancy::TenantRegistry;

const BANNER: &str = r#"
  ____  _               _   _
 |  _ \(_)_ __ ___  ___| |_(_)_   ____ _
 | | | | | '__/ _ \/ __| __| \ \ / / _` |
 | |_| | | | |  __/ (__| |_| |\ V / (_| |
 |____/|_|_|  \___|\___|\__|_| \_/ \__,_|

  Directiva Agrícola  version : {VERSION}
"#;

/// Directiva Agrícola - multi-tenant membership management
#[derive(Parser)]
#[command(name = "directiva-server")]
#[command(about = "Directiva Agrícola server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "DIRECTIVA_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        global = true
    )]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server (default if no command specified)
    Serve,
    /// Create a user in the control database
    AddUser {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        /// Create the account disabled
        #[arg(long, default_value = "false")]
        inactive: bool,
    },
    /// Delete expired session records and exit
    PurgeSessions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::load(&cli.config)?;
    init_tracing(&config.logging.level);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::AddUser {
            username,
            password,
            inactive,
        } => add_user(config, &username, &password, !inactive).await,
        Commands::PurgeSessions => purge_sessions(config).await,
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    // A second init (tests, nested invocation) is not fatal.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    println!(
        "{}",
        BANNER.replace("{VERSION}", env!("CARGO_PKG_VERSION"))
    );

    let state = build_state(&config).await?;

    spawn_cleanup_task(
        state.session_store.clone(),
        std::time::Duration::from_secs(config.session.cleanup_interval_secs),
    );

    let addr = config.bind_addr();
    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "directiva-server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn add_user(
    config: ServerConfig,
    username: &str,
    password: &str,
    is_active: bool,
) -> anyhow::Result<()> {
    let state = build_state(&config).await?;
    let id = state.users.create_user(username, password, is_active).await?;
    println!("created user {} (id {})", username, id);
    Ok(())
}

async fn purge_sessions(config: ServerConfig) -> anyhow::Result<()> {
    let store = SqliteSessionStore::new(&config.session_store_path()).await?;
    let deleted = purge_expired(&store).await?;
    println!("deleted {} expired sessions", deleted);
    Ok(())
}

async fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let session_store: Arc<dyn SessionStore> =
        Arc::new(SqliteSessionStore::new(&config.session_store_path()).await?);
    let registry = Arc::new(
        TenantRegistry::open(config.control_descriptor(), config.data_dir()).await?,
    );

    let users = UserStore::new(registry.default_handle().pool.clone());
    users.ensure_schema().await?;

    Ok(AppState {
        config: Arc::new(config.clone()),
        session_store,
        registry,
        users: Arc::new(users),
    })
}
