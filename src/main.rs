use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use videohub::auth::session::create_session;
use videohub::config::{Cli, Command, Config};
use videohub::db::models::Role;
use videohub::media::LocalObjectStore;
use videohub::state::AppState;
use videohub::store::SqliteStore;
use videohub::{db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Ensure uploads directory exists
    std::fs::create_dir_all(config.uploads_path())?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let store = Arc::new(SqliteStore::new(pool.clone()));
    let media = Arc::new(LocalObjectStore::new(
        config.uploads_path(),
        config.storage.public_base_url.clone(),
    ));
    let state = AppState::new(pool, config.clone(), store, media);

    match cli.command.unwrap_or(Command::Serve) {
        Command::CreateUser { name, role } => {
            let role: Role = role.parse().map_err(anyhow::Error::msg)?;
            let profile = state.profiles.create(&name, role).await?;
            let token = create_session(&state.db, &profile.id, config.auth.session_hours)?;
            println!("user_id={}", profile.id);
            println!("token={}", token);
            Ok(())
        }
        Command::Serve => serve(state, &config).await,
    }
}

async fn serve(state: AppState, config: &Config) -> anyhow::Result<()> {
    let app = routes::app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
