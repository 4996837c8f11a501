use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::auth::{generate_jwt, Claims};
use crate::clock::LocalClock;
use crate::config::AppConfig;
use crate::database::Database;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "coleta-api")]
#[command(about = "Coleta API - parcel collection log with daily protocol closing")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overrides COLETA_API_PORT")]
        port: Option<u16>,
    },

    #[command(about = "Apply database migrations and exit")]
    Migrate,

    #[command(about = "Mint an operator bearer token signed with JWT_SECRET")]
    Token {
        #[arg(long, help = "Operator name stored as the token subject")]
        subject: String,
        #[arg(long, help = "Hours until expiry, defaults to the configured expiry")]
        hours: Option<u64>,
    },
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Migrate => {
            let db = Database::connect(&config.database).await?;
            db.migrate().await?;
            db.close().await;
            Ok(())
        }
        Commands::Token { subject, hours } => {
            let secret = config
                .security
                .jwt_secret
                .as_deref()
                .context("JWT_SECRET must be set to mint tokens")?;
            let hours = hours.unwrap_or(config.security.jwt_expiry_hours);
            let token = generate_jwt(&Claims::new(subject.trim(), hours), secret)?;
            println!("{}", token);
            Ok(())
        }
    }
}

async fn serve(mut config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.api.port = port;
    }

    let clock = LocalClock::from_name(&config.coleta.timezone)?;
    let db = Database::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    if config.database.run_migrations {
        db.migrate().await?;
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!(
        "Coleta API listening on http://{} (timezone {})",
        bind_addr,
        clock.timezone()
    );

    let app = crate::app(AppState::new(db.clone(), config, clock));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
