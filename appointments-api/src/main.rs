use actix_web::{web, App, HttpServer};
use appointments_api::config::ApiConfig;
use appointments_api::integrations::ghl::GhlClient;
use appointments_api::{handlers, AppointmentGateway, Database};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long)]
    log_file_path: Option<String>,

    /// Config file to use instead of the platform default
    #[arg(long)]
    config: Option<PathBuf>,
}

fn default_db_path() -> std::io::Result<PathBuf> {
    let data_dir = dirs::data_local_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine local data directory",
        )
    })?;
    Ok(data_dir.join("ghl-appointments").join("appointments.db"))
}

fn other_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(log_path) = args.log_file_path {
        let log_path = std::path::Path::new(&log_path);
        let file_appender = tracing_appender::rolling::never(
            log_path.parent().unwrap_or(std::path::Path::new(".")),
            log_path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("ghl-appointments.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        tracing_subscriber::registry()
            .with(env_filter.clone())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(true)
                    .with_writer(std::io::stdout),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    // Load config
    let (config, config_path) =
        ApiConfig::load(args.config.as_deref()).map_err(|e| other_error("Failed to load config", e))?;
    tracing::info!("Loaded config from {}", config_path.display());

    if let Err(missing) = config.ghl.credentials() {
        tracing::warn!("{}; appointment actions will fail until it is set", missing);
    }

    // Initialize database
    let db_path = match config.database.as_ref().and_then(|d| d.path.clone()) {
        Some(path) => path,
        None => default_db_path()?,
    };
    let db = Arc::new(
        Database::open(&db_path).map_err(|e| other_error("Failed to initialize database", e))?,
    );
    tracing::info!("Database initialized at: {}", db_path.display());

    let remote = GhlClient::new(&config.ghl).map_err(|e| other_error("Failed to build GHL client", e))?;
    let gateway = web::Data::new(AppointmentGateway::new(
        db.async_connection.clone(),
        Arc::new(remote),
        config.ghl.clone(),
        config.sync.clone(),
    ));

    // Spawn periodic sync task
    if let Some(interval_secs) = config.sync.interval_secs.filter(|secs| *secs > 0) {
        let sync_gateway = gateway.clone().into_inner();
        tracing::info!("Periodic GHL sync every {} seconds", interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                if let Err(e) = sync_gateway.sync().await {
                    tracing::error!("Periodic sync failed: {}", e);
                }
            }
        });
    }

    let (host, port) = config.server_address();
    tracing::info!("Server will listen on {}:{}", host, port);

    let db_data = web::Data::new(db.clone());
    let server = HttpServer::new(move || {
        App::new()
            .wrap(handlers::cors())
            .wrap(handlers::cors_headers())
            .app_data(db_data.clone())
            .app_data(gateway.clone())
            .configure(handlers::configure)
    })
    .bind((host.as_str(), port))?
    .run();

    let handle = server.handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }

        tracing::info!("Ctrl+C received, shutting down...");
        handle.stop(true).await;
    });

    server.await
}
