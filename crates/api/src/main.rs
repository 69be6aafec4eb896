use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unwritten_api::config::ServerConfig;
use unwritten_api::router::build_app_router;
use unwritten_api::state::AppState;
use unwritten_cloud::{ArtifactConfig, HttpPhotoFetcher, SupabaseConfig, SupabaseEntryStore};
use unwritten_core::format::FormatCatalog;
use unwritten_core::ports::OrderStore;
use unwritten_db::{MemoryOrderStore, PgOrderStore};
use unwritten_events::{EmailConfig, EmailDelivery, EventBus, NotificationRouter};
use unwritten_pipeline::{OrderCoordinator, PipelineConfig, Services};
use unwritten_print::{RpiClient, RpiConfig, SubmissionThrottle, ThrottledProvider};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "unwritten_api=debug,unwritten_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let pipeline_config = PipelineConfig::from_env().expect("Invalid pipeline configuration");
    let rpi_config = RpiConfig::from_env().expect("Invalid print provider configuration");
    let supabase_config = SupabaseConfig::from_env().expect("Invalid Supabase configuration");
    let artifact_config = ArtifactConfig::from_env().expect("Invalid artifact configuration");

    // --- Order store ---
    let (orders, pool) = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = unwritten_db::create_pool(&database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            unwritten_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            unwritten_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let store: Arc<dyn OrderStore> = Arc::new(PgOrderStore::new(pool.clone()));
            (store, Some(pool))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory only");
            let store: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
            (store, None)
        }
    };

    // --- External services ---
    let entries = Arc::new(SupabaseEntryStore::new(supabase_config));
    let artifacts = unwritten_cloud::artifacts::from_config(&artifact_config).await;
    let photos = Arc::new(HttpPhotoFetcher::new().expect("Failed to build photo HTTP client"));

    let throttle = Arc::new(SubmissionThrottle::from_config(&rpi_config));
    let rpi = RpiClient::new(&rpi_config).expect("Failed to build print provider client");
    let provider = Arc::new(ThrottledProvider::new(Arc::new(rpi), Arc::clone(&throttle)));
    tracing::info!(
        daily_limit = rpi_config.daily_order_limit,
        max_backlog = rpi_config.max_backlog,
        "Print provider client ready"
    );

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    // Spawn notification router (emails customers on shipment and failure).
    let notification_handle = match EmailConfig::from_env() {
        Some(email_config) => {
            let delivery = EmailDelivery::new(email_config).expect("Invalid SMTP configuration");
            let router = NotificationRouter::new(Arc::new(delivery), config.support_email.clone());
            Some(tokio::spawn(router.run(event_bus.subscribe())))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, customer emails are disabled");
            None
        }
    };

    // --- Order coordinator ---
    let coordinator = Arc::new(OrderCoordinator::new(
        Services {
            entries,
            orders,
            artifacts,
            photos,
            provider,
            events: Arc::clone(&event_bus),
            catalog: Arc::new(FormatCatalog::default()),
        },
        pipeline_config,
    ));

    // Expiry and recovery sweeps. The first sweep resumes orders left
    // mid-pipeline by a previous run.
    let sweeper_cancel = CancellationToken::new();
    let sweeper_handle = tokio::spawn(
        Arc::clone(&coordinator).run_sweepers(sweeper_cancel.clone()),
    );

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        coordinator: Arc::clone(&coordinator),
        pool,
        throttle: Some(throttle),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST:PORT combination");

    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweeper_cancel.cancel();
    coordinator.shutdown();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    let _ = tokio::time::timeout(drain, sweeper_handle).await;

    // Closing the bus ends the notification router once in-flight runs
    // have released the coordinator.
    drop(coordinator);
    drop(event_bus);
    if let Some(handle) = notification_handle {
        let _ = tokio::time::timeout(drain, handle).await;
    }

    tracing::info!("Shutdown complete");
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
