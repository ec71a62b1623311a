//! Agency portal server - Main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::sync::Arc;

use actix_web::middleware::from_fn;
use actix_web::{App, HttpServer, web};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use agency_portal_lib::api;
use agency_portal_lib::config::Config;
use agency_portal_lib::db::{self, DbPool};
use agency_portal_lib::middleware::log_requests;
use agency_portal_lib::services::{
    DualStoreSynchronizer, FieldCodec, HttpEnrichmentClient, HttpQuestionCatalog, LoggingNotifier,
    NotificationQueue,
};
use agency_portal_lib::store::{PersistenceContext, S3DocumentStore};

/// Maximum accepted step payload size (1 MB).
const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL, S3 credentials and field secrets must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Agency Portal Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let pool = match DbPool::new(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db::migrations::run_migrations(&pool).await {
        error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }
    info!("Database migrations complete");

    let documents = match S3DocumentStore::new(&config.s3).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to initialize document store: {}", e);
            std::process::exit(1);
        }
    };

    let codec = match FieldCodec::new(&config.field_protection) {
        Ok(codec) => codec,
        Err(e) => {
            error!("Failed to initialize field protection: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = PersistenceContext::relational(pool.clone(), Arc::new(documents), Arc::new(codec));
    let notifications = NotificationQueue::start(
        Arc::new(LoggingNotifier),
        config.external.notification_max_attempts,
    );

    let mut sync = DualStoreSynchronizer::new(ctx, &config.workflow, notifications);

    if let Some(ref url) = config.external.enrichment_url {
        match HttpEnrichmentClient::new(url) {
            Ok(client) => {
                info!("Business enrichment enabled ({})", url);
                sync = sync.with_enrichment(Arc::new(client));
            }
            Err(e) => warn!("Business enrichment disabled: {}", e),
        }
    }

    if let Some(ref url) = config.external.question_catalog_url {
        match HttpQuestionCatalog::new(url) {
            Ok(client) => {
                info!("Question catalog enabled ({})", url);
                sync = sync.with_question_catalog(Arc::new(client));
            }
            Err(e) => warn!("Question catalog disabled: {}", e),
        }
    }

    let bind_address = config.bind_address();
    let worker_count = if config.is_development() {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };

    let sync = web::Data::new(sync);
    let pool = web::Data::new(pool);

    HttpServer::new(move || {
        App::new()
            .wrap(from_fn(log_requests))
            .app_data(pool.clone())
            .app_data(sync.clone())
            .app_data(web::JsonConfig::default().limit(MAX_PAYLOAD_SIZE))
            .service(
                web::scope("/api/v1")
                    .configure(api::configure_health_routes)
                    .configure(api::configure_application_routes),
            )
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await
}
