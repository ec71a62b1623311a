//! Liveness and readiness of the portal server.

use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use serde::Serialize;
use tracing::warn;

use crate::db::DbPool;

const SERVICE_NAME: &str = "agency-portal";

/// Readiness query: the applications table must answer, which also proves
/// migrations have run.
const READINESS_QUERY: &str = "SELECT 1 FROM applications LIMIT 1";

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
}

/// Readiness of the stores behind a step save.
#[derive(Serialize)]
pub struct ReadyResponse {
    status: &'static str,
    /// Authoritative store; a save cannot succeed without it.
    relational_store: &'static str,
    /// Not checked: document writes are best-effort.
    document_store: &'static str,
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// 200 once the relational store can serve application rows, 503 otherwise.
#[get("/ready")]
pub async fn ready(pool: web::Data<DbPool>) -> HttpResponse {
    let stmt = Statement::from_string(DatabaseBackend::Postgres, READINESS_QUERY.to_owned());
    match pool.connection().query_one_raw(stmt).await {
        Ok(_) => HttpResponse::Ok().json(ReadyResponse {
            status: "ready",
            relational_store: "connected",
            document_store: "best_effort",
        }),
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "error": "NOT_READY",
                "message": "Relational store cannot serve application rows"
            }))
        }
    }
}

pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready);
}
