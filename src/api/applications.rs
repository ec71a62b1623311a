//! Application workflow API handlers.
//!
//! Thin wrappers over [`DualStoreSynchronizer`]; every decision is made there.

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ApplicationIdentity, ApplicationState, StepPayload};
use crate::services::{DualStoreSynchronizer, SaveOptions};

/// Query parameters of a step save.
#[derive(Debug, Default, Deserialize)]
pub struct SaveStepQuery {
    /// Skip the edit-window age check (internal callers only)
    #[serde(default)]
    pub bypass_edit_window: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub app_status_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProgressRequest {
    pub progress: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStateRequest {
    pub state: ApplicationState,
}

/// Save one workflow step. The body is the step payload; the response is the
/// decrypted application document.
pub async fn save_step(
    sync: web::Data<DualStoreSynchronizer>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<SaveStepQuery>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let step = path.into_inner();
    let payload = StepPayload::from_value(body.into_inner())?;
    let options = SaveOptions {
        bypass_edit_window: query.bypass_edit_window,
        client_ip: req
            .connection_info()
            .realip_remote_addr()
            .map(str::to_string),
    };

    let document = sync.save_application_step(&step, payload, options).await?;
    Ok(HttpResponse::Ok().json(document))
}

pub async fn get_application(
    sync: web::Data<DualStoreSynchronizer>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let document = sync.get_application(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(document))
}

pub async fn update_status(
    sync: web::Data<DualStoreSynchronizer>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> AppResult<HttpResponse> {
    let uuid = path.into_inner();
    let req = body.into_inner();
    let record = sync
        .update_status(ApplicationIdentity::Uuid(uuid), &req.status, req.app_status_id)
        .await?;

    info!(
        "Application {} status set to {} ({})",
        uuid, record.status, record.app_status_id
    );
    Ok(HttpResponse::Ok().json(record))
}

pub async fn update_progress(
    sync: web::Data<DualStoreSynchronizer>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateProgressRequest>,
) -> AppResult<HttpResponse> {
    let record = sync
        .update_progress(ApplicationIdentity::Uuid(path.into_inner()), &body.progress)
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

pub async fn update_state(
    sync: web::Data<DualStoreSynchronizer>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStateRequest>,
) -> AppResult<HttpResponse> {
    let record = sync
        .update_state(ApplicationIdentity::Uuid(path.into_inner()), body.state)
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Rebuild the relational rows of an application from its document.
pub async fn replay_document(
    sync: web::Data<DualStoreSynchronizer>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let record = sync.replay_document(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

pub async fn delete_application(
    sync: web::Data<DualStoreSynchronizer>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    sync.delete_application(ApplicationIdentity::Uuid(path.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Configure application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/applications/{uuid}/status").route(web::put().to(update_status)),
    )
    .service(web::resource("/applications/{uuid}/progress").route(web::put().to(update_progress)))
    .service(web::resource("/applications/{uuid}/state").route(web::put().to(update_state)))
    .service(web::resource("/applications/{uuid}/replay").route(web::post().to(replay_document)))
    .service(
        web::resource("/applications/{id}")
            .route(web::post().to(save_step))
            .route(web::get().to(get_application))
            .route(web::delete().to(delete_application)),
    );
}
