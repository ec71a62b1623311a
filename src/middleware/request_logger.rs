//! Request logging middleware.

use std::time::Instant;

use actix_web::Error;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use tracing::{info, warn};

/// Log every request with its outcome and duration. Use with
/// `actix_web::middleware::from_fn(log_requests)`.
pub async fn log_requests(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req.path().to_string();
    let remote_addr = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();

    let res = next.call(req).await?;
    let status = res.status();
    let duration_ms = start.elapsed().as_millis();

    if status.is_success() {
        info!(
            target: "api",
            method = %method,
            path = %path,
            remote_addr = %remote_addr,
            status = status.as_u16(),
            duration_ms = %duration_ms,
            "Request completed"
        );
    } else if status.is_client_error() {
        warn!(
            target: "api",
            method = %method,
            path = %path,
            remote_addr = %remote_addr,
            status = status.as_u16(),
            duration_ms = %duration_ms,
            "Request rejected"
        );
    } else {
        warn!(
            target: "api",
            method = %method,
            path = %path,
            remote_addr = %remote_addr,
            status = status.as_u16(),
            duration_ms = %duration_ms,
            "Request failed"
        );
    }

    Ok(res)
}
