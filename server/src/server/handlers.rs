//! HTTP request handlers for metric ingestion and device registration.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use common::types::{MessageResponse, MetricPushRequest, RegisterRequest};
use common::TelemetryError;
use log::{error, info, warn};
use serde_json::json;

use super::AppState;
use crate::ingest;
use crate::registration::RegistrationOutcome;

/// `POST /metrics/push`: dispatches the payload to the handler registered
/// for its metric name and persists one document per push.
pub async fn push_metric(
    request: web::Json<MetricPushRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let request = request.into_inner();
    info!(
        "Received metric push {} from {} ({})",
        request.metric_name, request.identifier.uuid, request.identifier.client_type
    );

    match ingest::process_push(&state.registry, state.store.as_ref(), request).await {
        Ok(()) => HttpResponse::Ok().json(MessageResponse::new("Metric was stored successfully")),
        Err(TelemetryError::UnknownMetric(name)) => {
            warn!("Rejected push for unknown metric name {}", name);
            HttpResponse::UnprocessableEntity().json(MessageResponse::with_error(
                "Metric failed to be stored",
                "UNKNOWN_METRIC",
            ))
        }
        Err(e) => {
            // The cause stays in the logs; callers only learn stored / not stored.
            error!("Error storing metric: {}", e);
            HttpResponse::BadRequest().json(MessageResponse::new("Metric failed to be stored"))
        }
    }
}

/// `POST /register`: forwards a gateway-creation request to the
/// orchestrator and reports success, duplicate, or failure.
pub async fn register_device(
    request: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let request = request.into_inner();
    info!("Registration request for {}", request.uuid);

    let outcome = match state
        .orchestrator
        .create_gateway(&request.uuid, &request.public_key)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Registration error for {}: {}", request.uuid, e);
            RegistrationOutcome::Failed
        }
    };

    if matches!(
        outcome,
        RegistrationOutcome::Success | RegistrationOutcome::Duplicate
    ) {
        if let Err(e) = state
            .devices
            .record_device(&request.uuid, &request.public_key)
            .await
        {
            error!("Failed to record device {}: {}", request.uuid, e);
        }
    }

    match outcome {
        RegistrationOutcome::Success => {
            HttpResponse::Ok().json(MessageResponse::new("Registered Successfully"))
        }
        RegistrationOutcome::Duplicate => {
            HttpResponse::Conflict().json(MessageResponse::new("UUID is already registered"))
        }
        RegistrationOutcome::Failed => {
            HttpResponse::BadRequest().json(MessageResponse::new("Registration Failed"))
        }
    }
}

/// `GET /devices`: lists the recorded registered devices.
pub async fn get_devices(state: web::Data<AppState>) -> HttpResponse {
    match state.devices.all_devices().await {
        Ok(devices) => HttpResponse::Ok().json(devices),
        Err(e) => {
            error!("Failed to list devices: {}", e);
            HttpResponse::InternalServerError().json(MessageResponse::new(e.to_string()))
        }
    }
}

/// `GET /status`: storage health probe.
pub async fn get_status(state: web::Data<AppState>) -> HttpResponse {
    match state.store.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "timestamp": Utc::now().timestamp(),
            "services": {
                "storage": "healthy",
                "server": "healthy"
            }
        })),
        Err(_) => HttpResponse::Ok().json(json!({
            "status": "error",
            "timestamp": Utc::now().timestamp(),
            "services": {
                "storage": "unhealthy",
                "server": "healthy"
            }
        })),
    }
}
