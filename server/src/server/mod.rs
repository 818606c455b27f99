//! HTTP server wiring: shared state, route table, and startup.

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use actix_web_httpauth::middleware::HttpAuthentication;
use common::{Result, ServerConfig, TelemetryError};
use log::info;
use std::sync::Arc;

use crate::auth::validate_basic_auth;
use crate::devices::{DeviceDirectory, RedisDeviceDirectory};
use crate::ingest::HandlerRegistry;
use crate::registration::{GatewayOrchestrator, OrchestratorClient};
use crate::store::{DocumentStore, RedisStore};

pub mod handlers;

/// Shared per-request state: config, the handler registry, and the
/// injected store/orchestrator/directory implementations.
pub struct AppState {
    pub config: ServerConfig,
    pub registry: HandlerRegistry,
    pub store: Arc<dyn DocumentStore>,
    pub orchestrator: Arc<dyn GatewayOrchestrator>,
    pub devices: Arc<dyn DeviceDirectory>,
}

pub struct TelemetryServer {
    state: web::Data<AppState>,
}

impl TelemetryServer {
    /// Builds the Redis-backed production wiring from config.
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let redis_client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        let store = Arc::new(RedisStore::new(redis_client.clone()));
        let devices = Arc::new(RedisDeviceDirectory::new(redis_client));
        let orchestrator = Arc::new(OrchestratorClient::new(&config)?);

        Ok(Self::new(config, store, orchestrator, devices))
    }

    pub fn new(
        config: ServerConfig,
        store: Arc<dyn DocumentStore>,
        orchestrator: Arc<dyn GatewayOrchestrator>,
        devices: Arc<dyn DeviceDirectory>,
    ) -> Self {
        let state = web::Data::new(AppState {
            config,
            registry: HandlerRegistry::baseline(),
            store,
            orchestrator,
            devices,
        });
        Self { state }
    }

    pub async fn start(&self) -> Result<()> {
        let bind_address = self.state.config.bind_address.clone();
        let state = self.state.clone();

        info!("Starting HTTP server on {}", bind_address);
        HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .wrap(HttpAuthentication::basic(validate_basic_auth))
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header(),
                )
                .configure(configure_routes)
        })
        .bind(&bind_address)?
        .run()
        .await
        .map_err(|e| TelemetryError::InternalError(e.to_string()))
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/metrics/push").route(web::post().to(handlers::push_metric)))
        .service(web::resource("/register").route(web::post().to(handlers::register_device)))
        .service(web::resource("/devices").route(web::get().to(handlers::get_devices)))
        .service(web::resource("/status").route(web::get().to(handlers::get_status)));
}
