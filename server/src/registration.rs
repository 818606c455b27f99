//! Gateway registration against the external orchestrator.
//!
//! The backend does not own the gateway records; it forwards a creation
//! request over a client-certificate-authenticated channel and classifies
//! the orchestrator's answer. Duplicate detection matches the error text
//! against a known substring, which is brittle but is what the orchestrator
//! gives us to work with.

use async_trait::async_trait;
use common::{Result, ServerConfig, TelemetryError};
use log::{error, info, warn};
use serde_json::json;
use std::time::Duration;

/// Error-text marker the orchestrator returns when a hardware id is already
/// bound to a gateway.
const ALREADY_MAPPED_MARKER: &str = "already mapped";

const ORCHESTRATOR_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Success,
    Duplicate,
    Failed,
}

#[async_trait]
pub trait GatewayOrchestrator: Send + Sync {
    /// Asks the orchestrator to create a gateway for the device.
    async fn create_gateway(&self, uuid: &str, public_key: &str) -> Result<RegistrationOutcome>;
}

/// HTTP client for the orchestrator gateway API.
pub struct OrchestratorClient {
    http_client: reqwest::Client,
    base_url: String,
    network: String,
    gateway_base_id: String,
}

impl OrchestratorClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(ORCHESTRATOR_TIMEOUT);

        if !config.orchestrator_identity_pem.is_empty() {
            let pem = std::fs::read(&config.orchestrator_identity_pem)
                .map_err(|e| TelemetryError::CertificateError(e.to_string()))?;
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| TelemetryError::CertificateError(e.to_string()))?;
            builder = builder.identity(identity);
        }

        let http_client = builder
            .build()
            .map_err(|e| TelemetryError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.orchestrator_base_url.trim_end_matches('/').to_string(),
            network: config.orchestrator_network.clone(),
            gateway_base_id: config.gateway_base_id.clone(),
        })
    }

    fn gateway_id(&self, uuid: &str) -> String {
        format!("{}{}", self.gateway_base_id, uuid.replace('-', ""))
    }

    fn gateway_body(&self, uuid: &str, public_key: &str) -> serde_json::Value {
        json!({
            "description": "OpenSchema UE",
            "device": {
                "hardware_id": uuid,
                "key": {
                    "key": public_key,
                    "key_type": "SOFTWARE_ECDSA_SHA256",
                },
            },
            "id": self.gateway_id(uuid),
            "magmad": {
                "autoupgrade_enabled": true,
                "autoupgrade_poll_interval": 300,
                "checkin_interval": 60,
                "checkin_timeout": 10,
            },
            "name": "OpenSchema UE",
            "tier": "default",
        })
    }
}

/// Maps an orchestrator error body to the registration outcome.
pub fn classify_orchestrator_error(error_text: &str) -> RegistrationOutcome {
    if error_text.contains(ALREADY_MAPPED_MARKER) {
        RegistrationOutcome::Duplicate
    } else {
        RegistrationOutcome::Failed
    }
}

#[async_trait]
impl GatewayOrchestrator for OrchestratorClient {
    async fn create_gateway(&self, uuid: &str, public_key: &str) -> Result<RegistrationOutcome> {
        let url = format!("{}/networks/{}/gateways", self.base_url, self.network);
        info!("Sending UE data to orchestrator at {}", url);

        let response = match self
            .http_client
            .post(&url)
            .json(&self.gateway_body(uuid, public_key))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Orchestrator request failed: {}", e);
                return Ok(RegistrationOutcome::Failed);
            }
        };

        if response.status().is_success() {
            info!("UE registration was successful for {}", uuid);
            return Ok(RegistrationOutcome::Success);
        }

        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        warn!(
            "Orchestrator rejected gateway for {} ({}): {}",
            uuid, status, error_text
        );

        Ok(classify_orchestrator_error(&error_text))
    }
}
