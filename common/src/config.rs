use serde::{Deserialize, Serialize};

/// Ingestion service configuration, loaded from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub redis_url: String,
    pub bind_address: String,
    pub basic_auth_username: String,
    pub basic_auth_password: String,
    pub orchestrator_base_url: String,
    pub orchestrator_network: String,
    /// Path to a PEM bundle (client certificate + key) for the
    /// orchestrator channel. Empty disables client authentication.
    pub orchestrator_identity_pem: String,
    /// Prefix prepended to the device UUID to form the gateway id.
    pub gateway_base_id: String,
}

impl ServerConfig {
    pub fn load() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            basic_auth_username: std::env::var("BASIC_AUTH_USERNAME")
                .unwrap_or_else(|_| "admin".to_string()),
            basic_auth_password: std::env::var("BASIC_AUTH_PASSWORD")
                .unwrap_or_else(|_| "admin".to_string()),
            orchestrator_base_url: std::env::var("ORCHESTRATOR_BASE_URL")
                .unwrap_or_else(|_| "https://127.0.0.1:9443/magma/v1".to_string()),
            orchestrator_network: std::env::var("ORCHESTRATOR_NETWORK")
                .unwrap_or_else(|_| "openschema".to_string()),
            orchestrator_identity_pem: std::env::var("ORCHESTRATOR_IDENTITY_PEM")
                .unwrap_or_default(),
            gateway_base_id: std::env::var("GATEWAY_BASE_ID")
                .unwrap_or_else(|_| "openschema_ue_".to_string()),
        }
    }
}

/// Agent-side configuration, loaded from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Directory holding the persisted UUID and key material.
    pub data_dir: String,
    pub client_type: String,
    pub register_endpoint: String,
    pub metrics_push_endpoint: String,
    pub bootstrap_authority_url: String,
    pub metrics_authority_url: String,
    /// Optional path to the pinned root certificate (PEM).
    pub pinned_root_cert: String,
    pub basic_auth_username: String,
    pub basic_auth_password: String,
}

impl AgentConfig {
    pub fn load() -> Self {
        Self {
            data_dir: std::env::var("AGENT_DATA_DIR").unwrap_or_else(|_| ".agent".to_string()),
            client_type: std::env::var("AGENT_CLIENT_TYPE").unwrap_or_else(|_| "ios".to_string()),
            register_endpoint: std::env::var("REGISTER_ENDPOINT")
                .unwrap_or_else(|_| "https://127.0.0.1:8080/register".to_string()),
            metrics_push_endpoint: std::env::var("METRICS_PUSH_ENDPOINT")
                .unwrap_or_else(|_| "https://127.0.0.1:8080/metrics/push".to_string()),
            bootstrap_authority_url: std::env::var("BOOTSTRAP_AUTHORITY_URL")
                .unwrap_or_else(|_| "https://bootstrapper-controller.localdomain".to_string()),
            metrics_authority_url: std::env::var("METRICS_AUTHORITY_URL")
                .unwrap_or_else(|_| "https://controller.localdomain".to_string()),
            pinned_root_cert: std::env::var("PINNED_ROOT_CERT").unwrap_or_default(),
            basic_auth_username: std::env::var("BASIC_AUTH_USERNAME").unwrap_or_default(),
            basic_auth_password: std::env::var("BASIC_AUTH_PASSWORD").unwrap_or_default(),
        }
    }

    pub fn has_basic_auth(&self) -> bool {
        !self.basic_auth_username.is_empty()
    }
}
