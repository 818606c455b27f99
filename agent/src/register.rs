//! Device registration against the backend `/register` endpoint.
//!
//! A successful (or already-registered) outcome is flagged on disk so later
//! launches skip the request entirely.

use common::types::RegisterRequest;
use common::{AgentConfig, Result, TelemetryError};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const REGISTERED_FLAG_FILE: &str = "registered";
const REGISTER_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    AlreadyRegistered,
    Failed,
}

pub struct RegistrationManager {
    http_client: reqwest::Client,
    endpoint: String,
    basic_auth: Option<(String, String)>,
    data_dir: PathBuf,
}

impl RegistrationManager {
    pub fn new(config: &AgentConfig, data_dir: &Path) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(REGISTER_TIMEOUT);

        if !config.pinned_root_cert.is_empty() {
            let pem = std::fs::read(&config.pinned_root_cert)
                .map_err(|e| TelemetryError::CertificateError(e.to_string()))?;
            let root = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| TelemetryError::CertificateError(e.to_string()))?;
            builder = builder.add_root_certificate(root);
        }

        let http_client = builder
            .build()
            .map_err(|e| TelemetryError::NetworkError(e.to_string()))?;

        let basic_auth = if config.has_basic_auth() {
            Some((
                config.basic_auth_username.clone(),
                config.basic_auth_password.clone(),
            ))
        } else {
            None
        };

        Ok(Self {
            http_client,
            endpoint: config.register_endpoint.clone(),
            basic_auth,
            data_dir: data_dir.to_path_buf(),
        })
    }

    fn flag_path(&self) -> PathBuf {
        self.data_dir.join(REGISTERED_FLAG_FILE)
    }

    pub fn is_registered(&self) -> bool {
        self.flag_path().exists()
    }

    fn save_registration(&self) {
        if let Err(e) = fs::write(self.flag_path(), b"1") {
            warn!("Failed to persist registration flag: {}", e);
        }
    }

    /// Sends the UUID and trimmed public key to the registration endpoint.
    /// A 409 means the UUID is already known upstream; both that and a 200
    /// count as registered.
    pub async fn register_device(&self, uuid: &str, public_key: &str) -> Result<RegisterOutcome> {
        if self.is_registered() {
            info!("Device already registered, no request will be sent");
            return Ok(RegisterOutcome::AlreadyRegistered);
        }

        let body = RegisterRequest {
            uuid: uuid.to_string(),
            public_key: public_key.to_string(),
        };

        let mut request = self.http_client.post(&self.endpoint).json(&body);
        if let Some((username, password)) = &self.basic_auth {
            request = request.basic_auth(username, Some(password));
        }

        info!("Sending registration request to {}", self.endpoint);
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            info!("Registration was successful: {}", text);
            self.save_registration();
            Ok(RegisterOutcome::Registered)
        } else if status.as_u16() == 409 {
            info!("UUID already registered upstream, proceeding as registered");
            self.save_registration();
            Ok(RegisterOutcome::AlreadyRegistered)
        } else {
            warn!("Registration failed ({}): {}", status, text);
            Ok(RegisterOutcome::Failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_config(dir: &Path) -> AgentConfig {
        AgentConfig {
            data_dir: dir.to_string_lossy().to_string(),
            client_type: "ios".to_string(),
            register_endpoint: "https://127.0.0.1:1/register".to_string(),
            metrics_push_endpoint: "https://127.0.0.1:1/metrics/push".to_string(),
            bootstrap_authority_url: "https://127.0.0.1:1".to_string(),
            metrics_authority_url: "https://127.0.0.1:1".to_string(),
            pinned_root_cert: String::new(),
            basic_auth_username: String::new(),
            basic_auth_password: String::new(),
        }
    }

    #[tokio::test]
    async fn registered_flag_short_circuits_the_request() {
        let dir = tempdir().unwrap();
        let manager = RegistrationManager::new(&test_config(dir.path()), dir.path()).unwrap();

        std::fs::write(dir.path().join(REGISTERED_FLAG_FILE), b"1").unwrap();
        assert!(manager.is_registered());

        // The endpoint is unreachable; the flag alone must satisfy the call.
        let outcome = manager.register_device("uuid", "key").await.unwrap();
        assert_eq!(outcome, RegisterOutcome::AlreadyRegistered);
    }
}
