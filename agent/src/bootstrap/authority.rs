//! HTTP client for the bootstrap authority.
//!
//! The channel is pinned to the configured root certificate; the request
//! and response bodies carry the bootstrapper protocol messages as JSON.

use async_trait::async_trait;
use common::bootstrap::{AccessGatewayId, Challenge, SignedCertificate, SignedResponse};
use common::{AgentConfig, Result, TelemetryError};
use log::{debug, info};

use super::BootstrapAuthority;

pub struct HttpBootstrapAuthority {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpBootstrapAuthority {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().use_rustls_tls();

        if !config.pinned_root_cert.is_empty() {
            let pem = std::fs::read(&config.pinned_root_cert)
                .map_err(|e| TelemetryError::CertificateError(e.to_string()))?;
            let root = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| TelemetryError::CertificateError(e.to_string()))?;
            builder = builder.add_root_certificate(root).tls_built_in_root_certs(false);
        }

        let http_client = builder
            .build()
            .map_err(|e| TelemetryError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.bootstrap_authority_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self.http_client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TelemetryError::NetworkError(format!(
                "authority returned {}: {}",
                status, text
            )));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl BootstrapAuthority for HttpBootstrapAuthority {
    async fn get_challenge(&self, id: &AccessGatewayId) -> Result<Challenge> {
        info!("Requesting challenge for {}", id.id);
        self.post_json("/bootstrapper/challenge", id).await
    }

    async fn request_sign(&self, response: &SignedResponse) -> Result<SignedCertificate> {
        info!("Submitting signed challenge and CSR for {}", response.hw_id.id);
        self.post_json("/bootstrapper/sign", response).await
    }
}
