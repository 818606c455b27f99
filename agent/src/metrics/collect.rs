//! Certified metrics channel.
//!
//! Once bootstrap yields a signed certificate, metric families are pushed
//! to the metrics authority over a mutually-authenticated session built
//! from that certificate and the RSA key that backed the CSR.

use common::bootstrap::{GaugeMetric, LabelPair, MetricFamily, MetricsContainer, SignedCertificate};
use common::types::MetricPair;
use common::{AgentConfig, Result, TelemetryError};
use log::info;

pub struct CertifiedMetricsChannel {
    http_client: reqwest::Client,
    endpoint: String,
}

impl CertifiedMetricsChannel {
    /// Builds the mTLS session from the bootstrap certificate (DER) and the
    /// PEM of the RSA key whose CSR the certificate signed.
    pub fn new(
        config: &AgentConfig,
        certificate: &SignedCertificate,
        rsa_private_key_pem: &str,
    ) -> Result<Self> {
        let identity_pem = format!(
            "{}\n{}",
            der_to_pem(&certificate.cert_der, "CERTIFICATE"),
            rsa_private_key_pem
        );
        let identity = reqwest::Identity::from_pem(identity_pem.as_bytes())
            .map_err(|e| TelemetryError::CertificateError(e.to_string()))?;

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .identity(identity);

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
            endpoint: format!(
                "{}/metricsd/collect",
                config.metrics_authority_url.trim_end_matches('/')
            ),
        })
    }

    pub async fn collect(&self, container: &MetricsContainer) -> Result<()> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(container)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TelemetryError::NetworkError(format!(
                "collect returned {}: {}",
                status, text
            )));
        }

        info!(
            "Collected {} metric families for {}",
            container.family.len(),
            container.gateway_id
        );
        Ok(())
    }
}

/// Encodes string-valued pairs as one gauge family: each value rides in a
/// label with a gauge of 1.
pub fn gauge_family_from_pairs(family_name: &str, pairs: &[MetricPair]) -> MetricFamily {
    let metrics = pairs
        .iter()
        .map(|pair| GaugeMetric {
            label: vec![LabelPair {
                name: pair.first.clone(),
                value: match &pair.second {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            }],
            gauge: 1.0,
        })
        .collect();

    MetricFamily {
        name: family_name.to_string(),
        metric: metrics,
    }
}

fn der_to_pem(der: &[u8], label: &str) -> String {
    let encoded = base64::encode(der);
    let mut pem = format!("-----BEGIN {}-----\n", label);
    for chunk in encoded.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str(&format!("-----END {}-----\n", label));
    pem
}
