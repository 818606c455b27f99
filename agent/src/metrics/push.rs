//! Metric push over HTTPS to the ingestion endpoint.
//!
//! Fire-and-forget: one POST per metric, optional Basic auth, no retry and
//! nothing persisted locally on success or failure.

use common::types::{Identifier, MetricPair, MetricPushRequest, MetricTimestamp};
use common::{AgentConfig, Result, TelemetryError};
use log::{info, warn};
use std::time::Duration;

const PUSH_TIMEOUT: Duration = Duration::from_secs(20);

pub struct MetricPushManager {
    http_client: reqwest::Client,
    endpoint: String,
    basic_auth: Option<(String, String)>,
}

impl MetricPushManager {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(PUSH_TIMEOUT);

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
            endpoint: config.metrics_push_endpoint.clone(),
            basic_auth,
        })
    }

    pub fn build_push_request(
        metric_name: &str,
        pairs: Vec<MetricPair>,
        identifier: Identifier,
        timestamp: MetricTimestamp,
    ) -> MetricPushRequest {
        MetricPushRequest {
            metric_name: metric_name.to_string(),
            metrics_list: Some(pairs),
            metrics: None,
            identifier,
            timestamp,
        }
    }

    /// Pushes one metric. The response is logged; no retry on failure.
    pub async fn push_metric(
        &self,
        metric_name: &str,
        pairs: Vec<MetricPair>,
        identifier: Identifier,
        timestamp: MetricTimestamp,
    ) -> Result<()> {
        let body = Self::build_push_request(metric_name, pairs, identifier, timestamp);

        let mut request = self.http_client.post(&self.endpoint).json(&body);
        if let Some((username, password)) = &self.basic_auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            info!("Pushed {}: {}", metric_name, text);
            Ok(())
        } else {
            warn!("Push of {} rejected ({}): {}", metric_name, status, text);
            Err(TelemetryError::NetworkError(format!(
                "push rejected with {}",
                status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_request_has_expected_shape() {
        let request = MetricPushManager::build_push_request(
            "openschemaWifiSession",
            vec![MetricPair::new("ssid", "net1")],
            Identifier {
                client_type: "ios".to_string(),
                uuid: "u".to_string(),
            },
            MetricTimestamp {
                timestamp: 7,
                offset_minutes: 0,
            },
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["metricName"], json!("openschemaWifiSession"));
        assert_eq!(value["metricsList"][0]["second"], json!("net1"));
        assert!(value.get("metrics").is_none());
    }
}
