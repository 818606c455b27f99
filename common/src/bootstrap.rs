//! Wire messages for the bootstrap handshake and the certified metrics
//! channel. The shapes mirror the orchestrator's bootstrapper service:
//! a challenge is fetched for a gateway id, signed with the hardware key,
//! and submitted together with a CSR to obtain a signed client certificate.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessGatewayId {
    pub id: String,
}

/// Opaque challenge issued by the bootstrap authority, consumed once per
/// bootstrap attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Challenge {
    pub challenge: Vec<u8>,
}

/// ECDSA signature over the challenge bytes, split into its (r, s) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EcdsaSignature {
    pub r: Vec<u8>,
    pub s: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CsrPayload {
    pub hardware_id: String,
    /// Requested certificate validity in seconds.
    pub valid_seconds: u64,
    pub csr_der: Vec<u8>,
}

/// Response submitted to the authority after signing the challenge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignedResponse {
    pub hw_id: AccessGatewayId,
    pub challenge: Vec<u8>,
    pub ecdsa_response: EcdsaSignature,
    pub csr: CsrPayload,
}

/// DER certificate returned by the authority once the signed challenge and
/// CSR are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignedCertificate {
    pub cert_der: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelPair {
    pub name: String,
    pub value: String,
}

/// Single gauge sample. String-valued metrics are carried as labels with a
/// gauge value of 1, matching how the original agents encode them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GaugeMetric {
    pub label: Vec<LabelPair>,
    pub gauge: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub metric: Vec<GaugeMetric>,
}

/// Payload of the certified `collect` call on the metrics authority.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsContainer {
    pub gateway_id: String,
    pub family: Vec<MetricFamily>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_response_round_trips() {
        let response = SignedResponse {
            hw_id: AccessGatewayId {
                id: "abc".to_string(),
            },
            challenge: vec![1, 2, 3],
            ecdsa_response: EcdsaSignature {
                r: vec![4; 32],
                s: vec![5; 32],
            },
            csr: CsrPayload {
                hardware_id: "abc".to_string(),
                valid_seconds: 10_000,
                csr_der: vec![48, 130],
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        let parsed: SignedResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, response);
        assert!(json.contains("\"hwId\""));
        assert!(json.contains("\"csrDer\""));
    }
}
