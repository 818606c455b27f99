use agent::bootstrap::{
    BootstrapAuthority, BootstrapFlow, BootstrapOutcome, BootstrapState, ChallengeSigner,
    CsrBuilder,
};
use agent::identity::{HardwareKeyManager, IdentityManager};
use async_trait::async_trait;
use common::bootstrap::{
    AccessGatewayId, Challenge, EcdsaSignature, SignedCertificate, SignedResponse,
};
use common::{Result, TelemetryError};
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use x509_parser::prelude::*;

/// Authority double that verifies the proof-of-possession signature before
/// issuing a canned certificate.
struct MockAuthority {
    challenge: Vec<u8>,
    verifying_key: Option<VerifyingKey>,
    sign_requests: AtomicUsize,
    last_response: Mutex<Option<SignedResponse>>,
    challenge_delay: Duration,
}

impl MockAuthority {
    fn new(challenge: Vec<u8>, verifying_key: Option<VerifyingKey>) -> Self {
        Self {
            challenge,
            verifying_key,
            sign_requests: AtomicUsize::new(0),
            last_response: Mutex::new(None),
            challenge_delay: Duration::from_millis(0),
        }
    }

    fn with_challenge_delay(mut self, delay: Duration) -> Self {
        self.challenge_delay = delay;
        self
    }
}

#[async_trait]
impl BootstrapAuthority for MockAuthority {
    async fn get_challenge(&self, _id: &AccessGatewayId) -> Result<Challenge> {
        if !self.challenge_delay.is_zero() {
            tokio::time::sleep(self.challenge_delay).await;
        }
        Ok(Challenge {
            challenge: self.challenge.clone(),
        })
    }

    async fn request_sign(&self, response: &SignedResponse) -> Result<SignedCertificate> {
        self.sign_requests.fetch_add(1, Ordering::SeqCst);

        if let Some(verifying_key) = &self.verifying_key {
            let mut raw = response.ecdsa_response.r.clone();
            raw.extend_from_slice(&response.ecdsa_response.s);
            let signature = Signature::from_slice(&raw)
                .map_err(|e| TelemetryError::SigningError(e.to_string()))?;
            verifying_key
                .verify(&response.challenge, &signature)
                .map_err(|e| TelemetryError::SigningError(e.to_string()))?;
        }

        *self.last_response.lock().unwrap() = Some(response.clone());
        Ok(SignedCertificate {
            cert_der: vec![0x30, 0x82, 0x01, 0x0a],
        })
    }
}

struct FailingSigner;

impl ChallengeSigner for FailingSigner {
    fn sign_challenge(&self, _challenge: &[u8]) -> Result<EcdsaSignature> {
        Err(TelemetryError::SigningError(
            "simulated hardware fault".to_string(),
        ))
    }
}

#[tokio::test]
async fn bootstrap_happy_path_yields_certificate() {
    let dir = tempdir().unwrap();
    let identity = Arc::new(IdentityManager::new(dir.path()).unwrap());
    let hardware_key = Arc::new(HardwareKeyManager::new(dir.path()).unwrap());
    let authority = Arc::new(MockAuthority::new(
        b"opaque-challenge".to_vec(),
        Some(hardware_key.verifying_key()),
    ));

    let flow = BootstrapFlow::new(
        identity.clone(),
        hardware_key,
        CsrBuilder::new(dir.path()),
        authority.clone(),
    );

    let outcome = flow.run().await.unwrap();

    let certificate = match outcome {
        BootstrapOutcome::Certified(certificate) => certificate,
        other => panic!("expected certificate, got {:?}", other),
    };
    assert!(!certificate.cert_der.is_empty());
    assert_eq!(flow.state(), BootstrapState::Certified);
    assert_eq!(authority.sign_requests.load(Ordering::SeqCst), 1);

    // The submitted CSR carries the device UUID as its subject CN.
    let response = authority.last_response.lock().unwrap().clone().unwrap();
    assert_eq!(response.hw_id.id, identity.uuid());
    let (_, csr) = X509CertificationRequest::from_der(&response.csr.csr_der).unwrap();
    let cn = csr
        .certification_request_info
        .subject
        .iter_common_name()
        .next()
        .unwrap()
        .as_str()
        .unwrap();
    assert_eq!(cn, identity.uuid());
}

#[tokio::test]
async fn signing_fault_fails_without_submitting_csr() {
    let dir = tempdir().unwrap();
    let identity = Arc::new(IdentityManager::new(dir.path()).unwrap());
    let authority = Arc::new(MockAuthority::new(b"challenge".to_vec(), None));

    let flow = BootstrapFlow::new(
        identity,
        Arc::new(FailingSigner),
        CsrBuilder::new(dir.path()),
        authority.clone(),
    );

    let result = flow.run().await;

    assert!(result.is_err());
    assert_eq!(flow.state(), BootstrapState::Failed);
    assert_eq!(authority.sign_requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_trigger_is_skipped_by_in_flight_guard() {
    let dir = tempdir().unwrap();
    let identity = Arc::new(IdentityManager::new(dir.path()).unwrap());
    let hardware_key = Arc::new(HardwareKeyManager::new(dir.path()).unwrap());
    let authority = Arc::new(
        MockAuthority::new(b"challenge".to_vec(), Some(hardware_key.verifying_key()))
            .with_challenge_delay(Duration::from_millis(200)),
    );

    let flow = BootstrapFlow::new(
        identity,
        hardware_key,
        CsrBuilder::new(dir.path()),
        authority.clone(),
    );

    let (first, second) = tokio::join!(flow.run(), flow.run());

    let outcomes = [first.unwrap(), second.unwrap()];
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, BootstrapOutcome::Certified(_))));
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, BootstrapOutcome::AlreadyRunning)));
    assert_eq!(authority.sign_requests.load(Ordering::SeqCst), 1);
}
