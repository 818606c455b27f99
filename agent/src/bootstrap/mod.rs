//! Device bootstrap: challenge retrieval, proof-of-possession signing, CSR
//! submission, and certificate receipt.
//!
//! The flow is a small state machine; terminal states are never retried
//! automatically. Overlapping triggers (e.g. rapid network-change events)
//! are serialized through a single in-flight guard per device: a second
//! trigger while a run is active is skipped, not queued.

pub mod authority;
pub mod csr;

pub use authority::HttpBootstrapAuthority;
pub use csr::{CsrBuilder, CsrMaterial};

use async_trait::async_trait;
use common::bootstrap::{
    AccessGatewayId, Challenge, CsrPayload, EcdsaSignature, SignedCertificate, SignedResponse,
};
use common::Result;
use log::{debug, error, info, warn};
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, watch};

use crate::identity::IdentityManager;

/// Requested certificate validity in seconds.
const CERT_VALID_SECONDS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Idle,
    AwaitingChallenge,
    ChallengeReceived,
    Signing,
    SubmittingCsr,
    Certified,
    Failed,
}

/// Authority that issues challenges and signs CSRs.
#[async_trait]
pub trait BootstrapAuthority: Send + Sync {
    async fn get_challenge(&self, id: &AccessGatewayId) -> Result<Challenge>;
    async fn request_sign(&self, response: &SignedResponse) -> Result<SignedCertificate>;
}

/// Signs challenge bytes with the device-bound hardware key.
pub trait ChallengeSigner: Send + Sync {
    fn sign_challenge(&self, challenge: &[u8]) -> Result<EcdsaSignature>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    Certified(SignedCertificate),
    /// Another run holds the in-flight guard; this trigger was dropped.
    AlreadyRunning,
}

/// Events that start a bootstrap attempt. Subscription ends by dropping the
/// sender half of the trigger channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapTrigger {
    Startup,
    NetworkChanged,
    Manual,
}

pub struct BootstrapFlow {
    identity: Arc<IdentityManager>,
    signer: Arc<dyn ChallengeSigner>,
    csr_builder: CsrBuilder,
    authority: Arc<dyn BootstrapAuthority>,
    state: RwLock<BootstrapState>,
    in_flight: tokio::sync::Mutex<()>,
}

impl BootstrapFlow {
    pub fn new(
        identity: Arc<IdentityManager>,
        signer: Arc<dyn ChallengeSigner>,
        csr_builder: CsrBuilder,
        authority: Arc<dyn BootstrapAuthority>,
    ) -> Self {
        Self {
            identity,
            signer,
            csr_builder,
            authority,
            state: RwLock::new(BootstrapState::Idle),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> BootstrapState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: BootstrapState) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        debug!("Bootstrap state {:?} -> {:?}", *state, next);
        *state = next;
    }

    /// Runs one bootstrap attempt to completion or failure. A concurrent
    /// trigger returns `AlreadyRunning` without touching the active run.
    pub async fn run(&self) -> Result<BootstrapOutcome> {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("Bootstrap already in flight, skipping trigger");
                return Ok(BootstrapOutcome::AlreadyRunning);
            }
        };

        match self.run_inner().await {
            Ok(certificate) => {
                self.set_state(BootstrapState::Certified);
                info!("Bootstrap complete, received signed certificate");
                Ok(BootstrapOutcome::Certified(certificate))
            }
            Err(e) => {
                error!("Bootstrap failed: {}", e);
                self.set_state(BootstrapState::Failed);
                Err(e)
            }
        }
    }

    async fn run_inner(&self) -> Result<SignedCertificate> {
        let uuid = self.identity.uuid();

        self.set_state(BootstrapState::AwaitingChallenge);
        let gateway_id = AccessGatewayId { id: uuid.clone() };
        let challenge = self.authority.get_challenge(&gateway_id).await?;
        self.set_state(BootstrapState::ChallengeReceived);
        info!("Received challenge ({} bytes)", challenge.challenge.len());

        self.set_state(BootstrapState::Signing);
        let signature = self.signer.sign_challenge(&challenge.challenge)?;

        // Fresh RSA pair per attempt; the builder deletes the previous one.
        let csr = self.csr_builder.build(&uuid)?;

        self.set_state(BootstrapState::SubmittingCsr);
        let response = SignedResponse {
            hw_id: gateway_id,
            challenge: challenge.challenge,
            ecdsa_response: signature,
            csr: CsrPayload {
                hardware_id: uuid,
                valid_seconds: CERT_VALID_SECONDS,
                csr_der: csr.csr_der,
            },
        };

        self.authority.request_sign(&response).await
    }
}

/// Forwards trigger events into bootstrap runs, publishing each new
/// certificate on the watch channel. The loop ends when every trigger
/// sender is dropped.
pub fn spawn_trigger_loop(
    flow: Arc<BootstrapFlow>,
    mut triggers: mpsc::Receiver<BootstrapTrigger>,
    certificates: watch::Sender<Option<SignedCertificate>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(trigger) = triggers.recv().await {
            info!("Bootstrap trigger received: {:?}", trigger);
            match flow.run().await {
                Ok(BootstrapOutcome::Certified(certificate)) => {
                    let _ = certificates.send(Some(certificate));
                }
                Ok(BootstrapOutcome::AlreadyRunning) => {}
                Err(_) => {
                    // Terminal for this run; the next trigger starts fresh.
                }
            }
        }
        info!("Bootstrap trigger channel closed");
    })
}
