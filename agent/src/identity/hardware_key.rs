//! Device-bound P-256 key pair used to prove possession during bootstrap.
//!
//! The private key is generated on first use and persisted as PKCS#8 PEM;
//! the public half is derived from it on every load.

use common::bootstrap::EcdsaSignature;
use common::{Result, TelemetryError};
use log::info;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use p256::SecretKey;
use rand::rngs::OsRng;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bootstrap::ChallengeSigner;

const HARDWARE_KEY_FILE: &str = "hardware_key.pem";

pub struct HardwareKeyManager {
    secret_key: SecretKey,
    key_path: PathBuf,
}

impl HardwareKeyManager {
    /// Loads the persisted hardware key, generating and persisting a fresh
    /// P-256 key on first use.
    pub fn new(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let key_path = data_dir.join(HARDWARE_KEY_FILE);

        let secret_key = if key_path.exists() {
            let pem = fs::read_to_string(&key_path)?;
            SecretKey::from_pkcs8_pem(&pem)
                .map_err(|e| TelemetryError::KeyError(e.to_string()))?
        } else {
            let secret_key = SecretKey::random(&mut OsRng);
            let pem = secret_key
                .to_pkcs8_pem(LineEnding::LF)
                .map_err(|e| TelemetryError::KeyError(e.to_string()))?;
            fs::write(&key_path, pem.as_bytes())?;
            info!("Generated new hardware key at {}", key_path.display());
            secret_key
        };

        Ok(Self {
            secret_key,
            key_path,
        })
    }

    pub fn private_key_pem(&self) -> Result<String> {
        let pem = self
            .secret_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| TelemetryError::KeyError(e.to_string()))?;
        Ok(pem.to_string())
    }

    pub fn public_key_pem(&self) -> Result<String> {
        self.secret_key
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| TelemetryError::KeyError(e.to_string()))
    }

    /// Bare base64 body of the public key, with header/footer and newlines
    /// stripped, in the form the registration endpoint expects.
    pub fn public_key_base64(&self) -> Result<String> {
        let pem = self.public_key_pem()?;
        Ok(pem
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .collect::<String>())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey::from(&SigningKey::from(&self.secret_key))
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }
}

impl ChallengeSigner for HardwareKeyManager {
    fn sign_challenge(&self, challenge: &[u8]) -> Result<EcdsaSignature> {
        let signing_key = SigningKey::from(&self.secret_key);
        let signature: Signature = signing_key.sign(challenge);

        let bytes = signature.to_bytes();
        let (r, s) = bytes.split_at(bytes.len() / 2);
        Ok(EcdsaSignature {
            r: r.to_vec(),
            s: s.to_vec(),
        })
    }
}
