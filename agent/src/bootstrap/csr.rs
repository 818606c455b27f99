//! PKCS#10 certificate-signing-request builder.
//!
//! Each bootstrap attempt gets a fresh RSA-2048 pair; the previous pair is
//! deleted first so a stale key can never sign two CSRs.

use common::{Result, TelemetryError};
use log::{debug, info};
use rand::rngs::OsRng;
use rcgen::{Certificate, CertificateParams, DistinguishedName, DnType, KeyPair, PKCS_RSA_SHA256};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use std::fs;
use std::path::{Path, PathBuf};

const RSA_KEY_BITS: usize = 2048;
const RSA_KEY_FILE: &str = "csr_key.pem";

/// Output of one CSR build: the DER request, a printable PEM rendition for
/// diagnostics, and the PEM of the RSA key that will back the issued
/// certificate on the metrics channel.
pub struct CsrMaterial {
    pub csr_der: Vec<u8>,
    pub csr_pem: String,
    pub rsa_private_key_pem: String,
}

pub struct CsrBuilder {
    data_dir: PathBuf,
}

impl CsrBuilder {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Regenerates the RSA pair and builds a CSR with the given common name
    /// (the device UUID) and a SHA-256 signature.
    pub fn build(&self, common_name: &str) -> Result<CsrMaterial> {
        fs::create_dir_all(&self.data_dir)?;
        let key_path = self.data_dir.join(RSA_KEY_FILE);

        if key_path.exists() {
            fs::remove_file(&key_path)?;
            debug!("Deleted stale CSR key at {}", key_path.display());
        }

        let private_key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| TelemetryError::KeyError(e.to_string()))?;

        let key_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| TelemetryError::KeyError(e.to_string()))?;
        fs::write(&key_path, key_pem.as_bytes())?;

        let key_der = private_key
            .to_pkcs8_der()
            .map_err(|e| TelemetryError::KeyError(e.to_string()))?;
        let key_pair = KeyPair::from_der(key_der.as_bytes())
            .map_err(|e| TelemetryError::KeyError(e.to_string()))?;

        let mut distinguished_name = DistinguishedName::new();
        distinguished_name.push(DnType::CommonName, common_name);

        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name;
        params.alg = &PKCS_RSA_SHA256;
        params.key_pair = Some(key_pair);

        let certificate = Certificate::from_params(params)
            .map_err(|e| TelemetryError::CertificateError(e.to_string()))?;
        let csr_der = certificate
            .serialize_request_der()
            .map_err(|e| TelemetryError::CertificateError(e.to_string()))?;
        let csr_pem = certificate
            .serialize_request_pem()
            .map_err(|e| TelemetryError::CertificateError(e.to_string()))?;

        info!("Built CSR for CN={}", common_name);
        Ok(CsrMaterial {
            csr_der,
            csr_pem,
            rsa_private_key_pem: key_pem.to_string(),
        })
    }

    /// PEM of the most recently generated RSA key, if any.
    pub fn current_key_pem(&self) -> Result<String> {
        let key_path = self.data_dir.join(RSA_KEY_FILE);
        Ok(fs::read_to_string(key_path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use x509_parser::prelude::*;

    #[test]
    fn csr_subject_cn_matches_common_name() {
        let dir = tempdir().unwrap();
        let builder = CsrBuilder::new(dir.path());
        let uuid = "276f45e0-ae4b-4bfa-b650-4a2b5c51bd1a";

        let material = builder.build(uuid).unwrap();

        let (_, csr) = X509CertificationRequest::from_der(&material.csr_der).unwrap();
        let cn = csr
            .certification_request_info
            .subject
            .iter_common_name()
            .next()
            .unwrap()
            .as_str()
            .unwrap();
        assert_eq!(cn, uuid);
    }

    #[test]
    fn csr_pem_is_printable() {
        let dir = tempdir().unwrap();
        let builder = CsrBuilder::new(dir.path());

        let material = builder.build("test-device").unwrap();
        assert!(material.csr_pem.contains("CERTIFICATE REQUEST"));
    }

    #[test]
    fn rebuild_replaces_the_rsa_key() {
        let dir = tempdir().unwrap();
        let builder = CsrBuilder::new(dir.path());

        let first = builder.build("test-device").unwrap();
        let second = builder.build("test-device").unwrap();

        assert_ne!(first.rsa_private_key_pem, second.rsa_private_key_pem);
        assert_eq!(
            builder.current_key_pem().unwrap(),
            second.rsa_private_key_pem
        );
    }
}
