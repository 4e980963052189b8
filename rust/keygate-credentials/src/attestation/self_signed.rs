//! Self-signed P-256 attestation certificates.
//!
//! The certificate is encoded by `rcgen`; the ephemeral key is generated by
//! `rcgen` as PKCS#8 and loaded into a `p256` signing key so registration
//! data is signed with exactly the key the certificate names.

use async_trait::async_trait;
use p256::{
    ecdsa::{Signature, SigningKey, VerifyingKey, signature::Signer as _},
    pkcs8::{DecodePrivateKey as _, EncodePublicKey as _},
};
use rand::{RngCore as _, rngs::OsRng};
use rcgen::{
    CertificateParams, DistinguishedName, DnType, KeyPair, PKCS_ECDSA_P256_SHA256, SerialNumber,
};
use time::OffsetDateTime;

use super::{Attestation, AttestationConfig, AttestationError, AttestationIssuer};

/// Issues [`SelfSignedAttestation`]s described by an [`AttestationConfig`].
#[derive(Debug, Clone, Default)]
pub struct SelfSignedIssuer {
    config: AttestationConfig,
}

impl SelfSignedIssuer {
    /// Create an issuer for `config`.
    pub fn new(config: AttestationConfig) -> Self {
        Self { config }
    }

    /// The certificate settings in use.
    pub fn config(&self) -> &AttestationConfig {
        &self.config
    }

    fn serial_number(&self) -> SerialNumber {
        let mut serial = vec![0u8; self.config.clamped_serial_length()];
        OsRng.fill_bytes(&mut serial);
        SerialNumber::from(positive_serial(serial))
    }

    fn generate(&self) -> Result<SelfSignedAttestation, AttestationError> {
        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)
            .map_err(|error| AttestationError::Generation(error.to_string()))?;
        let key = SigningKey::from_pkcs8_der(&key_pair.serialize_der())
            .map_err(|error| AttestationError::Generation(error.to_string()))?;

        let mut distinguished_name = DistinguishedName::new();
        distinguished_name.push(DnType::CommonName, self.config.common_name.as_str());
        distinguished_name.push(DnType::OrganizationName, self.config.organization.as_str());

        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name;
        params.serial_number = Some(self.serial_number());

        let not_before = OffsetDateTime::now_utc()
            .replace_nanosecond(0)
            .map_err(|error| AttestationError::Generation(error.to_string()))?;
        params.not_before = not_before;
        params.not_after = not_before + self.config.validity();

        let certificate = params
            .self_signed(&key_pair)
            .map_err(|error| AttestationError::Generation(error.to_string()))?;

        Ok(SelfSignedAttestation {
            certificate: certificate.der().to_vec(),
            key,
        })
    }
}

/// Clear the sign bit and rule out zero so the DER INTEGER is positive
/// without a padding byte.
fn positive_serial(mut serial: Vec<u8>) -> Vec<u8> {
    if let Some(first) = serial.first_mut() {
        *first &= 0x7f;
    }
    if serial.iter().all(|byte| *byte == 0) {
        if let Some(last) = serial.last_mut() {
            *last = 1;
        }
    }
    serial
}

#[async_trait]
impl AttestationIssuer for SelfSignedIssuer {
    type Attestation = SelfSignedAttestation;

    async fn issue(&self) -> Result<SelfSignedAttestation, AttestationError> {
        self.generate()
    }
}

/// A DER certificate and the ephemeral P-256 key it certifies.
pub struct SelfSignedAttestation {
    certificate: Vec<u8>,
    key: SigningKey,
}

impl SelfSignedAttestation {
    /// The attestation's public key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.key.verifying_key()
    }

    /// The SubjectPublicKeyInfo DER of the attestation key, as embedded in
    /// the certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be encoded.
    pub fn public_key_der(&self) -> Result<Vec<u8>, AttestationError> {
        self.verifying_key()
            .to_public_key_der()
            .map(|document| document.as_bytes().to_vec())
            .map_err(|error| AttestationError::Generation(error.to_string()))
    }
}

impl std::fmt::Debug for SelfSignedAttestation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfSignedAttestation")
            .field("certificate_len", &self.certificate.len())
            .finish_non_exhaustive()
    }
}

impl Attestation for SelfSignedAttestation {
    fn to_der(&self) -> &[u8] {
        &self.certificate
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, AttestationError> {
        let signature: Signature = self
            .key
            .try_sign(data)
            .map_err(|error| AttestationError::Signing(error.to_string()))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }
}
