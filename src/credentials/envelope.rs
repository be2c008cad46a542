//! Detached CMS/PKCS#7 signed envelopes.
//!
//! A login ticket request is signed with the taxpayer's certificate and key
//! and sent as a CMS `SignedData` structure:
//!
//! ```text
//! ContentInfo (id-signedData)
//!   SignedData
//!     digestAlgorithms   { sha256 }
//!     encapContentInfo   { id-data, <absent> }      ← detached
//!     certificates       { signer certificate }     ← embedded
//!     signerInfos        { one SignerInfo }
//! ```
//!
//! The payload is never part of the output; a verifier needs the original
//! bytes to check the signature.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKeyRef, Private};
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509, X509Ref};
use tracing::debug;

use super::pem;
use crate::{Error, Result};

/// Serialized detached `SignedData` (DER).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    der: Vec<u8>,
}

impl SignedEnvelope {
    /// Wrap DER bytes received from elsewhere, e.g. for verification.
    pub fn from_der(der: Vec<u8>) -> Self {
        Self { der }
    }

    /// DER bytes.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Consume into DER bytes.
    pub fn into_der(self) -> Vec<u8> {
        self.der
    }

    /// Standard base64 of the DER bytes, the form the login service expects
    /// inside its `in0` request element.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.der)
    }

    /// Verify against `payload`; see [`verify_envelope`].
    pub fn verify(&self, payload: &[u8]) -> Result<X509> {
        verify_envelope(&self.der, payload)
    }
}

impl AsRef<[u8]> for SignedEnvelope {
    fn as_ref(&self) -> &[u8] {
        &self.der
    }
}

/// Builds detached, single-signer envelopes.
pub struct SignedEnvelopeBuilder;

impl SignedEnvelopeBuilder {
    /// Sign `payload` with the PEM certificate and matching PEM private key.
    ///
    /// Inputs are validated in order (key format, key parse, certificate
    /// format, certificate parse) and the first failure is returned before
    /// any signing work is done.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidKeyFormat`] / [`Error::KeyParse`] for the key
    /// - [`Error::InvalidCertificateFormat`] / [`Error::CertificateParse`] for
    ///   the certificate
    /// - [`Error::EnvelopeInit`], [`Error::SignerAttach`],
    ///   [`Error::EnvelopeFinalize`] for signing failures
    pub fn sign(
        payload: &[u8],
        certificate_pem: &[u8],
        private_key_pem: &[u8],
    ) -> Result<SignedEnvelope> {
        let key = pem::parse_rsa_private_key(private_key_pem)?;
        let certificate = pem::parse_certificate(certificate_pem)?;
        Self::sign_with(payload, &certificate, &key)
    }

    /// Sign with an already-parsed certificate and key.
    pub fn sign_with(
        payload: &[u8],
        certificate: &X509Ref,
        key: &PKeyRef<Private>,
    ) -> Result<SignedEnvelope> {
        // No certificates beyond the signer's own.
        let extra_certs = Stack::<X509>::new()
            .map_err(|e| Error::EnvelopeInit(e.to_string()))?;

        let certificate_key = certificate
            .public_key()
            .map_err(|e| Error::SignerAttach(format!("certificate public key unreadable: {e}")))?;
        if !certificate_key.public_eq(key) {
            return Err(Error::SignerAttach(
                "private key does not match certificate".into(),
            ));
        }

        // BINARY: sign the bytes as given, no MIME canonicalization.
        // NOSMIMECAP: only the mandatory signed attributes.
        let flags = Pkcs7Flags::BINARY | Pkcs7Flags::NOSMIMECAP | Pkcs7Flags::DETACHED;

        // Pkcs7::sign attaches the signer and finalizes in one call, so a
        // failure in either step surfaces as SignerAttach. EnvelopeFinalize
        // covers DER serialization.
        let signed = Pkcs7::sign(certificate, key, &extra_certs, payload, flags)
            .map_err(|e| Error::SignerAttach(e.to_string()))?;

        let der = signed
            .to_der()
            .map_err(|e| Error::EnvelopeFinalize(e.to_string()))?;

        debug!(
            payload_len = payload.len(),
            envelope_len = der.len(),
            "detached envelope signed"
        );
        Ok(SignedEnvelope { der })
    }
}

/// Verify a detached envelope against `payload` using only the certificate
/// embedded in it.
///
/// The certificate chain is not validated; this checks that the signature
/// was made over `payload` by the key of the embedded certificate. Returns
/// the signer certificate.
///
/// # Errors
///
/// Returns [`Error::EnvelopeVerify`] if the envelope cannot be decoded, has
/// no signer, or the signature does not match `payload`.
pub fn verify_envelope(envelope_der: &[u8], payload: &[u8]) -> Result<X509> {
    let envelope = Pkcs7::from_der(envelope_der)
        .map_err(|e| Error::EnvelopeVerify(format!("not a PKCS7 structure: {e}")))?;

    let no_certs = Stack::<X509>::new().map_err(|e| Error::EnvelopeVerify(e.to_string()))?;
    let store = X509StoreBuilder::new()
        .map_err(|e| Error::EnvelopeVerify(e.to_string()))?
        .build();

    envelope
        .verify(
            &no_certs,
            &store,
            Some(payload),
            None,
            Pkcs7Flags::NOVERIFY | Pkcs7Flags::BINARY,
        )
        .map_err(|e| Error::EnvelopeVerify(e.to_string()))?;

    let signers = envelope
        .signers(&no_certs, Pkcs7Flags::empty())
        .map_err(|e| Error::EnvelopeVerify(e.to_string()))?;
    let signer = signers
        .iter()
        .next()
        .ok_or_else(|| Error::EnvelopeVerify("envelope has no signer".into()))?;

    Ok(signer.to_owned())
}
