//! Error types for afip-creds

use std::io;

use thiserror::Error;

use crate::transport::Environment;

/// Result type alias for afip-creds
pub type Result<T> = std::result::Result<T, Error>;

/// Credential and transport provisioning errors
#[derive(Error, Debug)]
pub enum Error {
    /// RSA key generation failed (randomness source unavailable)
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Private key PEM block missing or carrying an unaccepted label
    #[error("Invalid private key format: {0}")]
    InvalidKeyFormat(String),

    /// Private key block decoded but is not a valid RSA key
    #[error("Failed to parse RSA private key: {0}")]
    KeyParse(String),

    /// Certificate PEM block missing or not labeled `CERTIFICATE`
    #[error("Invalid certificate format: {0}")]
    InvalidCertificateFormat(String),

    /// Certificate block decoded but is not a valid X.509 certificate
    #[error("Failed to parse X509 certificate: {0}")]
    CertificateParse(String),

    /// CSR construction or signing failed
    #[error("CSR generation failed: {0}")]
    CsrGeneration(String),

    /// Signed-data structure could not be created
    #[error("Failed to create signed data: {0}")]
    EnvelopeInit(String),

    /// Certificate and key could not be attached as signer
    #[error("Failed to add signer to PKCS7: {0}")]
    SignerAttach(String),

    /// Signed-data structure could not be finalized or serialized
    #[error("Failed to finalize PKCS7 envelope: {0}")]
    EnvelopeFinalize(String),

    /// Envelope signature did not verify
    #[error("Envelope verification failed: {0}")]
    EnvelopeVerify(String),

    /// No endpoint configured for the service in the environment
    #[error("Unknown service name: {service} ({environment})")]
    UnknownService {
        /// Requested logical service name
        service: String,
        /// Requested environment
        environment: Environment,
    },

    /// Endpoint table contains an unusable URL
    #[error("Endpoint table misconfigured: {0}")]
    EndpointTable(String),

    /// Local TLS library rejected the legacy gateway parameters
    #[error("TLS configuration rejected: {0}")]
    TlsConfig(String),

    /// HTTPS connector could not be constructed
    #[error("Transport construction failed: {0}")]
    TransportInit(String),

    /// Request through the resolved client failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request through the resolved client exceeded its deadline
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// `true` for errors caused by bad caller input or lookups.
    ///
    /// These are deterministic: replaying the same input fails the same way.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidKeyFormat(_)
                | Self::KeyParse(_)
                | Self::InvalidCertificateFormat(_)
                | Self::CertificateParse(_)
                | Self::UnknownService { .. }
        )
    }

    /// `true` for failures of the one-time transport initialization.
    #[must_use]
    pub fn is_transport_init(&self) -> bool {
        matches!(
            self,
            Self::EndpointTable(_) | Self::TlsConfig(_) | Self::TransportInit(_)
        )
    }
}
