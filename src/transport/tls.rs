//! TLS parameters for the legacy gateway.
//!
//! The gateway's servers only complete a handshake with RSA key exchange and
//! `AES128-SHA` (`TLS_RSA_WITH_AES_128_CBC_SHA`), and some still negotiate
//! TLS 1.0. Modern defaults (TLS 1.2+ only, ECDHE/AEAD suites, OpenSSL
//! security level 2) make every handshake fail, so these values are pinned
//! here and are not exposed through configuration.
//!
//! Do not replace [`LEGACY_GATEWAY_TLS`] with library defaults.

use std::fmt;

use openssl::ssl::{SslConnector, SslConnectorBuilder, SslMethod, SslVersion};
use tracing::debug;

use crate::{Error, Result};

/// TLS protocol versions the transport can be pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsProtocol {
    /// TLS 1.0
    Tls10,
    /// TLS 1.1
    Tls11,
    /// TLS 1.2
    Tls12,
}

impl TlsProtocol {
    fn ssl_version(self) -> SslVersion {
        match self {
            Self::Tls10 => SslVersion::TLS1,
            Self::Tls11 => SslVersion::TLS1_1,
            Self::Tls12 => SslVersion::TLS1_2,
        }
    }
}

impl fmt::Display for TlsProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tls10 => "TLSv1.0",
            Self::Tls11 => "TLSv1.1",
            Self::Tls12 => "TLSv1.2",
        })
    }
}

/// Fixed TLS parameters for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Lowest protocol version offered.
    pub min_protocol: TlsProtocol,
    /// Highest protocol version offered. Capped below TLS 1.3 so that no
    /// suite outside `cipher_suites` is ever offered.
    pub max_protocol: TlsProtocol,
    /// OpenSSL cipher names; the complete list offered in the ClientHello.
    pub cipher_suites: &'static [&'static str],
    /// OpenSSL security level. Level 0 is required for TLS 1.0/1.1 with
    /// SHA-1 MACs on OpenSSL 3.
    pub security_level: u32,
}

/// The parameters the gateway requires.
pub const LEGACY_GATEWAY_TLS: TransportConfig = TransportConfig {
    min_protocol: TlsProtocol::Tls10,
    max_protocol: TlsProtocol::Tls12,
    cipher_suites: &["AES128-SHA"],
    security_level: 0,
};

impl TransportConfig {
    /// Colon-separated OpenSSL cipher list.
    pub fn cipher_list(&self) -> String {
        self.cipher_suites.join(":")
    }

    /// Build an OpenSSL connector configured with these parameters.
    ///
    /// Peer and hostname verification stay enabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TlsConfig`] if the local OpenSSL rejects any
    /// parameter, e.g. a build without the cipher compiled in.
    pub fn connector_builder(&self) -> Result<SslConnectorBuilder> {
        let mut builder = SslConnector::builder(SslMethod::tls_client())
            .map_err(|e| Error::TlsConfig(format!("Failed to create SSL context: {e}")))?;

        builder.set_security_level(self.security_level);
        builder
            .set_min_proto_version(Some(self.min_protocol.ssl_version()))
            .map_err(|e| {
                Error::TlsConfig(format!("Minimum protocol {} rejected: {e}", self.min_protocol))
            })?;
        builder
            .set_max_proto_version(Some(self.max_protocol.ssl_version()))
            .map_err(|e| {
                Error::TlsConfig(format!("Maximum protocol {} rejected: {e}", self.max_protocol))
            })?;

        let ciphers = self.cipher_list();
        builder
            .set_cipher_list(&ciphers)
            .map_err(|e| Error::TlsConfig(format!("Cipher list '{ciphers}' rejected: {e}")))?;

        debug!(
            min_protocol = %self.min_protocol,
            max_protocol = %self.max_protocol,
            ciphers = %ciphers,
            "legacy TLS connector configured"
        );
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_parameters_are_pinned() {
        assert_eq!(LEGACY_GATEWAY_TLS.min_protocol, TlsProtocol::Tls10);
        assert_eq!(LEGACY_GATEWAY_TLS.cipher_suites, &["AES128-SHA"]);
        assert_eq!(LEGACY_GATEWAY_TLS.cipher_list(), "AES128-SHA");
    }

    #[test]
    fn legacy_connector_builds() {
        let builder = LEGACY_GATEWAY_TLS.connector_builder().unwrap();
        let connector = builder.build();
        assert!(connector.configure().unwrap().into_ssl("wsaa.afip.gov.ar").is_ok());
    }

    #[test]
    fn connector_pins_minimum_protocol() {
        let mut builder = LEGACY_GATEWAY_TLS.connector_builder().unwrap();
        assert!(builder.min_proto_version() == Some(SslVersion::TLS1));
        // TLS 1.3 suites are configured separately and would bypass the list.
        assert!(builder.max_proto_version() == Some(SslVersion::TLS1_2));
    }

    #[test]
    fn unknown_cipher_is_a_tls_config_error() {
        let bogus = TransportConfig {
            cipher_suites: &["NOT-A-REAL-CIPHER"],
            ..LEGACY_GATEWAY_TLS
        };
        let Err(err) = bogus.connector_builder() else {
            panic!("bogus cipher list accepted");
        };
        assert!(matches!(err, Error::TlsConfig(_)));
        assert!(err.to_string().contains("NOT-A-REAL-CIPHER"));
    }

    #[test]
    fn protocol_display_names() {
        assert_eq!(TlsProtocol::Tls10.to_string(), "TLSv1.0");
        assert_eq!(TlsProtocol::Tls12.to_string(), "TLSv1.2");
    }
}
