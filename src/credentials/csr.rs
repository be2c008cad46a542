//! PKCS#10 certificate signing requests.
//!
//! The gateway's certificate authority issues certificates for a subject made
//! of exactly three attributes: organization (`O`), common name (`CN`, the
//! alias of the computer certificate) and `serialNumber` (the taxpayer id,
//! e.g. `CUIT 20123456789`). No extensions are requested.

use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKeyRef, Private};
use openssl::x509::{X509NameBuilder, X509ReqBuilder};
use tracing::debug;

use super::pem;
use crate::{Error, Result};

/// PKCS#10 version field value (v1 is encoded as 0).
const X509_REQ_VERSION_1: i32 = 0;

/// Builds signed PKCS#10 requests.
pub struct CertificateRequestBuilder;

impl CertificateRequestBuilder {
    /// Build a CSR from a PEM private key and the three subject attributes.
    ///
    /// Returns the request as PEM with label `CERTIFICATE REQUEST`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidKeyFormat`] if the key block is missing or mislabeled
    /// - [`Error::KeyParse`] if the key bytes are not a valid RSA key
    /// - [`Error::CsrGeneration`] if building or signing the request fails
    pub fn build(
        private_key_pem: &[u8],
        organization: &str,
        common_name: &str,
        serial_number: &str,
    ) -> Result<Vec<u8>> {
        let key = pem::parse_rsa_private_key(private_key_pem)?;
        Self::build_with_key(&key, organization, common_name, serial_number)
    }

    /// Build a CSR from an already-parsed key.
    pub fn build_with_key(
        key: &PKeyRef<Private>,
        organization: &str,
        common_name: &str,
        serial_number: &str,
    ) -> Result<Vec<u8>> {
        let mut name = X509NameBuilder::new().map_err(csr_err("create subject"))?;
        name.append_entry_by_nid(Nid::ORGANIZATIONNAME, organization)
            .map_err(csr_err("set organization"))?;
        name.append_entry_by_nid(Nid::COMMONNAME, common_name)
            .map_err(csr_err("set common name"))?;
        name.append_entry_by_nid(Nid::SERIALNUMBER, serial_number)
            .map_err(csr_err("set serial number"))?;
        let subject = name.build();

        let mut req = X509ReqBuilder::new().map_err(csr_err("create request"))?;
        req.set_version(X509_REQ_VERSION_1)
            .map_err(csr_err("set version"))?;
        req.set_subject_name(&subject)
            .map_err(csr_err("set subject"))?;
        req.set_pubkey(key).map_err(csr_err("set public key"))?;
        req.sign(key, MessageDigest::sha256())
            .map_err(csr_err("sign request"))?;

        let pem = req.build().to_pem().map_err(csr_err("encode request"))?;

        debug!(
            organization,
            common_name,
            serial_number,
            "certificate request built"
        );
        Ok(pem)
    }
}

fn csr_err(step: &'static str) -> impl Fn(openssl::error::ErrorStack) -> Error {
    move |e| Error::CsrGeneration(format!("Failed to {step}: {e}"))
}
