//! RSA key material generation and serialization.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use tracing::debug;

use super::pem;
use crate::{Error, Result};

/// Modulus size of every generated key.
pub const RSA_KEY_BITS: u32 = 2048;

/// An RSA key pair.
///
/// The public half is derived from the private key. `Debug` never prints key
/// material.
#[derive(Clone)]
pub struct KeyPair {
    key: PKey<Private>,
}

impl KeyPair {
    /// Wrap an existing OpenSSL RSA key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyParse`] if `key` is not an RSA key.
    pub fn from_private_key(key: PKey<Private>) -> Result<Self> {
        key.rsa()
            .map_err(|e| Error::KeyParse(format!("not an RSA key: {e}")))?;
        Ok(Self { key })
    }

    /// Parse a PEM private key (`RSA PRIVATE KEY` or `PRIVATE KEY`).
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        Ok(Self {
            key: pem::parse_rsa_private_key(pem)?,
        })
    }

    /// Borrow the underlying OpenSSL key.
    pub fn private_key(&self) -> &PKey<Private> {
        &self.key
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> u32 {
        self.key.bits()
    }

    /// Private key as PEM, label `RSA PRIVATE KEY` (PKCS#1).
    pub fn to_pem(&self) -> Result<Vec<u8>> {
        self.key
            .rsa()
            .and_then(|rsa| rsa.private_key_to_pem())
            .map_err(|e| Error::KeyGeneration(format!("Failed to serialize private key: {e}")))
    }

    /// Public key as PEM, label `PUBLIC KEY` (SubjectPublicKeyInfo).
    pub fn public_key_pem(&self) -> Result<Vec<u8>> {
        self.key
            .public_key_to_pem()
            .map_err(|e| Error::KeyGeneration(format!("Failed to serialize public key: {e}")))
    }

    /// Write the PEM private key to `path`.
    ///
    /// Parent directories are created. On Unix the file is created with mode
    /// `0600`. The file handle is closed on every return path.
    pub fn write_private_key(&self, path: &Path) -> Result<()> {
        let pem = self.to_pem()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        file.write_all(&pem)?;
        file.sync_all()?;

        debug!(path = %path.display(), "private key written");
        Ok(())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

/// Generates fresh RSA key material.
pub struct KeyMaterialGenerator;

impl KeyMaterialGenerator {
    /// Generate a new 2048-bit RSA key pair from the OpenSSL CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyGeneration`] if the random source is unavailable.
    pub fn generate() -> Result<KeyPair> {
        let rsa = Rsa::generate(RSA_KEY_BITS)
            .map_err(|e| Error::KeyGeneration(format!("Failed to generate RSA keypair: {e}")))?;
        let key = PKey::from_rsa(rsa)
            .map_err(|e| Error::KeyGeneration(format!("Failed to create private key: {e}")))?;

        debug!(bits = RSA_KEY_BITS, "RSA key pair generated");
        Ok(KeyPair { key })
    }

    /// Serialize a key pair's private key as `RSA PRIVATE KEY` PEM.
    pub fn serialize(pair: &KeyPair) -> Result<Vec<u8>> {
        pair.to_pem()
    }
}
