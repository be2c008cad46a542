//! Credential generation for the gateway's login service.
//!
//! ```text
//! KeyMaterialGenerator::generate()      → KeyPair (RSA 2048, "RSA PRIVATE KEY")
//!   → CertificateRequestBuilder::build() → "CERTIFICATE REQUEST" PEM
//!   → (certificate issued out-of-band by the tax authority)
//!   → SignedEnvelopeBuilder::sign()      → detached CMS SignedData (DER)
//! ```
//!
//! # Modules
//!
//! - [`key`]: RSA key generation and PEM serialization
//! - [`csr`]: PKCS#10 request building
//! - [`envelope`]: detached PKCS#7 signing and verification
//! - [`pem`]: label-checked PEM decoding shared by the builders
//!
//! Every operation is synchronous and holds no shared state, so all of them
//! may be called concurrently from independent threads.

pub mod csr;
pub mod envelope;
pub mod key;
pub mod pem;

#[cfg(test)]
pub(crate) mod test_support;

pub use csr::CertificateRequestBuilder;
pub use envelope::{SignedEnvelope, SignedEnvelopeBuilder, verify_envelope};
pub use key::{KeyMaterialGenerator, KeyPair, RSA_KEY_BITS};
