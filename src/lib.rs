//! AFIP credential and transport provisioning
//!
//! Prepares everything a client needs before it can call the tax authority's
//! web services:
//!
//! - **Key material**: RSA 2048 keys serialized as `RSA PRIVATE KEY` PEM
//! - **Certificate requests**: PKCS#10 with the `O`, `CN`, `serialNumber` subject
//!   the gateway expects
//! - **Login envelopes**: detached CMS `SignedData` over a ticket request, with
//!   the signer certificate embedded
//! - **Transport**: one shared HTTPS client pinned to the legacy TLS parameters
//!   the gateway still requires, resolved per service and environment
//!
//! ```no_run
//! use afip_creds::credentials::{CertificateRequestBuilder, KeyMaterialGenerator};
//! use afip_creds::transport::{Environment, TransportRegistry, WSAA};
//!
//! # fn main() -> afip_creds::Result<()> {
//! let key = KeyMaterialGenerator::generate()?;
//! let pem = KeyMaterialGenerator::serialize(&key)?;
//! let csr = CertificateRequestBuilder::build(&pem, "Acme", "acme", "CUIT 20123456789")?;
//! # let _ = csr;
//!
//! let wsaa = TransportRegistry::global().resolve(WSAA, Environment::Sandbox)?;
//! println!("{}", wsaa.endpoint.url);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod transport;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so PEM/DER output on stdout stays clean.
    match format {
        Some("json") => {
            subscriber
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to install subscriber: {e}")))?;
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to install subscriber: {e}")))?;
        }
    }

    Ok(())
}
