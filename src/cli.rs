//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::transport::Environment;

/// AFIP credential and transport provisioning
#[derive(Parser, Debug)]
#[command(name = "afip-creds")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "AFIP_CREDS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "warn",
        env = "AFIP_CREDS_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "AFIP_CREDS_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate an RSA 2048 private key
    Keygen {
        /// Output file (defaults to `credentials.key_path`)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Build a certificate signing request for an existing key
    Csr {
        /// Private key PEM (defaults to `credentials.key_path`)
        #[arg(short, long)]
        key: Option<PathBuf>,

        /// Output file (defaults to `credentials.csr_path`)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Subject organization (O)
        #[arg(long)]
        org: Option<String>,

        /// Subject common name (CN)
        #[arg(long)]
        cn: Option<String>,

        /// Subject serial number, e.g. "CUIT 20123456789"
        #[arg(long)]
        serial: Option<String>,
    },

    /// Produce a detached CMS signature over a payload
    Sign {
        /// File whose bytes are signed, e.g. a login ticket request
        #[arg(short, long, required = true)]
        payload: PathBuf,

        /// Signer certificate PEM (defaults to `credentials.cert_path`)
        #[arg(long)]
        cert: Option<PathBuf>,

        /// Private key PEM (defaults to `credentials.key_path`)
        #[arg(short, long)]
        key: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Emit base64 instead of raw DER
        #[arg(long)]
        base64: bool,
    },

    /// Check a detached envelope against its payload
    Verify {
        /// DER envelope file
        #[arg(short, long, required = true)]
        envelope: PathBuf,

        /// Payload the envelope was made over
        #[arg(short, long, required = true)]
        payload: PathBuf,
    },

    /// Resolve a service to its endpoint and build the transport
    Resolve {
        /// Logical service name, e.g. wsaa or wsfe
        #[arg(required = true)]
        service: String,

        /// Environment (production, sandbox); defaults to the configured one
        #[arg(long)]
        env: Option<Environment>,

        /// Fetch the endpoint through the transport and report the status
        #[arg(long)]
        probe: bool,
    },

    /// List configured services
    Services {
        /// Environment (production, sandbox); defaults to the configured one
        #[arg(long)]
        env: Option<Environment>,
    },
}
