//! Configuration management

use std::{collections::HashMap, env, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::transport::{EndpointTable, Environment};
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    /// Variables are set into the process environment for `${VAR}` resolution.
    pub env_files: Vec<String>,
    /// Environment used when a command does not name one
    pub environment: Environment,
    /// Key, certificate and CSR locations plus the default CSR subject
    pub credentials: CredentialsConfig,
    /// Request and connect timeouts for the gateway transport
    pub transport: TransportSettings,
    /// Endpoint overrides merged over the built-in table
    pub services: ServicesConfig,
}

/// Credential file locations and CSR subject defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// PEM private key
    pub key_path: String,
    /// PEM certificate issued by the gateway
    pub cert_path: String,
    /// Where `csr` writes the request
    pub csr_path: String,
    /// Subject organization (`O`)
    pub organization: Option<String>,
    /// Subject common name (`CN`), usually the alias registered with the gateway
    pub common_name: Option<String>,
    /// Subject serial number, e.g. `CUIT 20123456789`
    pub serial_number: Option<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            key_path: "afip.key".to_string(),
            cert_path: "afip.crt".to_string(),
            csr_path: "afip.csr".to_string(),
            organization: None,
            common_name: None,
            serial_number: None,
        }
    }
}

/// Timeouts for requests through the gateway transport.
///
/// TLS parameters are fixed and deliberately absent here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Deadline for a whole request, body included
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Deadline for establishing the TCP connection
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Per-environment `service: url` overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Production overrides
    pub production: HashMap<String, String>,
    /// Sandbox overrides
    pub sandbox: HashMap<String, String>,
}

impl ServicesConfig {
    /// Overrides for one environment
    pub fn for_environment(&self, environment: Environment) -> &HashMap<String, String> {
        match environment {
            Environment::Production => &self.production,
            Environment::Sandbox => &self.sandbox,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // AFIP_CREDS_TRANSPORT__REQUEST_TIMEOUT=5s etc.
        figment = figment.merge(Env::prefixed("AFIP_CREDS_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.load_env_files();
        config.expand_env_vars()?;

        Ok(config)
    }

    /// Built-in endpoints with the configured overrides applied.
    pub fn endpoint_table(&self) -> EndpointTable {
        let mut table = EndpointTable::builtin();
        for environment in Environment::ALL {
            table.merge(environment, self.services.for_environment(environment));
        }
        table
    }

    /// Load environment files into the process environment.
    /// Supports ~ expansion. Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs::home_dir() {
                    path_str.replacen('~', &home.display().to_string(), 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => {
                        tracing::info!("Loaded env file: {expanded}");
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load env file {expanded}: {e}");
                    }
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }

    /// Expand ${VAR} and ${VAR:-default} in credential paths and service URLs
    fn expand_env_vars(&mut self) -> Result<()> {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
            .map_err(|e| Error::Config(format!("Invalid expansion pattern: {e}")))?;

        let creds = &mut self.credentials;
        for path in [&mut creds.key_path, &mut creds.cert_path, &mut creds.csr_path] {
            *path = Self::expand_string(&re, path);
        }

        for url in self
            .services
            .production
            .values_mut()
            .chain(self.services.sandbox.values_mut())
        {
            *url = Self::expand_string(&re, url);
        }

        Ok(())
    }

    /// Expand environment variables in a string
    fn expand_string(re: &Regex, value: &str) -> String {
        re.replace_all(value, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map_or("", |m| m.as_str());
            env::var(var_name).unwrap_or_else(|_| default.to_string())
        })
        .into_owned()
    }
}
