//! Service endpoint table.
//!
//! Maps `(service, environment)` to the URL the gateway publishes for it.
//! The built-in table covers the login service and the services most
//! clients need; deployments add or override entries through configuration.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Authentication and authorization service (login tickets).
pub const WSAA: &str = "wsaa";
/// Electronic invoicing service.
pub const WSFE: &str = "wsfe";
/// Registration certificate lookup (padron A5).
pub const WS_SR_CONSTANCIA_INSCRIPCION: &str = "ws_sr_constancia_inscripcion";
/// Taxpayer registry lookup (padron A13).
pub const WS_SR_PADRON_A13: &str = "ws_sr_padron_a13";

const PRODUCTION_ENDPOINTS: &[(&str, &str)] = &[
    (WSAA, "https://wsaa.afip.gov.ar/ws/services/LoginCms?wsdl"),
    (WSFE, "https://servicios1.afip.gov.ar/wsfev1/service.asmx?WSDL"),
    (
        WS_SR_CONSTANCIA_INSCRIPCION,
        "https://aws.afip.gov.ar/sr-padron/webservices/personaServiceA5?WSDL",
    ),
    (
        WS_SR_PADRON_A13,
        "https://aws.afip.gov.ar/sr-padron/webservices/personaServiceA13?WSDL",
    ),
];

const SANDBOX_ENDPOINTS: &[(&str, &str)] = &[
    (WSAA, "https://wsaahomo.afip.gov.ar/ws/services/LoginCms?wsdl"),
    (WSFE, "https://wswhomo.afip.gov.ar/wsfev1/service.asmx?WSDL"),
    (
        WS_SR_CONSTANCIA_INSCRIPCION,
        "https://awshomo.afip.gov.ar/sr-padron/webservices/personaServiceA5?WSDL",
    ),
    (
        WS_SR_PADRON_A13,
        "https://awshomo.afip.gov.ar/sr-padron/webservices/personaServiceA13?WSDL",
    ),
];

/// Gateway environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Live services.
    Production,
    /// Homologation (testing) services.
    #[default]
    Sandbox,
}

impl Environment {
    /// Both environments.
    pub const ALL: [Environment; 2] = [Environment::Production, Environment::Sandbox];

    /// Select by a `sandbox` flag, as most callers carry it.
    pub fn from_sandbox_flag(sandbox: bool) -> Self {
        if sandbox { Self::Sandbox } else { Self::Production }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Sandbox => "sandbox",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "sandbox" | "homo" | "homologation" => Ok(Self::Sandbox),
            other => Err(Error::Config(format!(
                "Unknown environment '{other}' (expected 'production' or 'sandbox')"
            ))),
        }
    }
}

/// A resolved endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEndpoint {
    /// Logical service name
    pub service: String,
    /// Environment the URL belongs to
    pub environment: Environment,
    /// Endpoint (WSDL) URL
    pub url: String,
}

/// Per-environment service → URL table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTable {
    entries: HashMap<Environment, BTreeMap<String, String>>,
}

impl EndpointTable {
    /// Table with no entries.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The published production and sandbox endpoints.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (service, url) in PRODUCTION_ENDPOINTS {
            table.insert(Environment::Production, *service, *url);
        }
        for (service, url) in SANDBOX_ENDPOINTS {
            table.insert(Environment::Sandbox, *service, *url);
        }
        table
    }

    /// Add or replace one entry.
    pub fn insert(
        &mut self,
        environment: Environment,
        service: impl Into<String>,
        url: impl Into<String>,
    ) {
        self.entries
            .entry(environment)
            .or_default()
            .insert(service.into(), url.into());
    }

    /// Merge `overrides` over this table; entries in `overrides` win.
    pub fn merge(&mut self, environment: Environment, overrides: &HashMap<String, String>) {
        for (service, url) in overrides {
            self.insert(environment, service.clone(), url.clone());
        }
    }

    /// Look up an endpoint.
    pub fn lookup(&self, service: &str, environment: Environment) -> Option<ServiceEndpoint> {
        self.entries
            .get(&environment)
            .and_then(|services| services.get(service))
            .map(|url| ServiceEndpoint {
                service: service.to_string(),
                environment,
                url: url.clone(),
            })
    }

    /// Services configured for `environment`, sorted by name.
    pub fn services(&self, environment: Environment) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .get(&environment)
            .into_iter()
            .flat_map(|services| services.iter().map(|(s, u)| (s.as_str(), u.as_str())))
    }

    /// Total number of entries across environments.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// `true` if no environment has entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check every URL is absolute `http(s)` with a host.
    ///
    /// Returns the distinct `scheme://host[:port]` origins on success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndpointTable`] naming the first offending entry.
    pub fn validate(&self) -> Result<Vec<String>> {
        let mut origins = Vec::new();
        for environment in Environment::ALL {
            for (service, raw) in self.services(environment) {
                let url = Url::parse(raw).map_err(|e| {
                    Error::EndpointTable(format!("{environment}/{service}: '{raw}': {e}"))
                })?;
                if !matches!(url.scheme(), "https" | "http") || url.host_str().is_none() {
                    return Err(Error::EndpointTable(format!(
                        "{environment}/{service}: '{raw}' is not an http(s) URL with a host"
                    )));
                }
                let origin = url.origin().ascii_serialization();
                if !origins.contains(&origin) {
                    origins.push(origin);
                }
            }
        }
        Ok(origins)
    }
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self::builtin()
    }
}
