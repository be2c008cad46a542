//! Transport registry.
//!
//! Owns the single HTTP transport shared by every service of the gateway and
//! remembers the last URL resolved for each service.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::client::GatewayClient;
use super::endpoints::{EndpointTable, Environment, ServiceEndpoint};
use super::tls::{LEGACY_GATEWAY_TLS, TransportConfig};
use crate::config::TransportSettings;
use crate::{Error, Result};

static GLOBAL: OnceCell<TransportRegistry> = OnceCell::new();

/// Outcome of [`TransportRegistry::resolve`].
#[derive(Debug, Clone)]
pub struct ResolvedService {
    /// The shared transport, identical for every service.
    pub client: Arc<GatewayClient>,
    /// Where the service lives.
    pub endpoint: ServiceEndpoint,
}

/// Resolves services to endpoints and hands out the shared transport.
///
/// The transport is built on the first successful [`resolve`](Self::resolve)
/// and reused afterwards. Concurrent first callers block until the build
/// finishes and all observe the same instance. A failed build is reported to
/// the caller that ran it and attempted again on the next call.
pub struct TransportRegistry {
    endpoints: EndpointTable,
    tls: TransportConfig,
    settings: TransportSettings,
    transport: OnceCell<Arc<GatewayClient>>,
    resolved: Mutex<HashMap<String, String>>,
    builds: AtomicUsize,
}

impl TransportRegistry {
    /// Create a registry over `endpoints`. Nothing is built until the first
    /// resolution.
    pub fn new(endpoints: EndpointTable, settings: TransportSettings) -> Self {
        Self {
            endpoints,
            tls: LEGACY_GATEWAY_TLS,
            settings,
            transport: OnceCell::new(),
            resolved: Mutex::new(HashMap::new()),
            builds: AtomicUsize::new(0),
        }
    }

    /// Process-wide registry.
    ///
    /// Uses the instance passed to [`install_global`](Self::install_global)
    /// if one was installed first, otherwise the built-in endpoint table
    /// with default timeouts.
    pub fn global() -> &'static TransportRegistry {
        GLOBAL.get_or_init(|| Self::new(EndpointTable::builtin(), TransportSettings::default()))
    }

    /// Install `registry` as the process-wide instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a global registry already exists.
    pub fn install_global(registry: TransportRegistry) -> Result<&'static TransportRegistry> {
        GLOBAL
            .set(registry)
            .map_err(|_| Error::Config("Global transport registry already initialized".into()))?;
        GLOBAL
            .get()
            .ok_or_else(|| Error::Config("Global transport registry missing after install".into()))
    }

    /// Resolve `service` in `environment` to its endpoint and the shared
    /// transport.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownService`] if the table has no entry; the cache is
    ///   left untouched and no transport is built
    /// - [`Error::EndpointTable`], [`Error::TlsConfig`] or
    ///   [`Error::TransportInit`] if the one-time build fails
    pub fn resolve(&self, service: &str, environment: Environment) -> Result<ResolvedService> {
        let endpoint = self
            .endpoints
            .lookup(service, environment)
            .ok_or_else(|| Error::UnknownService {
                service: service.to_string(),
                environment,
            })?;

        let client = self.client()?;

        self.resolved
            .lock()
            .insert(endpoint.service.clone(), endpoint.url.clone());
        debug!(service, %environment, url = %endpoint.url, "endpoint resolved");

        Ok(ResolvedService { client, endpoint })
    }

    /// The shared transport, building it on first use.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn client(&self) -> Result<Arc<GatewayClient>> {
        self.transport
            .get_or_try_init(|| self.build_transport())
            .cloned()
    }

    fn build_transport(&self) -> Result<Arc<GatewayClient>> {
        let origins = self.endpoints.validate()?;
        let client = GatewayClient::new(&self.tls, &self.settings)?;
        self.builds.fetch_add(1, Ordering::SeqCst);

        info!(
            origins = ?origins,
            min_protocol = %self.tls.min_protocol,
            ciphers = %self.tls.cipher_list(),
            "gateway transport built"
        );
        Ok(Arc::new(client))
    }

    /// Last URL resolved for `service`, in whichever environment.
    pub fn resolved_endpoint(&self, service: &str) -> Option<String> {
        self.resolved.lock().get(service).cloned()
    }

    /// Number of services resolved so far.
    pub fn resolved_count(&self) -> usize {
        self.resolved.lock().len()
    }

    /// How many transports this registry has built. At most one.
    pub fn transports_built(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// The endpoint table.
    pub fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    /// TLS parameters the transport uses.
    pub fn tls_config(&self) -> &TransportConfig {
        &self.tls
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("endpoints", &self.endpoints.len())
            .field("built", &self.transport.get().is_some())
            .field("resolved", &self.resolved_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::endpoints::{WSAA, WSFE};

    fn registry() -> TransportRegistry {
        TransportRegistry::new(EndpointTable::builtin(), TransportSettings::default())
    }

    #[test]
    fn nothing_is_built_before_first_resolve() {
        let registry = registry();
        assert_eq!(registry.transports_built(), 0);
        assert_eq!(registry.resolved_count(), 0);
    }

    #[test]
    fn resolve_returns_configured_url_and_caches_it() {
        // GIVEN: a fresh registry
        let registry = registry();

        // WHEN: resolving the login service in production
        let resolved = registry.resolve(WSAA, Environment::Production).unwrap();

        // THEN: the configured URL is returned and recorded
        assert_eq!(
            resolved.endpoint.url,
            "https://wsaa.afip.gov.ar/ws/services/LoginCms?wsdl"
        );
        assert_eq!(
            registry.resolved_endpoint(WSAA).as_deref(),
            Some(resolved.endpoint.url.as_str())
        );
        assert_eq!(registry.transports_built(), 1);
    }

    #[test]
    fn services_share_one_transport() {
        let registry = registry();
        let a = registry.resolve(WSAA, Environment::Sandbox).unwrap();
        let b = registry.resolve(WSFE, Environment::Production).unwrap();
        assert!(Arc::ptr_eq(&a.client, &b.client));
        assert_eq!(registry.transports_built(), 1);
        assert_eq!(registry.resolved_count(), 2);
    }

    #[test]
    fn unknown_service_leaves_registry_untouched() {
        // GIVEN: a registry with one resolution recorded
        let registry = registry();
        registry.resolve(WSAA, Environment::Production).unwrap();

        // WHEN: resolving a service that is not in the table
        let err = registry
            .resolve("not_a_real_service", Environment::Production)
            .unwrap_err();

        // THEN: the lookup error names it and the cache is unchanged
        assert!(matches!(err, Error::UnknownService { ref service, .. } if service == "not_a_real_service"));
        assert_eq!(registry.resolved_count(), 1);
        assert!(registry.resolved_endpoint("not_a_real_service").is_none());
    }

    #[test]
    fn unknown_service_does_not_build_transport() {
        let registry = registry();
        assert!(registry.resolve("nope", Environment::Sandbox).is_err());
        assert_eq!(registry.transports_built(), 0);
    }

    #[test]
    fn last_resolution_wins_in_cache() {
        let registry = registry();
        registry.resolve(WSFE, Environment::Production).unwrap();
        let sandbox = registry.resolve(WSFE, Environment::Sandbox).unwrap();
        assert_eq!(registry.resolved_endpoint(WSFE), Some(sandbox.endpoint.url));
    }

    #[test]
    fn invalid_table_fails_init_and_is_retried() {
        // GIVEN: a table whose only entry is not a URL
        let mut table = EndpointTable::empty();
        table.insert(Environment::Production, WSAA, "not a url");
        let registry = TransportRegistry::new(table, TransportSettings::default());

        // WHEN: resolving twice
        let first = registry.resolve(WSAA, Environment::Production).unwrap_err();
        let second = registry.resolve(WSAA, Environment::Production).unwrap_err();

        // THEN: both calls report the table and nothing is cached
        assert!(matches!(first, Error::EndpointTable(_)));
        assert!(second.is_transport_init());
        assert_eq!(registry.transports_built(), 0);
        assert_eq!(registry.resolved_count(), 0);
    }

    #[test]
    fn registry_uses_legacy_tls() {
        let registry = registry();
        let client = registry.client().unwrap();
        assert_eq!(client.tls_config(), &LEGACY_GATEWAY_TLS);
        assert_eq!(registry.tls_config(), &LEGACY_GATEWAY_TLS);
    }
}
