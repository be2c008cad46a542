//! HTTPS client preconfigured for the legacy gateway.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper_openssl::client::legacy::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tracing::debug;

use super::tls::TransportConfig;
use crate::config::TransportSettings;
use crate::{Error, Result};

const USER_AGENT: &str = concat!("afip-creds/", env!("CARGO_PKG_VERSION"));

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Response from the gateway, fully buffered.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    /// HTTP status
    pub status: StatusCode,
    /// `Content-Type` header, if present and valid
    pub content_type: Option<String>,
    /// Response body
    pub body: Bytes,
}

impl GatewayResponse {
    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP client bound to the legacy TLS parameters.
///
/// Cheap to share behind an `Arc`; the underlying connection pool is safe
/// for concurrent use.
pub struct GatewayClient {
    inner: HttpsClient,
    tls: TransportConfig,
    request_timeout: Duration,
}

impl GatewayClient {
    /// Build a client from fixed TLS parameters and timeouts.
    ///
    /// # Errors
    ///
    /// - [`Error::TlsConfig`] if OpenSSL rejects the TLS parameters
    /// - [`Error::TransportInit`] if the HTTPS connector cannot be built
    pub fn new(tls: &TransportConfig, settings: &TransportSettings) -> Result<Self> {
        let ssl = tls.connector_builder()?;

        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);
        http.set_connect_timeout(Some(settings.connect_timeout));

        let https = HttpsConnector::with_connector(http, ssl)
            .map_err(|e| Error::TransportInit(format!("Failed to build HTTPS connector: {e}")))?;

        let inner = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build(https);

        Ok(Self {
            inner,
            tls: tls.clone(),
            request_timeout: settings.request_timeout,
        })
    }

    /// TLS parameters this client was built with.
    pub fn tls_config(&self) -> &TransportConfig {
        &self.tls
    }

    /// Deadline applied to each request.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// `GET` a URL, e.g. a service WSDL.
    pub async fn get(&self, url: &str) -> Result<GatewayResponse> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(url)
            .header(header::USER_AGENT, USER_AGENT)
            .body(Full::new(Bytes::new()))
            .map_err(|e| Error::Transport(format!("Invalid request for '{url}': {e}")))?;
        self.send(request).await
    }

    /// `POST` a body, e.g. a SOAP envelope.
    pub async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> Result<GatewayResponse> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::CONTENT_TYPE, content_type)
            .body(Full::new(body.into()))
            .map_err(|e| Error::Transport(format!("Invalid request for '{url}': {e}")))?;
        self.send(request).await
    }

    async fn send(&self, request: Request<Full<Bytes>>) -> Result<GatewayResponse> {
        let method = request.method().clone();
        let uri = request.uri().clone();

        let exchange = async {
            let response = self
                .inner
                .request(request)
                .await
                .map_err(|e| Error::Transport(format!("{method} {uri} failed: {e}")))?;

            let status = response.status();
            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| Error::Transport(format!("Failed to read body from {uri}: {e}")))?
                .to_bytes();

            Ok::<_, Error>(GatewayResponse {
                status,
                content_type,
                body,
            })
        };

        let response = tokio::time::timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| Error::Timeout(self.request_timeout))??;

        debug!(%method, %uri, status = %response.status, bytes = response.body.len(), "gateway request complete");
        Ok(response)
    }
}

impl fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayClient")
            .field("tls", &self.tls)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
