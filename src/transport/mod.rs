//! Transport provisioning for the gateway's web services.
//!
//! - [`endpoints`]: `(service, environment)` → URL table
//! - [`tls`]: the fixed legacy TLS parameters
//! - [`client`]: HTTPS client built from those parameters
//! - [`registry`]: once-only transport construction and endpoint cache

pub mod client;
pub mod endpoints;
pub mod registry;
pub mod tls;

pub use client::{GatewayClient, GatewayResponse};
pub use endpoints::{
    EndpointTable, Environment, ServiceEndpoint, WS_SR_CONSTANCIA_INSCRIPCION, WS_SR_PADRON_A13,
    WSAA, WSFE,
};
pub use registry::{ResolvedService, TransportRegistry};
pub use tls::{LEGACY_GATEWAY_TLS, TlsProtocol, TransportConfig};
