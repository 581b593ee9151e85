//! SPNEGO credential propagation for gRPC clients
//!
//! This library transparently injects a Kerberos/SPNEGO negotiation
//! credential into the `authorization` header of every outgoing gRPC call, so
//! the receiving service can authenticate the caller without the caller's
//! code performing authentication explicitly.
//!
//! ## Core Components
//!
//! - **SpnegoClientInterceptor**: per-call orchestration: config resolution,
//!   TGT validity, service-ticket negotiation, header injection
//! - **InterceptorConfig**: per-call environment snapshot
//!   (`KRB5_CONFIG`, `APP_BIN_PATH`, `CLIENT_USER_PRINCIPAL_NAME`,
//!   `IMPERSONATE_CLIENT_USER`)
//! - **EndpointIdentity**: the channel's remote identity, carrying the target
//!   service UPN as its resource claim
//! - **inject_authorization**: idempotent header mutation; a pre-existing
//!   non-empty value always wins
//!
//! ## Design Philosophy
//!
//! - **Fail open**: every pipeline error is logged and the call proceeds
//!   unauthenticated; the receiving service's own rejection is the only
//!   user-visible symptom
//! - **Typed failures**: each step returns an explicit error instead of
//!   relying on a catch-all, so the never-abort contract is testable
//! - **Nothing cached per call**: configuration and tokens are per-call,
//!   stack-scoped; only the TGT manager outlives a call
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use grpc_spnego_propagation::{EndpointIdentity, SpnegoClientInterceptor};
//! use std::sync::Arc;
//!
//! # fn negotiator() -> Arc<dyn kerberos_credentials::Negotiate> { unimplemented!() }
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let identity = EndpointIdentity::upn("HTTP/target.example.com@EXAMPLE.COM");
//! let interceptor = SpnegoClientInterceptor::new(Some(identity), negotiator());
//!
//! let channel = tonic::transport::Channel::from_static("http://[::1]:50051")
//!     .connect()
//!     .await?;
//!
//! // Every request on this client now carries "authorization: Negotiate ..."
//! // let mut client = RouteServiceClient::with_interceptor(channel, interceptor);
//! # Ok(())
//! # }
//! ```
//!
//! With the `gssapi` feature (requires the MIT Kerberos native libraries),
//! [`SpnegoClientInterceptor::for_endpoint`] wires in the real GSSAPI
//! negotiator. Deployments that also enable `IMPERSONATE_CLIENT_USER` attach
//! the separate impersonation interceptor behind this one; this crate only
//! carries the flag.

mod client;
mod config;
mod headers;
mod identity;

pub use client::SpnegoClientInterceptor;
pub use config::{
    ConfigError, InterceptorConfig, APP_BIN_PATH_ENV, CLIENT_UPN_ENV, DEFAULT_APP_BIN_PATH,
    IMPERSONATE_ENV, KRB5_CONFIG_ENV,
};
pub use headers::{inject_authorization, AUTHORIZATION_HEADER};
pub use identity::EndpointIdentity;

// Re-export the credential-lifecycle surface so callers need one import.
pub use kerberos_credentials::{
    preflight, KerberosTooling, Negotiate, NegotiationError, NegotiationToken, TgtError,
    TgtManager,
};
