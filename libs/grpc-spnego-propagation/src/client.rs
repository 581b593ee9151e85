//! Client-side SPNEGO interceptor
//!
//! One instance is attached per channel and invoked once per outgoing call,
//! possibly concurrently from multiple in-flight calls. Every failure inside
//! the per-call pipeline is logged and degrades to "send unauthenticated";
//! the interceptor never fails the call.

use std::sync::Arc;

use kerberos_credentials::{Negotiate, TgtError, TgtManager};
use tonic::metadata::MetadataMap;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::{debug, error, warn};

use crate::config::InterceptorConfig;
use crate::headers::inject_authorization;
use crate::identity::EndpointIdentity;

/// Injects a fresh `Negotiate` credential into each outgoing request.
///
/// Per-call pipeline: check identity, resolve configuration, ensure a valid
/// TGT, negotiate a service ticket, inject the header. Each step aborts to
/// "done without injection" on failure; the request always proceeds.
#[derive(Clone)]
pub struct SpnegoClientInterceptor {
    identity: Option<EndpointIdentity>,
    tgt: Arc<TgtManager>,
    negotiator: Arc<dyn Negotiate>,
}

impl SpnegoClientInterceptor {
    /// Interceptor for a channel whose remote identity is `identity`.
    ///
    /// `None` disables injection for the channel (logged per call as a
    /// warning, since the target principal cannot be determined).
    pub fn new(identity: Option<EndpointIdentity>, negotiator: Arc<dyn Negotiate>) -> Self {
        Self::with_components(identity, Arc::new(TgtManager::new()), negotiator)
    }

    /// Fully injected constructor, used by tests and by callers that share a
    /// [`TgtManager`] across channels.
    pub fn with_components(
        identity: Option<EndpointIdentity>,
        tgt: Arc<TgtManager>,
        negotiator: Arc<dyn Negotiate>,
    ) -> Self {
        Self {
            identity,
            tgt,
            negotiator,
        }
    }

    /// GSSAPI-backed interceptor for a channel.
    #[cfg(feature = "gssapi")]
    pub fn for_endpoint(identity: Option<EndpointIdentity>) -> Self {
        Self::new(identity, Arc::new(kerberos_credentials::GssNegotiator))
    }

    fn authorize(&self, metadata: &mut MetadataMap) {
        let Some(identity) = &self.identity else {
            warn!("skipping kerberos ticket injection because the remote identity (UPN) is not set");
            return;
        };

        let config = match InterceptorConfig::from_env() {
            Ok(config) => config,
            Err(err) => {
                error!(error = %err, "skipping kerberos ticket injection");
                return;
            }
        };
        if config.impersonation_enabled {
            debug!("client user impersonation is handled by the impersonation interceptor");
        }

        let client_upn = config.client_principal.as_str();
        let target_upn = identity.resource();
        debug!(client = client_upn, target = target_upn, "negotiating kerberos credential");

        match self.tgt.ensure_valid(&config.tooling(), client_upn) {
            Ok(()) => {}
            Err(err @ TgtError::MissingTool(_)) => {
                error!(error = %err, "kerberos tooling is missing, sending unauthenticated");
                return;
            }
            // Renewal failure is logged but negotiation is still attempted:
            // the cache may hold a ticket the KDC refused to refresh yet the
            // target still accepts.
            Err(err) => {
                error!(error = %err, "TGT renewal failed, attempting negotiation anyway");
            }
        }

        let token = match self.negotiator.negotiate(target_upn, client_upn) {
            Ok(token) => token,
            Err(err) => {
                error!(error = %err, "negotiation failed, sending unauthenticated");
                return;
            }
        };
        if token.is_empty() {
            debug!("negotiation produced an empty token, sending unauthenticated");
            return;
        }

        if inject_authorization(metadata, &token.authorization_value()) {
            debug!(target = target_upn, "authorization header injected");
        }
    }
}

impl Interceptor for SpnegoClientInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        // Never fails the call: all pipeline errors are logged inside
        // authorize and the request proceeds, with or without a credential.
        self.authorize(request.metadata_mut());
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerberos_credentials::{NegotiationError, NegotiationToken};

    struct StubNegotiator {
        result: fn() -> Result<NegotiationToken, NegotiationError>,
    }

    impl Negotiate for StubNegotiator {
        fn negotiate(
            &self,
            _target_upn: &str,
            _client_upn: &str,
        ) -> Result<NegotiationToken, NegotiationError> {
            (self.result)()
        }
    }

    fn never_negotiates() -> Arc<dyn Negotiate> {
        Arc::new(StubNegotiator {
            result: || panic!("negotiation must not be reached"),
        })
    }

    #[test]
    fn test_absent_identity_leaves_request_untouched() {
        let mut interceptor = SpnegoClientInterceptor::new(None, never_negotiates());

        let request = interceptor
            .call(Request::new(()))
            .expect("interceptor never fails the call");
        assert!(request.metadata().get("authorization").is_none());
    }

    #[test]
    fn test_call_always_returns_ok() {
        // No identity, no config, no tooling: every internal step would fail,
        // and the call must still go through.
        let mut interceptor = SpnegoClientInterceptor::new(None, never_negotiates());
        assert!(interceptor.call(Request::new(())).is_ok());
    }
}
