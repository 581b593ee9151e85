//! Service-ticket negotiation
//!
//! Produces the opaque security-context token that proves the client's
//! identity to the target service. The GSSAPI handshake itself is delegated
//! to the `libgssapi` crate behind the `gssapi` cargo feature; everything
//! above the `Negotiate` trait is testable without the native libraries.

use std::ops::Deref;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

/// HTTP authentication scheme label for SPNEGO tokens.
pub const NEGOTIATE_SCHEME: &str = "Negotiate";

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("failed to resolve principal '{principal}': {message}")]
    InvalidPrincipal { principal: String, message: String },

    #[error("failed to acquire credentials for '{principal}' from the keytab: {message}")]
    CredentialAcquisition { principal: String, message: String },

    #[error("security context negotiation with '{target}' failed: {message}")]
    Handshake { target: String, message: String },
}

/// Opaque security-context token, produced fresh per call and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationToken(Vec<u8>);

impl NegotiationToken {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Format the token as a transport authorization header value:
    /// `"Negotiate " + base64(token)`.
    pub fn authorization_value(&self) -> String {
        format!("{} {}", NEGOTIATE_SCHEME, BASE64.encode(&self.0))
    }
}

impl Deref for NegotiationToken {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

/// Seam over the security-context handshake.
///
/// Precondition: a non-expired TGT for `client_upn` already exists in the
/// external credential cache (the orchestrator runs the TGT manager first).
pub trait Negotiate: Send + Sync {
    /// Perform a single-leg client-initiate handshake addressed to
    /// `target_upn` and return the resulting context token.
    fn negotiate(
        &self,
        target_upn: &str,
        client_upn: &str,
    ) -> Result<NegotiationToken, NegotiationError>;
}

#[cfg(feature = "gssapi")]
pub use gss::GssNegotiator;

#[cfg(feature = "gssapi")]
mod gss {
    use super::{Negotiate, NegotiationError, NegotiationToken};

    use libgssapi::context::{ClientCtx, CtxFlags};
    use libgssapi::credential::{Cred, CredUsage};
    use libgssapi::name::Name;
    use libgssapi::oid::{OidSet, GSS_MECH_KRB5, GSS_NT_KRB5_PRINCIPAL};
    use tracing::debug;

    /// Kerberos negotiation backed by the system GSSAPI implementation.
    ///
    /// Client credentials come from the keytab-backed store the MIT libraries
    /// resolve (`KRB5_CLIENT_KTNAME`). The credential handle and the security
    /// context are scoped to one `negotiate` call; `Drop` releases them on
    /// every exit path, including protocol errors.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct GssNegotiator;

    impl Negotiate for GssNegotiator {
        fn negotiate(
            &self,
            target_upn: &str,
            client_upn: &str,
        ) -> Result<NegotiationToken, NegotiationError> {
            let mut mechs = OidSet::new().map_err(|e| NegotiationError::Handshake {
                target: target_upn.to_string(),
                message: e.to_string(),
            })?;
            mechs
                .add(&GSS_MECH_KRB5)
                .map_err(|e| NegotiationError::Handshake {
                    target: target_upn.to_string(),
                    message: e.to_string(),
                })?;

            let client_name = Name::new(client_upn.as_bytes(), Some(&GSS_NT_KRB5_PRINCIPAL))
                .map_err(|e| NegotiationError::InvalidPrincipal {
                    principal: client_upn.to_string(),
                    message: e.to_string(),
                })?;

            debug!(principal = client_upn, "acquiring client credentials from keytab");
            let credential = Cred::acquire(
                Some(&client_name),
                None,
                CredUsage::Initiate,
                Some(&mechs),
            )
            .map_err(|e| NegotiationError::CredentialAcquisition {
                principal: client_upn.to_string(),
                message: e.to_string(),
            })?;

            let target_name = Name::new(target_upn.as_bytes(), Some(&GSS_NT_KRB5_PRINCIPAL))
                .map_err(|e| NegotiationError::InvalidPrincipal {
                    principal: target_upn.to_string(),
                    message: e.to_string(),
                })?;

            debug!(target = target_upn, "initiating security context");
            let mut context = ClientCtx::new(
                Some(credential),
                target_name,
                CtxFlags::GSS_C_MUTUAL_FLAG | CtxFlags::GSS_C_CONF_FLAG | CtxFlags::GSS_C_INTEG_FLAG,
                Some(&GSS_MECH_KRB5),
            );

            let token = context
                .step(None, None)
                .map_err(|e| NegotiationError::Handshake {
                    target: target_upn.to_string(),
                    message: e.to_string(),
                })?
                .ok_or_else(|| NegotiationError::Handshake {
                    target: target_upn.to_string(),
                    message: "handshake produced no context token".to_string(),
                })?;

            Ok(NegotiationToken::new(token.to_vec()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_value_encodes_base64() {
        let token = NegotiationToken::new(vec![0xAB, 0xCD]);
        assert_eq!(token.authorization_value(), "Negotiate q80=");
    }

    #[test]
    fn test_token_is_opaque_bytes() {
        let token = NegotiationToken::new(vec![1, 2, 3]);
        assert_eq!(&*token, &[1, 2, 3]);
        assert!(!token.is_empty());
        assert!(NegotiationToken::new(Vec::new()).is_empty());
    }

    #[test]
    fn test_error_messages_name_the_principal() {
        let err = NegotiationError::CredentialAcquisition {
            principal: "user@EXAMPLE.COM".to_string(),
            message: "no keytab entry".to_string(),
        };
        assert!(err.to_string().contains("user@EXAMPLE.COM"));

        let err = NegotiationError::Handshake {
            target: "svc/target@EXAMPLE.COM".to_string(),
            message: "clock skew too great".to_string(),
        };
        assert!(err.to_string().contains("svc/target@EXAMPLE.COM"));
    }
}
