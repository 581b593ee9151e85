//! Remote endpoint identity

use serde::{Deserialize, Serialize};

/// Identity claim of the remote endpoint, carrying the target service UPN as
/// its resource claim.
///
/// The transport layer resolves this when the channel is built; the
/// interceptor only reads it. A channel without an identity cannot be
/// authenticated to and is skipped with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointIdentity {
    upn: String,
}

impl EndpointIdentity {
    /// Identity addressed by a user principal name, e.g.
    /// `HTTP/target.example.com@EXAMPLE.COM`.
    pub fn upn(upn: impl Into<String>) -> Self {
        Self { upn: upn.into() }
    }

    /// The identity's resource claim: the target service UPN.
    pub fn resource(&self) -> &str {
        &self.upn
    }
}
