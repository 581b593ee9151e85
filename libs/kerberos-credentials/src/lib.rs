//! Kerberos credential lifecycle for egress authentication
//!
//! This library owns everything between "a call is about to go out" and "we
//! hold a fresh SPNEGO token for it":
//!
//! - **CommandRunner / SystemCommandRunner**: synchronous execution of the
//!   external Kerberos tooling with typed failures
//! - **TgtManager**: TGT expiry tracking via `klist` and renewal via `kinit`
//! - **Negotiate / GssNegotiator**: GSSAPI service-ticket negotiation
//!   producing an opaque [`NegotiationToken`]
//!
//! The GSSAPI implementation needs the MIT Kerberos native libraries and is
//! gated behind the `gssapi` feature; the traits above it keep the rest of
//! the stack testable without them.
//!
//! ## Failure philosophy
//!
//! Every operation returns a typed error instead of panicking or raising
//! through the caller. The interceptor layer decides which errors degrade to
//! "send unauthenticated" and which are deployment defects worth surfacing
//! from a health check (`preflight`).

pub mod exec;
pub mod negotiate;
pub mod tgt;

pub use exec::{CommandRunner, ExecError, SystemCommandRunner};
pub use negotiate::{Negotiate, NegotiationError, NegotiationToken, NEGOTIATE_SCHEME};
pub use tgt::{preflight, CredentialCacheState, KerberosTooling, TgtError, TgtManager};

#[cfg(feature = "gssapi")]
pub use negotiate::GssNegotiator;
