//! Authorization header injection
//!
//! Pure mutation helper over the request's metadata map. An already-populated
//! `authorization` entry always wins: a manual override set by another layer
//! is never clobbered. Only this exact lowercase key is inspected (tonic
//! normalizes metadata keys to lowercase; no casing generalization).

use tonic::metadata::{AsciiMetadataValue, MetadataMap};
use tracing::{debug, error};

/// Transport-level authorization header key.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Set the authorization header to `value` unless a non-empty value is
/// already present. Returns whether the header was written.
///
/// Insert-on-demand and overwrite semantics: a missing entry is created, an
/// empty one is replaced, and calling twice never duplicates the key.
pub fn inject_authorization(metadata: &mut MetadataMap, value: &str) -> bool {
    if let Some(existing) = metadata.get(AUTHORIZATION_HEADER) {
        // An unreadable value is treated as populated rather than clobbered.
        let populated = existing.to_str().map(|s| !s.is_empty()).unwrap_or(true);
        if populated {
            debug!("authorization header already set, leaving it untouched");
            return false;
        }
    }

    // HeaderValue accepts bytes >= 0x80, so try_from alone does not reject
    // non-ASCII input; tonic metadata values must stay ASCII.
    if !value.is_ascii() {
        error!("authorization value is not valid ASCII, skipping injection");
        return false;
    }

    match AsciiMetadataValue::try_from(value) {
        Ok(header) => {
            metadata.insert(AUTHORIZATION_HEADER, header);
            true
        }
        Err(err) => {
            error!(error = %err, "authorization value is not a valid header value, skipping injection");
            false
        }
    }
}
