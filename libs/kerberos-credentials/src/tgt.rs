//! TGT lifecycle management
//!
//! The MIT Kerberos tools own the real credential cache; this module only
//! decides when to shell out to them. `ensure_valid` queries the cache with
//! `klist`, parses the TGT expiry out of its fixed-width output, and runs
//! `kinit` against the keytab when the TGT is expired or the expiry cannot be
//! determined.
//!
//! The external cache is a shared OS-level resource: other processes (and
//! other threads of this one) may renew concurrently. That is safe because
//! renewal is idempotent, but we still serialize `ensure_valid` per principal
//! to avoid redundant `kinit` invocations under concurrent outbound traffic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::exec::{CommandRunner, ExecError, SystemCommandRunner};

/// `klist` expiry column: 17 fixed-width characters immediately preceding the
/// TGT service marker on the same line.
static TGT_EXPIRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.{17})  krbtgt").expect("TGT expiry pattern is valid"));

const TGT_EXPIRY_FORMAT: &str = "%m/%d/%y %H:%M:%S";

#[derive(Debug, Error)]
pub enum TgtError {
    /// `klist` or `kinit` is absent from the tool directory. A deployment
    /// defect; fatal for the current call and worth surfacing from health
    /// checks rather than rediscovering per call.
    #[error(transparent)]
    MissingTool(ExecError),

    /// The list-credentials command ran but failed. Never fatal: the caller
    /// degrades to unknown expiry and attempts renewal anyway.
    #[error("TGT expiry query failed: {source}")]
    QueryFailed {
        #[source]
        source: ExecError,
    },

    /// `kinit` ran but the KDC did not issue a TGT.
    #[error("TGT renewal for '{principal}' failed: {source}")]
    RenewalFailed {
        principal: String,
        #[source]
        source: ExecError,
    },
}

/// Paths to the external Kerberos tooling, resolved relative to the
/// application binary directory for the current call.
#[derive(Debug, Clone)]
pub struct KerberosTooling {
    bin_path: PathBuf,
}

impl KerberosTooling {
    pub fn new(bin_path: impl Into<PathBuf>) -> Self {
        Self {
            bin_path: bin_path.into(),
        }
    }

    pub fn bin_path(&self) -> &Path {
        &self.bin_path
    }

    pub fn klist(&self) -> PathBuf {
        self.bin_path.join("klist")
    }

    pub fn kinit(&self) -> PathBuf {
        self.bin_path.join("kinit")
    }
}

/// Verify that both external tools exist.
///
/// A missing tool means the host environment lacks the Kerberos buildpack;
/// run this at startup or from a health check so the defect fails loudly once
/// instead of surfacing as a per-call log line.
pub fn preflight(tools: &KerberosTooling) -> Result<(), TgtError> {
    for path in [tools.klist(), tools.kinit()] {
        if !path.is_file() {
            return Err(TgtError::MissingTool(ExecError::ToolNotFound { path }));
        }
    }
    Ok(())
}

/// What we last learned about the external credential cache for one
/// principal. Recomputed from `klist` on every `ensure_valid`; never
/// persisted across process restarts.
#[derive(Debug, Default, Clone, Copy)]
pub struct CredentialCacheState {
    pub last_known_expiry: Option<NaiveDateTime>,
}

/// Tracks TGT validity per principal and renews through the external tooling
/// when needed. One instance is shared across all calls on a channel.
pub struct TgtManager {
    runner: Arc<dyn CommandRunner>,
    state: Mutex<HashMap<String, Arc<Mutex<CredentialCacheState>>>>,
}

impl Default for TgtManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TgtManager {
    pub fn new() -> Self {
        Self::with_runner(Arc::new(SystemCommandRunner))
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Guarantee that, on `Ok(())`, the external credential cache held a
    /// non-expired TGT for `principal` at the moment it was checked.
    ///
    /// A failed expiry query degrades to "unknown" and falls through to
    /// renewal; a failed renewal is an error. Renewal success is not
    /// re-verified by a second query.
    pub fn ensure_valid(&self, tools: &KerberosTooling, principal: &str) -> Result<(), TgtError> {
        self.ensure_valid_at(tools, principal, Local::now().naive_local())
    }

    /// `ensure_valid` against an explicit clock.
    pub fn ensure_valid_at(
        &self,
        tools: &KerberosTooling,
        principal: &str,
        now: NaiveDateTime,
    ) -> Result<(), TgtError> {
        let state = self.state_for(principal);
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);

        let expiry = match self.query_expiry(tools) {
            Ok(expiry) => expiry,
            Err(err @ TgtError::MissingTool(_)) => return Err(err),
            Err(err) => {
                error!(principal, error = %err, "treating TGT expiry as unknown");
                None
            }
        };
        state.last_known_expiry = expiry;

        match expiry {
            Some(expiry) if expiry > now => {
                debug!(principal, %expiry, "cached TGT is still valid");
                Ok(())
            }
            Some(expiry) => {
                debug!(principal, %expiry, "cached TGT is expired");
                self.renew(tools, principal)
            }
            None => {
                debug!(principal, "TGT expiry unknown, forcing renewal");
                self.renew(tools, principal)
            }
        }
    }

    /// Last expiry learned from `klist` for `principal`, if any.
    pub fn last_known_expiry(&self, principal: &str) -> Option<NaiveDateTime> {
        let state = self.state_for(principal);
        let state = state.lock().unwrap_or_else(PoisonError::into_inner);
        state.last_known_expiry
    }

    fn state_for(&self, principal: &str) -> Arc<Mutex<CredentialCacheState>> {
        let mut map = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(principal.to_string()).or_default().clone()
    }

    fn query_expiry(&self, tools: &KerberosTooling) -> Result<Option<NaiveDateTime>, TgtError> {
        match self.runner.run(&tools.klist(), &[]) {
            Ok(stdout) => Ok(parse_tgt_expiry(&stdout)),
            Err(err) if err.is_tool_missing() => Err(TgtError::MissingTool(err)),
            Err(source) => Err(TgtError::QueryFailed { source }),
        }
    }

    fn renew(&self, tools: &KerberosTooling, principal: &str) -> Result<(), TgtError> {
        info!(principal, "renewing TGT from keytab");
        match self.runner.run(&tools.kinit(), &["-k", "-i", principal]) {
            Ok(_) => Ok(()),
            Err(err) if err.is_tool_missing() => Err(TgtError::MissingTool(err)),
            Err(source) => Err(TgtError::RenewalFailed {
                principal: principal.to_string(),
                source,
            }),
        }
    }
}

/// Extract the TGT expiry from `klist` output.
///
/// Returns `None` when the `krbtgt` marker is absent or the preceding field
/// does not parse as a timestamp; the caller treats that as already-expired.
pub fn parse_tgt_expiry(klist_output: &str) -> Option<NaiveDateTime> {
    let captures = TGT_EXPIRY.captures(klist_output)?;
    let field = captures.get(1)?.as_str();
    NaiveDateTime::parse_from_str(field, TGT_EXPIRY_FORMAT).ok()
}
