//! Per-call interceptor configuration
//!
//! Resolved fresh on every outgoing call: the snapshot is cheap to build and
//! the environment may legitimately change between calls. Nothing here is
//! cached across calls.

use std::path::PathBuf;

use kerberos_credentials::KerberosTooling;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Overrides the derived `<bin>/krb5.ini` location.
pub const KRB5_CONFIG_ENV: &str = "KRB5_CONFIG";
/// Directory holding the application binary and the Kerberos tooling.
pub const APP_BIN_PATH_ENV: &str = "APP_BIN_PATH";
/// UPN the client authenticates as.
pub const CLIENT_UPN_ENV: &str = "CLIENT_USER_PRINCIPAL_NAME";
/// Enables the separate client-user impersonation interceptor.
pub const IMPERSONATE_ENV: &str = "IMPERSONATE_CLIENT_USER";

/// Where the buildpack drops the tooling inside the container.
pub const DEFAULT_APP_BIN_PATH: &str = "/home/vcap/app/bin";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither the `KRB5_CONFIG` override nor the derived `<bin>/krb5.ini`
    /// points at an existing file.
    #[error(
        "kerberos config file '{}' does not exist; set {} or place krb5.ini in the application bin directory",
        .path.display(),
        KRB5_CONFIG_ENV
    )]
    Krb5ConfNotFound { path: PathBuf },

    /// The client UPN setting is absent or blank.
    #[error("client principal is not set; export {}", CLIENT_UPN_ENV)]
    ClientPrincipalMissing,
}

/// Read-only snapshot of everything the interceptor needs for one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptorConfig {
    /// UPN the client authenticates as, e.g. `user@EXAMPLE.COM`.
    pub client_principal: String,
    /// Resolved, existing krb5 configuration file.
    pub krb5_config_path: PathBuf,
    /// Directory holding `klist`/`kinit`.
    pub app_bin_path: PathBuf,
    /// Whether the deployment also runs the impersonation interceptor.
    pub impersonation_enabled: bool,
}

impl InterceptorConfig {
    /// Resolve the configuration from the environment.
    ///
    /// The krb5 config path prefers the explicit `KRB5_CONFIG` override and
    /// falls back to `<APP_BIN_PATH>/krb5.ini`; whichever wins must exist as
    /// a file. The client principal is required and must be non-blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        let app_bin_path = env_path(APP_BIN_PATH_ENV)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_APP_BIN_PATH));
        debug!(
            path = %app_bin_path.display(),
            "using app bin path, override with {}", APP_BIN_PATH_ENV
        );

        let krb5_config_path =
            env_path(KRB5_CONFIG_ENV).unwrap_or_else(|| app_bin_path.join("krb5.ini"));
        debug!(path = %krb5_config_path.display(), "using krb5 config file location");
        if !krb5_config_path.is_file() {
            return Err(ConfigError::Krb5ConfNotFound {
                path: krb5_config_path,
            });
        }

        let client_principal = std::env::var(CLIENT_UPN_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::ClientPrincipalMissing)?;

        let impersonation_enabled = std::env::var(IMPERSONATE_ENV)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(false);

        Ok(Self {
            client_principal,
            krb5_config_path,
            app_bin_path,
            impersonation_enabled,
        })
    }

    /// Kerberos tool paths for this call's bin directory.
    pub fn tooling(&self) -> KerberosTooling {
        KerberosTooling::new(&self.app_bin_path)
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
