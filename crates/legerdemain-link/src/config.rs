//! Link flow configuration.
//!
//! Built once by the caller and handed to the coordinator by value; nothing
//! in this crate reads ambient global state.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::LinkError;

/// Default loopback port of the consent server.
pub const DEFAULT_PORT: u16 = 8080;

/// Default callback route the consent page posts the public token to.
pub const DEFAULT_CALLBACK_PATH: &str = "/get_access_token";

/// Default time a human gets to finish the consent flow.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default time the listener gets to drain before it is abandoned.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Settings of the consent server and the interactive wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Address the consent server listens on. Loopback only.
    pub listen_addr: SocketAddr,
    /// Route receiving the form-encoded public token.
    pub callback_path: String,
    /// How long to wait for the callback before giving up.
    pub timeout: Duration,
    /// How long graceful shutdown may take before the listener is aborted.
    pub shutdown_grace: Duration,
    /// Directory holding `templates/index.html` and `static/*` overrides.
    /// `None` serves the embedded copies.
    pub assets_dir: Option<PathBuf>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            assets_dir: None,
        }
    }
}

impl LinkConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable                   | Default | Description                       |
    /// |----------------------------|---------|-----------------------------------|
    /// | `LINK_PORT`                | `8080`  | Loopback port of the consent page |
    /// | `LINK_TIMEOUT_SECS`        | `300`   | Interactive wait                  |
    /// | `LINK_SHUTDOWN_GRACE_SECS` | `5`     | Listener drain time               |
    /// | `LINK_ASSETS_DIR`          | unset   | On-disk template/static overrides |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port: u16 = env_parse("LINK_PORT").unwrap_or(DEFAULT_PORT);
        let timeout = env_parse("LINK_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let shutdown_grace = env_parse("LINK_SHUTDOWN_GRACE_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.shutdown_grace);
        let assets_dir = std::env::var_os("LINK_ASSETS_DIR").map(PathBuf::from);

        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
            timeout,
            shutdown_grace,
            assets_dir,
            ..defaults
        }
    }

    /// Use `port` on the loopback interface.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.listen_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        self
    }

    /// Check the settings before anything is bound.
    pub fn validate(&self) -> Result<(), LinkError> {
        if !self.listen_addr.ip().is_loopback() {
            return Err(LinkError::Config(format!(
                "listen address {} is not a loopback address",
                self.listen_addr
            )));
        }
        let path = self.callback_path.as_str();
        if !path.starts_with('/') || path == "/" || path.starts_with("/static") {
            return Err(LinkError::Config(format!(
                "callback path \"{path}\" must be an absolute path outside / and /static"
            )));
        }
        if self.timeout.is_zero() {
            return Err(LinkError::Config("timeout must be positive".into()));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
