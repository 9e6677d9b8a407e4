//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. The config file is
//! optional so the service can run from the environment alone.
//! The client secret is loaded from DEXCOM_CLIENT_SECRET or client_secret_file,
//! never stored in the TOML directly to avoid leaking secrets.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dexcom: DexcomConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Where the browser lands after a successful callback
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Upstream request timeout; transport defaults apply when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            frontend_url: default_frontend_url(),
            max_connections: default_max_connections(),
            timeout_secs: None,
        }
    }
}

/// Dexcom OAuth client registration
#[derive(Debug, Default, Deserialize)]
pub struct DexcomConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to DEXCOM_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_frontend_url() -> String {
    "http://localhost:3000/".into()
}

fn default_max_connections() -> usize {
    1000
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// A missing file is treated as empty. Client secret resolution order:
    /// 1. DEXCOM_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let mut config: Config = toml::from_str(&contents)?;

        config.apply_env()?;
        config.resolve_client_secret()?;
        config.validate()?;

        Ok(config)
    }

    fn apply_env(&mut self) -> common::Result<()> {
        override_from_env("DEXCOM_BASE_URL", &mut self.dexcom.base_url);
        override_from_env("DEXCOM_CLIENT_ID", &mut self.dexcom.client_id);
        override_from_env("DEXCOM_REDIRECT_URI", &mut self.dexcom.redirect_uri);
        override_from_env("FRONTEND_URL", &mut self.server.frontend_url);

        if let Some(addr) = env_value("LISTEN_ADDR") {
            self.server.listen_addr = addr.parse().map_err(|e| {
                common::Error::Config(format!("LISTEN_ADDR is not a socket address ({addr}): {e}"))
            })?;
        }

        Ok(())
    }

    fn resolve_client_secret(&mut self) -> common::Result<()> {
        if let Some(secret) = env_value("DEXCOM_CLIENT_SECRET") {
            self.dexcom.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = self.dexcom.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                self.dexcom.client_secret = Some(Secret::new(secret));
            }
        }
        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        if self.dexcom.base_url.is_empty() {
            return Err(common::Error::MissingSetting {
                setting: "dexcom.base_url",
                env_var: "DEXCOM_BASE_URL",
            });
        }
        require_http_scheme("base_url", &self.dexcom.base_url)?;

        if self.dexcom.client_id.is_empty() {
            return Err(common::Error::MissingSetting {
                setting: "dexcom.client_id",
                env_var: "DEXCOM_CLIENT_ID",
            });
        }
        if self.dexcom.redirect_uri.is_empty() {
            return Err(common::Error::MissingSetting {
                setting: "dexcom.redirect_uri",
                env_var: "DEXCOM_REDIRECT_URI",
            });
        }
        if self.dexcom.client_secret.is_none() {
            return Err(common::Error::MissingSetting {
                setting: "dexcom.client_secret_file",
                env_var: "DEXCOM_CLIENT_SECRET",
            });
        }

        require_http_scheme("frontend_url", &self.server.frontend_url)?;
        reqwest::Url::parse(&self.server.frontend_url).map_err(|e| {
            common::Error::Config(format!(
                "frontend_url is not a valid URL ({}): {e}",
                self.server.frontend_url
            ))
        })?;

        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }
        if self.server.timeout_secs == Some(0) {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("dexcom-proxy.toml")
    }
}

/// Non-empty value of an environment variable.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn override_from_env(key: &str, target: &mut String) {
    if let Some(value) = env_value(key) {
        *target = value;
    }
}

fn require_http_scheme(name: &str, url: &str) -> common::Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(common::Error::Config(format!(
            "{name} must start with http:// or https://, got: {url}"
        )));
    }
    Ok(())
}
