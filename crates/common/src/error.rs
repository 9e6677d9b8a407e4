//! Configuration error types

use thiserror::Error;

/// Errors raised while loading and validating configuration
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required setting `{setting}` (set {env_var} or add it to the config file)")]
    MissingSetting {
        setting: &'static str,
        env_var: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let config_err = Error::Config("base_url must start with http".into());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: base_url must start with http"
        );

        let io_err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "secret file unreadable",
        ));
        assert!(
            io_err.to_string().starts_with("I/O error:"),
            "got: {}",
            io_err
        );
    }

    #[test]
    fn missing_setting_names_env_var() {
        let err = Error::MissingSetting {
            setting: "dexcom.client_id",
            env_var: "DEXCOM_CLIENT_ID",
        };
        let msg = err.to_string();
        assert!(msg.contains("dexcom.client_id"), "got: {msg}");
        assert!(msg.contains("DEXCOM_CLIENT_ID"), "got: {msg}");
    }
}
