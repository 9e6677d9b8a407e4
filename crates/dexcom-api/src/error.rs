//! Error types for Dexcom API operations

use std::fmt;

/// Upstream endpoint an error originated from, used for logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Token,
    DataRange,
    Egvs,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Token => "token",
            Endpoint::DataRange => "data_range",
            Endpoint::Egvs => "egvs",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from Dexcom API operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Transport failure: connection refused, DNS, timeout.
    #[error("{endpoint} request failed: {message}")]
    Http { endpoint: Endpoint, message: String },

    /// Dexcom answered with something other than 200 OK.
    #[error("{endpoint} returned HTTP {status}")]
    Upstream {
        endpoint: Endpoint,
        status: u16,
        body: String,
    },

    #[error("{endpoint} returned an unreadable body: {message}")]
    InvalidResponse { endpoint: Endpoint, message: String },

    #[error("token response did not include an access token")]
    MissingAccessToken,

    #[error("data range response has no egvs entry")]
    MissingDataRange,

    #[error("invalid egvs date range: {0}")]
    InvalidDateRange(String),
}

impl Error {
    /// Upstream endpoint involved, if the error came from an HTTP exchange.
    pub fn endpoint(&self) -> Option<Endpoint> {
        match self {
            Error::Http { endpoint, .. }
            | Error::Upstream { endpoint, .. }
            | Error::InvalidResponse { endpoint, .. } => Some(*endpoint),
            Error::MissingAccessToken => Some(Endpoint::Token),
            Error::MissingDataRange | Error::InvalidDateRange(_) => Some(Endpoint::DataRange),
            Error::InvalidBaseUrl(_) => None,
        }
    }

    /// Short classification label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidBaseUrl(_) => "config",
            Error::Http { .. } => "transport",
            Error::Upstream { .. } => "status",
            Error::InvalidResponse { .. } => "invalid_body",
            Error::MissingAccessToken => "missing_token",
            Error::MissingDataRange => "missing_range",
            Error::InvalidDateRange(_) => "invalid_range",
        }
    }
}

/// Result alias for Dexcom API operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_display_omits_body() {
        let err = Error::Upstream {
            endpoint: Endpoint::Egvs,
            status: 401,
            body: r#"{"fault":"invalid token"}"#.into(),
        };
        assert_eq!(err.to_string(), "egvs returned HTTP 401");
    }

    #[test]
    fn endpoint_classification() {
        assert_eq!(
            Error::MissingDataRange.endpoint(),
            Some(Endpoint::DataRange)
        );
        assert_eq!(Error::MissingAccessToken.endpoint(), Some(Endpoint::Token));
        assert_eq!(Error::InvalidBaseUrl("x".into()).endpoint(), None);
    }
}
