//! HTTP-facing error type
//!
//! Every handler failure becomes `{"error": "<message>"}`. Local validation
//! failures are 400; upstream non-200 responses keep the upstream status.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dexcom_api::Endpoint;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authorization code not returned")]
    MissingCode,

    #[error("Access token not returned")]
    MissingAccessToken,

    #[error("Access token is required")]
    AccessTokenRequired,

    #[error("EGVs data range not found")]
    MissingDataRange,

    #[error("Failed to fetch date range")]
    DateRangeFailed { status: StatusCode },

    #[error("Failed to fetch glucose data")]
    GlucoseDataFailed { status: StatusCode },

    #[error("Failed to reach Dexcom API")]
    UpstreamUnreachable,

    #[error("Invalid response from Dexcom API")]
    InvalidUpstreamResponse,

    #[error("Invalid EGVs data range")]
    InvalidDataRange,

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCode
            | ApiError::MissingAccessToken
            | ApiError::AccessTokenRequired
            | ApiError::MissingDataRange => StatusCode::BAD_REQUEST,
            ApiError::DateRangeFailed { status } | ApiError::GlucoseDataFailed { status } => {
                *status
            }
            ApiError::UpstreamUnreachable
            | ApiError::InvalidUpstreamResponse
            | ApiError::InvalidDataRange => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<dexcom_api::Error> for ApiError {
    fn from(err: dexcom_api::Error) -> Self {
        use dexcom_api::Error;

        match err {
            Error::Upstream {
                endpoint, status, ..
            } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                match endpoint {
                    Endpoint::DataRange => ApiError::DateRangeFailed { status },
                    Endpoint::Egvs => ApiError::GlucoseDataFailed { status },
                    Endpoint::Token => ApiError::MissingAccessToken,
                }
            }
            Error::Http { .. } => ApiError::UpstreamUnreachable,
            Error::InvalidResponse { .. } => ApiError::InvalidUpstreamResponse,
            Error::MissingAccessToken => ApiError::MissingAccessToken,
            Error::MissingDataRange => ApiError::MissingDataRange,
            Error::InvalidDateRange(_) => ApiError::InvalidDataRange,
            Error::InvalidBaseUrl(_) => ApiError::Internal,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
