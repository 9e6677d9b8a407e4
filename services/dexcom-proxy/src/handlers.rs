//! Dexcom route handlers
//!
//! Each handler is a stateless transform: validate query parameters, make one
//! or two upstream calls, and return a redirect or the upstream JSON.
//! Access tokens arrive and leave as query parameters. They are wrapped in
//! `Secret` as soon as they are read so they never reach the logs.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::Secret;
use dexcom_api::{DexcomClient, EgvWindow};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::error::ApiError;
use crate::metrics;

/// State shared by the Dexcom handlers
#[derive(Clone)]
pub struct ProxyState {
    pub dexcom: DexcomClient,
    /// Browser destination after a successful callback
    pub frontend_url: Url,
}

/// Query string as ordered pairs.
///
/// A repeated key resolves to its first value and unknown keys (the frontend
/// also sends `startDate`/`endDate`) are ignored, so no query string is ever
/// rejected before the handler runs.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// First value of `name`, treating an empty value as absent.
    fn first(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    fn access_token(&self) -> Result<Secret<String>, ApiError> {
        match self.first("access_token") {
            Some(token) => Ok(Secret::new(token.to_owned())),
            None => {
                error!("access token is required");
                Err(ApiError::AccessTokenRequired)
            }
        }
    }
}

fn request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

/// 302 Found, matching what browsers and OAuth servers expect from a login hop.
fn found(location: &Url) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.as_str())]).into_response()
}

/// Log and count an upstream failure, then map it to its HTTP form.
fn upstream_error(err: dexcom_api::Error) -> ApiError {
    let endpoint = err.endpoint().map(|e| e.as_str()).unwrap_or("none");
    match &err {
        dexcom_api::Error::Upstream { status, body, .. } => {
            warn!(endpoint, status, upstream_body = %body, "dexcom returned an error status");
        }
        _ => warn!(endpoint, error = %err, "dexcom request failed"),
    }
    metrics::record_upstream_error(endpoint, err.kind());
    err.into()
}

/// GET /api/dexcom/auth: redirect the browser to the Dexcom login page.
#[instrument(skip_all, fields(request_id = %request_id()))]
pub async fn initiate_auth(State(state): State<ProxyState>) -> Response {
    let location = state.dexcom.authorization_url();
    info!(client_id = state.dexcom.client_id(), %location, "redirecting to dexcom login");
    found(&location)
}

/// GET /api/dexcom/callback: exchange the code and hand the token to the frontend.
#[instrument(skip_all, fields(request_id = %request_id()))]
pub async fn handle_callback(
    State(state): State<ProxyState>,
    Query(params): Query<QueryParams>,
) -> Result<Response, ApiError> {
    if let Some(reason) = params.first("error") {
        warn!(reason, "dexcom reported an authorization error");
    }

    let Some(code) = params.first("code").map(|c| Secret::new(c.to_owned())) else {
        error!("no code returned in the callback");
        return Err(ApiError::MissingCode);
    };
    info!("authorization code received");

    let token = state
        .dexcom
        .exchange_code(code.expose())
        .await
        .map_err(upstream_error)?;
    let access_token = Secret::new(token.access_token);
    info!(expires_in = ?token.expires_in, "access token obtained");

    let mut location = state.frontend_url.clone();
    location
        .query_pairs_mut()
        .append_pair("access_token", access_token.expose());
    Ok(found(&location))
}

/// GET /api/dexcom/daterange: forward the user's data range verbatim.
#[instrument(skip_all, fields(request_id = %request_id()))]
pub async fn get_date_range(
    State(state): State<ProxyState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Value>, ApiError> {
    let access_token = params.access_token()?;

    let date_range = state
        .dexcom
        .data_range(access_token.expose())
        .await
        .map_err(upstream_error)?;
    Ok(Json(date_range))
}

/// GET /api/dexcom/data: fetch EGVs over the available range, capped at 90 days.
#[instrument(skip_all, fields(request_id = %request_id()))]
pub async fn get_glucose_data(
    State(state): State<ProxyState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Value>, ApiError> {
    let access_token = params.access_token()?;

    let date_range = state
        .dexcom
        .data_range(access_token.expose())
        .await
        .map_err(upstream_error)?;
    let window = EgvWindow::from_data_range(&date_range).map_err(upstream_error)?;
    info!(
        start = %window.start,
        end = %window.end,
        clamped = window.clamped,
        "egvs window resolved"
    );

    let readings = state
        .dexcom
        .egvs(access_token.expose(), &window)
        .await
        .map_err(upstream_error)?;
    Ok(Json(readings))
}
