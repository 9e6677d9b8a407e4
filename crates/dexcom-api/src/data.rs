//! Bearer-authenticated data queries
//!
//! Both endpoints return JSON that is handed back to the caller untouched.
//! Anything other than 200 OK becomes `Error::Upstream` carrying the status.

use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::client::DexcomClient;
use crate::error::{Endpoint, Error, Result};
use crate::window::EgvWindow;

impl DexcomClient {
    /// Fetch the earliest and latest record times for the token's user.
    pub async fn data_range(&self, access_token: &str) -> Result<Value> {
        self.get_json(
            Endpoint::DataRange,
            self.endpoints.data_range.clone(),
            access_token,
        )
        .await
    }

    /// Fetch estimated glucose values within `window`.
    pub async fn egvs(&self, access_token: &str, window: &EgvWindow) -> Result<Value> {
        let mut url = self.endpoints.egvs.clone();
        url.query_pairs_mut()
            .append_pair("startDate", &window.start)
            .append_pair("endDate", &window.end);
        self.get_json(Endpoint::Egvs, url, access_token).await
    }

    async fn get_json(&self, endpoint: Endpoint, url: Url, access_token: &str) -> Result<Value> {
        let response = self
            .prepare(self.http.get(url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::Http {
                endpoint,
                message: e.to_string(),
            })?;

        let status = response.status();
        debug!(%endpoint, status = status.as_u16(), "dexcom response received");

        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::Upstream {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::InvalidResponse {
                endpoint,
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mock_dexcom;

    const DATA_RANGE: &str = r#"{
        "recordType": "dataRange",
        "egvs": {
            "start": {"systemTime": "2023-01-01T00:00:00", "displayTime": "2022-12-31T16:00:00"},
            "end": {"systemTime": "2023-02-01T00:00:00", "displayTime": "2023-01-31T16:00:00"}
        }
    }"#;

    #[tokio::test]
    async fn data_range_sends_bearer_token_and_returns_body() {
        let dexcom = mock_dexcom(&[("/v2/users/self/dataRange", 200, DATA_RANGE)]).await;

        let body = dexcom.client().data_range("at_123").await.unwrap();
        assert_eq!(body["recordType"], "dataRange");
        assert_eq!(body["egvs"]["start"]["displayTime"], "2022-12-31T16:00:00");

        let requests = dexcom.requests();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/v2/users/self/dataRange");
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer at_123"));
    }

    #[tokio::test]
    async fn data_range_non_200_carries_status() {
        let dexcom = mock_dexcom(&[(
            "/v2/users/self/dataRange",
            401,
            r#"{"fault":{"faultstring":"Invalid Access Token"}}"#,
        )])
        .await;

        let err = dexcom.client().data_range("expired").await.unwrap_err();
        match err {
            Error::Upstream {
                endpoint, status, ..
            } => {
                assert_eq!(endpoint, Endpoint::DataRange);
                assert_eq!(status, 401);
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_200_success_status_is_still_upstream_error() {
        let dexcom = mock_dexcom(&[("/v2/users/self/dataRange", 204, "")]).await;

        let err = dexcom.client().data_range("at").await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 204, .. }));
    }

    #[tokio::test]
    async fn egvs_passes_window_as_query() {
        let dexcom = mock_dexcom(&[(
            "/v2/users/self/egvs",
            200,
            r#"{"recordType":"egv","records":[{"value":112}]}"#,
        )])
        .await;
        let window = EgvWindow::clamp("2023-01-01T00:00:00", "2023-06-01T00:00:00").unwrap();

        let body = dexcom.client().egvs("at_123", &window).await.unwrap();
        assert_eq!(body["records"][0]["value"], 112);

        let requests = dexcom.requests();
        let query: std::collections::HashMap<String, String> =
            Url::parse(&format!("http://x/?{}", requests[0].query))
                .unwrap()
                .query_pairs()
                .into_owned()
                .collect();
        assert_eq!(query["startDate"], "2023-01-01T00:00:00");
        assert_eq!(query["endDate"], "2023-04-01T00:00:00");
    }

    #[tokio::test]
    async fn egvs_invalid_json_is_invalid_response() {
        let dexcom = mock_dexcom(&[("/v2/users/self/egvs", 200, "not json")]).await;
        let window = EgvWindow::clamp("2023-01-01T00:00:00", "2023-01-02T00:00:00").unwrap();

        let err = dexcom.client().egvs("at", &window).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidResponse {
                endpoint: Endpoint::Egvs,
                ..
            }
        ));
    }
}
