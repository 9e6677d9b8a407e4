//! Authorization code exchange
//!
//! POSTs the single-use code together with the client credentials to the
//! Dexcom token endpoint. Only `access_token` is consumed; refresh tokens are
//! returned by Dexcom but this proxy does not keep them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::client::DexcomClient;
use crate::constants::GRANT_TYPE;
use crate::error::{Endpoint, Error, Result};

/// Token endpoint response body.
///
/// Only `access_token` is required. The other fields are informational and
/// fall back to `None` when absent or of an unexpected type.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, deserialize_with = "lenient")]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires
    #[serde(default, deserialize_with = "lenient")]
    pub expires_in: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub token_type: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl TokenResponse {
    /// Extract the token from a raw response body.
    ///
    /// A body without a non-empty string `access_token` yields
    /// `Error::MissingAccessToken`, whatever else it contains.
    pub fn from_body(body: Value) -> Result<Self> {
        let token: TokenResponse =
            serde_json::from_value(body).map_err(|_| Error::MissingAccessToken)?;
        if token.access_token.is_empty() {
            return Err(Error::MissingAccessToken);
        }
        Ok(token)
    }
}

impl DexcomClient {
    /// Exchange an authorization code for tokens.
    ///
    /// The response body is inspected whatever the status code: Dexcom reports
    /// a rejected code as a JSON error body, which surfaces here as
    /// `Error::MissingAccessToken`.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let credentials = &self.credentials;
        let response = self
            .prepare(self.http.post(self.endpoints.token.clone()))
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.expose().as_str()),
                ("code", code),
                ("grant_type", GRANT_TYPE),
                ("redirect_uri", credentials.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http {
                endpoint: Endpoint::Token,
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = match response.json::<Value>().await {
            Ok(body) => body,
            Err(e) => {
                warn!(status = status.as_u16(), error = %e, "token endpoint returned a non-JSON body");
                return Err(Error::MissingAccessToken);
            }
        };

        if !status.is_success() {
            let reason = body
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("<none>");
            warn!(
                status = status.as_u16(),
                error = reason,
                "token endpoint rejected the authorization code"
            );
        }

        TokenResponse::from_body(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mock_dexcom;

    #[test]
    fn token_response_ignores_unknown_fields() {
        let body = serde_json::json!({
            "access_token": "at_abc",
            "refresh_token": "rt_def",
            "expires_in": 7200,
            "token_type": "Bearer",
            "scope": "offline_access",
        });
        let token = TokenResponse::from_body(body).unwrap();
        assert_eq!(token.access_token, "at_abc");
        assert_eq!(token.refresh_token.as_deref(), Some("rt_def"));
        assert_eq!(token.expires_in, Some(7200));
    }

    #[test]
    fn mistyped_optional_fields_do_not_reject_the_token() {
        for expires_in in [serde_json::json!(7200.0), serde_json::json!("7200")] {
            let body = serde_json::json!({
                "access_token": "at_ok",
                "refresh_token": 42,
                "expires_in": expires_in,
                "token_type": null,
            });
            let token = TokenResponse::from_body(body).unwrap();
            assert_eq!(token.access_token, "at_ok");
            assert_eq!(token.expires_in, None);
            assert_eq!(token.refresh_token, None);
            assert_eq!(token.token_type, None);
        }
    }

    #[test]
    fn non_string_access_token_is_rejected() {
        let body = serde_json::json!({ "access_token": 12345 });
        assert!(matches!(
            TokenResponse::from_body(body),
            Err(Error::MissingAccessToken)
        ));
    }

    #[test]
    fn token_response_without_access_token_is_rejected() {
        let body = serde_json::json!({ "error": "invalid_grant" });
        assert!(matches!(
            TokenResponse::from_body(body),
            Err(Error::MissingAccessToken)
        ));
    }

    #[test]
    fn empty_access_token_is_rejected() {
        let body = serde_json::json!({ "access_token": "" });
        assert!(matches!(
            TokenResponse::from_body(body),
            Err(Error::MissingAccessToken)
        ));
    }

    #[tokio::test]
    async fn exchange_code_posts_form_with_credentials() {
        let dexcom = mock_dexcom(&[(
            "/v2/oauth2/token",
            200,
            r#"{"access_token":"at_live","refresh_token":"rt_live","expires_in":7200}"#,
        )])
        .await;

        let token = dexcom.client().exchange_code("code-xyz").await.unwrap();
        assert_eq!(token.access_token, "at_live");

        let requests = dexcom.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        let form: std::collections::HashMap<String, String> =
            reqwest::Url::parse(&format!("http://x/?{}", requests[0].body))
                .unwrap()
                .query_pairs()
                .into_owned()
                .collect();
        assert_eq!(form["client_id"], "test-client");
        assert_eq!(form["client_secret"], "test-secret");
        assert_eq!(form["code"], "code-xyz");
        assert_eq!(form["grant_type"], "authorization_code");
        assert_eq!(
            form["redirect_uri"],
            "http://localhost:5000/api/dexcom/callback"
        );
    }

    #[tokio::test]
    async fn rejected_code_yields_missing_access_token() {
        let dexcom = mock_dexcom(&[(
            "/v2/oauth2/token",
            400,
            r#"{"error":"invalid_grant","error_description":"code expired"}"#,
        )])
        .await;

        let result = dexcom.client().exchange_code("stale").await;
        assert!(matches!(result, Err(Error::MissingAccessToken)));
    }

    #[tokio::test]
    async fn non_json_token_body_yields_missing_access_token() {
        let dexcom = mock_dexcom(&[("/v2/oauth2/token", 502, "<html>bad gateway</html>")]).await;

        let result = dexcom.client().exchange_code("code").await;
        assert!(matches!(result, Err(Error::MissingAccessToken)));
    }

    #[tokio::test]
    async fn unreachable_token_endpoint_is_http_error() {
        let client = DexcomClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1",
            crate::ClientCredentials {
                client_id: "id".into(),
                client_secret: common::Secret::new("s".into()),
                redirect_uri: "http://localhost/cb".into(),
            },
        )
        .unwrap();

        let result = client.exchange_code("code").await;
        assert!(matches!(
            result,
            Err(Error::Http {
                endpoint: Endpoint::Token,
                ..
            })
        ));
    }
}
