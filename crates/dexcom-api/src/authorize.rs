//! Authorization URL construction
//!
//! The first leg of the authorization code flow: the browser is sent to the
//! Dexcom login page, which later redirects back to `redirect_uri` with a
//! single-use code.

use reqwest::Url;

use crate::client::DexcomClient;
use crate::constants::{RESPONSE_TYPE, SCOPE};

impl DexcomClient {
    /// Build the Dexcom login URL with all required OAuth parameters.
    ///
    /// Query values are percent-encoded, so a redirect URI containing its own
    /// query string survives the round trip intact.
    pub fn authorization_url(&self) -> Url {
        let mut url = self.endpoints.login.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("redirect_uri", &self.credentials.redirect_uri)
            .append_pair("response_type", RESPONSE_TYPE)
            .append_pair("scope", SCOPE);
        url
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use common::Secret;

    use crate::client::ClientCredentials;
    use crate::DexcomClient;

    fn client(base_url: &str, redirect_uri: &str) -> DexcomClient {
        DexcomClient::new(
            reqwest::Client::new(),
            base_url,
            ClientCredentials {
                client_id: "client-abc".into(),
                client_secret: Secret::new("never-in-url".into()),
                redirect_uri: redirect_uri.into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn authorization_url_has_all_parameters() {
        let url = client(
            "https://sandbox-api.dexcom.com",
            "http://localhost:5000/api/dexcom/callback",
        )
        .authorization_url();

        assert_eq!(url.host_str(), Some("sandbox-api.dexcom.com"));
        assert_eq!(url.path(), "/v2/oauth2/login");

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client-abc");
        assert_eq!(
            params["redirect_uri"],
            "http://localhost:5000/api/dexcom/callback"
        );
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], "offline_access");
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn authorization_url_never_contains_secret() {
        let url = client("https://api.dexcom.com", "https://app.example/cb").authorization_url();
        assert!(!url.as_str().contains("never-in-url"));
    }

    #[test]
    fn redirect_uri_with_query_is_encoded() {
        let url = client("https://api.dexcom.com", "https://app.example/cb?env=dev")
            .authorization_url();
        assert!(
            url.as_str().contains("redirect_uri=https%3A%2F%2Fapp.example%2Fcb%3Fenv%3Ddev"),
            "got: {url}"
        );
    }
}
