//! Dexcom client handle
//!
//! Endpoint URLs are resolved once at construction so that a malformed base
//! URL surfaces at startup rather than on the first request.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use reqwest::{RequestBuilder, Url};

use crate::constants::{DATA_RANGE_PATH, EGVS_PATH, LOGIN_PATH, TOKEN_PATH};
use crate::error::{Error, Result};

/// OAuth client registration issued by the Dexcom developer portal.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
}

#[derive(Debug)]
pub(crate) struct Endpoints {
    pub(crate) login: Url,
    pub(crate) token: Url,
    pub(crate) data_range: Url,
    pub(crate) egvs: Url,
}

impl Endpoints {
    fn resolve(base_url: &str) -> Result<Self> {
        let base = base_url.trim_end_matches('/');
        let join = |path: &str| {
            Url::parse(&format!("{base}{path}"))
                .map_err(|e| Error::InvalidBaseUrl(format!("{base_url}: {e}")))
        };

        Ok(Self {
            login: join(LOGIN_PATH)?,
            token: join(TOKEN_PATH)?,
            data_range: join(DATA_RANGE_PATH)?,
            egvs: join(EGVS_PATH)?,
        })
    }
}

/// Cheap-to-clone handle for talking to the Dexcom API.
///
/// Shares one `reqwest::Client` connection pool across clones. Holds no
/// per-user state: access tokens are passed in on every call.
#[derive(Debug, Clone)]
pub struct DexcomClient {
    pub(crate) http: reqwest::Client,
    pub(crate) endpoints: Arc<Endpoints>,
    pub(crate) credentials: Arc<ClientCredentials>,
    timeout: Option<Duration>,
}

impl DexcomClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        credentials: ClientCredentials,
    ) -> Result<Self> {
        Ok(Self {
            http,
            endpoints: Arc::new(Endpoints::resolve(base_url)?),
            credentials: Arc::new(credentials),
            timeout: None,
        })
    }

    /// Apply a per-request timeout to every upstream call. Without one the
    /// transport defaults apply.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    pub(crate) fn prepare(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }
}
