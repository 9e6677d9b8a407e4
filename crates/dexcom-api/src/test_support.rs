//! In-process stand-in for the Dexcom API
//!
//! Compiled for this crate's tests and, behind the `test-support` feature,
//! for downstream crates that exercise their handlers against it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use tokio::net::TcpListener;

use common::Secret;

use crate::client::{ClientCredentials, DexcomClient};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub body: String,
}

pub struct MockDexcom {
    /// Base URL to configure a client with
    pub url: String,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockDexcom {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Client for the mock using the `test-client` / `test-secret` credentials
    pub fn client(&self) -> DexcomClient {
        DexcomClient::new(
            reqwest::Client::new(),
            &self.url,
            ClientCredentials {
                client_id: "test-client".into(),
                client_secret: Secret::new("test-secret".into()),
                redirect_uri: "http://localhost:5000/api/dexcom/callback".into(),
            },
        )
        .unwrap()
    }
}

/// Serve canned `(path, status, body)` responses; unknown paths get 404.
pub async fn mock_dexcom(routes: &[(&str, u16, &str)]) -> MockDexcom {
    let responses: Arc<HashMap<String, (StatusCode, String)>> = Arc::new(
        routes
            .iter()
            .map(|(path, status, body)| {
                (
                    path.to_string(),
                    (StatusCode::from_u16(*status).unwrap(), body.to_string()),
                )
            })
            .collect(),
    );
    let requests = Arc::new(Mutex::new(Vec::new()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let recorded = requests.clone();
    let app = axum::Router::new().fallback(
        move |request: axum::http::Request<axum::body::Body>| {
            let responses = responses.clone();
            let recorded = recorded.clone();
            async move {
                let method = request.method().to_string();
                let path = request.uri().path().to_string();
                let query = request.uri().query().unwrap_or("").to_string();
                let authorization = request
                    .headers()
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let body = axum::body::to_bytes(request.into_body(), 1024 * 1024)
                    .await
                    .unwrap();
                recorded.lock().unwrap().push(RecordedRequest {
                    method,
                    path: path.clone(),
                    query,
                    authorization,
                    body: String::from_utf8_lossy(&body).into_owned(),
                });

                match responses.get(&path) {
                    Some((status, body)) => (
                        *status,
                        [(header::CONTENT_TYPE, "application/json")],
                        body.clone(),
                    )
                        .into_response(),
                    None => StatusCode::NOT_FOUND.into_response(),
                }
            }
        },
    );
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockDexcom {
        url: format!("http://{addr}"),
        requests,
    }
}
