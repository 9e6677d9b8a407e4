//! Dexcom API client
//!
//! Wraps the handful of Dexcom endpoints the proxy needs. This crate has no
//! dependency on the proxy binary and can be tested on its own.
//!
//! Flow:
//! 1. Frontend is redirected to `DexcomClient::authorization_url()`
//! 2. Dexcom calls back with a code, exchanged via `DexcomClient::exchange_code()`
//! 3. The access token is used for `DexcomClient::data_range()`
//! 4. `EgvWindow::from_data_range()` clamps the range and
//!    `DexcomClient::egvs()` fetches the readings

pub mod authorize;
pub mod client;
pub mod constants;
pub mod data;
pub mod error;
pub mod token;
pub mod window;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use client::{ClientCredentials, DexcomClient};
pub use constants::*;
pub use error::{Endpoint, Error, Result};
pub use token::TokenResponse;
pub use window::EgvWindow;
