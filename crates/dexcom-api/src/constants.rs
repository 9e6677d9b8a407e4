//! Dexcom API paths and fixed OAuth parameters
//!
//! Paths are appended to the configured base URL, which selects between the
//! sandbox (`https://sandbox-api.dexcom.com`) and production hosts.

/// Authorization page the user is redirected to
pub const LOGIN_PATH: &str = "/v2/oauth2/login";

/// Token endpoint for authorization code exchange
pub const TOKEN_PATH: &str = "/v2/oauth2/token";

/// Earliest and latest record times available for the user
pub const DATA_RANGE_PATH: &str = "/v2/users/self/dataRange";

/// Estimated glucose values for a time window
pub const EGVS_PATH: &str = "/v2/users/self/egvs";

pub const RESPONSE_TYPE: &str = "code";

/// `offline_access` is the only scope Dexcom defines for the v2 API.
pub const SCOPE: &str = "offline_access";

pub const GRANT_TYPE: &str = "authorization_code";

/// Timestamp format used by `systemTime` fields and the EGV query parameters.
pub const SYSTEM_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Longest window the EGV endpoint accepts in a single query.
pub const MAX_WINDOW_DAYS: i64 = 90;
