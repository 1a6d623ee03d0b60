//! API contract constants shared between the CLI's HTTP client and the
//! service's router, so the two can never drift apart on a path string.

/// Default configuration values.
pub mod defaults {
    /// Default port the `dotmd-indexer` service binds to.
    pub const SERVER_PORT: u16 = 8088;

    /// Default host the `dotmd-indexer` service binds to.
    pub const SERVER_HOST: &str = "localhost";

    /// Default request timeout in milliseconds.
    pub const REQUEST_TIMEOUT_MS: u64 = 30000;

    /// API URL prefix.
    pub const API_PREFIX: &str = "/api";
}

/// API endpoint paths.
pub mod endpoints {
    pub const STATUS: &str = "/api/status";
    pub const SEARCH: &str = "/api/search";
    pub const INDEX: &str = "/api/index";
    pub const CLEAR: &str = "/api/clear";
    pub const HEALTH: &str = "/healthz";
}

/// URL generation utilities.
pub mod urls {
    use super::defaults::{SERVER_HOST, SERVER_PORT};

    pub fn default_server_url() -> String {
        format!("http://{}:{}", SERVER_HOST, SERVER_PORT)
    }

    pub fn server_url(host: &str, port: u16) -> String {
        format!("http://{}:{}", host, port)
    }
}
