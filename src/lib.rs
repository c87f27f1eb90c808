pub mod api;
pub mod config;
pub mod error;
pub mod reporter;
pub mod types;

/// Manifold REST API base URL (version 0).
pub const API_BASE_URL: &str = "https://api.manifold.markets/v0";

/// Environment variable holding the Manifold API key.
pub const API_KEY_VAR: &str = "MANIFOLD_API_KEY";
