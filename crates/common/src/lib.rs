//! Shared runtime helpers for the namerator workspace.
//! - tracing subscriber setup
//! - data directory checks
//! - admin HTTP endpoint (healthz/metrics)
//! - human-readable byte sizes

pub mod utils;
pub mod env;
pub mod admin_http;
