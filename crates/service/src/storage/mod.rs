//! Storage helpers for the service layer
//!
//! Contains the file-backed JSON map used by the local durable cache.

pub mod json_map_store;
