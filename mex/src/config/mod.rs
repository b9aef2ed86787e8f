//! Configuration module for the metadata resolver
//!
//! Holds the resolution limits (reference capacity, timeout, nested-reference
//! mode) and the settings of the two retrieval backends. Everything is
//! serde-deserializable so a resolver can be configured from a TOML file.

pub mod types;

pub use types::*;
