//! VitaGuide assistant library.
//!
//! The conversational pipeline, its collaborator adapters, and the HTTP
//! surface, as a library so the binary, the CLI, and the integration tests
//! share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod intent;
pub mod language;
pub mod middleware;
pub mod profiles;
pub mod providers;
pub mod rate_limit;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
