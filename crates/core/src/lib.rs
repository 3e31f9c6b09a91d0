//! VitaGuide Core - Shared domain types library.
//!
//! This crate provides the request-scoped types shared by every VitaGuide component:
//! - `assistant` - Conversational nutrition assistant (HTTP API + pipeline)
//! - `cli` - Command-line tools for migrations, profiles, and offline classification
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Goals, profiles, intents, product candidates, combos, prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
