//! HTTP middleware for the assistant.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. CORS
//! 4. Request ID (add unique ID to each request)
//!
//! Rate limiting is applied inside the chat handler so that the decision's
//! headers can be attached to successful responses too.

pub mod client_ip;
pub mod request_id;

pub use client_ip::{ANONYMOUS_CLIENT, client_identifier};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
