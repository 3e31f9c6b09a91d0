//! The chat pipeline.
//!
//! # Services
//!
//! - `assistant` - one chat turn from message to payload
//! - `assembler` - final payload and its product sanitization

pub mod assembler;
pub mod assistant;

pub use assembler::{ChatResponse, ResponseParts, assemble};
pub use assistant::{Assistant, ChatOutcome, ChatRequest, Collaborators};
