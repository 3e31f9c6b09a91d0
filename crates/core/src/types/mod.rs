//! Core types for VitaGuide.
//!
//! This module provides type-safe wrappers for the assistant's domain concepts.

pub mod combo;
pub mod conversation;
pub mod goal;
pub mod id;
pub mod intent;
pub mod price;
pub mod product;
pub mod profile;

pub use combo::ComboResult;
pub use conversation::{ConversationRole, ConversationTurn, Language};
pub use goal::{GoalKey, GoalParseError};
pub use id::*;
pub use intent::{DietaryFlags, Intent, SearchGate};
pub use price::{CurrencyCode, CurrencyError, Price};
pub use product::{ProductCandidate, RankedProduct, UsageInstructions};
pub use profile::{BudgetRange, Gender, Profile};
