//! Top-level module for the impersonation model.
//!
//! This module provides:
//! - Tokens and lookup keys (`Token`, `NGramKey`)
//! - Per-user tables (`TransitionTable`, `ClosingTables`, `SourceTables`)
//! - User bookkeeping (`UserRecord`, `UserRegistry`)
//! - Generation configuration (`GenerationInput`)
//! - A high-level generation interface (`Generator`)

/// High-level interface for generating lines in the voice of loaded users.
///
/// Exposes loading, generation, and per-user and generic statistics.
pub mod generator;

/// Parameters of one generation request.
pub mod generation_input;

/// Registry of users: nick resolution, aliases, usage counters and aggregates.
pub mod registry;

/// Tables learned from one user's source lines.
pub mod source;

/// Transition tables and per-bracket closing tables.
pub mod table;

/// Word tokens, the URL placeholder and fixed-length keys.
pub mod token;

/// Bracket pairs, emoticon exceptions and the bracket stack used while rendering.
pub mod punctuation;

/// A single user and its statistics.
pub mod user;

/// Sources of randomness.
pub mod picker;
