//! Impersonation text generator.
//!
//! This crate learns word-level n-gram tables from per-user chat logs and
//! generates new lines in the voice of one or several users, including:
//! - Transition and closing-bracket tables built from source lines
//! - A registry of users, aliases and usage counters
//! - Bracket-balanced generation with controllable randomness
//! - Persistence of usage counters between runs
//!
//! Most callers only need `model::generator::Generator`.

/// Generation parameters and their defaults.
pub mod config;

/// Crate error type.
pub mod error;

/// Core tables, registry and generation logic.
pub mod model;

/// I/O utilities (file loading, directory listing, metadata parsing).
pub mod io;

/// Usage counter persistence.
pub mod usage;

pub use config::GeneratorConfig;
pub use error::{ImpostorError, Result};
