//! Core error types.
//!
//! [`ScriptoriumError`] is the error type the whole project speaks:
//! configuration problems, database failures, serialization trouble and
//! command-level errors all end up here, and `main` renders whatever
//! bubbles up before exiting non-zero.

use thiserror::Error;

/// The project-wide error type.
///
/// Only [`ScriptoriumError::CommandError`] ever receives special treatment:
/// the initialization sequence logs and skips it for the asset compression
/// step, and lets every other variant abort the run.
#[derive(Error, Debug)]
pub enum ScriptoriumError {
    // ── Configuration ────────────────────────────────────────────────

    /// A settings value is missing, unparsable or contradictory.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The settings are valid but do not support the requested operation.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Commands ─────────────────────────────────────────────────────

    /// A management command reporting its own failure condition.
    #[error("Command error: {0}")]
    CommandError(String),

    // ── Database ─────────────────────────────────────────────────────

    /// A failing SQL statement or an inconsistency in the schema state.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// The database itself is unreachable or unusable.
    #[error("Operational error: {0}")]
    OperationalError(String),

    /// A constraint rejected the data.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// A single-row query matched nothing.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// A single-row query matched more than one row.
    #[error("Multiple objects returned when one expected: {0}")]
    MultipleObjectsReturned(String),

    // ── Data ─────────────────────────────────────────────────────────

    /// Encoding or decoding of fixtures, migrations or catalogs failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Well-formed data that violates the schema's rules.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A file or object that should exist does not.
    #[error("Not found: {0}")]
    NotFound(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An underlying I/O failure.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Shorthand for `Result<T, ScriptoriumError>`.
pub type ScriptoriumResult<T> = Result<T, ScriptoriumError>;
