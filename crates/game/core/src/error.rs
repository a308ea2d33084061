//! Common error infrastructure for pug-core.
//!
//! Domain-specific errors live next to the code that raises them
//! (`TurnError` in [`crate::engine`], `LevelError` in [`crate::grid`],
//! `SpawnError` in [`crate::state`]). This module provides the shared
//! severity classification they all report through [`GameError`].
//!
//! # Design Principles
//!
//! - **Isolation**: per-entity decision failures are never errors; they
//!   degrade to "stay" inside the resolver. Only structural failures
//!   surface as `Err`.
//! - **Severity Classification**: errors are categorized so the shell can
//!   decide whether to keep the turn loop alive.

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Temporary condition; the same request may succeed later.
    ///
    /// Examples: input submitted while a turn is resolving, spawn cell occupied
    Recoverable,

    /// Invalid input that should not be retried unchanged.
    ///
    /// Examples: spawn outside the grid, unknown entity id
    Validation,

    /// The world is structurally broken and no turn can be resolved.
    ///
    /// Examples: no player entity, two entities in one cell
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

/// Common interface implemented by every error type in pug-core.
pub trait GameError: std::error::Error {
    /// Classifies the error for recovery decisions.
    fn severity(&self) -> ErrorSeverity;

    /// Stable machine-readable code, e.g. `TURN_MISSING_PLAYER`.
    fn error_code(&self) -> &'static str;
}
