/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::SlotIndex;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shutdown subsystem errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ShutdownError {
    #[error("Invalid hook slot {slot} (table has {max} slots)")]
    #[diagnostic(
        code(shutdown::invalid_slot),
        help("Slots are fixed at build time. Use one of the constants in core::limits.")
    )]
    InvalidSlot { slot: SlotIndex, max: usize },

    #[error("Shutdown hook at slot {0} already registered")]
    #[diagnostic(
        code(shutdown::slot_already_bound),
        help("Each slot is claimed exactly once during initialization. This is an internal fault.")
    )]
    SlotAlreadyBound(SlotIndex),

    #[error("Shutdown in progress: {0}")]
    #[diagnostic(
        code(shutdown::in_progress),
        help("Termination has already started. Hooks can no longer be added or removed.")
    )]
    ShutdownInProgress(String),

    #[error("Hook previously registered: {0}")]
    #[diagnostic(
        code(shutdown::already_registered),
        help("The same hook instance can only be registered once.")
    )]
    AlreadyRegistered(String),

    #[error("Hook already running: {0}")]
    #[diagnostic(
        code(shutdown::already_running),
        help("A hook that has started cannot be registered again. Create a new hook instead.")
    )]
    AlreadyRunning(String),

    #[error("Hook reference is missing")]
    #[diagnostic(
        code(shutdown::null_action),
        help("Pass the hook handle returned at registration time.")
    )]
    NullAction,

    #[error("Fatal failure in shutdown hook at slot {slot}: {reason}")]
    #[diagnostic(
        code(shutdown::fatal_hook),
        help("A hook signalled an unrecoverable failure. Remaining hooks were skipped.")
    )]
    FatalHook { slot: SlotIndex, reason: String },

    #[error("Failed to start hook thread: {0}")]
    #[diagnostic(
        code(shutdown::spawn_failed),
        help("The system refused to create a thread. Check thread limits and memory.")
    )]
    Spawn(String),
}

impl ShutdownError {
    /// Whether the caller can reasonably carry on after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ShutdownError::ShutdownInProgress(_)
                | ShutdownError::AlreadyRegistered(_)
                | ShutdownError::AlreadyRunning(_)
        )
    }
}

// Allow conversion from thread spawn failures
impl From<std::io::Error> for ShutdownError {
    fn from(err: std::io::Error) -> Self {
        ShutdownError::Spawn(err.to_string())
    }
}

/// Result type for shutdown operations
pub type ShutdownResult<T> = Result<T, ShutdownError>;
