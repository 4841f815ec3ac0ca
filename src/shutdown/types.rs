/*!
 * Shutdown Types
 * Hook outcomes, lifecycle states and run summaries
 */

use crate::core::types::SlotIndex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result returned by a slot action
pub type HookResult = Result<(), HookError>;

/// How a hook failure affects the rest of the sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookSeverity {
    /// Logged and suppressed; later slots still run
    Recoverable,
    /// Aborts the remaining sequence
    Fatal,
}

/// Failure reported by a slot action
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{severity:?} hook failure: {message}")]
pub struct HookError {
    pub severity: HookSeverity,
    pub message: String,
}

impl HookError {
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self {
            severity: HookSeverity::Recoverable,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            severity: HookSeverity::Fatal,
            message: message.into(),
        }
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.severity == HookSeverity::Fatal
    }
}

/// Process-wide termination state
///
/// Monotonic: NotStarted -> InProgress -> Halted, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationPhase {
    /// Hooks may still be registered freely
    NotStarted,
    /// The slot sequence is executing
    InProgress,
    /// Every slot has run; only the halt remains
    Halted,
}

impl fmt::Display for TerminationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminationPhase::NotStarted => "not-started",
            TerminationPhase::InProgress => "in-progress",
            TerminationPhase::Halted => "halted",
        };
        f.write_str(name)
    }
}

/// Execution state of an application hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HookState {
    /// Registered or free-standing, never started
    Idle = 0,
    /// Body is executing on its own thread
    Running = 1,
    /// Body has returned or panicked
    Finished = 2,
}

impl HookState {
    #[inline]
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => HookState::Idle,
            1 => HookState::Running,
            _ => HookState::Finished,
        }
    }

    /// A hook that has ever been started cannot be registered again
    #[inline]
    pub fn has_started(&self) -> bool {
        !matches!(self, HookState::Idle)
    }
}

/// What a call to `HookRegistry::run_all` did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Bound slots that were invoked, in invocation order
    pub executed: Vec<SlotIndex>,
    /// Slots whose action failed recoverably or panicked
    pub failed: Vec<SlotIndex>,
    /// The sequence had already started, completed or aborted; nothing ran
    pub already_run: bool,
}

impl RunSummary {
    pub(crate) fn skipped() -> Self {
        Self {
            already_run: true,
            ..Default::default()
        }
    }
}

/// What a drain of the application hook set did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Hook threads started
    pub started: usize,
    /// Hooks whose body panicked
    pub panicked: usize,
    /// Hooks that could not get a thread
    pub spawn_failures: usize,
}
