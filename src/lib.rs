/*!
 * VM Shutdown
 * Ordered termination hooks and exit sequencing for a managed runtime
 */

pub mod core;
pub mod monitoring;
pub mod shutdown;

// Re-exports
pub use crate::core::errors::{ShutdownError, ShutdownResult};
pub use crate::core::limits::{
    APPLICATION_HOOKS_SLOT, CONSOLE_RESTORE_SLOT, DELETE_ON_EXIT_SLOT, MAX_SLOTS,
};
pub use crate::core::types::{ExitStatus, HookId, SlotIndex};
pub use monitoring::init_tracing;
pub use shutdown::{
    ApplicationHook, ApplicationHookSet, DrainReport, Halt, HookError, HookRegistry, HookResult,
    ProcessHalt, RunSummary, ShutdownConfig, ShutdownController, TerminationPhase,
};
