/*!
 * System Limits and Constants
 *
 * Centralized location for the slot layout and tunables of the shutdown
 * subsystem.
 */

// =============================================================================
// HOOK SLOTS
// =============================================================================

/// Number of slots in the internal hook table
/// Slots run in ascending index order during termination
pub const MAX_SLOTS: usize = 10;

/// Console state restoration (echo, raw mode)
/// Runs first so later hooks can still write to a sane terminal
pub const CONSOLE_RESTORE_SLOT: usize = 0;

/// Relay for all user-registered application hooks
pub const APPLICATION_HOOKS_SLOT: usize = 1;

/// Deletion of files registered for removal on exit
/// Runs after application hooks, which may still register files
pub const DELETE_ON_EXIT_SLOT: usize = 2;

// =============================================================================
// HOOK THREADS
// =============================================================================

/// Default name prefix for application hook threads
pub const DEFAULT_HOOK_THREAD_PREFIX: &str = "shutdown-hook";

/// Smallest stack accepted from configuration (64KB)
pub const MIN_HOOK_STACK_SIZE: usize = 64 * 1024;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Overrides the stack size of application hook threads
pub const ENV_HOOK_STACK_SIZE: &str = "SHUTDOWN_HOOK_STACK_SIZE";

/// Enables or disables debug logging of exit requests
pub const ENV_LOG_EXIT: &str = "SHUTDOWN_LOG_EXIT";

/// Switches tracing output to JSON
pub const ENV_TRACE_JSON: &str = "SHUTDOWN_TRACE_JSON";
