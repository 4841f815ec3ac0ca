/*!
 * Shutdown Module
 *
 * Ordered, exactly-once process termination:
 * - `HookRegistry`: fixed slots of internal actions run in index order
 * - `ApplicationHookSet`: user tasks drained concurrently from one slot
 * - `ShutdownController`: serializes exit requests and performs the halt
 */

mod application;
pub mod config;
mod console;
mod controller;
mod delete_on_exit;
mod global;
mod latch;
mod registry;
pub mod stats;
pub mod traits;
pub mod types;

// Re-export public API
pub use application::{ApplicationHook, ApplicationHookSet};
pub use config::ShutdownConfig;
pub use console::ConsoleRestore;
pub use controller::{ShutdownController, ShutdownControllerBuilder};
pub use delete_on_exit::DeleteOnExit;
pub use global::{add_application_hook, exit, global, halt, remove_application_hook};
pub use latch::CompletionLatch;
pub use registry::{HookRegistry, SlotAction};
pub use stats::{AtomicShutdownStats, ShutdownStats};
pub use traits::{Halt, ProcessHalt};
pub use types::{
    DrainReport, HookError, HookResult, HookSeverity, HookState, RunSummary, TerminationPhase,
};
