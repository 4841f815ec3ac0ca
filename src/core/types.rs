/*!
 * Core Types
 * Common types used across the shutdown subsystem
 */

/// Process exit status handed to the halt primitive
pub type ExitStatus = i32;

/// Index into the fixed hook slot table
pub type SlotIndex = usize;

/// Identity of an application hook
pub type HookId = u64;
