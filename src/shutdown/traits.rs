/*!
 * Shutdown Traits
 * Seams between the termination sequence and the host process
 */

use crate::core::types::ExitStatus;

/// Terminal stop of the process
///
/// Implementations of `halt` are expected not to return in production.
/// Tests inject halters that record the call instead.
pub trait Halt: Send + Sync {
    /// Notification issued once before the hook sequence of an exit request
    fn before_halt(&self) {}

    /// Stop the process with `status`
    fn halt(&self, status: ExitStatus);

    /// Get halter name for debugging
    fn name(&self) -> &'static str;
}

/// Halts the real process through `std::process::exit`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessHalt;

impl Halt for ProcessHalt {
    fn halt(&self, status: ExitStatus) {
        std::process::exit(status)
    }

    fn name(&self) -> &'static str {
        "process"
    }
}
