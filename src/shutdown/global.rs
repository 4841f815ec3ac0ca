/*!
 * Process-Wide Controller
 *
 * Lazily built controller wired to the real process halt. It lives for the
 * rest of the process once created.
 */

use super::application::ApplicationHook;
use super::config::ShutdownConfig;
use super::controller::ShutdownController;
use crate::core::errors::ShutdownResult;
use crate::core::types::ExitStatus;
use std::sync::{Arc, OnceLock};
use tracing::error;

static GLOBAL_CONTROLLER: OnceLock<Arc<ShutdownController>> = OnceLock::new();

/// Get the process-wide controller, building it on first use
pub fn global() -> ShutdownResult<&'static Arc<ShutdownController>> {
    if let Some(controller) = GLOBAL_CONTROLLER.get() {
        return Ok(controller);
    }

    let controller = ShutdownController::builder()
        .with_config(ShutdownConfig::from_env())
        .with_console_restore()
        .with_delete_on_exit()
        .build()?;

    // A racing initializer may win; its controller is the one kept
    Ok(GLOBAL_CONTROLLER.get_or_init(|| Arc::new(controller)))
}

/// Run the shutdown sequence and terminate the process
pub fn exit(status: ExitStatus) -> ! {
    match global() {
        Ok(controller) => controller.request_exit(status),
        Err(e) => error!(error = %e, status, "Shutdown controller unavailable, exiting directly"),
    }
    std::process::exit(status)
}

/// Terminate the process without running any hooks
pub fn halt(status: ExitStatus) -> ! {
    match global() {
        Ok(controller) => controller.halt(status),
        Err(e) => error!(error = %e, status, "Shutdown controller unavailable, exiting directly"),
    }
    std::process::exit(status)
}

/// Register a user termination task with the process-wide controller
pub fn add_application_hook(hook: &ApplicationHook) -> ShutdownResult<()> {
    global()?.add_application_hook(hook)
}

/// De-register a user termination task from the process-wide controller
pub fn remove_application_hook(hook: &ApplicationHook) -> ShutdownResult<bool> {
    global()?.remove_application_hook(hook)
}
