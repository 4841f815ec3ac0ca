/*!
 * shutdownd - Main Entry Point
 *
 * Small daemon that wires the process-wide shutdown controller:
 * - Console restore and delete-on-exit slots
 * - A few application hooks of varying duration
 * - A final slot that reports shutdown statistics
 *
 * Usage: shutdownd [EXIT_STATUS]
 */

use anyhow::Context;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;
use vm_shutdown::shutdown::{self, ApplicationHook, HookError};
use vm_shutdown::{init_tracing, MAX_SLOTS};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let status = std::env::args()
        .nth(1)
        .map(|raw| raw.parse::<i32>())
        .transpose()
        .context("exit status must be an integer")?
        .unwrap_or(0);

    info!("shutdownd starting...");
    let controller = shutdown::global()?;

    if let Some(console) = controller.console_restore() {
        console.set_restore(|| {
            info!("Console state restored");
            Ok(())
        });
    }

    let scratch = std::env::temp_dir().join(format!("shutdownd-{}.tmp", std::process::id()));
    std::fs::write(&scratch, b"scratch").context("creating scratch file")?;
    if let Some(delete_on_exit) = controller.delete_on_exit() {
        delete_on_exit.add(&scratch)?;
        info!(path = %scratch.display(), "Scratch file scheduled for deletion");
    }

    for (name, millis) in [("flush-journal", 50u64), ("close-sessions", 120), ("sync-cache", 20)] {
        controller.add_application_hook(&ApplicationHook::new(name, move || {
            thread::sleep(Duration::from_millis(millis));
            info!(hook = name, millis, "Application hook done");
        }))?;
    }

    let reporter = Arc::clone(controller);
    controller.register(MAX_SLOTS - 1, false, "stats-report", move || {
        let stats = serde_json::to_string(&reporter.stats())
            .map_err(|e| HookError::recoverable(e.to_string()))?;
        info!(stats = %stats, "Shutdown statistics");
        Ok(())
    })?;

    info!(status, "Requesting exit");
    shutdown::exit(status)
}
