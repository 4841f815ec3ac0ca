/*!
 * Shutdown Controller Tests
 * Exit serialization, halting and the last-thread path
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use vm_shutdown::{
    ApplicationHook, ExitStatus, Halt, HookError, ShutdownConfig, ShutdownController,
    ShutdownError, TerminationPhase,
};

/// Records halts and returns to the caller
#[derive(Default)]
struct RecordingHalt {
    statuses: Mutex<Vec<ExitStatus>>,
}

impl Halt for RecordingHalt {
    fn halt(&self, status: ExitStatus) {
        self.statuses.lock().push(status);
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Records the halt, then never returns, like a real process halt
struct ParkingHalt {
    halts: AtomicUsize,
    notify: Mutex<mpsc::Sender<ExitStatus>>,
}

impl Halt for ParkingHalt {
    fn halt(&self, status: ExitStatus) {
        self.halts.fetch_add(1, Ordering::SeqCst);
        let _ = self.notify.lock().send(status);
        loop {
            thread::park();
        }
    }

    fn name(&self) -> &'static str {
        "parking"
    }
}

fn build(halter: Arc<dyn Halt>) -> ShutdownController {
    ShutdownController::builder()
        .with_halter(halter)
        .with_config(ShutdownConfig::quiet())
        .with_delete_on_exit()
        .build()
        .unwrap()
}

#[test]
fn test_concurrent_exit_runs_sequence_once() {
    const THREADS: usize = 6;
    let (tx, rx) = mpsc::channel();
    let halter = Arc::new(ParkingHalt {
        halts: AtomicUsize::new(0),
        notify: Mutex::new(tx),
    });
    let controller = Arc::new(build(halter.clone()));

    let runs = Arc::new(AtomicUsize::new(0));
    let app_runs = Arc::new(AtomicUsize::new(0));
    {
        let runs = Arc::clone(&runs);
        controller
            .register(5, false, "count-runs", move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        let app_runs = Arc::clone(&app_runs);
        controller
            .add_application_hook(&ApplicationHook::new("count-app", move || {
                app_runs.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
    }

    let barrier = Arc::new(Barrier::new(THREADS));
    for i in 0..THREADS {
        let controller = Arc::clone(&controller);
        let barrier = Arc::clone(&barrier);
        // Left running: every thread either halts (parks) or waits on the winner
        thread::spawn(move || {
            barrier.wait();
            controller.request_exit(i as ExitStatus);
        });
    }

    rx.recv_timeout(Duration::from_secs(10))
        .expect("one exit request should reach the halt");
    thread::sleep(Duration::from_millis(200));

    assert_eq!(halter.halts.load(Ordering::SeqCst), 1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(app_runs.load(Ordering::SeqCst), 1);
    assert_eq!(controller.stats().halts, 1);
    assert_eq!(controller.stats().exit_requests, THREADS as u64);
    assert_eq!(controller.phase(), TerminationPhase::Halted);
}

#[test]
fn test_exit_sequence_order() {
    let halter = Arc::new(RecordingHalt::default());
    let controller = Arc::new(build(halter.clone()));
    let order = Arc::new(Mutex::new(Vec::new()));

    for slot in [7usize, 3] {
        let order = Arc::clone(&order);
        controller
            .register(slot, false, format!("slot-{slot}"), move || {
                order.lock().push(format!("slot-{slot}"));
                Ok(())
            })
            .unwrap();
    }
    let app_order = Arc::clone(&order);
    controller
        .add_application_hook(&ApplicationHook::new("app", move || {
            app_order.lock().push("app".to_string());
        }))
        .unwrap();

    controller.request_exit(0);

    assert_eq!(
        *order.lock(),
        vec!["app".to_string(), "slot-3".to_string(), "slot-7".to_string()]
    );
    assert_eq!(*halter.statuses.lock(), vec![0]);
}

#[test]
fn test_hook_registering_later_and_earlier_slots() {
    let halter = Arc::new(RecordingHalt::default());
    let controller = Arc::new(build(halter));
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let ran_late = Arc::new(AtomicUsize::new(0));

    // Slot 1 belongs to the application hooks, so use a user hook there
    let ctl = Arc::clone(&controller);
    let out = Arc::clone(&outcomes);
    let late = Arc::clone(&ran_late);
    controller
        .add_application_hook(&ApplicationHook::new("registers", move || {
            let late = Arc::clone(&late);
            out.lock().push(ctl.register(5, true, "x", move || {
                late.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
            out.lock().push(ctl.register(0, true, "y", || Ok(())));
        }))
        .unwrap();

    controller.shutdown_from_last_thread_exit().unwrap();

    let outcomes = outcomes.lock();
    assert!(outcomes[0].is_ok());
    assert!(matches!(
        outcomes[1],
        Err(ShutdownError::ShutdownInProgress(_))
    ));
    assert_eq!(ran_late.load(Ordering::SeqCst), 1);
}

#[test]
fn test_exit_from_slot_hook_halts_without_deadlock() {
    let halter = Arc::new(RecordingHalt::default());
    let controller = Arc::new(build(halter.clone()));

    let ctl = Arc::clone(&controller);
    controller
        .register(4, false, "exits", move || {
            ctl.request_exit(42);
            Ok(())
        })
        .unwrap();

    controller.request_exit(0);
    assert_eq!(*halter.statuses.lock(), vec![42, 0]);
}

#[test]
fn test_forced_exit_after_hooks_completed() {
    let halter = Arc::new(RecordingHalt::default());
    let controller = build(halter.clone());
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    controller
        .register(6, false, "count", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    controller.shutdown_from_last_thread_exit().unwrap();
    controller.request_exit(137);

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(*halter.statuses.lock(), vec![137]);
}

#[test]
fn test_delete_on_exit_accepts_files_from_application_hooks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("written-by-hook.log");
    let halter = Arc::new(RecordingHalt::default());
    let controller = Arc::new(build(halter));

    let ctl = Arc::clone(&controller);
    let hook_path = path.clone();
    controller
        .add_application_hook(&ApplicationHook::new("writes-log", move || {
            std::fs::write(&hook_path, b"final words").unwrap();
            if let Some(delete_on_exit) = ctl.delete_on_exit() {
                delete_on_exit.add(&hook_path).unwrap();
            }
        }))
        .unwrap();

    controller.request_exit(0);
    assert!(!path.exists());
}

#[test]
fn test_registration_after_exit_fails() {
    let halter = Arc::new(RecordingHalt::default());
    let controller = build(halter);
    controller.request_exit(0);

    let hook = ApplicationHook::new("too-late", || {});
    assert!(matches!(
        controller.add_application_hook(&hook),
        Err(ShutdownError::ShutdownInProgress(_))
    ));
    assert!(matches!(
        controller.register(8, true, "too-late", || Ok(())),
        Err(ShutdownError::ShutdownInProgress(_))
    ));
}

#[test]
fn test_fatal_last_thread_exit_then_exit_runs_each_slot_once() {
    let halter = Arc::new(RecordingHalt::default());
    let controller = build(halter.clone());
    let slot_runs = Arc::new(AtomicUsize::new(0));
    let app_runs = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&slot_runs);
    controller
        .register(3, false, "count", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    controller
        .register(5, false, "fatal", || Err(HookError::fatal("heap corrupted")))
        .unwrap();
    let app_counter = Arc::clone(&app_runs);
    controller
        .add_application_hook(&ApplicationHook::new("count-app", move || {
            app_counter.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

    let err = controller.shutdown_from_last_thread_exit().unwrap_err();
    assert!(matches!(err, ShutdownError::FatalHook { slot: 5, .. }));

    controller.request_exit(1);

    assert_eq!(slot_runs.load(Ordering::SeqCst), 1);
    assert_eq!(app_runs.load(Ordering::SeqCst), 1);
    assert_eq!(*halter.statuses.lock(), vec![1]);
    // Application hooks, delete-on-exit, count and fatal
    assert_eq!(controller.stats().slots_run, 4);
}
