/*!
 * Hook Registry Tests
 * Slot ordering, write-once slots and late registration
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use vm_shutdown::{HookRegistry, ShutdownError, TerminationPhase, MAX_SLOTS};

fn recording_registry(slots: &[usize]) -> (HookRegistry, Arc<Mutex<Vec<usize>>>) {
    let registry = HookRegistry::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for &slot in slots {
        let order = Arc::clone(&order);
        registry
            .register(slot, false, format!("slot-{slot}"), move || {
                order.lock().push(slot);
                Ok(())
            })
            .unwrap();
    }
    (registry, order)
}

#[test]
fn test_scenario_gap_in_slots() {
    let (registry, order) = recording_registry(&[2, 0]);

    registry.run_all().unwrap();

    assert_eq!(*order.lock(), vec![0, 2]);
    assert!(!registry.is_bound(1));
    assert_eq!(registry.phase(), TerminationPhase::Halted);
}

#[test]
fn test_phase_progression() {
    let registry = Arc::new(HookRegistry::new());
    let observed = Arc::new(Mutex::new(None));

    let reg = Arc::clone(&registry);
    let seen = Arc::clone(&observed);
    registry
        .register(3, false, "observer", move || {
            *seen.lock() = Some((reg.phase(), reg.current_running_slot()));
            Ok(())
        })
        .unwrap();

    assert_eq!(registry.phase(), TerminationPhase::NotStarted);
    assert_eq!(registry.current_running_slot(), None);

    registry.run_all().unwrap();

    assert_eq!(
        *observed.lock(),
        Some((TerminationPhase::InProgress, Some(3)))
    );
    assert_eq!(registry.phase(), TerminationPhase::Halted);
}

#[test]
fn test_strict_registration_refused_once_running() {
    let registry = Arc::new(HookRegistry::new());
    let outcome = Arc::new(Mutex::new(None));

    let reg = Arc::clone(&registry);
    let out = Arc::clone(&outcome);
    registry
        .register(0, false, "first", move || {
            *out.lock() = Some(reg.register(8, false, "strict", || Ok(())));
            Ok(())
        })
        .unwrap();

    registry.run_all().unwrap();
    assert!(matches!(
        outcome.lock().take(),
        Some(Err(ShutdownError::ShutdownInProgress(_)))
    ));
    assert!(!registry.is_bound(8));
}

#[test]
fn test_concurrent_registration_binds_each_slot_once() {
    const THREADS: usize = 8;
    let registry = Arc::new(HookRegistry::new());
    let barrier = Arc::new(Barrier::new(THREADS));
    let wins = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            let wins = Arc::clone(&wins);
            thread::spawn(move || {
                barrier.wait();
                for slot in 0..MAX_SLOTS {
                    match registry.register(slot, false, format!("t{t}"), || Ok(())) {
                        Ok(()) => {
                            wins.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => assert_eq!(e, ShutdownError::SlotAlreadyBound(slot)),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(wins.load(Ordering::SeqCst), MAX_SLOTS);
    assert_eq!(registry.bound_count(), MAX_SLOTS);
}

proptest! {
    #[test]
    fn prop_run_order_is_ascending(
        shuffled in Just((0..MAX_SLOTS).collect::<Vec<_>>()).prop_shuffle(),
        keep in proptest::collection::vec(any::<bool>(), MAX_SLOTS),
    ) {
        let slots: Vec<usize> = shuffled
            .into_iter()
            .filter(|&slot| keep[slot])
            .collect();
        let (registry, order) = recording_registry(&slots);

        let summary = registry.run_all().unwrap();

        let mut expected = slots.clone();
        expected.sort_unstable();
        prop_assert_eq!(order.lock().clone(), expected.clone());
        prop_assert_eq!(summary.executed, expected);
    }

    #[test]
    fn prop_out_of_range_slots_rejected(slot in MAX_SLOTS..usize::MAX) {
        let registry = HookRegistry::new();
        let is_invalid = matches!(
            registry.register(slot, true, "x", || Ok(())),
            Err(ShutdownError::InvalidSlot { .. })
        );
        prop_assert!(is_invalid);
    }
}
