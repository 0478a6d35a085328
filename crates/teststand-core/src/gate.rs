//! Single-flight admission gate.
//!
//! At most one test workflow may be in flight at any time, system-wide
//! (not per battery). The gate is a single [`AtomicBool`] shared between
//! the start-test handler and the analysis-done callback handler, so
//! admission is a lock-free compare-and-set with no window where two
//! requests can both succeed.

use std::sync::atomic::{AtomicBool, Ordering};

/// Binary admission gate serializing test workflows.
///
/// Transitions Idle → Busy on [`try_admit`](Self::try_admit) and
/// Busy → Idle on [`release`](Self::release). There is deliberately no
/// timeout: a workflow that never receives its analysis-done callback
/// leaves the gate Busy until process restart.
#[derive(Debug, Default)]
pub struct SingleFlightGate {
    /// Whether a workflow is currently in flight.
    busy: AtomicBool,
}

impl SingleFlightGate {
    /// Create a new gate in the Idle state.
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// Atomically transition Idle → Busy.
    ///
    /// Returns `true` if this call won admission, `false` (with no state
    /// change) if a workflow is already in flight. A `false` return is a
    /// normal busy outcome, not an error.
    pub fn try_admit(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Transition Busy → Idle unconditionally.
    ///
    /// Idempotent: releasing an already-Idle gate is a no-op.
    pub fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    /// Check whether a workflow is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_idle() {
        let gate = SingleFlightGate::new();
        assert!(!gate.is_busy());
    }

    #[test]
    fn first_admit_wins_second_is_rejected() {
        let gate = SingleFlightGate::new();
        assert!(gate.try_admit());
        assert!(gate.is_busy());
        assert!(!gate.try_admit());
        assert!(gate.is_busy());
    }

    #[test]
    fn release_reopens_exactly_one_admission() {
        let gate = SingleFlightGate::new();
        assert!(gate.try_admit());
        gate.release();
        assert!(!gate.is_busy());
        assert!(gate.try_admit());
        assert!(!gate.try_admit());
    }

    #[test]
    fn release_on_idle_gate_is_a_noop() {
        let gate = SingleFlightGate::new();
        gate.release();
        assert!(!gate.is_busy());
        gate.release();
        assert!(gate.try_admit());
    }

    #[test]
    fn concurrent_admission_admits_exactly_one() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        let gate = Arc::new(SingleFlightGate::new());
        let admitted = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let admitted = Arc::clone(&admitted);
                std::thread::spawn(move || {
                    if gate.try_admit() {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            let _ = handle.join();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
        assert!(gate.is_busy());
    }
}
