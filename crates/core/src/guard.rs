//! One-shot guards for completion and retry scheduling.

use std::sync::atomic::{AtomicBool, Ordering};

/// A consumed-once token: the first [`acquire`](OnceGuard::acquire) wins and
/// every later call is inert.
///
/// Retry chains hold one guard for "terminal outcome delivered" and one per
/// attempt for "this attempt already settled", so duplicate transport signals
/// can neither double-complete an upload nor schedule a second retry.
#[derive(Debug, Default)]
pub struct OnceGuard {
    fired: AtomicBool,
}

impl OnceGuard {
    pub fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }

    /// Consume the guard. Returns `true` exactly once.
    pub fn acquire(&self) -> bool {
        !self.fired.swap(true, Ordering::AcqRel)
    }

    /// Whether the guard has already been consumed.
    pub fn consumed(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::OnceGuard;

    #[test]
    fn first_acquire_wins() {
        let guard = OnceGuard::new();
        assert!(!guard.consumed());
        assert!(guard.acquire());
        assert!(guard.consumed());
        assert!(!guard.acquire());
        assert!(!guard.acquire());
    }

    #[test]
    fn exactly_one_winner_across_threads() {
        let guard = std::sync::Arc::new(OnceGuard::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                std::thread::spawn(move || guard.acquire())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
