use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Why a [`WakeSignal::wait`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full duration passed
    Elapsed,
    /// Another thread called [`WakeSignal::wake`]
    Woken,
    /// Shutdown was requested
    Shutdown,
}

/// An interruptible sleep shared between the state machine and its producers.
///
/// The network thread wakes the loop when a server event arrives; the CLI
/// triggers shutdown. A wake delivered while nobody waits is kept until the
/// next `wait`, so events that race with the start of a sleep are not lost.
pub struct WakeSignal {
    shutdown: AtomicBool,
    condvar: Condvar,
    /// Pending wake flag
    mutex: Mutex<bool>,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(false),
        }
    }

    /// Cut the current (or next) wait short.
    pub fn wake(&self) {
        // A poisoned lock only happens if a waiter panicked; the flag is still usable.
        let mut pending = match self.mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *pending = true;
        self.condvar.notify_all();
    }

    /// Trigger shutdown, waking all waiting threads.
    pub fn trigger(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, or until woken or shut down.
    ///
    /// A pending wake is consumed by this call.
    pub fn wait(&self, duration: Duration) -> WaitOutcome {
        if self.is_shutdown() {
            return WaitOutcome::Shutdown;
        }

        let guard = match self.mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return WaitOutcome::Shutdown,
        };
        let result = self
            .condvar
            .wait_timeout_while(guard, duration, |pending| {
                !*pending && !self.is_shutdown()
            });

        match result {
            Ok((mut pending, _)) => {
                let woken = std::mem::take(&mut *pending);
                if self.is_shutdown() {
                    WaitOutcome::Shutdown
                } else if woken {
                    WaitOutcome::Woken
                } else {
                    WaitOutcome::Elapsed
                }
            }
            // Mutex poisoned, treat as shutdown
            Err(_) => WaitOutcome::Shutdown,
        }
    }

    /// Wait ignoring wakes; returns `true` if shutdown was triggered.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = std::time::Instant::now() + duration;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return self.is_shutdown();
            }
            match self.wait(remaining) {
                WaitOutcome::Shutdown => return true,
                WaitOutcome::Elapsed => return false,
                WaitOutcome::Woken => {}
            }
        }
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_initial_state() {
        let signal = WakeSignal::new();
        assert!(!signal.is_shutdown());
    }

    #[test]
    fn test_wait_timeout() {
        let signal = WakeSignal::new();
        let start = Instant::now();
        let outcome = signal.wait(Duration::from_millis(50));
        let elapsed = start.elapsed();

        assert_eq!(outcome, WaitOutcome::Elapsed);
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[test]
    fn test_wake_before_wait_is_kept() {
        let signal = WakeSignal::new();
        signal.wake();

        let start = Instant::now();
        assert_eq!(signal.wait(Duration::from_secs(10)), WaitOutcome::Woken);
        assert!(start.elapsed() < Duration::from_millis(100));

        // Consumed by the first wait
        assert_eq!(
            signal.wait(Duration::from_millis(20)),
            WaitOutcome::Elapsed
        );
    }

    #[test]
    fn test_wait_woken_from_other_thread() {
        let signal = Arc::new(WakeSignal::new());
        let signal_clone = Arc::clone(&signal);

        let handle = thread::spawn(move || {
            let start = Instant::now();
            let outcome = signal_clone.wait(Duration::from_secs(10));
            (outcome, start.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        signal.wake();

        let (outcome, elapsed) = handle.join().unwrap();
        assert_eq!(outcome, WaitOutcome::Woken);
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_interrupted_by_shutdown() {
        let signal = Arc::new(WakeSignal::new());
        let signal_clone = Arc::clone(&signal);

        let handle = thread::spawn(move || signal_clone.wait(Duration::from_secs(10)));

        thread::sleep(Duration::from_millis(50));
        signal.trigger();

        assert_eq!(handle.join().unwrap(), WaitOutcome::Shutdown);
        assert!(signal.is_shutdown());
    }

    #[test]
    fn test_sleep_ignores_wakes() {
        let signal = WakeSignal::new();
        signal.wake();
        let start = Instant::now();
        assert!(!signal.sleep(Duration::from_millis(40)));
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_wait_already_shutdown() {
        let signal = WakeSignal::new();
        signal.trigger();
        assert_eq!(signal.wait(Duration::from_secs(10)), WaitOutcome::Shutdown);
        assert!(signal.sleep(Duration::from_secs(10)));
    }
}
