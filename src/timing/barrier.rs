use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Fires once after a fixed number of arrivals.
#[derive(Debug)]
pub struct CompletionBarrier {
    expected: usize,
    arrived: Mutex<usize>,
    fired: Condvar,
}

impl CompletionBarrier {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            arrived: Mutex::new(0),
            fired: Condvar::new(),
        }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn arrived(&self) -> usize {
        *self.arrived.lock()
    }

    /// Records one arrival. Returns `true` only for the arrival that
    /// completed the barrier. Arrivals past `expected` are ignored.
    pub fn arrive(&self) -> bool {
        let mut arrived = self.arrived.lock();
        if *arrived >= self.expected {
            tracing::warn!(expected = self.expected, "arrival after barrier completed");
            return false;
        }
        *arrived += 1;
        if *arrived < self.expected {
            return false;
        }
        drop(arrived);
        self.fired.notify_all();
        true
    }

    pub fn is_complete(&self) -> bool {
        *self.arrived.lock() >= self.expected
    }

    pub fn wait(&self) {
        let mut arrived = self.arrived.lock();
        while *arrived < self.expected {
            self.fired.wait(&mut arrived);
        }
    }

    /// Returns whether the barrier completed within `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut arrived = self.arrived.lock();
        while *arrived < self.expected {
            if self.fired.wait_until(&mut arrived, deadline).timed_out() {
                return *arrived >= self.expected;
            }
        }
        true
    }
}
