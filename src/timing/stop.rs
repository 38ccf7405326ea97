use std::time::Instant;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;

/// Raises the stop signal for every [`StopSignal`] created with it.
#[derive(Debug)]
pub struct StopHandle {
    sender: Mutex<Option<Sender<()>>>,
}

/// Observes a [`StopHandle`]. Nothing is ever sent on the channel; the
/// handle dropping its sender disconnects it, which wakes every waiter.
#[derive(Debug, Clone)]
pub struct StopSignal {
    receiver: Receiver<()>,
}

pub fn stop_pair() -> (StopHandle, StopSignal) {
    let (sender, receiver) = channel::bounded(0);
    (
        StopHandle {
            sender: Mutex::new(Some(sender)),
        },
        StopSignal { receiver },
    )
}

impl StopHandle {
    pub fn stop(&self) {
        self.sender.lock().take();
    }

    pub fn is_stopped(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        matches!(self.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Blocks until `deadline`. Returns `false` if stopped first.
    pub fn sleep_until(&self, deadline: Instant) -> bool {
        if deadline <= Instant::now() {
            return !self.is_stopped();
        }
        matches!(
            self.receiver.recv_deadline(deadline),
            Err(RecvTimeoutError::Timeout)
        )
    }

    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }
}
