//! One-shot broadcast signal
//!
//! Firing drops the only sender, which disconnects the channel and wakes
//! every receiver blocked on it, including those inside `select!`.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

pub struct Signal {
    trigger: Mutex<Option<Sender<()>>>,
    fired: Receiver<()>,
}

impl Signal {
    pub fn new() -> Self {
        let (trigger, fired) = channel::bounded(0);
        Self {
            trigger: Mutex::new(Some(trigger)),
            fired,
        }
    }

    /// Fire the signal. Returns true for the call that actually fired it.
    pub fn fire(&self) -> bool {
        self.trigger.lock().take().is_some()
    }

    pub fn is_fired(&self) -> bool {
        self.trigger.lock().is_none()
    }

    /// Receiver that becomes ready (disconnected) once fired
    pub fn receiver(&self) -> &Receiver<()> {
        &self.fired
    }

    /// Block until fired
    pub fn wait(&self) {
        let _ = self.fired.recv();
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
