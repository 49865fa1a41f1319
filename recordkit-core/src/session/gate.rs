//! Session synchronization primitives.

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct GateState {
    paused: bool,
    stopping: bool,
}

/// Blocks the pull path while the session is paused.
///
/// Waiters are released exactly once per resume or stop; there is no
/// polling. Once opened for stop the gate never blocks again.
#[derive(Default)]
pub(crate) struct PauseGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl PauseGate {
    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    pub fn resume(&self) {
        let mut state = self.state.lock();
        state.paused = false;
        self.cond.notify_all();
    }

    pub fn open_for_stop(&self) {
        let mut state = self.state.lock();
        state.stopping = true;
        self.cond.notify_all();
    }

    /// Block while paused. Returns false once the gate was opened for stop.
    pub fn wait_while_paused(&self) -> bool {
        let mut state = self.state.lock();
        while state.paused && !state.stopping {
            self.cond.wait(&mut state);
        }
        !state.stopping
    }

    pub fn is_stopping(&self) -> bool {
        self.state.lock().stopping
    }
}

/// Single-use completion latch: released once, awaited until then.
#[derive(Default)]
pub(crate) struct Completion {
    done: Mutex<bool>,
    cond: Condvar,
}

impl Completion {
    pub fn complete(&self) {
        let mut done = self.done.lock();
        *done = true;
        self.cond.notify_all();
    }

    pub fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.cond.wait(&mut done);
        }
    }
}
