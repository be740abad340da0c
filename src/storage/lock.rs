//! A simple exclusive lock used to serialize writer transactions. A plain
//! `Mutex<()>` guard can't be held across `Transaction` method calls
//! without tying the transaction's lifetime to the mutex's, so this models
//! the same single-writer discipline with an explicit acquire/release pair
//! instead.

use std::sync::{Condvar, Mutex};

pub(crate) struct WriteLock {
    held: Mutex<bool>,
    available: Condvar,
}

impl WriteLock {
    pub(crate) fn new() -> Self {
        WriteLock {
            held: Mutex::new(false),
            available: Condvar::new(),
        }
    }

    /// Block until the lock is free, then take it. Waiters are woken in
    /// whatever order the OS condition variable picks, which is not
    /// strictly FIFO but is fair enough for a single-process accumulator.
    pub(crate) fn acquire(&self) {
        let mut held = self.held.lock().expect("write lock poisoned");
        while *held {
            held = self.available.wait(held).expect("write lock poisoned");
        }
        *held = true;
    }

    pub(crate) fn release(&self) {
        let mut held = self.held.lock().expect("write lock poisoned");
        *held = false;
        self.available.notify_one();
    }
}
