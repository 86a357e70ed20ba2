//! Global spacing between item actions.
//!
//! Every caller reserves the next slot under a lock, so the interval holds in
//! aggregate no matter how many workers share the pacer.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Block until this caller's slot. The first slot is immediate.
    pub fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = next.map_or(now, |at| at.max(now));
            *next = Some(slot + self.interval);
            slot
        };

        let now = Instant::now();
        if slot > now {
            std::thread::sleep(slot - now);
        }
    }
}
