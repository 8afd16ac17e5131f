//! Periodic ticks for polling-mode devices.
//!
//! The crate never sleeps or spawns threads. A [`TimerService`] hands out
//! handles; whoever owns it decides when ticks fire. [`TimerQueue`] is the
//! host-driven implementation: call [`TimerQueue::due`] with the current time
//! and dispatch what it returns.

use std::collections::BTreeMap;

use crate::transport::DeviceId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

pub trait TimerService {
    fn start_periodic(&mut self, device: DeviceId, period_ms: u32) -> TimerHandle;

    /// Stopping an unknown or already stopped handle is a no-op.
    fn stop(&mut self, handle: TimerHandle);
}

#[derive(Clone, Debug)]
struct Entry {
    device: DeviceId,
    period_ms: u32,
    next_due_ms: u32,
}

/// Timer set driven by an external millisecond clock.
#[derive(Clone, Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    now_ms: u32,
    timers: BTreeMap<u64, Entry>,
}

/// `a` is at or past `b` on a wrapping 32-bit clock.
#[inline]
fn reached(a: u32, b: u32) -> bool {
    a.wrapping_sub(b) < u32::MAX / 2
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock used to schedule newly started timers.
    pub fn observe(&mut self, now_ms: u32) {
        self.now_ms = now_ms;
    }

    pub fn is_running(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle.0)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Timers whose period elapsed by `now_ms`, each rescheduled one period ahead.
    pub fn due(&mut self, now_ms: u32) -> Vec<(TimerHandle, DeviceId)> {
        self.now_ms = now_ms;
        let mut fired = Vec::new();
        for (id, entry) in self.timers.iter_mut() {
            if reached(now_ms, entry.next_due_ms) {
                entry.next_due_ms = now_ms.wrapping_add(entry.period_ms);
                fired.push((TimerHandle(*id), entry.device));
            }
        }
        fired
    }
}

impl TimerService for TimerQueue {
    fn start_periodic(&mut self, device: DeviceId, period_ms: u32) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let period_ms = period_ms.max(1);
        self.timers.insert(
            id,
            Entry {
                device,
                period_ms,
                next_due_ms: self.now_ms.wrapping_add(period_ms),
            },
        );
        TimerHandle(id)
    }

    fn stop(&mut self, handle: TimerHandle) {
        self.timers.remove(&handle.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_period() {
        let mut q = TimerQueue::new();
        q.observe(100);
        let h = q.start_periodic(DeviceId(7), 20);
        assert!(q.due(119).is_empty());
        assert_eq!(q.due(120), vec![(h, DeviceId(7))]);
        assert!(q.due(125).is_empty());
        assert_eq!(q.due(141).len(), 1);
        q.stop(h);
        assert!(!q.is_running(h));
        assert!(q.due(1000).is_empty());
        q.stop(h);
    }

    #[test]
    fn survives_clock_wrap() {
        let mut q = TimerQueue::new();
        q.observe(u32::MAX - 5);
        q.start_periodic(DeviceId(1), 10);
        assert!(q.due(u32::MAX).is_empty());
        assert_eq!(q.due(4).len(), 1);
    }
}
