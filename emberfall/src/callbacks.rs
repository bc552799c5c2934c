//! Deferred, frame-driven callbacks.
//!
//! This is the whole concurrency model of the simulation: callbacks are
//! scheduled during one frame and run synchronously during a later frame's
//! update pass. A delay of zero still fires on the *next* tick, never
//! inline — running a callback inside contact processing could create or
//! destroy fixtures while the physics world is mid-step, which is exactly
//! the hazard this queue exists to prevent.

use crate::scene::WorldCtx;

pub type CallbackId = u64;

/// A deferred action run against the live world.
pub type ScheduledFn = Box<dyn FnOnce(&mut WorldCtx<'_>)>;

struct Entry {
    id: CallbackId,
    deadline: f64,
    scheduled_frame: u64,
    callback: ScheduledFn,
}

/// Schedules and cancels deferred callbacks. Owned by the scene; advanced
/// once per fixed step.
#[derive(Default)]
pub struct CallbackManager {
    now: f64,
    frame: u64,
    next_id: CallbackId,
    entries: Vec<Entry>,
}

impl CallbackManager {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            frame: 0,
            next_id: 1,
            entries: Vec::new(),
        }
    }

    /// Schedule `callback` to run `delay` seconds from now. Returns an id
    /// usable with [`CallbackManager::cancel`].
    pub fn run_after(
        &mut self,
        delay: f32,
        callback: impl FnOnce(&mut WorldCtx<'_>) + 'static,
    ) -> CallbackId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            deadline: self.now + delay.max(0.0) as f64,
            scheduled_frame: self.frame,
            callback: Box::new(callback),
        });
        id
    }

    /// Cancel a pending callback. Returns false if it already ran, was
    /// already cancelled, or never existed.
    pub fn cancel(&mut self, id: CallbackId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Advance simulated time by one fixed step.
    pub fn advance(&mut self, dt: f32) {
        self.now += dt as f64;
        self.frame += 1;
    }

    /// Remove and return every callback that is due. A callback scheduled
    /// this very frame is never due, whatever its delay.
    pub fn take_due(&mut self) -> Vec<ScheduledFn> {
        let now = self.now;
        let frame = self.frame;

        let mut due: Vec<Entry> = Vec::new();
        let mut remaining: Vec<Entry> = Vec::new();
        for entry in self.entries.drain(..) {
            if entry.deadline <= now && entry.scheduled_frame < frame {
                due.push(entry);
            } else {
                remaining.push(entry);
            }
        }
        self.entries = remaining;

        due.sort_by(|a, b| {
            a.deadline
                .partial_cmp(&b.deadline)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        due.into_iter().map(|e| e.callback).collect()
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delay_fires_next_tick_not_inline() {
        let mut cm = CallbackManager::new();
        cm.run_after(0.0, |_| {});
        assert!(cm.take_due().is_empty(), "must not fire on the scheduling frame");
        cm.advance(1.0 / 60.0);
        assert_eq!(cm.take_due().len(), 1);
    }

    #[test]
    fn callbacks_fire_after_their_delay() {
        let mut cm = CallbackManager::new();
        cm.run_after(0.1, |_| {});
        cm.advance(0.05);
        assert!(cm.take_due().is_empty());
        cm.advance(0.06);
        assert_eq!(cm.take_due().len(), 1);
        assert_eq!(cm.pending(), 0);
    }

    #[test]
    fn cancel_removes_pending_only_once() {
        let mut cm = CallbackManager::new();
        let id = cm.run_after(0.5, |_| {});
        assert!(cm.cancel(id));
        assert!(!cm.cancel(id));
        cm.advance(1.0);
        assert!(cm.take_due().is_empty());
    }

    #[test]
    fn due_callbacks_come_out_in_deadline_order() {
        let mut cm = CallbackManager::new();
        let late = cm.run_after(0.2, |_| {});
        let early = cm.run_after(0.1, |_| {});
        assert!(late > early);
        cm.advance(0.3);
        assert_eq!(cm.take_due().len(), 2);
    }
}
