//! Sample-clock timer queue for transient events.
//!
//! Timers are keyed by `(due frame, sequence)` so equal due times fire in the
//! order they were scheduled. Each timer carries the session it was scheduled
//! for and that session's [`LivenessToken`]; the controller drops any timer
//! whose token was revoked or whose session is no longer the active one, so a
//! timer that slips through cancellation still cannot make sound.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::graph::SessionId;

/// Shared "this session is still current" flag.
#[derive(Clone, Debug)]
pub struct LivenessToken(Arc<AtomicBool>);

impl LivenessToken {
    pub fn new() -> Self { Self(Arc::new(AtomicBool::new(true))) }
    #[inline] pub fn is_live(&self) -> bool { self.0.load(Ordering::Acquire) }
    #[inline] pub fn revoke(&self) { self.0.store(false, Ordering::Release) }
}

impl Default for LivenessToken {
    fn default() -> Self { Self::new() }
}

/// Handle for cancelling a pending timer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle {
    due: u64,
    seq: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Task {
    /// Pick a cluster size, schedule its bursts and the next cluster.
    Cluster,
    /// Emit one burst.
    Burst,
}

#[derive(Clone, Debug)]
pub struct Timer {
    pub handle: TaskHandle,
    pub session: SessionId,
    pub token: LivenessToken,
    pub task: Task,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BTreeMap<TaskHandle, Timer>,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self { Self::default() }

    pub fn schedule(
        &mut self,
        now: u64,
        delay_frames: u64,
        session: SessionId,
        token: LivenessToken,
        task: Task,
    ) -> TaskHandle {
        let handle = TaskHandle { due: now.saturating_add(delay_frames), seq: self.seq };
        self.seq += 1;
        self.queue.insert(handle, Timer { handle, session, token, task });
        handle
    }

    /// Returns false if the timer already fired or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool { self.queue.remove(&handle).is_some() }

    /// Cancel every timer of `session`. Returns how many were pending.
    pub fn cancel_session(&mut self, session: SessionId) -> usize {
        let before = self.queue.len();
        self.queue.retain(|_, t| t.session != session);
        before - self.queue.len()
    }

    pub fn pending_for(&self, session: SessionId) -> usize {
        self.queue.values().filter(|t| t.session == session).count()
    }

    #[inline] pub fn len(&self) -> usize { self.queue.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.queue.is_empty() }

    /// Due frame of the earliest timer.
    pub fn next_due(&self) -> Option<u64> { self.queue.keys().next().map(|h| h.due) }

    /// Remove and return the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<Timer> {
        match self.queue.first_key_value() {
            Some((h, _)) if h.due <= now => self.queue.pop_first().map(|(_, t)| t),
            _ => None,
        }
    }
}

/// Milliseconds to whole frames (rounded).
#[inline]
pub fn ms_to_frames(ms: f32, sr: f32) -> u64 {
    (ms.max(0.0) * 1e-3 * sr + 0.5) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const S1: SessionId = SessionId(1);
    const S2: SessionId = SessionId(2);

    #[test]
    fn fires_in_due_then_schedule_order() {
        let mut s = Scheduler::new();
        let tok = LivenessToken::new();
        let late = s.schedule(0, 100, S1, tok.clone(), Task::Cluster);
        let a = s.schedule(0, 10, S1, tok.clone(), Task::Burst);
        let b = s.schedule(0, 10, S1, tok.clone(), Task::Burst);

        assert_eq!(s.next_due(), Some(10));
        assert!(s.pop_due(9).is_none());
        assert_eq!(s.pop_due(10).map(|t| t.handle), Some(a));
        assert_eq!(s.pop_due(10).map(|t| t.handle), Some(b));
        assert!(s.pop_due(50).is_none());
        assert_eq!(s.pop_due(100).map(|t| t.handle), Some(late));
        assert!(s.is_empty());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut s = Scheduler::new();
        let h = s.schedule(0, 5, S1, LivenessToken::new(), Task::Burst);
        assert!(s.cancel(h));
        assert!(!s.cancel(h));
        assert!(s.pop_due(10).is_none());
    }

    #[test]
    fn cancel_session_leaves_others() {
        let mut s = Scheduler::new();
        for d in 0..3 {
            s.schedule(0, d, S1, LivenessToken::new(), Task::Burst);
        }
        s.schedule(0, 1, S2, LivenessToken::new(), Task::Cluster);
        assert_eq!(s.pending_for(S1), 3);
        assert_eq!(s.cancel_session(S1), 3);
        assert_eq!(s.pending_for(S1), 0);
        assert_eq!(s.pending_for(S2), 1);
    }

    #[test]
    fn token_revocation_is_shared() {
        let tok = LivenessToken::new();
        let copy = tok.clone();
        assert!(copy.is_live());
        tok.revoke();
        assert!(!copy.is_live());
    }

    #[test]
    fn ms_conversion_rounds() {
        assert_eq!(ms_to_frames(300.0, 48_000.0), 14_400);
        assert_eq!(ms_to_frames(0.01, 48_000.0), 0);
        assert_eq!(ms_to_frames(-5.0, 48_000.0), 0);
    }
}
