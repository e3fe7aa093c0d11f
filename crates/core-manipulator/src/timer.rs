//! Timer registry shared by the manipulators of one manager.
//!
//! Tokens never hold references into the manipulator list; they carry the
//! manager epoch, the manipulator's stable index, and the activation's
//! monotonic id. A fired token whose epoch or activation no longer exists is
//! a no-op, which makes invalidation a pure drop.

use core_events::AbsoluteMs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    ToIfAlone,
    ToIfHeldDown,
    ToDelayedAction,
    SimultaneousWindow,
    DeferredKeyUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    pub epoch: u64,
    pub manipulator_index: usize,
    pub activation_id: u64,
    pub kind: TimerKind,
}

#[derive(Debug, Clone, Copy)]
struct TimerRecord {
    token: TimerToken,
    deadline: AbsoluteMs,
}

/// Pending timers, ordered on demand. The population is bounded by live
/// activations, so a linear scan beats maintaining a heap.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    records: Vec<TimerRecord>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, token: TimerToken, deadline: AbsoluteMs) {
        self.records.push(TimerRecord { token, deadline });
    }

    /// Drop timers belonging to one activation, optionally narrowed to a kind.
    pub fn cancel(
        &mut self,
        manipulator_index: usize,
        activation_id: u64,
        kind: Option<TimerKind>,
    ) {
        self.records.retain(|record| {
            record.token.manipulator_index != manipulator_index
                || record.token.activation_id != activation_id
                || kind.is_some_and(|kind| record.token.kind != kind)
        });
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn next_deadline(&self) -> Option<AbsoluteMs> {
        self.records.iter().map(|record| record.deadline).min()
    }

    /// Remove and return every token due at `now`, earliest first; ties keep
    /// scheduling order.
    pub fn take_due(&mut self, now: AbsoluteMs) -> Vec<TimerToken> {
        let mut due: Vec<(AbsoluteMs, usize, TimerToken)> = Vec::new();
        let mut sequence = 0usize;
        self.records.retain(|record| {
            if record.deadline <= now {
                due.push((record.deadline, sequence, record.token));
                sequence += 1;
                false
            } else {
                sequence += 1;
                true
            }
        });
        due.sort_by_key(|(deadline, sequence, _)| (*deadline, *sequence));
        due.into_iter().map(|(_, _, token)| token).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(manipulator_index: usize, activation_id: u64, kind: TimerKind) -> TimerToken {
        TimerToken {
            epoch: 0,
            manipulator_index,
            activation_id,
            kind,
        }
    }

    #[test]
    fn take_due_orders_by_deadline() {
        let mut registry = TimerRegistry::new();
        registry.schedule(token(0, 1, TimerKind::ToIfAlone), AbsoluteMs(100));
        registry.schedule(token(0, 1, TimerKind::ToDelayedAction), AbsoluteMs(50));
        registry.schedule(token(1, 2, TimerKind::ToIfHeldDown), AbsoluteMs(200));

        assert_eq!(registry.next_deadline(), Some(AbsoluteMs(50)));
        let due = registry.take_due(AbsoluteMs(150));
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].kind, TimerKind::ToDelayedAction);
        assert_eq!(due[1].kind, TimerKind::ToIfAlone);
        assert_eq!(registry.next_deadline(), Some(AbsoluteMs(200)));
    }

    #[test]
    fn cancel_narrows_by_kind() {
        let mut registry = TimerRegistry::new();
        registry.schedule(token(0, 1, TimerKind::ToIfAlone), AbsoluteMs(100));
        registry.schedule(token(0, 1, TimerKind::ToDelayedAction), AbsoluteMs(100));
        registry.cancel(0, 1, Some(TimerKind::ToIfAlone));
        let due = registry.take_due(AbsoluteMs(100));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].kind, TimerKind::ToDelayedAction);
    }

    #[test]
    fn cancel_all_for_activation() {
        let mut registry = TimerRegistry::new();
        registry.schedule(token(0, 1, TimerKind::ToIfAlone), AbsoluteMs(100));
        registry.schedule(token(0, 2, TimerKind::ToIfAlone), AbsoluteMs(100));
        registry.cancel(0, 1, None);
        let due = registry.take_due(AbsoluteMs(100));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].activation_id, 2);
    }
}
