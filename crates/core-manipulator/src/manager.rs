//! The manipulator manager: exclusive owner of an ordered rule set, the
//! invalidation protocol, and the per-entry routing loop.

use crate::environment::ManipulatorEnvironment;
use crate::manipulators::{ApplyContext, Manipulator};
use crate::timer::{TimerRegistry, TimerToken};
use core_events::{AbsoluteMs, DeviceId, EventEntry};
use tracing::{debug, trace};

#[derive(Debug, Default)]
pub struct ManipulatorManager {
    manipulators: Vec<Manipulator>,
    timers: TimerRegistry,
    /// Bumped by every invalidation; outstanding timer tokens from earlier
    /// epochs are ignored when they fire.
    epoch: u64,
}

impl ManipulatorManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a manipulator. Order is authoring order and decides matching
    /// priority.
    pub fn push_back(&mut self, manipulator: Manipulator) {
        self.manipulators.push(manipulator);
    }

    pub fn len(&self) -> usize {
        self.manipulators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manipulators.is_empty()
    }

    pub fn needs_virtual_hid_pointing(&self) -> bool {
        self.manipulators
            .iter()
            .any(Manipulator::needs_virtual_hid_pointing)
    }

    /// Route one entry through the ordered list. Every manipulator observes
    /// the entry; the first to consume it claims it. Unconsumed entries are
    /// forwarded unchanged.
    pub fn manipulate(
        &mut self,
        entry: &EventEntry,
        env: &mut ManipulatorEnvironment,
    ) -> Vec<EventEntry> {
        env.begin_dispatch(entry.device_id, entry.origin);
        let mut output = Vec::new();
        let mut consumed = false;
        for (index, manipulator) in self.manipulators.iter_mut().enumerate() {
            let mut ctx = ApplyContext::new(env, &mut output, &mut self.timers, self.epoch, index);
            manipulator.apply(entry, &mut consumed, &mut ctx);
        }
        if !consumed {
            output.push(entry.clone());
        }
        trace!(
            target: "manipulator",
            consumed,
            outputs = output.len(),
            "manipulate"
        );
        output
    }

    /// Invalidate every manipulator: wind down live activations (emitting
    /// outstanding key-ups and cancellation side effects in order), drop all
    /// timers, then clear the list. Variable state in the environment
    /// persists.
    pub fn invalidate_manipulators(
        &mut self,
        now: AbsoluteMs,
        env: &mut ManipulatorEnvironment,
    ) -> Vec<EventEntry> {
        let mut output = Vec::new();
        self.epoch += 1;
        for (index, manipulator) in self.manipulators.iter_mut().enumerate() {
            let mut ctx = ApplyContext::new(env, &mut output, &mut self.timers, self.epoch, index);
            manipulator.wind_down(now, &mut ctx);
        }
        debug!(
            target: "manipulator",
            dropped = self.manipulators.len(),
            flushed = output.len(),
            "invalidate_manipulators"
        );
        self.manipulators.clear();
        self.timers.clear();
        output
    }

    pub fn handle_device_ungrabbed(
        &mut self,
        device_id: DeviceId,
        now: AbsoluteMs,
        env: &mut ManipulatorEnvironment,
    ) -> Vec<EventEntry> {
        let mut output = Vec::new();
        for (index, manipulator) in self.manipulators.iter_mut().enumerate() {
            let mut ctx = ApplyContext::new(env, &mut output, &mut self.timers, self.epoch, index);
            manipulator.handle_device_ungrabbed(device_id, now, &mut ctx);
        }
        output
    }

    pub fn handle_device_keys_and_pointing_buttons_are_released(
        &mut self,
        device_id: DeviceId,
        now: AbsoluteMs,
        env: &mut ManipulatorEnvironment,
    ) -> Vec<EventEntry> {
        let mut output = Vec::new();
        for (index, manipulator) in self.manipulators.iter_mut().enumerate() {
            let mut ctx = ApplyContext::new(env, &mut output, &mut self.timers, self.epoch, index);
            manipulator
                .handle_device_keys_and_pointing_buttons_are_released(device_id, now, &mut ctx);
        }
        output
    }

    /// Earliest pending timer deadline, for the dispatcher's sleep.
    pub fn next_timer_deadline(&self) -> Option<AbsoluteMs> {
        self.timers.next_deadline()
    }

    /// Fire every timer due at `now`. Tokens from an older epoch, or whose
    /// activation no longer exists, are no-ops.
    pub fn fire_due_timers(
        &mut self,
        now: AbsoluteMs,
        env: &mut ManipulatorEnvironment,
    ) -> Vec<EventEntry> {
        let due: Vec<TimerToken> = self.timers.take_due(now);
        let mut output = Vec::new();
        for token in due {
            if token.epoch != self.epoch {
                continue;
            }
            let Some(manipulator) = self.manipulators.get_mut(token.manipulator_index) else {
                continue;
            };
            let mut ctx = ApplyContext::new(
                env,
                &mut output,
                &mut self.timers,
                self.epoch,
                token.manipulator_index,
            );
            manipulator.fire_timer(token.kind, token.activation_id, now, &mut ctx);
        }
        output
    }
}
