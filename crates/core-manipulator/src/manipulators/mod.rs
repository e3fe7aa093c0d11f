//! Manipulator variants and the context they run against.
//!
//! Manipulators are a tagged variant with an explicit operation table rather
//! than trait objects: the manager owns them exclusively, dispatch stays
//! monomorphic on the hot path, and invalidation is a pure drop.

pub mod basic;
pub mod mouse_basic;

use crate::condition::Condition;
use crate::environment::ManipulatorEnvironment;
use crate::timer::{TimerKind, TimerRegistry, TimerToken};
use core_events::{AbsoluteMs, DeviceId, Event, EventEntry};

pub use basic::BasicManipulator;
pub use mouse_basic::MouseBasicManipulator;

/// Everything a manipulator may touch while handling one entry: the
/// environment (variable writes become visible immediately), the output
/// buffer, and the manager's timer registry keyed by this manipulator's
/// stable index.
pub struct ApplyContext<'a> {
    pub env: &'a mut ManipulatorEnvironment,
    output: &'a mut Vec<EventEntry>,
    timers: &'a mut TimerRegistry,
    epoch: u64,
    manipulator_index: usize,
}

impl<'a> ApplyContext<'a> {
    pub(crate) fn new(
        env: &'a mut ManipulatorEnvironment,
        output: &'a mut Vec<EventEntry>,
        timers: &'a mut TimerRegistry,
        epoch: u64,
        manipulator_index: usize,
    ) -> Self {
        Self {
            env,
            output,
            timers,
            epoch,
            manipulator_index,
        }
    }

    /// Emit one entry. `set_variable` payloads are applied to the environment
    /// here so later manipulators in the same dispatch observe the write.
    pub fn post(&mut self, entry: EventEntry) {
        if let Event::SetVariable(set_variable) = &entry.event {
            self.env.apply_set_variable(set_variable);
        }
        self.output.push(entry);
    }

    pub fn schedule(&mut self, activation_id: u64, kind: TimerKind, deadline: AbsoluteMs) {
        self.timers.schedule(
            TimerToken {
                epoch: self.epoch,
                manipulator_index: self.manipulator_index,
                activation_id,
                kind,
            },
            deadline,
        );
    }

    pub fn cancel(&mut self, activation_id: u64, kind: Option<TimerKind>) {
        self.timers.cancel(self.manipulator_index, activation_id, kind);
    }
}

/// One active unit of the rule engine.
#[derive(Debug)]
pub enum Manipulator {
    Basic(BasicManipulator),
    MouseBasic(MouseBasicManipulator),
}

impl Manipulator {
    /// Route one entry through this manipulator. `consumed` marks whether an
    /// earlier manipulator already claimed the entry; a claimed entry is
    /// still observed (activation bookkeeping) but never matched.
    pub fn apply(&mut self, entry: &EventEntry, consumed: &mut bool, ctx: &mut ApplyContext<'_>) {
        match self {
            Manipulator::Basic(manipulator) => manipulator.apply(entry, consumed, ctx),
            Manipulator::MouseBasic(manipulator) => manipulator.apply(entry, consumed, ctx),
        }
    }

    /// A timer scheduled by this manipulator fired. Stale activation ids are
    /// no-ops.
    pub fn fire_timer(
        &mut self,
        kind: TimerKind,
        activation_id: u64,
        now: AbsoluteMs,
        ctx: &mut ApplyContext<'_>,
    ) {
        match self {
            Manipulator::Basic(manipulator) => manipulator.fire_timer(kind, activation_id, now, ctx),
            Manipulator::MouseBasic(_) => {}
        }
    }

    /// Flush all live state: outstanding key-ups and cancellation side
    /// effects, in order. Used by invalidation.
    pub fn wind_down(&mut self, now: AbsoluteMs, ctx: &mut ApplyContext<'_>) {
        match self {
            Manipulator::Basic(manipulator) => manipulator.wind_down(now, ctx),
            Manipulator::MouseBasic(_) => {}
        }
    }

    pub fn handle_device_ungrabbed(
        &mut self,
        device_id: DeviceId,
        now: AbsoluteMs,
        ctx: &mut ApplyContext<'_>,
    ) {
        match self {
            Manipulator::Basic(manipulator) => {
                manipulator.handle_device_ungrabbed(device_id, now, ctx)
            }
            Manipulator::MouseBasic(_) => {}
        }
    }

    pub fn handle_device_keys_and_pointing_buttons_are_released(
        &mut self,
        device_id: DeviceId,
        now: AbsoluteMs,
        ctx: &mut ApplyContext<'_>,
    ) {
        match self {
            Manipulator::Basic(manipulator) => {
                manipulator.handle_device_ungrabbed(device_id, now, ctx)
            }
            Manipulator::MouseBasic(_) => {}
        }
    }

    pub fn needs_virtual_hid_pointing(&self) -> bool {
        match self {
            Manipulator::Basic(manipulator) => manipulator.needs_virtual_hid_pointing(),
            Manipulator::MouseBasic(_) => true,
        }
    }

    /// Whether live activations exist.
    pub fn active(&self) -> bool {
        match self {
            Manipulator::Basic(manipulator) => manipulator.active(),
            Manipulator::MouseBasic(_) => false,
        }
    }

    pub fn push_back_condition(&mut self, condition: Condition) {
        match self {
            Manipulator::Basic(manipulator) => manipulator.push_back_condition(condition),
            Manipulator::MouseBasic(manipulator) => manipulator.push_back_condition(condition),
        }
    }
}
