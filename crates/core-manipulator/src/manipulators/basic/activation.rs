//! Per-activation state: one live match of a basic manipulator, from press
//! to full wind-down.

use crate::manipulators::ApplyContext;
use core_events::{AbsoluteMs, DeviceId, Event, EventEntry, EventType, MomentarySwitchEvent};
use smallvec::SmallVec;

/// One emitted, still-held key-down awaiting its paired key-up.
#[derive(Debug, Clone)]
pub(crate) struct EmittedDown {
    pub event: Event,
    pub lazy: bool,
}

/// A queued key-up whose emission was postponed by `hold_down_milliseconds`.
#[derive(Debug, Clone)]
pub(crate) struct DeferredKeyUp {
    pub at: AbsoluteMs,
    pub entry: EventEntry,
}

/// A chord collection in progress: constituent key-downs consumed while
/// waiting for the rest of the simultaneous set.
#[derive(Debug)]
pub(crate) struct PendingSimultaneous {
    pub id: u64,
    pub device_id: DeviceId,
    /// Consumed entries in arrival order, re-posted verbatim if the chord
    /// fails.
    pub buffered: Vec<EventEntry>,
    /// Definition index claimed by each buffered entry, in arrival order.
    pub matched: Vec<usize>,
    pub switches: Vec<MomentarySwitchEvent>,
}

#[derive(Debug)]
pub(crate) struct Activation {
    pub id: u64,
    pub device_id: DeviceId,
    /// The entry that triggered the activation; template for timer-driven
    /// emissions after the physical entry is gone.
    pub original_entry: EventEntry,
    from_switches: SmallVec<[MomentarySwitchEvent; 1]>,
    released: SmallVec<[bool; 1]>,
    emitted: Vec<EmittedDown>,
    pub alone: bool,
    pub halted: bool,
    pub unwound: bool,
    pub delayed_action_pending: bool,
    pub key_down_time: AbsoluteMs,
}

impl Activation {
    pub fn new(id: u64, original_entry: EventEntry, switches: Vec<MomentarySwitchEvent>) -> Self {
        let count = switches.len();
        Self {
            id,
            device_id: original_entry.device_id,
            key_down_time: original_entry.time,
            original_entry,
            from_switches: switches.into(),
            released: SmallVec::from_elem(false, count),
            emitted: Vec::new(),
            alone: true,
            halted: false,
            unwound: false,
            delayed_action_pending: false,
        }
    }

    /// Whether this activation still holds `switch` (pressed, not yet
    /// released).
    pub fn holds(&self, switch: &MomentarySwitchEvent) -> bool {
        self.from_switches
            .iter()
            .zip(&self.released)
            .any(|(held, released)| !released && held == switch)
    }

    pub fn mark_released(&mut self, switch: &MomentarySwitchEvent) {
        if let Some(index) = self
            .from_switches
            .iter()
            .zip(&self.released)
            .position(|(held, released)| !released && held == switch)
        {
            self.released[index] = true;
        }
    }

    pub fn fully_released(&self) -> bool {
        self.released.iter().all(|released| *released)
    }

    pub fn push_emitted(&mut self, event: Event, lazy: bool) {
        self.emitted.push(EmittedDown { event, lazy });
    }

    /// Pop the emitted stack, pairing every key-down with its key-up in
    /// reverse order. `set_variable` emissions wind down through their
    /// key-up value.
    pub fn unwind_emitted(
        &mut self,
        template: &EventEntry,
        now: AbsoluteMs,
        ctx: &mut ApplyContext<'_>,
    ) {
        while let Some(EmittedDown { event, lazy }) = self.emitted.pop() {
            match &event {
                Event::SetVariable(set_variable) => {
                    if let Some(key_up) = set_variable.key_up_variant() {
                        ctx.post(template.manipulated(
                            Event::SetVariable(key_up),
                            EventType::Single,
                            now,
                        ));
                    }
                }
                _ => {
                    ctx.post(
                        template
                            .manipulated(event, EventType::KeyUp, now)
                            .with_lazy(lazy),
                    );
                }
            }
        }
    }
}
