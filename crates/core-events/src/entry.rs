//! The envelope routed between pipeline stages.
//!
//! [`Event`] is the serializable value; [`EventEntry`] wraps it with the
//! per-dispatch facts the engine needs: originating device, monotonic
//! timestamp, press/release direction, the untouched original event, and the
//! emission flags consumed by the virtual-HID collaborator.

use crate::device::DeviceId;
use crate::event::Event;
use std::ops::{Add, Sub};

/// Monotonic milliseconds supplied by the clock collaborator. Never read from
/// the wall clock inside the core; every API that needs time takes it as an
/// argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AbsoluteMs(pub u64);

impl AbsoluteMs {
    pub fn saturating_add(self, delta_ms: u64) -> AbsoluteMs {
        AbsoluteMs(self.0.saturating_add(delta_ms))
    }

    pub fn saturating_elapsed(self, since: AbsoluteMs) -> u64 {
        self.0.saturating_sub(since.0)
    }
}

impl Add<u64> for AbsoluteMs {
    type Output = AbsoluteMs;

    fn add(self, delta_ms: u64) -> AbsoluteMs {
        AbsoluteMs(self.0 + delta_ms)
    }
}

impl Sub<AbsoluteMs> for AbsoluteMs {
    type Output = u64;

    fn sub(self, earlier: AbsoluteMs) -> u64 {
        self.0 - earlier.0
    }
}

/// Direction of a momentary-switch entry. Non-switch events use `Single`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    KeyDown,
    KeyUp,
    Single,
}

/// Whether the entry still carries the physical event or was produced by a
/// manipulator. `event_changed_if` conditions evaluate against this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventOrigin {
    Original,
    Manipulated,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventEntry {
    pub device_id: DeviceId,
    pub time: AbsoluteMs,
    pub event: Event,
    pub event_type: EventType,
    /// The physical event this entry descends from; preserved across
    /// manipulation so wind-down can pair against it.
    pub original_event: Event,
    /// Lazy entries defer modifier flushing in the output sink until a
    /// non-lazy event arrives.
    pub lazy: bool,
    /// Whether the key participates in OS auto-repeat.
    pub repeat: bool,
    pub origin: EventOrigin,
}

impl EventEntry {
    /// Entry as delivered by the device-capture collaborator.
    pub fn input(device_id: DeviceId, time: AbsoluteMs, event: Event, event_type: EventType) -> Self {
        Self {
            device_id,
            time,
            original_event: event.clone(),
            event,
            event_type,
            lazy: false,
            repeat: true,
            origin: EventOrigin::Original,
        }
    }

    /// Entry emitted by a manipulator in place of `self`.
    pub fn manipulated(&self, event: Event, event_type: EventType, time: AbsoluteMs) -> Self {
        Self {
            device_id: self.device_id,
            time,
            event,
            event_type,
            original_event: self.original_event.clone(),
            lazy: false,
            repeat: true,
            origin: EventOrigin::Manipulated,
        }
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }
}
