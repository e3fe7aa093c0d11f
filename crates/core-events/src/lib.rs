//! Core event types for keymorph.
//!
//! Everything that can traverse the manipulation pipeline lives here: the
//! tagged [`Event`] value, the physical-switch and pointing payload types,
//! modifier flags/masks, and the [`EventEntry`] envelope the pipeline routes
//! between stages. The crate is pure data — no clocks, no channels, no IO —
//! so every downstream crate can test against it deterministically.
//!
//! Serialization contract: [`Event::make_from_json`] is total. An unknown
//! `"type"` (or a malformed payload) degrades to [`Event::None`]; it never
//! returns an error. [`Event::to_json`] emits `{"type": <kind>}` plus at most
//! one payload key.

mod device;
mod entry;
mod error;
mod event;
mod input_source;
mod modifier;
mod momentary_switch;
mod mouse_key;
mod pointing_motion;
mod software_function;
mod types;
mod variable;

pub use device::{DeviceId, DeviceIdentifiers, DeviceProperties};
pub use entry::{AbsoluteMs, EventEntry, EventOrigin, EventType};
pub use error::{UnmarshalError, dump_for_error};
pub use event::{Event, EventKind};
pub use input_source::{InputSourceProperties, InputSourceSpecifier};
pub use modifier::{ModifierFlag, ModifierMask};
pub use momentary_switch::{
    AppleVendorKeyboardKeyCode, AppleVendorTopCaseKeyCode, ConsumerKeyCode, GenericDesktop,
    KeyCode, MomentarySwitchEvent, PointingButton, UsageFamily,
};
pub use mouse_key::MouseKey;
pub use pointing_motion::PointingMotion;
pub use software_function::SoftwareFunction;
pub use types::{
    Application, NotificationMessage, StickyModifierType, SystemPreferencesProperties,
    VirtualHidDevicesState,
};
pub use variable::{SetVariable, SetVariableType, VariableValue};
