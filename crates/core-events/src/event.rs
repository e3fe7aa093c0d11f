//! The tagged event value routed through the manipulation pipeline.

use crate::device::DeviceProperties;
use crate::input_source::{InputSourceProperties, InputSourceSpecifier};
use crate::modifier::ModifierFlag;
use crate::momentary_switch::MomentarySwitchEvent;
use crate::mouse_key::MouseKey;
use crate::pointing_motion::PointingMotion;
use crate::software_function::SoftwareFunction;
use crate::types::{
    Application, NotificationMessage, StickyModifierType, SystemPreferencesProperties,
    VirtualHidDevicesState,
};
use crate::variable::SetVariable;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// Discriminant of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    None,
    MomentarySwitchEvent,
    PointingMotion,
    ShellCommand,
    SelectInputSource,
    SetVariable,
    SetNotificationMessage,
    MouseKey,
    StickyModifier,
    SoftwareFunction,
    StopKeyboardRepeat,
    DeviceKeysAndPointingButtonsAreReleased,
    DeviceGrabbed,
    DeviceUngrabbed,
    CapsLockStateChanged,
    PointingDeviceEventFromEventTap,
    FrontmostApplicationChanged,
    InputSourceChanged,
    SystemPreferencesPropertiesChanged,
    VirtualHidDevicesStateChanged,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::None => "none",
            EventKind::MomentarySwitchEvent => "momentary_switch_event",
            EventKind::PointingMotion => "pointing_motion",
            EventKind::ShellCommand => "shell_command",
            EventKind::SelectInputSource => "select_input_source",
            EventKind::SetVariable => "set_variable",
            EventKind::SetNotificationMessage => "set_notification_message",
            EventKind::MouseKey => "mouse_key",
            EventKind::StickyModifier => "sticky_modifier",
            EventKind::SoftwareFunction => "software_function",
            EventKind::StopKeyboardRepeat => "stop_keyboard_repeat",
            EventKind::DeviceKeysAndPointingButtonsAreReleased => {
                "device_keys_and_pointing_buttons_are_released"
            }
            EventKind::DeviceGrabbed => "device_grabbed",
            EventKind::DeviceUngrabbed => "device_ungrabbed",
            EventKind::CapsLockStateChanged => "caps_lock_state_changed",
            EventKind::PointingDeviceEventFromEventTap => "pointing_device_event_from_event_tap",
            EventKind::FrontmostApplicationChanged => "frontmost_application_changed",
            EventKind::InputSourceChanged => "input_source_changed",
            EventKind::SystemPreferencesPropertiesChanged => {
                "system_preferences_properties_changed"
            }
            EventKind::VirtualHidDevicesStateChanged => "virtual_hid_devices_state_changed",
        }
    }

    fn from_str(name: &str) -> Option<Self> {
        Some(match name {
            "momentary_switch_event" => EventKind::MomentarySwitchEvent,
            "pointing_motion" => EventKind::PointingMotion,
            "shell_command" => EventKind::ShellCommand,
            "select_input_source" => EventKind::SelectInputSource,
            "set_variable" => EventKind::SetVariable,
            "set_notification_message" => EventKind::SetNotificationMessage,
            "mouse_key" => EventKind::MouseKey,
            "sticky_modifier" => EventKind::StickyModifier,
            "software_function" => EventKind::SoftwareFunction,
            "stop_keyboard_repeat" => EventKind::StopKeyboardRepeat,
            "device_keys_and_pointing_buttons_are_released" => {
                EventKind::DeviceKeysAndPointingButtonsAreReleased
            }
            "device_grabbed" => EventKind::DeviceGrabbed,
            "device_ungrabbed" => EventKind::DeviceUngrabbed,
            "caps_lock_state_changed" => EventKind::CapsLockStateChanged,
            "pointing_device_event_from_event_tap" => EventKind::PointingDeviceEventFromEventTap,
            "frontmost_application_changed" => EventKind::FrontmostApplicationChanged,
            "input_source_changed" => EventKind::InputSourceChanged,
            "system_preferences_properties_changed" => {
                EventKind::SystemPreferencesPropertiesChanged
            }
            "virtual_hid_devices_state_changed" => EventKind::VirtualHidDevicesStateChanged,
            _ => return None,
        })
    }
}

/// One value traversing the pipeline: a physical switch or motion, a virtual
/// side effect produced by a rule, or a lifecycle/environment signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    None,
    MomentarySwitch(MomentarySwitchEvent),
    PointingMotion(PointingMotion),
    ShellCommand(String),
    SelectInputSource(Vec<InputSourceSpecifier>),
    SetVariable(SetVariable),
    SetNotificationMessage(NotificationMessage),
    MouseKey(MouseKey),
    StickyModifier(ModifierFlag, StickyModifierType),
    SoftwareFunction(SoftwareFunction),
    StopKeyboardRepeat,
    DeviceKeysAndPointingButtonsAreReleased,
    DeviceGrabbed(DeviceProperties),
    DeviceUngrabbed,
    CapsLockStateChanged(i64),
    PointingDeviceEventFromEventTap,
    FrontmostApplicationChanged(Application),
    InputSourceChanged(InputSourceProperties),
    SystemPreferencesPropertiesChanged(SystemPreferencesProperties),
    VirtualHidDevicesStateChanged(VirtualHidDevicesState),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::None => EventKind::None,
            Event::MomentarySwitch(_) => EventKind::MomentarySwitchEvent,
            Event::PointingMotion(_) => EventKind::PointingMotion,
            Event::ShellCommand(_) => EventKind::ShellCommand,
            Event::SelectInputSource(_) => EventKind::SelectInputSource,
            Event::SetVariable(_) => EventKind::SetVariable,
            Event::SetNotificationMessage(_) => EventKind::SetNotificationMessage,
            Event::MouseKey(_) => EventKind::MouseKey,
            Event::StickyModifier(_, _) => EventKind::StickyModifier,
            Event::SoftwareFunction(_) => EventKind::SoftwareFunction,
            Event::StopKeyboardRepeat => EventKind::StopKeyboardRepeat,
            Event::DeviceKeysAndPointingButtonsAreReleased => {
                EventKind::DeviceKeysAndPointingButtonsAreReleased
            }
            Event::DeviceGrabbed(_) => EventKind::DeviceGrabbed,
            Event::DeviceUngrabbed => EventKind::DeviceUngrabbed,
            Event::CapsLockStateChanged(_) => EventKind::CapsLockStateChanged,
            Event::PointingDeviceEventFromEventTap => EventKind::PointingDeviceEventFromEventTap,
            Event::FrontmostApplicationChanged(_) => EventKind::FrontmostApplicationChanged,
            Event::InputSourceChanged(_) => EventKind::InputSourceChanged,
            Event::SystemPreferencesPropertiesChanged(_) => {
                EventKind::SystemPreferencesPropertiesChanged
            }
            Event::VirtualHidDevicesStateChanged(_) => EventKind::VirtualHidDevicesStateChanged,
        }
    }

    pub fn momentary_switch(&self) -> Option<&MomentarySwitchEvent> {
        match self {
            Event::MomentarySwitch(event) => Some(event),
            _ => None,
        }
    }

    pub fn pointing_motion(&self) -> Option<&PointingMotion> {
        match self {
            Event::PointingMotion(motion) => Some(motion),
            _ => None,
        }
    }

    pub fn set_variable(&self) -> Option<&SetVariable> {
        match self {
            Event::SetVariable(set_variable) => Some(set_variable),
            _ => None,
        }
    }

    pub fn shell_command(&self) -> Option<&str> {
        match self {
            Event::ShellCommand(command) => Some(command),
            _ => None,
        }
    }

    /// Total deserialization from the self-describing object form. An unknown
    /// or missing `"type"`, a non-object input, or a payload that does not
    /// parse all degrade to [`Event::None`].
    pub fn make_from_json(json: &Value) -> Event {
        let Some(object) = json.as_object() else {
            return Event::None;
        };
        let Some(kind) = object
            .get("type")
            .and_then(Value::as_str)
            .and_then(EventKind::from_str)
        else {
            return Event::None;
        };

        fn payload<T: DeserializeOwned>(
            object: &serde_json::Map<String, Value>,
            key: &str,
        ) -> Option<T> {
            object
                .get(key)
                .and_then(|value| serde_json::from_value(value.clone()).ok())
        }

        let event = match kind {
            EventKind::None => Some(Event::None),
            EventKind::MomentarySwitchEvent => {
                payload(object, "momentary_switch_event").map(Event::MomentarySwitch)
            }
            EventKind::PointingMotion => {
                payload(object, "pointing_motion").map(Event::PointingMotion)
            }
            EventKind::ShellCommand => payload(object, "shell_command").map(Event::ShellCommand),
            EventKind::SelectInputSource => {
                payload(object, "input_source_specifiers").map(Event::SelectInputSource)
            }
            EventKind::SetVariable => payload(object, "set_variable").map(Event::SetVariable),
            EventKind::SetNotificationMessage => {
                payload(object, "set_notification_message").map(Event::SetNotificationMessage)
            }
            EventKind::MouseKey => payload(object, "mouse_key").map(Event::MouseKey),
            EventKind::StickyModifier => object
                .get("sticky_modifier")
                .and_then(Value::as_object)
                .and_then(|pairs| {
                    // Single-pair object; the last pair wins if several appear.
                    pairs.iter().fold(None, |acc, (modifier, sticky_type)| {
                        let modifier = serde_json::from_value(json!(modifier)).ok();
                        let sticky_type = serde_json::from_value(sticky_type.clone()).ok();
                        match (modifier, sticky_type) {
                            (Some(m), Some(t)) => Some(Event::StickyModifier(m, t)),
                            _ => acc,
                        }
                    })
                }),
            EventKind::SoftwareFunction => {
                payload(object, "software_function").map(Event::SoftwareFunction)
            }
            EventKind::StopKeyboardRepeat => Some(Event::StopKeyboardRepeat),
            EventKind::DeviceKeysAndPointingButtonsAreReleased => {
                Some(Event::DeviceKeysAndPointingButtonsAreReleased)
            }
            EventKind::DeviceGrabbed => payload(object, "device_properties").map(Event::DeviceGrabbed),
            EventKind::DeviceUngrabbed => Some(Event::DeviceUngrabbed),
            EventKind::CapsLockStateChanged => {
                payload(object, "caps_lock_state_changed").map(Event::CapsLockStateChanged)
            }
            EventKind::PointingDeviceEventFromEventTap => {
                Some(Event::PointingDeviceEventFromEventTap)
            }
            EventKind::FrontmostApplicationChanged => {
                payload(object, "frontmost_application").map(Event::FrontmostApplicationChanged)
            }
            EventKind::InputSourceChanged => {
                payload(object, "input_source_properties").map(Event::InputSourceChanged)
            }
            EventKind::SystemPreferencesPropertiesChanged => {
                payload(object, "system_preferences_properties")
                    .map(Event::SystemPreferencesPropertiesChanged)
            }
            EventKind::VirtualHidDevicesStateChanged => {
                payload(object, "virtual_hid_devices_state")
                    .map(Event::VirtualHidDevicesStateChanged)
            }
        };
        event.unwrap_or(Event::None)
    }

    /// Serialize to the object form: `{"type": <kind>}` plus at most one
    /// payload key.
    pub fn to_json(&self) -> Value {
        let mut object = serde_json::Map::new();
        object.insert("type".to_string(), json!(self.kind().as_str()));

        // Payload structs all serialize infallibly (no maps with non-string
        // keys, no non-finite rejects), so the json! conversions here cannot
        // panic.
        match self {
            Event::None
            | Event::StopKeyboardRepeat
            | Event::DeviceKeysAndPointingButtonsAreReleased
            | Event::DeviceUngrabbed
            | Event::PointingDeviceEventFromEventTap => {}
            Event::MomentarySwitch(event) => {
                object.insert("momentary_switch_event".to_string(), json!(event));
            }
            Event::PointingMotion(motion) => {
                object.insert("pointing_motion".to_string(), json!(motion));
            }
            Event::ShellCommand(command) => {
                object.insert("shell_command".to_string(), json!(command));
            }
            Event::SelectInputSource(specifiers) => {
                object.insert("input_source_specifiers".to_string(), json!(specifiers));
            }
            Event::SetVariable(set_variable) => {
                object.insert("set_variable".to_string(), json!(set_variable));
            }
            Event::SetNotificationMessage(message) => {
                object.insert("set_notification_message".to_string(), json!(message));
            }
            Event::MouseKey(mouse_key) => {
                object.insert("mouse_key".to_string(), json!(mouse_key));
            }
            Event::StickyModifier(modifier, sticky_type) => {
                let mut pair = serde_json::Map::new();
                pair.insert(modifier.key_code_name().to_string(), json!(sticky_type));
                object.insert("sticky_modifier".to_string(), Value::Object(pair));
            }
            Event::SoftwareFunction(function) => {
                object.insert("software_function".to_string(), json!(function));
            }
            Event::DeviceGrabbed(properties) => {
                object.insert("device_properties".to_string(), json!(properties));
            }
            Event::CapsLockStateChanged(state) => {
                object.insert("caps_lock_state_changed".to_string(), json!(state));
            }
            Event::FrontmostApplicationChanged(application) => {
                object.insert("frontmost_application".to_string(), json!(application));
            }
            Event::InputSourceChanged(properties) => {
                object.insert("input_source_properties".to_string(), json!(properties));
            }
            Event::SystemPreferencesPropertiesChanged(properties) => {
                object.insert("system_preferences_properties".to_string(), json!(properties));
            }
            Event::VirtualHidDevicesStateChanged(state) => {
                object.insert("virtual_hid_devices_state".to_string(), json!(state));
            }
        }

        Value::Object(object)
    }
}
