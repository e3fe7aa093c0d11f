//! The event-definition model: the schema element rules use to describe an
//! event, on the match side (possibly a wildcard) or the emission side
//! (always concrete).

use core_events::{
    Event, MomentarySwitchEvent, ModifierFlag, StickyModifierType, UnmarshalError, UsageFamily,
    dump_for_error,
};
use serde_json::{Value, json};

/// Wildcard family for `"any"` patterns. `generic_desktop` is deliberately
/// absent: those usages are never wildcard-matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnyFamily {
    KeyCode,
    ConsumerKeyCode,
    AppleVendorKeyboardKeyCode,
    AppleVendorTopCaseKeyCode,
    PointingButton,
}

impl AnyFamily {
    pub fn usage_family(self) -> UsageFamily {
        match self {
            AnyFamily::KeyCode => UsageFamily::KeyCode,
            AnyFamily::ConsumerKeyCode => UsageFamily::ConsumerKeyCode,
            AnyFamily::AppleVendorKeyboardKeyCode => UsageFamily::AppleVendorKeyboardKeyCode,
            AnyFamily::AppleVendorTopCaseKeyCode => UsageFamily::AppleVendorTopCaseKeyCode,
            AnyFamily::PointingButton => UsageFamily::PointingButton,
        }
    }
}

/// One parsed event description. Built incrementally with [`ingest`]; at most
/// one type may ever be set, so supplying two type-exclusive keys (say
/// `key_code` and `shell_command`) is a schema violation.
///
/// [`ingest`]: EventDefinition::ingest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EventDefinition {
    #[default]
    None,
    MomentarySwitch(MomentarySwitchEvent),
    Any(AnyFamily),
    ShellCommand(String),
    SelectInputSource(Vec<core_events::InputSourceSpecifier>),
    SetVariable(core_events::SetVariable),
    SetNotificationMessage(core_events::NotificationMessage),
    MouseKey(core_events::MouseKey),
    StickyModifier(ModifierFlag, StickyModifierType),
    SoftwareFunction(core_events::SoftwareFunction),
}

const MOMENTARY_SWITCH_KEYS: [&str; 6] = [
    "key_code",
    "consumer_key_code",
    "apple_vendor_keyboard_key_code",
    "apple_vendor_top_case_key_code",
    "generic_desktop",
    "pointing_button",
];

impl EventDefinition {
    pub fn new() -> Self {
        EventDefinition::None
    }

    /// Extend the definition with one key/value pair from the containing
    /// object. Returns `Ok(true)` when the key was recognized, `Ok(false)`
    /// when it belongs to the caller (e.g. `modifiers` on a from-definition),
    /// and an error when the pair is recognized but malformed or would set a
    /// second type.
    pub fn ingest(
        &mut self,
        key: &str,
        value: &Value,
        whole: &Value,
    ) -> Result<bool, UnmarshalError> {
        if MOMENTARY_SWITCH_KEYS.contains(&key) {
            self.check_unset(whole)?;
            let mut pair = serde_json::Map::new();
            pair.insert(key.to_string(), value.clone());
            let event: MomentarySwitchEvent = serde_json::from_value(Value::Object(pair))
                .map_err(|e| UnmarshalError::new(format!("`{key}` error: {e}")))?;
            *self = EventDefinition::MomentarySwitch(event);
            return Ok(true);
        }

        match key {
            "any" => {
                self.check_unset(whole)?;
                let family = match value.as_str() {
                    Some("key_code") => AnyFamily::KeyCode,
                    Some("consumer_key_code") => AnyFamily::ConsumerKeyCode,
                    Some("apple_vendor_keyboard_key_code") => AnyFamily::AppleVendorKeyboardKeyCode,
                    Some("apple_vendor_top_case_key_code") => AnyFamily::AppleVendorTopCaseKeyCode,
                    Some("pointing_button") => AnyFamily::PointingButton,
                    _ => {
                        return Err(UnmarshalError::new(format!(
                            "unknown `any`: `{}`",
                            dump_for_error(value)
                        )));
                    }
                };
                *self = EventDefinition::Any(family);
                Ok(true)
            }

            "shell_command" => {
                self.check_unset(whole)?;
                let Some(command) = value.as_str() else {
                    return Err(UnmarshalError::new(format!(
                        "`shell_command` must be a string, but is `{}`",
                        dump_for_error(value)
                    )));
                };
                *self = EventDefinition::ShellCommand(command.to_string());
                Ok(true)
            }

            "select_input_source" => {
                self.check_unset(whole)?;
                let specifiers = match value {
                    Value::Object(_) => vec![
                        serde_json::from_value(value.clone()).map_err(|e| {
                            UnmarshalError::new(format!("`select_input_source` error: {e}"))
                        })?,
                    ],
                    Value::Array(_) => serde_json::from_value(value.clone()).map_err(|e| {
                        UnmarshalError::new(format!("`select_input_source` error: {e}"))
                    })?,
                    _ => {
                        return Err(UnmarshalError::new(format!(
                            "`select_input_source` must be object or array of objects, but is `{}`",
                            dump_for_error(value)
                        )));
                    }
                };
                *self = EventDefinition::SelectInputSource(specifiers);
                Ok(true)
            }

            "set_variable" => {
                self.check_unset(whole)?;
                let set_variable: core_events::SetVariable = serde_json::from_value(value.clone())
                    .map_err(|e| UnmarshalError::new(format!("`set_variable` error: {e}")))?;
                if set_variable.name.is_none() {
                    return Err(UnmarshalError::new(format!(
                        "`set_variable.name` is not found in `{}`",
                        dump_for_error(value)
                    )));
                }
                if set_variable.set_type == core_events::SetVariableType::Set
                    && set_variable.value.is_none()
                    && set_variable.expression.is_none()
                    && set_variable.key_up_value.is_none()
                    && set_variable.key_up_expression.is_none()
                {
                    return Err(UnmarshalError::new(format!(
                        "none of `set_variable.value`, `set_variable.expression`, \
                         `set_variable.key_up_value`, or `set_variable.key_up_expression` \
                         are found in `{}`",
                        dump_for_error(value)
                    )));
                }
                *self = EventDefinition::SetVariable(set_variable);
                Ok(true)
            }

            "set_notification_message" => {
                self.check_unset(whole)?;
                let message = serde_json::from_value(value.clone()).map_err(|e| {
                    UnmarshalError::new(format!("`set_notification_message` error: {e}"))
                })?;
                *self = EventDefinition::SetNotificationMessage(message);
                Ok(true)
            }

            "mouse_key" => {
                self.check_unset(whole)?;
                let mouse_key = serde_json::from_value(value.clone())
                    .map_err(|e| UnmarshalError::new(format!("`mouse_key` error: {e}")))?;
                *self = EventDefinition::MouseKey(mouse_key);
                Ok(true)
            }

            "sticky_modifier" => {
                self.check_unset(whole)?;
                let Some(pairs) = value.as_object() else {
                    return Err(UnmarshalError::new(format!(
                        "`sticky_modifier` must be an object, but is `{}`",
                        dump_for_error(value)
                    )));
                };
                // Single-pair object; the last pair wins if several appear.
                let mut parsed = None;
                for (modifier, sticky_type) in pairs {
                    let modifier: ModifierFlag = serde_json::from_value(json!(modifier))
                        .map_err(|e| UnmarshalError::new(format!("`sticky_modifier` error: {e}")))?;
                    let sticky_type: StickyModifierType =
                        serde_json::from_value(sticky_type.clone()).map_err(|e| {
                            UnmarshalError::new(format!("`sticky_modifier` error: {e}"))
                        })?;
                    parsed = Some((modifier, sticky_type));
                }
                let Some((modifier, sticky_type)) = parsed else {
                    return Err(UnmarshalError::new(format!(
                        "`sticky_modifier` must not be empty: `{}`",
                        dump_for_error(whole)
                    )));
                };
                *self = EventDefinition::StickyModifier(modifier, sticky_type);
                Ok(true)
            }

            "software_function" => {
                self.check_unset(whole)?;
                let function = serde_json::from_value(value.clone())
                    .map_err(|e| UnmarshalError::new(format!("`software_function` error: {e}")))?;
                *self = EventDefinition::SoftwareFunction(function);
                Ok(true)
            }

            // Documentation-only.
            "description" => Ok(true),

            _ => Ok(false),
        }
    }

    /// Materialize the concrete event. `None` for the `none` definition and
    /// for `any`, which is a pattern rather than an event.
    pub fn to_event(&self) -> Option<Event> {
        match self {
            EventDefinition::None | EventDefinition::Any(_) => None,
            EventDefinition::MomentarySwitch(event) => Some(Event::MomentarySwitch(event.clone())),
            EventDefinition::ShellCommand(command) => Some(Event::ShellCommand(command.clone())),
            EventDefinition::SelectInputSource(specifiers) => {
                Some(Event::SelectInputSource(specifiers.clone()))
            }
            EventDefinition::SetVariable(set_variable) => {
                Some(Event::SetVariable(set_variable.clone()))
            }
            EventDefinition::SetNotificationMessage(message) => {
                Some(Event::SetNotificationMessage(message.clone()))
            }
            EventDefinition::MouseKey(mouse_key) => Some(Event::MouseKey(*mouse_key)),
            EventDefinition::StickyModifier(modifier, sticky_type) => {
                Some(Event::StickyModifier(*modifier, *sticky_type))
            }
            EventDefinition::SoftwareFunction(function) => {
                Some(Event::SoftwareFunction(function.clone()))
            }
        }
    }

    /// Pattern match against an arriving switch event.
    pub fn matches_momentary_switch(&self, event: &MomentarySwitchEvent) -> bool {
        match self {
            EventDefinition::MomentarySwitch(expected) => expected == event,
            EventDefinition::Any(family) => family.usage_family() == event.usage_family(),
            _ => false,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, EventDefinition::None)
    }

    fn check_unset(&self, whole: &Value) -> Result<(), UnmarshalError> {
        if self.is_none() {
            Ok(())
        } else {
            Err(UnmarshalError::new(format!(
                "multiple types are specified: `{}`",
                dump_for_error(whole)
            )))
        }
    }
}
