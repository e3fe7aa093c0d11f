//! The emission side of a basic rule: a concrete event plus the attributes
//! governing how it is posted.

use crate::event_definition::EventDefinition;
use crate::modifier_definition::parse_modifier_list;
use core_events::{Event, ModifierFlag, UnmarshalError, dump_for_error};
use serde_json::{Value, json};

#[derive(Debug, Clone)]
pub struct ToEventDefinition {
    pub event_definition: EventDefinition,
    /// Modifiers pressed around the event: key-downs precede it, key-ups
    /// follow its key-up during wind-down.
    pub modifiers: Vec<ModifierFlag>,
    pub lazy: bool,
    pub repeat: bool,
    pub halt: bool,
    pub hold_down_milliseconds: u64,
}

impl Default for ToEventDefinition {
    fn default() -> Self {
        Self {
            event_definition: EventDefinition::None,
            modifiers: Vec::new(),
            lazy: false,
            repeat: true,
            halt: false,
            hold_down_milliseconds: 0,
        }
    }
}

impl ToEventDefinition {
    /// Parse one to-definition. A bare string is shorthand for
    /// `{"key_code": <string>}`.
    pub fn parse(json: &Value) -> Result<Self, UnmarshalError> {
        if let Some(name) = json.as_str() {
            return Self::parse(&json!({ "key_code": name }));
        }
        let Some(object) = json.as_object() else {
            return Err(UnmarshalError::new(format!(
                "`to` entry must be an object or a string, but is `{}`",
                dump_for_error(json)
            )));
        };

        let mut to = ToEventDefinition::default();
        for (key, value) in object {
            if to.event_definition.ingest(key, value, json)? {
                continue;
            }
            match key.as_str() {
                "modifiers" => {
                    for modifier in parse_modifier_list(value)? {
                        let Some(flag) = modifier.to_flag() else {
                            return Err(UnmarshalError::new(format!(
                                "`any` is not a valid `to` modifier: `{}`",
                                dump_for_error(json)
                            )));
                        };
                        to.modifiers.push(flag);
                    }
                }
                "lazy" => to.lazy = require_bool(key, value)?,
                "repeat" => to.repeat = require_bool(key, value)?,
                "halt" => to.halt = require_bool(key, value)?,
                "hold_down_milliseconds" => {
                    to.hold_down_milliseconds = value.as_u64().ok_or_else(|| {
                        UnmarshalError::new(format!(
                            "`hold_down_milliseconds` must be a non-negative integer, but is `{}`",
                            dump_for_error(value)
                        ))
                    })?;
                }
                _ => {
                    return Err(UnmarshalError::new(format!(
                        "unknown key `{key}` in `{}`",
                        dump_for_error(json)
                    )));
                }
            }
        }

        if to.event_definition.is_none() {
            return Err(UnmarshalError::new(format!(
                "`to` entry must specify an event: `{}`",
                dump_for_error(json)
            )));
        }
        if matches!(to.event_definition, EventDefinition::Any(_)) {
            return Err(UnmarshalError::new(format!(
                "`any` cannot appear on the `to` side: `{}`",
                dump_for_error(json)
            )));
        }
        Ok(to)
    }

    /// Parse a to-list: a single definition (object or string) or an array of
    /// them.
    pub fn parse_list(json: &Value) -> Result<Vec<ToEventDefinition>, UnmarshalError> {
        match json {
            Value::Array(items) => items.iter().map(Self::parse).collect(),
            _ => Ok(vec![Self::parse(json)?]),
        }
    }

    /// The concrete event to emit. Construction guarantees this is `Some`.
    pub fn event(&self) -> Option<Event> {
        self.event_definition.to_event()
    }
}

fn require_bool(key: &str, value: &Value) -> Result<bool, UnmarshalError> {
    value.as_bool().ok_or_else(|| {
        UnmarshalError::new(format!(
            "`{key}` must be a boolean, but is `{}`",
            dump_for_error(value)
        ))
    })
}
