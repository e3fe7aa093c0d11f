//! The match side of a basic rule: which event (or simultaneous chord) must
//! arrive, under which modifier state, for the rule to fire.

use crate::event_definition::EventDefinition;
use crate::modifier_definition::{Modifier, parse_modifier_list};
use crate::to_event_definition::ToEventDefinition;
use core_events::{ModifierMask, MomentarySwitchEvent, UnmarshalError, dump_for_error};
use serde_json::Value;

/// The `mandatory` / `optional` modifier sets of a from-definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FromModifiers {
    pub mandatory: Vec<Modifier>,
    pub optional: Vec<Modifier>,
}

impl FromModifiers {
    pub fn parse(value: &Value) -> Result<Self, UnmarshalError> {
        let Some(object) = value.as_object() else {
            return Err(UnmarshalError::new(format!(
                "`modifiers` must be an object, but is `{}`",
                dump_for_error(value)
            )));
        };
        let mut modifiers = FromModifiers::default();
        for (key, value) in object {
            match key.as_str() {
                "mandatory" => modifiers.mandatory = parse_modifier_list(value)?,
                "optional" => modifiers.optional = parse_modifier_list(value)?,
                _ => {
                    return Err(UnmarshalError::new(format!(
                        "unknown key `{key}` in `{}`",
                        dump_for_error(value)
                    )));
                }
            }
        }
        Ok(modifiers)
    }

    /// Inject `optional = [any]`, as simple substitutions always do.
    pub fn optional_any() -> Self {
        Self {
            mandatory: Vec::new(),
            optional: vec![Modifier::Any],
        }
    }

    /// Test the held-modifier mask: every mandatory entry must be satisfied,
    /// and a held flag covered by neither set forbids the match unless
    /// `optional` contains `any`.
    pub fn matches(&self, held: ModifierMask) -> bool {
        let mut covered = ModifierMask::empty();
        let mut mandatory_any = false;
        for modifier in &self.mandatory {
            if *modifier == Modifier::Any {
                mandatory_any = true;
                continue;
            }
            let satisfied = modifier.targets() & held;
            if satisfied.is_empty() {
                return false;
            }
            covered |= satisfied;
        }
        if mandatory_any || self.optional.contains(&Modifier::Any) {
            return true;
        }
        for modifier in &self.optional {
            covered |= modifier.targets();
        }
        (held - covered).is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyOrder {
    #[default]
    Insensitive,
    Strict,
    StrictInverse,
}

impl KeyOrder {
    fn parse(value: &Value) -> Result<Self, UnmarshalError> {
        match value.as_str() {
            Some("insensitive") => Ok(KeyOrder::Insensitive),
            Some("strict") => Ok(KeyOrder::Strict),
            Some("strict_inverse") => Ok(KeyOrder::StrictInverse),
            _ => Err(UnmarshalError::new(format!(
                "unknown key order: `{}`",
                dump_for_error(value)
            ))),
        }
    }

    /// Whether the definition indices, in arrival order, satisfy this order.
    pub fn permits(self, arrival: &[usize]) -> bool {
        match self {
            KeyOrder::Insensitive => true,
            KeyOrder::Strict => arrival.windows(2).all(|pair| pair[0] < pair[1]),
            KeyOrder::StrictInverse => arrival.windows(2).all(|pair| pair[0] > pair[1]),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyUpWhen {
    #[default]
    Any,
    All,
}

impl KeyUpWhen {
    fn parse(value: &Value) -> Result<Self, UnmarshalError> {
        match value.as_str() {
            Some("any") => Ok(KeyUpWhen::Any),
            Some("all") => Ok(KeyUpWhen::All),
            _ => Err(UnmarshalError::new(format!(
                "unknown `key_up_when`: `{}`",
                dump_for_error(value)
            ))),
        }
    }
}

/// Options governing simultaneous-chord matching.
#[derive(Debug, Clone, Default)]
pub struct SimultaneousOptions {
    pub detect_key_down_uninterruptedly: bool,
    pub key_down_order: KeyOrder,
    pub key_up_order: KeyOrder,
    pub key_up_when: KeyUpWhen,
    pub to_after_key_up: Vec<ToEventDefinition>,
}

impl SimultaneousOptions {
    fn parse(value: &Value) -> Result<Self, UnmarshalError> {
        let Some(object) = value.as_object() else {
            return Err(UnmarshalError::new(format!(
                "`simultaneous_options` must be an object, but is `{}`",
                dump_for_error(value)
            )));
        };
        let mut options = SimultaneousOptions::default();
        for (key, value) in object {
            match key.as_str() {
                "detect_key_down_uninterruptedly" => {
                    options.detect_key_down_uninterruptedly =
                        value.as_bool().ok_or_else(|| {
                            UnmarshalError::new(format!(
                                "`detect_key_down_uninterruptedly` must be a boolean, but is `{}`",
                                dump_for_error(value)
                            ))
                        })?;
                }
                "key_down_order" => options.key_down_order = KeyOrder::parse(value)?,
                "key_up_order" => options.key_up_order = KeyOrder::parse(value)?,
                "key_up_when" => options.key_up_when = KeyUpWhen::parse(value)?,
                "to_after_key_up" => {
                    options.to_after_key_up = ToEventDefinition::parse_list(value)?;
                }
                _ => {
                    return Err(UnmarshalError::new(format!(
                        "unknown key `{key}` in `simultaneous_options`"
                    )));
                }
            }
        }
        Ok(options)
    }
}

/// A parsed `from` object.
#[derive(Debug, Clone, Default)]
pub struct FromEventDefinition {
    /// One definition for a plain from, several for a simultaneous chord.
    pub event_definitions: Vec<EventDefinition>,
    pub modifiers: FromModifiers,
    pub simultaneous_options: SimultaneousOptions,
}

impl FromEventDefinition {
    pub fn parse(json: &Value) -> Result<Self, UnmarshalError> {
        let Some(object) = json.as_object() else {
            return Err(UnmarshalError::new(format!(
                "`from` must be an object, but is `{}`",
                dump_for_error(json)
            )));
        };

        let mut head = EventDefinition::new();
        let mut simultaneous: Vec<EventDefinition> = Vec::new();
        let mut modifiers = FromModifiers::default();
        let mut options = SimultaneousOptions::default();

        for (key, value) in object {
            if head.ingest(key, value, json)? {
                continue;
            }
            match key.as_str() {
                "modifiers" => modifiers = FromModifiers::parse(value)?,
                "simultaneous" => {
                    let Some(items) = value.as_array() else {
                        return Err(UnmarshalError::new(format!(
                            "`simultaneous` must be an array, but is `{}`",
                            dump_for_error(value)
                        )));
                    };
                    for item in items {
                        let Some(item_object) = item.as_object() else {
                            return Err(UnmarshalError::new(format!(
                                "`simultaneous` entry must be an object, but is `{}`",
                                dump_for_error(item)
                            )));
                        };
                        let mut definition = EventDefinition::new();
                        for (item_key, item_value) in item_object {
                            if !definition.ingest(item_key, item_value, item)? {
                                return Err(UnmarshalError::new(format!(
                                    "unknown key `{item_key}` in `{}`",
                                    dump_for_error(item)
                                )));
                            }
                        }
                        if !matches!(
                            definition,
                            EventDefinition::MomentarySwitch(_) | EventDefinition::Any(_)
                        ) {
                            return Err(UnmarshalError::new(format!(
                                "`simultaneous` entry must be a momentary switch, but is `{}`",
                                dump_for_error(item)
                            )));
                        }
                        simultaneous.push(definition);
                    }
                }
                "simultaneous_options" => options = SimultaneousOptions::parse(value)?,
                _ => {
                    return Err(UnmarshalError::new(format!(
                        "unknown key `{key}` in `{}`",
                        dump_for_error(json)
                    )));
                }
            }
        }

        let event_definitions = match (head.is_none(), simultaneous.is_empty()) {
            (false, true) => vec![head],
            (true, false) => simultaneous,
            (false, false) => {
                return Err(UnmarshalError::new(format!(
                    "both a direct event and `simultaneous` are specified: `{}`",
                    dump_for_error(json)
                )));
            }
            (true, true) => {
                return Err(UnmarshalError::new(format!(
                    "`from` must specify an event: `{}`",
                    dump_for_error(json)
                )));
            }
        };

        Ok(Self {
            event_definitions,
            modifiers,
            simultaneous_options: options,
        })
    }

    pub fn is_simultaneous(&self) -> bool {
        self.event_definitions.len() > 1
    }

    /// Index of the first definition matching `event` that is not already
    /// claimed in `taken`.
    pub fn find_unclaimed_match(
        &self,
        event: &MomentarySwitchEvent,
        taken: &[usize],
    ) -> Option<usize> {
        self.event_definitions
            .iter()
            .enumerate()
            .find(|(index, definition)| {
                !taken.contains(index) && definition.matches_momentary_switch(event)
            })
            .map(|(index, _)| index)
    }
}
