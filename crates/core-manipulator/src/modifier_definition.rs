//! Modifier names as they appear inside rules. Unlike [`ModifierFlag`], a
//! rule-side modifier may be the wildcard `any` or a generic (sideless) name.

use core_events::{ModifierFlag, ModifierMask, UnmarshalError, dump_for_error};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Any,
    Command,
    Control,
    Option,
    Shift,
    Flag(ModifierFlag),
}

impl Modifier {
    pub fn parse(value: &Value) -> Result<Modifier, UnmarshalError> {
        let Some(name) = value.as_str() else {
            return Err(UnmarshalError::new(format!(
                "modifier must be a string, but is `{}`",
                dump_for_error(value)
            )));
        };
        match name {
            "any" => Ok(Modifier::Any),
            "command" => Ok(Modifier::Command),
            "control" => Ok(Modifier::Control),
            "option" => Ok(Modifier::Option),
            "shift" => Ok(Modifier::Shift),
            _ => ModifierFlag::from_key_code_name(name)
                .map(Modifier::Flag)
                .ok_or_else(|| UnmarshalError::new(format!("unknown modifier: `{name}`"))),
        }
    }

    /// The set of flags that satisfy this modifier. `Any` targets every flag.
    pub fn targets(self) -> ModifierMask {
        match self {
            Modifier::Any => ModifierMask::all(),
            Modifier::Command => ModifierMask::ANY_COMMAND,
            Modifier::Control => ModifierMask::ANY_CONTROL,
            Modifier::Option => ModifierMask::ANY_OPTION,
            Modifier::Shift => ModifierMask::ANY_SHIFT,
            Modifier::Flag(flag) => flag.mask(),
        }
    }

    /// Concrete flag for the emission side. Generic names resolve to the left
    /// flag; `any` has no emission meaning.
    pub fn to_flag(self) -> Option<ModifierFlag> {
        match self {
            Modifier::Any => None,
            Modifier::Command => Some(ModifierFlag::LeftCommand),
            Modifier::Control => Some(ModifierFlag::LeftControl),
            Modifier::Option => Some(ModifierFlag::LeftOption),
            Modifier::Shift => Some(ModifierFlag::LeftShift),
            Modifier::Flag(flag) => Some(flag),
        }
    }
}

/// Parse a modifier list: a single string or an array of strings.
pub fn parse_modifier_list(value: &Value) -> Result<Vec<Modifier>, UnmarshalError> {
    match value {
        Value::String(_) => Ok(vec![Modifier::parse(value)?]),
        Value::Array(values) => values.iter().map(Modifier::parse).collect(),
        _ => Err(UnmarshalError::new(format!(
            "modifiers must be a string or an array of strings, but is `{}`",
            dump_for_error(value)
        ))),
    }
}
