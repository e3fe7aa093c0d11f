//! Variables stored in the manipulator environment and the `set_variable`
//! payload that mutates them.

use serde::{Deserialize, Serialize};

/// A variable value. JSON integers, booleans and strings map onto the three
/// variants; untagged serde keeps the wire form scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Integer(i64),
    Bool(bool),
    String(String),
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        VariableValue::Integer(value)
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        VariableValue::Bool(value)
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::String(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetVariableType {
    #[default]
    Set,
    Unset,
}

/// Payload of a `set_variable` event. `key_up_value` / `key_up_expression`
/// apply when the emitting to-event winds down; expressions are carried
/// verbatim for the expression-evaluator collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SetVariable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<VariableValue>,
    #[serde(rename = "type", default, skip_serializing_if = "is_default_type")]
    pub set_type: SetVariableType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_up_value: Option<VariableValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_up_expression: Option<String>,
}

fn is_default_type(set_type: &SetVariableType) -> bool {
    *set_type == SetVariableType::Set
}

impl SetVariable {
    pub fn set(name: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn unset(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            set_type: SetVariableType::Unset,
            ..Self::default()
        }
    }

    /// The event to emit on the key-up pass, if this payload carries one.
    pub fn key_up_variant(&self) -> Option<SetVariable> {
        if self.key_up_value.is_none() && self.key_up_expression.is_none() {
            return None;
        }
        Some(SetVariable {
            name: self.name.clone(),
            value: self.key_up_value.clone(),
            set_type: self.set_type,
            key_up_value: None,
            expression: self.key_up_expression.clone(),
            key_up_expression: None,
        })
    }
}
