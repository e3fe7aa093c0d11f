//! Conditions attached to manipulators. Each evaluates deterministically
//! against the environment; a manipulator matches only when all of its
//! conditions hold.

use crate::environment::ManipulatorEnvironment;
use core_events::{DeviceIdentifiers, UnmarshalError, VariableValue, dump_for_error};
use regex::Regex;
use serde_json::Value;

/// Regex triple for `input_source_if` / `input_source_unless` entries. Every
/// present field must match.
#[derive(Debug, Clone)]
pub struct InputSourcePattern {
    pub language: Option<Regex>,
    pub input_source_id: Option<Regex>,
    pub input_mode_id: Option<Regex>,
}

/// Expected value of a `variable_if` condition; an array means membership.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedVariableValue {
    Single(VariableValue),
    AnyOf(Vec<VariableValue>),
}

impl ExpectedVariableValue {
    fn matches(&self, actual: Option<&VariableValue>) -> bool {
        match self {
            ExpectedVariableValue::Single(expected) => actual == Some(expected),
            ExpectedVariableValue::AnyOf(candidates) => {
                actual.is_some_and(|value| candidates.contains(value))
            }
        }
    }
}

/// One device-identifier alternative of a `device_if` condition. Every
/// present field must match; alternatives are OR-combined.
#[derive(Debug, Clone, Default)]
pub struct DeviceMatcher {
    pub vendor_id: Option<u64>,
    pub product_id: Option<u64>,
    pub location_id: Option<u64>,
    pub device_address: Option<String>,
    pub is_keyboard: Option<bool>,
    pub is_pointing_device: Option<bool>,
}

#[derive(Debug, Clone)]
pub enum Condition {
    FrontmostApplication {
        is_if: bool,
        bundle_identifiers: Vec<Regex>,
        file_paths: Vec<Regex>,
    },
    InputSource {
        is_if: bool,
        patterns: Vec<InputSourcePattern>,
    },
    Variable {
        is_if: bool,
        name: String,
        expected: ExpectedVariableValue,
    },
    Device {
        is_if: bool,
        matchers: Vec<DeviceMatcher>,
    },
    EventChanged {
        is_if: bool,
        value: bool,
    },
    KeyboardType {
        is_if: bool,
        keyboard_types: Vec<String>,
    },
}

impl Condition {
    /// Build a condition from its JSON object form, dispatching on `"type"`.
    pub fn make_from_json(json: &Value) -> Result<Condition, UnmarshalError> {
        let Some(object) = json.as_object() else {
            return Err(UnmarshalError::new(format!(
                "condition must be an object, but is `{}`",
                dump_for_error(json)
            )));
        };
        let Some(condition_type) = object.get("type").and_then(Value::as_str) else {
            return Err(UnmarshalError::new(format!(
                "condition `type` is not found in `{}`",
                dump_for_error(json)
            )));
        };

        match condition_type {
            "frontmost_application_if" | "frontmost_application_unless" => {
                let is_if = condition_type == "frontmost_application_if";
                let bundle_identifiers =
                    parse_regex_list(object.get("bundle_identifiers"), "bundle_identifiers")?;
                let file_paths = parse_regex_list(object.get("file_paths"), "file_paths")?;
                Ok(Condition::FrontmostApplication {
                    is_if,
                    bundle_identifiers,
                    file_paths,
                })
            }

            "input_source_if" | "input_source_unless" => {
                let is_if = condition_type == "input_source_if";
                let Some(entries) = object.get("input_sources").and_then(Value::as_array) else {
                    return Err(UnmarshalError::new(format!(
                        "`input_sources` is not found in `{}`",
                        dump_for_error(json)
                    )));
                };
                let mut patterns = Vec::with_capacity(entries.len());
                for entry in entries {
                    let Some(fields) = entry.as_object() else {
                        return Err(UnmarshalError::new(format!(
                            "`input_sources` entry must be an object, but is `{}`",
                            dump_for_error(entry)
                        )));
                    };
                    let mut pattern = InputSourcePattern {
                        language: None,
                        input_source_id: None,
                        input_mode_id: None,
                    };
                    for (key, value) in fields {
                        let regex = Some(parse_regex(value, key)?);
                        match key.as_str() {
                            "language" => pattern.language = regex,
                            "input_source_id" => pattern.input_source_id = regex,
                            "input_mode_id" => pattern.input_mode_id = regex,
                            _ => {
                                return Err(UnmarshalError::new(format!(
                                    "unknown key `{key}` in `{}`",
                                    dump_for_error(entry)
                                )));
                            }
                        }
                    }
                    patterns.push(pattern);
                }
                Ok(Condition::InputSource { is_if, patterns })
            }

            "variable_if" | "variable_unless" => {
                let is_if = condition_type == "variable_if";
                let Some(name) = object.get("name").and_then(Value::as_str) else {
                    return Err(UnmarshalError::new(format!(
                        "`name` is not found in `{}`",
                        dump_for_error(json)
                    )));
                };
                let Some(value) = object.get("value") else {
                    return Err(UnmarshalError::new(format!(
                        "`value` is not found in `{}`",
                        dump_for_error(json)
                    )));
                };
                let expected = match value {
                    Value::Array(candidates) => ExpectedVariableValue::AnyOf(
                        candidates
                            .iter()
                            .map(parse_variable_value)
                            .collect::<Result<_, _>>()?,
                    ),
                    _ => ExpectedVariableValue::Single(parse_variable_value(value)?),
                };
                Ok(Condition::Variable {
                    is_if,
                    name: name.to_string(),
                    expected,
                })
            }

            "device_if" | "device_unless" => {
                let is_if = condition_type == "device_if";
                let Some(entries) = object.get("identifiers").and_then(Value::as_array) else {
                    return Err(UnmarshalError::new(format!(
                        "`identifiers` is not found in `{}`",
                        dump_for_error(json)
                    )));
                };
                let mut matchers = Vec::with_capacity(entries.len());
                for entry in entries {
                    matchers.push(parse_device_matcher(entry)?);
                }
                Ok(Condition::Device { is_if, matchers })
            }

            "event_changed_if" | "event_changed_unless" => {
                let is_if = condition_type == "event_changed_if";
                let Some(value) = object.get("value").and_then(Value::as_bool) else {
                    return Err(UnmarshalError::new(format!(
                        "`value` must be a boolean in `{}`",
                        dump_for_error(json)
                    )));
                };
                Ok(Condition::EventChanged { is_if, value })
            }

            "keyboard_type_if" | "keyboard_type_unless" => {
                let is_if = condition_type == "keyboard_type_if";
                let Some(entries) = object.get("keyboard_types").and_then(Value::as_array) else {
                    return Err(UnmarshalError::new(format!(
                        "`keyboard_types` is not found in `{}`",
                        dump_for_error(json)
                    )));
                };
                let keyboard_types = entries
                    .iter()
                    .map(|value| {
                        value.as_str().map(str::to_string).ok_or_else(|| {
                            UnmarshalError::new(format!(
                                "`keyboard_types` entry must be a string, but is `{}`",
                                dump_for_error(value)
                            ))
                        })
                    })
                    .collect::<Result<_, _>>()?;
                Ok(Condition::KeyboardType {
                    is_if,
                    keyboard_types,
                })
            }

            _ => Err(UnmarshalError::new(format!(
                "unknown condition type `{condition_type}` in `{}`",
                dump_for_error(json)
            ))),
        }
    }

    /// `device_if` gate for one configured device, used when scoping
    /// generated manipulators to the device that authored them.
    pub fn device_if(identifiers: &DeviceIdentifiers) -> Condition {
        Condition::Device {
            is_if: true,
            matchers: vec![DeviceMatcher {
                vendor_id: Some(identifiers.vendor_id),
                product_id: Some(identifiers.product_id),
                location_id: None,
                device_address: identifiers.device_address.clone(),
                is_keyboard: Some(identifiers.is_keyboard),
                is_pointing_device: Some(identifiers.is_pointing_device),
            }],
        }
    }

    pub fn evaluate(&self, env: &ManipulatorEnvironment) -> bool {
        match self {
            Condition::FrontmostApplication {
                is_if,
                bundle_identifiers,
                file_paths,
            } => {
                let application = env.frontmost_application();
                let bundle = application.bundle_identifier.as_deref().unwrap_or("");
                let path = application.file_path.as_deref().unwrap_or("");
                let matched = bundle_identifiers.iter().any(|regex| regex.is_match(bundle))
                    || file_paths.iter().any(|regex| regex.is_match(path));
                matched == *is_if
            }

            Condition::InputSource { is_if, patterns } => {
                let input_source = env.input_source();
                let matched = patterns.iter().any(|pattern| {
                    let language_ok = field_matches(
                        pattern.language.as_ref(),
                        input_source.first_language.as_deref(),
                    );
                    let source_ok = field_matches(
                        pattern.input_source_id.as_ref(),
                        input_source.input_source_id.as_deref(),
                    );
                    let mode_ok = field_matches(
                        pattern.input_mode_id.as_ref(),
                        input_source.input_mode_id.as_deref(),
                    );
                    language_ok && source_ok && mode_ok
                });
                matched == *is_if
            }

            Condition::Variable {
                is_if,
                name,
                expected,
            } => expected.matches(env.variable(name)) == *is_if,

            Condition::Device { is_if, matchers } => {
                let matched = env.current_device().is_some_and(|device| {
                    matchers.iter().any(|matcher| {
                        matcher
                            .vendor_id
                            .is_none_or(|v| v == device.identifiers.vendor_id)
                            && matcher
                                .product_id
                                .is_none_or(|v| v == device.identifiers.product_id)
                            && matcher.location_id.is_none_or(|v| Some(v) == device.location_id)
                            && matcher
                                .device_address
                                .as_deref()
                                .is_none_or(|v| Some(v) == device.identifiers.device_address.as_deref())
                            && matcher
                                .is_keyboard
                                .is_none_or(|v| v == device.identifiers.is_keyboard)
                            && matcher
                                .is_pointing_device
                                .is_none_or(|v| v == device.identifiers.is_pointing_device)
                    })
                });
                matched == *is_if
            }

            Condition::EventChanged { is_if, value } => {
                (env.dispatch().event_changed == *value) == *is_if
            }

            Condition::KeyboardType {
                is_if,
                keyboard_types,
            } => {
                let matched = keyboard_types
                    .iter()
                    .any(|keyboard_type| keyboard_type == env.keyboard_type());
                matched == *is_if
            }
        }
    }
}

fn field_matches(pattern: Option<&Regex>, value: Option<&str>) -> bool {
    match pattern {
        None => true,
        Some(regex) => value.is_some_and(|value| regex.is_match(value)),
    }
}

fn parse_regex(value: &Value, key: &str) -> Result<Regex, UnmarshalError> {
    let Some(pattern) = value.as_str() else {
        return Err(UnmarshalError::new(format!(
            "`{key}` entry must be a string, but is `{}`",
            dump_for_error(value)
        )));
    };
    Regex::new(pattern)
        .map_err(|e| UnmarshalError::new(format!("`{key}` regex error: {e}")))
}

fn parse_regex_list(value: Option<&Value>, key: &str) -> Result<Vec<Regex>, UnmarshalError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let Some(items) = value.as_array() else {
        return Err(UnmarshalError::new(format!(
            "`{key}` must be an array, but is `{}`",
            dump_for_error(value)
        )));
    };
    items.iter().map(|item| parse_regex(item, key)).collect()
}

fn parse_variable_value(value: &Value) -> Result<VariableValue, UnmarshalError> {
    serde_json::from_value(value.clone()).map_err(|_| {
        UnmarshalError::new(format!(
            "`value` must be an integer, boolean, or string, but is `{}`",
            dump_for_error(value)
        ))
    })
}

fn parse_device_matcher(entry: &Value) -> Result<DeviceMatcher, UnmarshalError> {
    let Some(fields) = entry.as_object() else {
        return Err(UnmarshalError::new(format!(
            "`identifiers` entry must be an object, but is `{}`",
            dump_for_error(entry)
        )));
    };
    let mut matcher = DeviceMatcher::default();
    for (key, value) in fields {
        match key.as_str() {
            "vendor_id" => matcher.vendor_id = Some(require_u64(key, value)?),
            "product_id" => matcher.product_id = Some(require_u64(key, value)?),
            "location_id" => matcher.location_id = Some(require_u64(key, value)?),
            "device_address" => {
                matcher.device_address = Some(
                    value
                        .as_str()
                        .ok_or_else(|| {
                            UnmarshalError::new(format!(
                                "`device_address` must be a string, but is `{}`",
                                dump_for_error(value)
                            ))
                        })?
                        .to_string(),
                );
            }
            "is_keyboard" => matcher.is_keyboard = Some(require_bool(key, value)?),
            "is_pointing_device" => matcher.is_pointing_device = Some(require_bool(key, value)?),
            "description" => {}
            _ => {
                return Err(UnmarshalError::new(format!(
                    "unknown key `{key}` in `{}`",
                    dump_for_error(entry)
                )));
            }
        }
    }
    Ok(matcher)
}

fn require_u64(key: &str, value: &Value) -> Result<u64, UnmarshalError> {
    value.as_u64().ok_or_else(|| {
        UnmarshalError::new(format!(
            "`{key}` must be a non-negative integer, but is `{}`",
            dump_for_error(value)
        ))
    })
}

fn require_bool(key: &str, value: &Value) -> Result<bool, UnmarshalError> {
    value.as_bool().ok_or_else(|| {
        UnmarshalError::new(format!(
            "`{key}` must be a boolean, but is `{}`",
            dump_for_error(value)
        ))
    })
}
