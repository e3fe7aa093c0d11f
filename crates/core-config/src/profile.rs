//! Profile model: the declarative half of the configuration file.
//!
//! Parsing is tolerant by design. A malformed fragment is logged and
//! skipped; the rest of the profile loads. Unknown keys are preserved and
//! written back verbatim so external tools can extend the file.

use crate::jsonc;
use core_events::DeviceIdentifiers;
use serde_json::{Map, Value, json};
use tracing::warn;

/// Simple-modification pairs, each side kept as its authored JSON (dumped to
/// a canonical string, possibly originally JSONC).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleModifications {
    pairs: Vec<(String, String)>,
}

impl SimpleModifications {
    pub fn from_json(value: &Value) -> Self {
        let mut modifications = SimpleModifications::default();
        let Some(entries) = value.as_array() else {
            return modifications;
        };
        for entry in entries {
            let (Some(from), Some(to)) = (entry.get("from"), entry.get("to")) else {
                warn!(target: "config", entry = %entry, "simple modification entry lacks from/to");
                continue;
            };
            modifications
                .pairs
                .push((from.to_string(), to.to_string()));
        }
        modifications
    }

    pub fn to_json(&self) -> Value {
        let entries: Vec<Value> = self
            .pairs
            .iter()
            .filter_map(|(from, to)| {
                let from = jsonc::parse_jsonc(from).ok()?;
                let to = jsonc::parse_jsonc(to).ok()?;
                Some(json!({"from": from, "to": to}))
            })
            .collect();
        Value::Array(entries)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn push_pair(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.pairs.push((from.into(), to.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Complex-modification rules are kept as raw JSON; the pipeline builder
/// interprets them and reports per-manipulator errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplexModifications {
    pub parameters: Value,
    pub rules: Vec<Value>,
}

impl ComplexModifications {
    fn from_json(value: &Value) -> Self {
        let parameters = value
            .get("parameters")
            .cloned()
            .unwrap_or_else(|| json!({}));
        let rules = value
            .get("rules")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Self { parameters, rules }
    }

    fn to_json(&self) -> Value {
        json!({
            "parameters": self.parameters,
            "rules": self.rules,
        })
    }
}

/// Per-device settings: identifiers, device-scoped substitutions, and the
/// pointing-axis flags that synthesize a `mouse_basic` manipulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceConfiguration {
    pub identifiers: DeviceIdentifiers,
    pub ignore: bool,
    pub simple_modifications: SimpleModifications,
    pub mouse_flip_x: bool,
    pub mouse_flip_y: bool,
    pub mouse_flip_vertical_wheel: bool,
    pub mouse_flip_horizontal_wheel: bool,
    pub mouse_swap_xy: bool,
    pub mouse_swap_wheels: bool,
    pub mouse_discard_x: bool,
    pub mouse_discard_y: bool,
    pub mouse_discard_vertical_wheel: bool,
    pub mouse_discard_horizontal_wheel: bool,
    extra: Map<String, Value>,
}

impl DeviceConfiguration {
    fn from_json(value: &Value) -> Self {
        let mut device = DeviceConfiguration::default();
        let Some(object) = value.as_object() else {
            return device;
        };
        for (key, value) in object {
            match key.as_str() {
                "identifiers" => {
                    device.identifiers =
                        serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                            warn!(target: "config", error = %e, "bad device identifiers");
                            DeviceIdentifiers::default()
                        });
                }
                "ignore" => device.ignore = value.as_bool().unwrap_or(false),
                "simple_modifications" => {
                    device.simple_modifications = SimpleModifications::from_json(value);
                }
                "mouse_flip_x" => device.mouse_flip_x = value.as_bool().unwrap_or(false),
                "mouse_flip_y" => device.mouse_flip_y = value.as_bool().unwrap_or(false),
                "mouse_flip_vertical_wheel" => {
                    device.mouse_flip_vertical_wheel = value.as_bool().unwrap_or(false);
                }
                "mouse_flip_horizontal_wheel" => {
                    device.mouse_flip_horizontal_wheel = value.as_bool().unwrap_or(false);
                }
                "mouse_swap_xy" => device.mouse_swap_xy = value.as_bool().unwrap_or(false),
                "mouse_swap_wheels" => device.mouse_swap_wheels = value.as_bool().unwrap_or(false),
                "mouse_discard_x" => device.mouse_discard_x = value.as_bool().unwrap_or(false),
                "mouse_discard_y" => device.mouse_discard_y = value.as_bool().unwrap_or(false),
                "mouse_discard_vertical_wheel" => {
                    device.mouse_discard_vertical_wheel = value.as_bool().unwrap_or(false);
                }
                "mouse_discard_horizontal_wheel" => {
                    device.mouse_discard_horizontal_wheel = value.as_bool().unwrap_or(false);
                }
                _ => {
                    device.extra.insert(key.clone(), value.clone());
                }
            }
        }
        device
    }

    fn to_json(&self) -> Value {
        let mut object = self.extra.clone();
        object.insert(
            "identifiers".into(),
            serde_json::to_value(&self.identifiers).unwrap_or_default(),
        );
        object.insert("ignore".into(), json!(self.ignore));
        object.insert(
            "simple_modifications".into(),
            self.simple_modifications.to_json(),
        );
        for (key, set) in [
            ("mouse_flip_x", self.mouse_flip_x),
            ("mouse_flip_y", self.mouse_flip_y),
            ("mouse_flip_vertical_wheel", self.mouse_flip_vertical_wheel),
            (
                "mouse_flip_horizontal_wheel",
                self.mouse_flip_horizontal_wheel,
            ),
            ("mouse_swap_xy", self.mouse_swap_xy),
            ("mouse_swap_wheels", self.mouse_swap_wheels),
            ("mouse_discard_x", self.mouse_discard_x),
            ("mouse_discard_y", self.mouse_discard_y),
            (
                "mouse_discard_vertical_wheel",
                self.mouse_discard_vertical_wheel,
            ),
            (
                "mouse_discard_horizontal_wheel",
                self.mouse_discard_horizontal_wheel,
            ),
        ] {
            if set {
                object.insert(key.into(), json!(true));
            }
        }
        Value::Object(object)
    }

    pub fn has_mouse_flags(&self) -> bool {
        self.mouse_flip_x
            || self.mouse_flip_y
            || self.mouse_flip_vertical_wheel
            || self.mouse_flip_horizontal_wheel
            || self.mouse_swap_xy
            || self.mouse_swap_wheels
            || self.mouse_discard_x
            || self.mouse_discard_y
            || self.mouse_discard_vertical_wheel
            || self.mouse_discard_horizontal_wheel
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualHidKeyboard {
    pub keyboard_type_v2: String,
    pub country_code: u64,
}

impl Default for VirtualHidKeyboard {
    fn default() -> Self {
        Self {
            keyboard_type_v2: "ansi".to_string(),
            country_code: 0,
        }
    }
}

impl VirtualHidKeyboard {
    fn from_json(value: &Value) -> Self {
        let mut keyboard = VirtualHidKeyboard::default();
        if let Some(keyboard_type) = value.get("keyboard_type_v2").and_then(Value::as_str) {
            keyboard.keyboard_type_v2 = keyboard_type.to_string();
        }
        if let Some(country_code) = value.get("country_code").and_then(Value::as_u64) {
            keyboard.country_code = country_code;
        }
        keyboard
    }

    fn to_json(&self) -> Value {
        json!({
            "keyboard_type_v2": self.keyboard_type_v2,
            "country_code": self.country_code,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub name: String,
    pub selected: bool,
    /// Profile-level parameters are opaque to this crate; the pipeline
    /// interprets the `basic.*` timing keys.
    pub parameters: Value,
    pub simple_modifications: SimpleModifications,
    pub complex_modifications: ComplexModifications,
    pub devices: Vec<DeviceConfiguration>,
    pub virtual_hid_keyboard: VirtualHidKeyboard,
    extra: Map<String, Value>,
}

impl Profile {
    pub fn from_json(value: &Value) -> Self {
        let mut profile = Profile {
            parameters: json!({}),
            ..Profile::default()
        };
        let Some(object) = value.as_object() else {
            return profile;
        };
        for (key, value) in object {
            match key.as_str() {
                "name" => profile.name = value.as_str().unwrap_or_default().to_string(),
                "selected" => profile.selected = value.as_bool().unwrap_or(false),
                "parameters" => profile.parameters = value.clone(),
                "simple_modifications" => {
                    profile.simple_modifications = SimpleModifications::from_json(value);
                }
                "complex_modifications" => {
                    profile.complex_modifications = ComplexModifications::from_json(value);
                }
                "devices" => {
                    if let Some(devices) = value.as_array() {
                        profile.devices =
                            devices.iter().map(DeviceConfiguration::from_json).collect();
                    }
                }
                "virtual_hid_keyboard" => {
                    profile.virtual_hid_keyboard = VirtualHidKeyboard::from_json(value);
                }
                _ => {
                    profile.extra.insert(key.clone(), value.clone());
                }
            }
        }
        profile
    }

    pub fn to_json(&self) -> Value {
        let mut object = self.extra.clone();
        object.insert("name".into(), json!(self.name));
        object.insert("selected".into(), json!(self.selected));
        object.insert("parameters".into(), self.parameters.clone());
        object.insert(
            "simple_modifications".into(),
            self.simple_modifications.to_json(),
        );
        object.insert(
            "complex_modifications".into(),
            self.complex_modifications.to_json(),
        );
        object.insert(
            "devices".into(),
            Value::Array(self.devices.iter().map(DeviceConfiguration::to_json).collect()),
        );
        object.insert(
            "virtual_hid_keyboard".into(),
            self.virtual_hid_keyboard.to_json(),
        );
        Value::Object(object)
    }
}
