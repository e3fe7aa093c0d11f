//! Momentary-switch events: one press-or-release of a key or button,
//! identified by usage family plus a symbolic code within the family.

use crate::modifier::ModifierFlag;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! symbolic_code {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self(name.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

symbolic_code!(
    /// Keyboard usage, e.g. `"a"`, `"caps_lock"`, `"left_shift"`.
    KeyCode
);
symbolic_code!(
    /// Consumer usage, e.g. `"volume_increment"`, `"play_or_pause"`.
    ConsumerKeyCode
);
symbolic_code!(
    /// Apple vendor keyboard usage, e.g. `"mission_control"`.
    AppleVendorKeyboardKeyCode
);
symbolic_code!(
    /// Apple vendor top-case usage, e.g. `"keyboard_fn"`.
    AppleVendorTopCaseKeyCode
);
symbolic_code!(
    /// Generic desktop usage, e.g. `"system_sleep"`.
    GenericDesktop
);
symbolic_code!(
    /// Pointing button, e.g. `"button1"`.
    PointingButton
);

impl KeyCode {
    /// The modifier flag this key emits, if it is a modifier key.
    pub fn modifier_flag(&self) -> Option<ModifierFlag> {
        ModifierFlag::from_key_code_name(&self.0)
    }
}

/// Usage family of a momentary switch. `any`-pattern matching in rules
/// compares families only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageFamily {
    KeyCode,
    ConsumerKeyCode,
    AppleVendorKeyboardKeyCode,
    AppleVendorTopCaseKeyCode,
    GenericDesktop,
    PointingButton,
}

/// A single physical switch event. Serializes externally tagged, so the JSON
/// form is the familiar one-pair object, e.g. `{"key_code": "caps_lock"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MomentarySwitchEvent {
    #[serde(rename = "key_code")]
    KeyCode(KeyCode),
    #[serde(rename = "consumer_key_code")]
    ConsumerKeyCode(ConsumerKeyCode),
    #[serde(rename = "apple_vendor_keyboard_key_code")]
    AppleVendorKeyboardKeyCode(AppleVendorKeyboardKeyCode),
    #[serde(rename = "apple_vendor_top_case_key_code")]
    AppleVendorTopCaseKeyCode(AppleVendorTopCaseKeyCode),
    #[serde(rename = "generic_desktop")]
    GenericDesktop(GenericDesktop),
    #[serde(rename = "pointing_button")]
    PointingButton(PointingButton),
}

impl MomentarySwitchEvent {
    pub fn key_code(name: impl Into<String>) -> Self {
        MomentarySwitchEvent::KeyCode(KeyCode::new(name))
    }

    pub fn pointing_button(name: impl Into<String>) -> Self {
        MomentarySwitchEvent::PointingButton(PointingButton::new(name))
    }

    pub fn usage_family(&self) -> UsageFamily {
        match self {
            MomentarySwitchEvent::KeyCode(_) => UsageFamily::KeyCode,
            MomentarySwitchEvent::ConsumerKeyCode(_) => UsageFamily::ConsumerKeyCode,
            MomentarySwitchEvent::AppleVendorKeyboardKeyCode(_) => {
                UsageFamily::AppleVendorKeyboardKeyCode
            }
            MomentarySwitchEvent::AppleVendorTopCaseKeyCode(_) => {
                UsageFamily::AppleVendorTopCaseKeyCode
            }
            MomentarySwitchEvent::GenericDesktop(_) => UsageFamily::GenericDesktop,
            MomentarySwitchEvent::PointingButton(_) => UsageFamily::PointingButton,
        }
    }

    /// Modifier flag emitted by this switch, if any. Only keyboard usages can
    /// be modifiers.
    pub fn modifier_flag(&self) -> Option<ModifierFlag> {
        match self {
            MomentarySwitchEvent::KeyCode(code) => code.modifier_flag(),
            _ => None,
        }
    }

    pub fn is_modifier(&self) -> bool {
        self.modifier_flag().is_some()
    }
}
