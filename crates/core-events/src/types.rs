//! Small payload types shared across event kinds.

use serde::{Deserialize, Serialize};

/// On-screen notification content. An empty `text` clears the message with
/// the given id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickyModifierType {
    On,
    Off,
    Toggle,
}

/// Frontmost application as reported by the application monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Application {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// Readiness of the virtual HID output devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VirtualHidDevicesState {
    #[serde(default)]
    pub virtual_hid_keyboard_ready: bool,
    #[serde(default)]
    pub virtual_hid_pointing_ready: bool,
}

/// Subset of system preferences the pipeline reacts to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SystemPreferencesProperties {
    #[serde(default)]
    pub use_fkeys_as_standard_function_keys: bool,
    #[serde(default)]
    pub scroll_direction_is_natural: bool,
}
