//! Software-function payloads: host-side actions a rule can trigger that are
//! neither key events nor pointer motion. Executed by the session collaborator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoftwareFunction {
    #[serde(rename = "cg_event_double_click")]
    CgEventDoubleClick { button: u32 },
    #[serde(rename = "iokit_power_management_sleep_system")]
    IokitPowerManagementSleepSystem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay_milliseconds: Option<u64>,
    },
    #[serde(rename = "open_application")]
    OpenApplication {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bundle_identifier: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_path: Option<String>,
    },
    #[serde(rename = "set_mouse_cursor_position")]
    SetMouseCursorPosition {
        x: i32,
        y: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        screen: Option<u32>,
    },
}
