//! Modifier flags and the pressed-modifier mask.

use serde::{Deserialize, Serialize};

/// One concrete modifier key position. Generic modifiers ("shift") belong to
/// the rule layer; at the event level every modifier is sided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierFlag {
    CapsLock,
    LeftControl,
    LeftShift,
    LeftOption,
    LeftCommand,
    RightControl,
    RightShift,
    RightOption,
    RightCommand,
    Fn,
}

impl ModifierFlag {
    pub fn mask(self) -> ModifierMask {
        match self {
            ModifierFlag::CapsLock => ModifierMask::CAPS_LOCK,
            ModifierFlag::LeftControl => ModifierMask::LEFT_CONTROL,
            ModifierFlag::LeftShift => ModifierMask::LEFT_SHIFT,
            ModifierFlag::LeftOption => ModifierMask::LEFT_OPTION,
            ModifierFlag::LeftCommand => ModifierMask::LEFT_COMMAND,
            ModifierFlag::RightControl => ModifierMask::RIGHT_CONTROL,
            ModifierFlag::RightShift => ModifierMask::RIGHT_SHIFT,
            ModifierFlag::RightOption => ModifierMask::RIGHT_OPTION,
            ModifierFlag::RightCommand => ModifierMask::RIGHT_COMMAND,
            ModifierFlag::Fn => ModifierMask::FN,
        }
    }

    /// Key-code name that emits this modifier. Aliases (`left_alt`,
    /// `left_gui`, ...) are accepted on input but never produced.
    pub fn key_code_name(self) -> &'static str {
        match self {
            ModifierFlag::CapsLock => "caps_lock",
            ModifierFlag::LeftControl => "left_control",
            ModifierFlag::LeftShift => "left_shift",
            ModifierFlag::LeftOption => "left_option",
            ModifierFlag::LeftCommand => "left_command",
            ModifierFlag::RightControl => "right_control",
            ModifierFlag::RightShift => "right_shift",
            ModifierFlag::RightOption => "right_option",
            ModifierFlag::RightCommand => "right_command",
            ModifierFlag::Fn => "fn",
        }
    }

    pub fn from_key_code_name(name: &str) -> Option<Self> {
        match name {
            "caps_lock" => Some(ModifierFlag::CapsLock),
            "left_control" => Some(ModifierFlag::LeftControl),
            "left_shift" => Some(ModifierFlag::LeftShift),
            "left_option" | "left_alt" => Some(ModifierFlag::LeftOption),
            "left_command" | "left_gui" => Some(ModifierFlag::LeftCommand),
            "right_control" => Some(ModifierFlag::RightControl),
            "right_shift" => Some(ModifierFlag::RightShift),
            "right_option" | "right_alt" => Some(ModifierFlag::RightOption),
            "right_command" | "right_gui" => Some(ModifierFlag::RightCommand),
            "fn" => Some(ModifierFlag::Fn),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    /// Set of modifier flags currently held. The pipeline maintains one per
    /// environment; rule matching treats it as read-only.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ModifierMask: u16 {
        const CAPS_LOCK     = 1 << 0;
        const LEFT_CONTROL  = 1 << 1;
        const LEFT_SHIFT    = 1 << 2;
        const LEFT_OPTION   = 1 << 3;
        const LEFT_COMMAND  = 1 << 4;
        const RIGHT_CONTROL = 1 << 5;
        const RIGHT_SHIFT   = 1 << 6;
        const RIGHT_OPTION  = 1 << 7;
        const RIGHT_COMMAND = 1 << 8;
        const FN            = 1 << 9;
    }
}

impl ModifierMask {
    pub const ANY_SHIFT: ModifierMask = ModifierMask::LEFT_SHIFT.union(ModifierMask::RIGHT_SHIFT);
    pub const ANY_CONTROL: ModifierMask =
        ModifierMask::LEFT_CONTROL.union(ModifierMask::RIGHT_CONTROL);
    pub const ANY_OPTION: ModifierMask =
        ModifierMask::LEFT_OPTION.union(ModifierMask::RIGHT_OPTION);
    pub const ANY_COMMAND: ModifierMask =
        ModifierMask::LEFT_COMMAND.union(ModifierMask::RIGHT_COMMAND);
}
