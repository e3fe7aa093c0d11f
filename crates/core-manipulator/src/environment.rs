//! The manipulator environment: everything a condition can observe.
//!
//! Owned by the dispatcher and mutated only on the dispatcher. External
//! observers read through [`ManipulatorEnvironment::variables_snapshot`];
//! they never mutate.

use core_events::{
    Application, DeviceId, DeviceProperties, EventOrigin, InputSourceProperties, ModifierFlag,
    ModifierMask, SetVariable, SetVariableType, SystemPreferencesProperties, VariableValue,
    VirtualHidDevicesState,
};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Per-dispatch facts about the entry currently being routed. Reset by the
/// pipeline before each entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchContext {
    pub device_id: DeviceId,
    pub event_changed: bool,
}

#[derive(Debug, Default)]
pub struct ManipulatorEnvironment {
    frontmost_application: Application,
    input_source: InputSourceProperties,
    variables: HashMap<String, VariableValue>,
    system_preferences: SystemPreferencesProperties,
    virtual_hid_devices_state: VirtualHidDevicesState,
    keyboard_type: String,
    caps_lock_state: i64,
    devices: HashMap<DeviceId, DeviceProperties>,
    pressed_modifiers: HashSet<(DeviceId, ModifierFlag)>,
    dispatch: DispatchContext,
}

impl ManipulatorEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    // -- per-dispatch context ---------------------------------------------

    pub fn begin_dispatch(&mut self, device_id: DeviceId, origin: EventOrigin) {
        self.dispatch = DispatchContext {
            device_id,
            event_changed: origin == EventOrigin::Manipulated,
        };
    }

    pub fn dispatch(&self) -> DispatchContext {
        self.dispatch
    }

    pub fn current_device(&self) -> Option<&DeviceProperties> {
        self.devices.get(&self.dispatch.device_id)
    }

    // -- monitors ---------------------------------------------------------

    pub fn frontmost_application(&self) -> &Application {
        &self.frontmost_application
    }

    pub fn set_frontmost_application(&mut self, application: Application) {
        trace!(
            target: "manipulator.environment",
            bundle_identifier = ?application.bundle_identifier,
            "frontmost_application_changed"
        );
        self.frontmost_application = application;
    }

    pub fn input_source(&self) -> &InputSourceProperties {
        &self.input_source
    }

    pub fn set_input_source(&mut self, input_source: InputSourceProperties) {
        self.input_source = input_source;
    }

    pub fn system_preferences(&self) -> &SystemPreferencesProperties {
        &self.system_preferences
    }

    pub fn set_system_preferences(&mut self, properties: SystemPreferencesProperties) {
        self.system_preferences = properties;
    }

    pub fn virtual_hid_devices_state(&self) -> VirtualHidDevicesState {
        self.virtual_hid_devices_state
    }

    pub fn set_virtual_hid_devices_state(&mut self, state: VirtualHidDevicesState) {
        self.virtual_hid_devices_state = state;
    }

    pub fn keyboard_type(&self) -> &str {
        &self.keyboard_type
    }

    pub fn set_keyboard_type(&mut self, keyboard_type: impl Into<String>) {
        self.keyboard_type = keyboard_type.into();
    }

    pub fn caps_lock_state(&self) -> i64 {
        self.caps_lock_state
    }

    pub fn set_caps_lock_state(&mut self, state: i64) {
        self.caps_lock_state = state;
    }

    // -- devices ----------------------------------------------------------

    pub fn insert_device(&mut self, properties: DeviceProperties) {
        self.devices.insert(properties.device_id, properties);
    }

    /// Forget a device and any modifiers it was holding.
    pub fn remove_device(&mut self, device_id: DeviceId) {
        self.devices.remove(&device_id);
        self.pressed_modifiers
            .retain(|(pressed_device, _)| *pressed_device != device_id);
    }

    pub fn device(&self, device_id: DeviceId) -> Option<&DeviceProperties> {
        self.devices.get(&device_id)
    }

    // -- modifier state ---------------------------------------------------

    pub fn modifier_mask(&self) -> ModifierMask {
        self.pressed_modifiers
            .iter()
            .fold(ModifierMask::empty(), |mask, (_, flag)| mask | flag.mask())
    }

    pub fn record_modifier_key_down(&mut self, device_id: DeviceId, flag: ModifierFlag) {
        self.pressed_modifiers.insert((device_id, flag));
    }

    pub fn record_modifier_key_up(&mut self, device_id: DeviceId, flag: ModifierFlag) {
        self.pressed_modifiers.remove(&(device_id, flag));
    }

    pub fn release_device_modifiers(&mut self, device_id: DeviceId) {
        self.pressed_modifiers
            .retain(|(pressed_device, _)| *pressed_device != device_id);
    }

    // -- variables --------------------------------------------------------

    pub fn variable(&self, name: &str) -> Option<&VariableValue> {
        self.variables.get(name)
    }

    /// Apply a `set_variable` payload. Expressions are not evaluated here;
    /// payloads carrying only an expression leave the store untouched.
    pub fn apply_set_variable(&mut self, set_variable: &SetVariable) {
        let Some(name) = set_variable.name.as_deref() else {
            return;
        };
        match set_variable.set_type {
            SetVariableType::Unset => {
                trace!(target: "manipulator.environment", name, "unset_variable");
                self.variables.remove(name);
            }
            SetVariableType::Set => {
                if let Some(value) = &set_variable.value {
                    trace!(target: "manipulator.environment", name, ?value, "set_variable");
                    self.variables.insert(name.to_string(), value.clone());
                }
            }
        }
    }

    /// Snapshot for external subscribers. The live map stays
    /// dispatcher-owned.
    pub fn variables_snapshot(&self) -> HashMap<String, VariableValue> {
        self.variables.clone()
    }
}
