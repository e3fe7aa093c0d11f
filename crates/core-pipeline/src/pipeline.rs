//! The staged pipeline: an ordered chain of manipulator managers plus the
//! shared environment, driven one entry at a time by the dispatcher.
//!
//! Stage order: complex-modification rules first, then simple modifications
//! (the capture side feeds rules before substitutions, so a rule that
//! consumes a key wins over a substitution for the same key). Outputs of an
//! earlier stage are routed through the later stages.

use crate::builder;
use core_config::CoreConfiguration;
use core_events::{
    AbsoluteMs, DeviceId, Event, EventEntry, EventOrigin, EventType, ModifierFlag,
    MomentarySwitchEvent,
};
use core_manipulator::{ManipulatorEnvironment, ManipulatorManager};
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<ManipulatorManager>,
    env: ManipulatorEnvironment,
    /// Physical switches whose key-down was consumed by some manipulator and
    /// whose key-up has not been seen yet. A key-up arriving after the
    /// consumer is gone (configuration reload) must not leak downstream as a
    /// spurious release.
    consumed_downs: HashSet<(DeviceId, MomentarySwitchEvent)>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configuration(configuration: &CoreConfiguration) -> Self {
        let mut pipeline = Self::new();
        pipeline.reload(configuration, AbsoluteMs(0));
        pipeline
    }

    /// Swap in a new configuration: invalidate every stage (flushing
    /// mid-flight activations as output) and rebuild from the selected
    /// profile. No entry is routed between the two steps.
    pub fn reload(
        &mut self,
        configuration: &CoreConfiguration,
        now: AbsoluteMs,
    ) -> Vec<EventEntry> {
        let flushed = self.invalidate(now);

        let profile = configuration.selected_profile();
        self.env
            .set_keyboard_type(profile.virtual_hid_keyboard.keyboard_type_v2.clone());
        self.stages = vec![
            builder::build_complex_modifications_manager(profile),
            builder::build_simple_modifications_manager(profile),
        ];
        info!(
            target: "pipeline",
            profile = %profile.name,
            complex = self.stages[0].len(),
            simple = self.stages[1].len(),
            "pipeline rebuilt"
        );
        flushed
    }

    /// Invalidate all stages, in stage order. Mid-flight activations wind
    /// down; variable state persists.
    pub fn invalidate(&mut self, now: AbsoluteMs) -> Vec<EventEntry> {
        let mut flushed = Vec::new();
        for stage in &mut self.stages {
            flushed.extend(stage.invalidate_manipulators(now, &mut self.env));
        }
        flushed
    }

    /// Route one entry through the stage chain. Environment-change and
    /// device-lifecycle events update the environment (and fan out to the
    /// stages) before routing; they still traverse the chain so downstream
    /// observers see them.
    pub fn manipulate(&mut self, entry: EventEntry) -> Vec<EventEntry> {
        let mut preamble = Vec::new();
        match &entry.event {
            Event::FrontmostApplicationChanged(application) => {
                self.env.set_frontmost_application(application.clone());
            }
            Event::InputSourceChanged(properties) => {
                self.env.set_input_source(properties.clone());
            }
            Event::SystemPreferencesPropertiesChanged(properties) => {
                self.env.set_system_preferences(properties.clone());
            }
            Event::VirtualHidDevicesStateChanged(state) => {
                self.env.set_virtual_hid_devices_state(*state);
            }
            Event::CapsLockStateChanged(state) => {
                self.env.set_caps_lock_state(*state);
            }
            Event::DeviceGrabbed(properties) => {
                debug!(target: "pipeline", device_id = %properties.device_id, "device grabbed");
                self.env.insert_device(properties.clone());
            }
            Event::DeviceUngrabbed => {
                debug!(target: "pipeline", device_id = %entry.device_id, "device ungrabbed");
                for stage in &mut self.stages {
                    preamble.extend(stage.handle_device_ungrabbed(
                        entry.device_id,
                        entry.time,
                        &mut self.env,
                    ));
                }
                self.env.remove_device(entry.device_id);
                self.consumed_downs
                    .retain(|(device_id, _)| *device_id != entry.device_id);
            }
            Event::DeviceKeysAndPointingButtonsAreReleased => {
                for stage in &mut self.stages {
                    preamble.extend(stage.handle_device_keys_and_pointing_buttons_are_released(
                        entry.device_id,
                        entry.time,
                        &mut self.env,
                    ));
                }
                self.env.release_device_modifiers(entry.device_id);
            }
            _ => {}
        }

        // Physical modifier bookkeeping: a released modifier stops counting
        // before the entry is matched, a pressed one starts counting after
        // (so a remapped modifier key does not shadow its own match).
        let modifier_flag = entry
            .event
            .momentary_switch()
            .and_then(|switch| switch.modifier_flag());
        if entry.event_type == EventType::KeyUp
            && let Some(flag) = modifier_flag
        {
            self.env.record_modifier_key_up(entry.device_id, flag);
        }

        let device_id = entry.device_id;
        let switch = entry.event.momentary_switch().cloned();
        let event = entry.event.clone();
        let event_type = entry.event_type;

        let mut output = preamble;
        output.extend(self.route_through_stages(entry, 0));

        // A buffered chord constituent flushed back out means its down did
        // reach the sink after all.
        self.note_flushed_downs(&output);

        if let Some(switch) = switch {
            match event_type {
                EventType::KeyDown => {
                    let passed_through = output.iter().any(|emitted| {
                        emitted.origin == EventOrigin::Original
                            && emitted.event_type == EventType::KeyDown
                            && emitted.event == event
                    });
                    if !passed_through {
                        self.consumed_downs.insert((device_id, switch));
                    }
                }
                EventType::KeyUp => {
                    if self.consumed_downs.remove(&(device_id, switch)) {
                        output.retain(|emitted| {
                            !(emitted.origin == EventOrigin::Original
                                && emitted.event_type == EventType::KeyUp
                                && emitted.event == event)
                        });
                    }
                }
                EventType::Single => {}
            }
        }

        if let Some(flag) = modifier_flag
            && output_contains_physical_modifier_down(&output, flag)
        {
            self.env.record_modifier_key_down(device_id, flag);
        }

        output
    }

    fn note_flushed_downs(&mut self, output: &[EventEntry]) {
        for emitted in output {
            if emitted.origin == EventOrigin::Original
                && emitted.event_type == EventType::KeyDown
                && let Some(switch) = emitted.event.momentary_switch()
            {
                self.consumed_downs
                    .remove(&(emitted.device_id, switch.clone()));
            }
        }
    }

    /// Fire every timer due at `now`, routing each stage's emissions through
    /// the later stages.
    pub fn fire_due_timers(&mut self, now: AbsoluteMs) -> Vec<EventEntry> {
        let mut output = Vec::new();
        for index in 0..self.stages.len() {
            let fired = self.stages[index].fire_due_timers(now, &mut self.env);
            for entry in fired {
                output.extend(self.route_through_stages(entry, index + 1));
            }
        }
        self.note_flushed_downs(&output);
        output
    }

    pub fn next_timer_deadline(&self) -> Option<AbsoluteMs> {
        self.stages
            .iter()
            .filter_map(ManipulatorManager::next_timer_deadline)
            .min()
    }

    pub fn needs_virtual_hid_pointing(&self) -> bool {
        self.stages
            .iter()
            .any(ManipulatorManager::needs_virtual_hid_pointing)
    }

    /// Read-only view for condition diagnostics and external observers.
    pub fn environment(&self) -> &ManipulatorEnvironment {
        &self.env
    }

    fn route_through_stages(&mut self, entry: EventEntry, first_stage: usize) -> Vec<EventEntry> {
        let mut current = vec![entry];
        for stage in self.stages.iter_mut().skip(first_stage) {
            let mut next = Vec::new();
            for entry in &current {
                next.extend(stage.manipulate(entry, &mut self.env));
            }
            current = next;
        }
        current
    }
}

/// The arriving modifier key-down only counts as held if it survived the
/// chain as itself; a remap that consumed it produced a different key.
fn output_contains_physical_modifier_down(output: &[EventEntry], flag: ModifierFlag) -> bool {
    output.iter().any(|entry| {
        entry.event_type == EventType::KeyDown
            && entry
                .event
                .momentary_switch()
                .and_then(|switch| switch.modifier_flag())
                == Some(flag)
    })
}
