//! Reconfiguration semantics: invalidation winds down mid-flight
//! activations, stale timers are inert, and variable state survives.

use core_config::CoreConfiguration;
use core_events::{
    AbsoluteMs, DeviceId, Event, EventEntry, EventType, MomentarySwitchEvent, VariableValue,
};
use core_pipeline::Pipeline;
use pretty_assertions::assert_eq;
use serde_json::json;

fn pipeline_from(config: serde_json::Value) -> Pipeline {
    Pipeline::from_configuration(&CoreConfiguration::from_json(&config))
}

fn key_entry(name: &str, time: u64, event_type: EventType) -> EventEntry {
    EventEntry::input(
        DeviceId(1),
        AbsoluteMs(time),
        Event::MomentarySwitch(MomentarySwitchEvent::key_code(name)),
        event_type,
    )
}

fn emitted_keys(entries: &[EventEntry]) -> Vec<(String, EventType)> {
    entries
        .iter()
        .filter_map(|entry| {
            entry.event.momentary_switch().map(|switch| match switch {
                MomentarySwitchEvent::KeyCode(code) => {
                    (code.as_str().to_string(), entry.event_type)
                }
                other => (format!("{other:?}"), entry.event_type),
            })
        })
        .collect()
}

fn remap_config() -> serde_json::Value {
    json!({
        "profiles": [{
            "name": "Default profile",
            "selected": true,
            "simple_modifications": [
                {"from": {"key_code": "caps_lock"}, "to": [{"key_code": "escape"}]},
            ],
        }],
    })
}

#[test]
fn invalidation_mid_hold_flushes_key_up_and_swallows_the_release() {
    let mut pipeline = pipeline_from(remap_config());

    let output = pipeline.manipulate(key_entry("caps_lock", 0, EventType::KeyDown));
    assert_eq!(
        emitted_keys(&output),
        vec![("escape".to_string(), EventType::KeyDown)]
    );

    let flushed = pipeline.invalidate(AbsoluteMs(100));
    assert_eq!(
        emitted_keys(&flushed),
        vec![("escape".to_string(), EventType::KeyUp)]
    );

    // The physical release afterwards produces no output at all.
    let output = pipeline.manipulate(key_entry("caps_lock", 200, EventType::KeyUp));
    assert!(output.is_empty());
}

#[test]
fn reload_replaces_rules_without_routing_in_between() {
    let mut pipeline = pipeline_from(remap_config());
    pipeline.manipulate(key_entry("caps_lock", 0, EventType::KeyDown));

    let new_config = CoreConfiguration::from_json(&json!({
        "profiles": [{
            "name": "Default profile",
            "selected": true,
            "simple_modifications": [
                {"from": {"key_code": "caps_lock"}, "to": [{"key_code": "tab"}]},
            ],
        }],
    }));
    let flushed = pipeline.reload(&new_config, AbsoluteMs(50));
    assert_eq!(
        emitted_keys(&flushed),
        vec![("escape".to_string(), EventType::KeyUp)]
    );

    // The stale release is swallowed; a fresh press uses the new rule.
    assert!(
        pipeline
            .manipulate(key_entry("caps_lock", 60, EventType::KeyUp))
            .is_empty()
    );
    let output = pipeline.manipulate(key_entry("caps_lock", 100, EventType::KeyDown));
    assert_eq!(
        emitted_keys(&output),
        vec![("tab".to_string(), EventType::KeyDown)]
    );
}

#[test]
fn timers_scheduled_before_invalidation_never_fire() {
    let mut pipeline = pipeline_from(json!({
        "profiles": [{
            "name": "Default profile",
            "selected": true,
            "complex_modifications": {"rules": [{"manipulators": [{
                "type": "basic",
                "from": {"key_code": "spacebar"},
                "to": [{"key_code": "spacebar"}],
                "to_delayed_action": {
                    "to_if_invoked": [{"key_code": "1"}],
                    "to_if_canceled": [{"key_code": "2"}],
                },
            }]}]},
        }],
    }));

    pipeline.manipulate(key_entry("spacebar", 0, EventType::KeyDown));
    assert!(pipeline.next_timer_deadline().is_some());

    // Wind-down emits the cancellation side effect, then the timer slot is
    // gone entirely.
    let flushed = pipeline.invalidate(AbsoluteMs(100));
    assert_eq!(
        emitted_keys(&flushed),
        vec![
            ("spacebar".to_string(), EventType::KeyUp),
            ("2".to_string(), EventType::KeyDown),
            ("2".to_string(), EventType::KeyUp),
        ]
    );
    assert_eq!(pipeline.next_timer_deadline(), None);
    assert!(pipeline.fire_due_timers(AbsoluteMs(500)).is_empty());
}

#[test]
fn variable_state_survives_invalidation() {
    let mut pipeline = pipeline_from(json!({
        "profiles": [{
            "name": "Default profile",
            "selected": true,
            "complex_modifications": {"rules": [{"manipulators": [{
                "type": "basic",
                "from": {"key_code": "f1"},
                "to": [{"set_variable": {"name": "mode", "value": 7}}],
            }]}]},
        }],
    }));

    pipeline.manipulate(key_entry("f1", 0, EventType::KeyDown));
    pipeline.manipulate(key_entry("f1", 10, EventType::KeyUp));
    assert_eq!(
        pipeline.environment().variable("mode"),
        Some(&VariableValue::Integer(7))
    );

    pipeline.invalidate(AbsoluteMs(20));
    assert_eq!(
        pipeline.environment().variable("mode"),
        Some(&VariableValue::Integer(7))
    );
}

#[test]
fn wind_down_pairs_every_key_down_in_reverse_order() {
    let mut pipeline = pipeline_from(json!({
        "profiles": [{
            "name": "Default profile",
            "selected": true,
            "complex_modifications": {"rules": [{"manipulators": [{
                "type": "basic",
                "from": {"key_code": "a"},
                "to": [
                    {"key_code": "b", "modifiers": ["command"]},
                    {"key_code": "c"},
                ],
            }]}]},
        }],
    }));

    let output = pipeline.manipulate(key_entry("a", 0, EventType::KeyDown));
    assert_eq!(
        emitted_keys(&output),
        vec![
            ("left_command".to_string(), EventType::KeyDown),
            ("b".to_string(), EventType::KeyDown),
            ("c".to_string(), EventType::KeyDown),
        ]
    );

    let flushed = pipeline.invalidate(AbsoluteMs(50));
    assert_eq!(
        emitted_keys(&flushed),
        vec![
            ("c".to_string(), EventType::KeyUp),
            ("b".to_string(), EventType::KeyUp),
            ("left_command".to_string(), EventType::KeyUp),
        ]
    );
}

#[test]
fn device_ungrab_winds_down_only_that_device() {
    let mut pipeline = pipeline_from(remap_config());

    pipeline.manipulate(key_entry("caps_lock", 0, EventType::KeyDown));
    let mut other_device = key_entry("caps_lock", 5, EventType::KeyDown);
    other_device.device_id = DeviceId(2);
    other_device.original_event = other_device.event.clone();
    pipeline.manipulate(other_device);

    let output = pipeline.manipulate(EventEntry::input(
        DeviceId(1),
        AbsoluteMs(10),
        Event::DeviceUngrabbed,
        EventType::Single,
    ));
    let flushed: Vec<_> = emitted_keys(&output)
        .into_iter()
        .filter(|(name, _)| name == "escape")
        .collect();
    assert_eq!(flushed, vec![("escape".to_string(), EventType::KeyUp)]);

    // Device 2's activation still releases normally.
    let mut release = key_entry("caps_lock", 20, EventType::KeyUp);
    release.device_id = DeviceId(2);
    release.original_event = release.event.clone();
    let output = pipeline.manipulate(release);
    assert_eq!(
        emitted_keys(&output),
        vec![("escape".to_string(), EventType::KeyUp)]
    );
}
