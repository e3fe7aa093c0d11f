//! End-to-end coverage of profile- and device-scoped simple modifications
//! and the synthesized mouse_basic rewrites.

use core_config::CoreConfiguration;
use core_events::{
    AbsoluteMs, DeviceId, DeviceProperties, Event, EventEntry, EventType, MomentarySwitchEvent,
    PointingMotion,
};
use core_pipeline::Pipeline;
use pretty_assertions::assert_eq;
use serde_json::json;

fn pipeline_from(config: serde_json::Value) -> Pipeline {
    Pipeline::from_configuration(&CoreConfiguration::from_json(&config))
}

fn grab_device(pipeline: &mut Pipeline, device_id: u64, identifiers: serde_json::Value) {
    let properties: DeviceProperties =
        serde_json::from_value(json!({"device_id": device_id, "identifiers": identifiers}))
            .expect("device properties");
    pipeline.manipulate(EventEntry::input(
        DeviceId(device_id),
        AbsoluteMs(0),
        Event::DeviceGrabbed(properties),
        EventType::Single,
    ));
}

fn key_entry(device_id: u64, name: &str, time: u64, event_type: EventType) -> EventEntry {
    EventEntry::input(
        DeviceId(device_id),
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

#[test]
fn profile_remap_press_release() {
    let mut pipeline = pipeline_from(json!({
        "profiles": [{
            "name": "Default profile",
            "selected": true,
            "simple_modifications": [
                {"from": {"key_code": "caps_lock"}, "to": [{"key_code": "left_control"}]},
            ],
        }],
    }));

    let output = pipeline.manipulate(key_entry(1, "caps_lock", 0, EventType::KeyDown));
    assert_eq!(
        emitted_keys(&output),
        vec![("left_control".to_string(), EventType::KeyDown)]
    );

    let output = pipeline.manipulate(key_entry(1, "caps_lock", 80, EventType::KeyUp));
    assert_eq!(
        emitted_keys(&output),
        vec![("left_control".to_string(), EventType::KeyUp)]
    );
}

#[test]
fn remap_applies_regardless_of_held_modifiers() {
    // Simple substitutions inject optional=[any].
    let mut pipeline = pipeline_from(json!({
        "profiles": [{
            "name": "Default profile",
            "selected": true,
            "simple_modifications": [
                {"from": {"key_code": "caps_lock"}, "to": [{"key_code": "escape"}]},
            ],
        }],
    }));

    let output = pipeline.manipulate(key_entry(1, "left_shift", 0, EventType::KeyDown));
    assert_eq!(
        emitted_keys(&output),
        vec![("left_shift".to_string(), EventType::KeyDown)]
    );

    let output = pipeline.manipulate(key_entry(1, "caps_lock", 10, EventType::KeyDown));
    assert_eq!(
        emitted_keys(&output),
        vec![("escape".to_string(), EventType::KeyDown)]
    );
}

#[test]
fn device_scoped_remap_shadows_profile_remap_on_that_device() {
    let mut pipeline = pipeline_from(json!({
        "profiles": [{
            "name": "Default profile",
            "selected": true,
            "simple_modifications": [
                {"from": {"key_code": "caps_lock"}, "to": [{"key_code": "left_control"}]},
            ],
            "devices": [{
                "identifiers": {"vendor_id": 100, "product_id": 1, "is_keyboard": true},
                "simple_modifications": [
                    {"from": {"key_code": "caps_lock"}, "to": [{"key_code": "escape"}]},
                ],
            }],
        }],
    }));
    grab_device(
        &mut pipeline,
        1,
        json!({"vendor_id": 100, "product_id": 1, "is_keyboard": true}),
    );
    grab_device(
        &mut pipeline,
        2,
        json!({"vendor_id": 200, "product_id": 9, "is_keyboard": true}),
    );

    // Device 1 hits the device-scoped rule first.
    let output = pipeline.manipulate(key_entry(1, "caps_lock", 0, EventType::KeyDown));
    assert_eq!(
        emitted_keys(&output),
        vec![("escape".to_string(), EventType::KeyDown)]
    );
    let output = pipeline.manipulate(key_entry(1, "caps_lock", 50, EventType::KeyUp));
    assert_eq!(
        emitted_keys(&output),
        vec![("escape".to_string(), EventType::KeyUp)]
    );

    // Device 2 falls through to the profile-scoped rule.
    let output = pipeline.manipulate(key_entry(2, "caps_lock", 100, EventType::KeyDown));
    assert_eq!(
        emitted_keys(&output),
        vec![("left_control".to_string(), EventType::KeyDown)]
    );
    let output = pipeline.manipulate(key_entry(2, "caps_lock", 150, EventType::KeyUp));
    assert_eq!(
        emitted_keys(&output),
        vec![("left_control".to_string(), EventType::KeyUp)]
    );
}

#[test]
fn mouse_flip_x_negates_motion_on_the_flagged_device() {
    let mut pipeline = pipeline_from(json!({
        "profiles": [{
            "name": "Default profile",
            "selected": true,
            "devices": [{
                "identifiers": {"vendor_id": 300, "product_id": 7, "is_pointing_device": true},
                "mouse_flip_x": true,
            }],
        }],
    }));
    grab_device(
        &mut pipeline,
        5,
        json!({"vendor_id": 300, "product_id": 7, "is_pointing_device": true}),
    );
    grab_device(
        &mut pipeline,
        6,
        json!({"vendor_id": 301, "product_id": 8, "is_pointing_device": true}),
    );

    let output = pipeline.manipulate(EventEntry::input(
        DeviceId(5),
        AbsoluteMs(10),
        Event::PointingMotion(PointingMotion::new(5, 3, 0, 0)),
        EventType::Single,
    ));
    assert_eq!(output.len(), 1);
    assert_eq!(
        output[0].event,
        Event::PointingMotion(PointingMotion::new(-5, 3, 0, 0))
    );

    // Another pointing device is untouched.
    let output = pipeline.manipulate(EventEntry::input(
        DeviceId(6),
        AbsoluteMs(20),
        Event::PointingMotion(PointingMotion::new(5, 3, 0, 0)),
        EventType::Single,
    ));
    assert_eq!(
        output[0].event,
        Event::PointingMotion(PointingMotion::new(5, 3, 0, 0))
    );
}

#[test]
fn mouse_discard_swallows_fully_zeroed_motion() {
    let mut pipeline = pipeline_from(json!({
        "profiles": [{
            "name": "Default profile",
            "selected": true,
            "devices": [{
                "identifiers": {"vendor_id": 300, "product_id": 7, "is_pointing_device": true},
                "mouse_discard_x": true,
                "mouse_discard_y": true,
            }],
        }],
    }));
    grab_device(
        &mut pipeline,
        5,
        json!({"vendor_id": 300, "product_id": 7, "is_pointing_device": true}),
    );

    let output = pipeline.manipulate(EventEntry::input(
        DeviceId(5),
        AbsoluteMs(10),
        Event::PointingMotion(PointingMotion::new(9, -4, 0, 0)),
        EventType::Single,
    ));
    assert!(output.is_empty());

    let output = pipeline.manipulate(EventEntry::input(
        DeviceId(5),
        AbsoluteMs(20),
        Event::PointingMotion(PointingMotion::new(9, -4, 2, 0)),
        EventType::Single,
    ));
    assert_eq!(
        output[0].event,
        Event::PointingMotion(PointingMotion::new(0, 0, 2, 0))
    );
}

#[test]
fn unmatched_events_forward_unchanged() {
    let mut pipeline = pipeline_from(json!({
        "profiles": [{
            "name": "Default profile",
            "selected": true,
            "simple_modifications": [
                {"from": {"key_code": "caps_lock"}, "to": [{"key_code": "escape"}]},
            ],
        }],
    }));

    let entry = key_entry(1, "spacebar", 0, EventType::KeyDown);
    let output = pipeline.manipulate(entry.clone());
    assert_eq!(output, vec![entry]);
}
