use super::*;
use crate::timer::TimerRegistry;
use core_events::{DeviceId, EventOrigin, VariableValue};
use pretty_assertions::assert_eq;
use serde_json::json;

struct Harness {
    manipulator: BasicManipulator,
    env: ManipulatorEnvironment,
    timers: TimerRegistry,
}

impl Harness {
    fn new(spec: serde_json::Value) -> Self {
        Self {
            manipulator: BasicManipulator::make_from_json(&spec, &Parameters::default())
                .expect("test spec must parse"),
            env: ManipulatorEnvironment::new(),
            timers: TimerRegistry::new(),
        }
    }

    fn apply(&mut self, entry: &EventEntry) -> (Vec<EventEntry>, bool) {
        let mut output = Vec::new();
        let mut consumed = false;
        self.env.begin_dispatch(entry.device_id, entry.origin);
        let mut ctx = ApplyContext::new(&mut self.env, &mut output, &mut self.timers, 0, 0);
        self.manipulator.apply(entry, &mut consumed, &mut ctx);
        (output, consumed)
    }

    fn fire_due(&mut self, now: u64) -> Vec<EventEntry> {
        let due = self.timers.take_due(AbsoluteMs(now));
        let mut output = Vec::new();
        for token in due {
            let mut ctx = ApplyContext::new(&mut self.env, &mut output, &mut self.timers, 0, 0);
            self.manipulator
                .fire_timer(token.kind, token.activation_id, AbsoluteMs(now), &mut ctx);
        }
        output
    }

    fn wind_down(&mut self, now: u64) -> Vec<EventEntry> {
        let mut output = Vec::new();
        let mut ctx = ApplyContext::new(&mut self.env, &mut output, &mut self.timers, 0, 0);
        self.manipulator.wind_down(AbsoluteMs(now), &mut ctx);
        output
    }
}

fn key(name: &str, time: u64, event_type: EventType) -> EventEntry {
    EventEntry::input(
        DeviceId(1),
        AbsoluteMs(time),
        Event::MomentarySwitch(MomentarySwitchEvent::key_code(name)),
        event_type,
    )
}

fn key_names(entries: &[EventEntry]) -> Vec<(String, EventType)> {
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
fn plain_remap_press_and_release() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "caps_lock"},
        "to": [{"key_code": "left_control"}],
    }));

    let (output, consumed) = harness.apply(&key("caps_lock", 0, EventType::KeyDown));
    assert!(consumed);
    assert_eq!(
        key_names(&output),
        vec![("left_control".to_string(), EventType::KeyDown)]
    );
    assert_eq!(output[0].origin, EventOrigin::Manipulated);
    assert_eq!(
        output[0].original_event,
        Event::MomentarySwitch(MomentarySwitchEvent::key_code("caps_lock"))
    );

    let (output, consumed) = harness.apply(&key("caps_lock", 120, EventType::KeyUp));
    assert!(consumed);
    assert_eq!(
        key_names(&output),
        vec![("left_control".to_string(), EventType::KeyUp)]
    );
    assert!(!harness.manipulator.active());
}

#[test]
fn non_matching_key_passes_untouched() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "caps_lock"},
        "to": [{"key_code": "escape"}],
    }));
    let (output, consumed) = harness.apply(&key("a", 0, EventType::KeyDown));
    assert!(!consumed);
    assert!(output.is_empty());
}

#[test]
fn mandatory_modifiers_gate_the_match() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "a", "modifiers": {"mandatory": ["shift"]}},
        "to": [{"key_code": "b"}],
    }));

    let (_, consumed) = harness.apply(&key("a", 0, EventType::KeyDown));
    assert!(!consumed, "no shift held");

    harness
        .env
        .record_modifier_key_down(DeviceId(1), ModifierFlag::LeftShift);
    let (output, consumed) = harness.apply(&key("a", 10, EventType::KeyDown));
    assert!(consumed);
    assert_eq!(key_names(&output), vec![("b".to_string(), EventType::KeyDown)]);
}

#[test]
fn to_modifiers_wrap_the_main_event() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "a"},
        "to": [{"key_code": "tab", "modifiers": ["command"]}],
    }));

    let (output, _) = harness.apply(&key("a", 0, EventType::KeyDown));
    assert_eq!(
        key_names(&output),
        vec![
            ("left_command".to_string(), EventType::KeyDown),
            ("tab".to_string(), EventType::KeyDown),
        ]
    );

    let (output, _) = harness.apply(&key("a", 40, EventType::KeyUp));
    assert_eq!(
        key_names(&output),
        vec![
            ("tab".to_string(), EventType::KeyUp),
            ("left_command".to_string(), EventType::KeyUp),
        ]
    );
}

#[test]
fn to_if_alone_fires_on_quick_release() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "left_shift"},
        "to": [{"key_code": "left_shift"}],
        "to_if_alone": [{"key_code": "9"}],
    }));

    harness.apply(&key("left_shift", 0, EventType::KeyDown));
    let (output, _) = harness.apply(&key("left_shift", 300, EventType::KeyUp));
    assert_eq!(
        key_names(&output),
        vec![
            ("left_shift".to_string(), EventType::KeyUp),
            ("9".to_string(), EventType::KeyDown),
            ("9".to_string(), EventType::KeyUp),
        ]
    );
}

#[test]
fn to_if_alone_expires_after_timeout() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "left_shift"},
        "to": [{"key_code": "left_shift"}],
        "to_if_alone": [{"key_code": "9"}],
    }));

    harness.apply(&key("left_shift", 0, EventType::KeyDown));
    assert!(harness.fire_due(1000).is_empty(), "expiry has no output");
    let (output, _) = harness.apply(&key("left_shift", 1500, EventType::KeyUp));
    assert_eq!(
        key_names(&output),
        vec![("left_shift".to_string(), EventType::KeyUp)]
    );
}

#[test]
fn foreign_key_down_cancels_alone() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "left_shift"},
        "to": [{"key_code": "left_shift"}],
        "to_if_alone": [{"key_code": "9"}],
    }));

    harness.apply(&key("left_shift", 0, EventType::KeyDown));
    let (output, consumed) = harness.apply(&key("a", 50, EventType::KeyDown));
    assert!(!consumed);
    assert!(output.is_empty());
    let (output, _) = harness.apply(&key("left_shift", 100, EventType::KeyUp));
    assert_eq!(
        key_names(&output),
        vec![("left_shift".to_string(), EventType::KeyUp)]
    );
}

#[test]
fn halt_suppresses_alone_and_after_key_up() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "caps_lock"},
        "to": [{"key_code": "escape", "halt": true}],
        "to_if_alone": [{"key_code": "9"}],
        "to_after_key_up": [{"key_code": "0"}],
    }));

    harness.apply(&key("caps_lock", 0, EventType::KeyDown));
    let (output, _) = harness.apply(&key("caps_lock", 100, EventType::KeyUp));
    assert_eq!(
        key_names(&output),
        vec![("escape".to_string(), EventType::KeyUp)]
    );
}

#[test]
fn hold_down_milliseconds_defers_the_tap_key_up() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "caps_lock"},
        "to": [{"key_code": "caps_lock"}],
        "to_if_alone": [{"key_code": "escape", "hold_down_milliseconds": 100}],
    }));

    harness.apply(&key("caps_lock", 0, EventType::KeyDown));
    let (output, _) = harness.apply(&key("caps_lock", 10, EventType::KeyUp));
    assert_eq!(
        key_names(&output),
        vec![
            ("caps_lock".to_string(), EventType::KeyUp),
            ("escape".to_string(), EventType::KeyDown),
        ]
    );
    assert!(harness.manipulator.active(), "deferred key-up outstanding");

    assert!(harness.fire_due(100).is_empty(), "not due yet");
    let output = harness.fire_due(110);
    assert_eq!(
        key_names(&output),
        vec![("escape".to_string(), EventType::KeyUp)]
    );
    assert!(!harness.manipulator.active());
}

#[test]
fn delayed_action_invoked_after_delay() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "spacebar"},
        "to": [{"key_code": "spacebar"}],
        "to_delayed_action": {
            "to_if_invoked": [{"key_code": "1"}],
            "to_if_canceled": [{"key_code": "2"}],
        },
    }));

    harness.apply(&key("spacebar", 0, EventType::KeyDown));
    let output = harness.fire_due(500);
    assert_eq!(
        key_names(&output),
        vec![
            ("1".to_string(), EventType::KeyDown),
            ("1".to_string(), EventType::KeyUp),
        ]
    );
    let (output, _) = harness.apply(&key("spacebar", 600, EventType::KeyUp));
    assert_eq!(
        key_names(&output),
        vec![("spacebar".to_string(), EventType::KeyUp)],
        "no cancellation after the action was invoked"
    );
}

#[test]
fn delayed_action_canceled_by_release() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "spacebar"},
        "to": [{"key_code": "spacebar"}],
        "to_delayed_action": {
            "to_if_invoked": [{"key_code": "1"}],
            "to_if_canceled": [{"key_code": "2"}],
        },
    }));

    harness.apply(&key("spacebar", 0, EventType::KeyDown));
    let (output, _) = harness.apply(&key("spacebar", 100, EventType::KeyUp));
    assert_eq!(
        key_names(&output),
        vec![
            ("spacebar".to_string(), EventType::KeyUp),
            ("2".to_string(), EventType::KeyDown),
            ("2".to_string(), EventType::KeyUp),
        ]
    );
    assert!(harness.fire_due(500).is_empty(), "timer is stale");
}

#[test]
fn to_if_held_down_fires_and_unwinds_on_release() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "return_or_enter"},
        "to": [{"key_code": "return_or_enter"}],
        "to_if_held_down": [{"key_code": "left_control"}],
    }));

    harness.apply(&key("return_or_enter", 0, EventType::KeyDown));
    let output = harness.fire_due(500);
    assert_eq!(
        key_names(&output),
        vec![("left_control".to_string(), EventType::KeyDown)]
    );

    let (output, _) = harness.apply(&key("return_or_enter", 800, EventType::KeyUp));
    assert_eq!(
        key_names(&output),
        vec![
            ("left_control".to_string(), EventType::KeyUp),
            ("return_or_enter".to_string(), EventType::KeyUp),
        ],
        "key-ups unwind in reverse emission order"
    );
}

#[test]
fn simultaneous_chord_activates_within_threshold() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"simultaneous": [{"key_code": "j"}, {"key_code": "k"}]},
        "to": [{"key_code": "escape"}],
    }));

    let (output, consumed) = harness.apply(&key("j", 0, EventType::KeyDown));
    assert!(consumed, "first constituent is buffered");
    assert!(output.is_empty());

    let (output, consumed) = harness.apply(&key("k", 30, EventType::KeyDown));
    assert!(consumed);
    assert_eq!(
        key_names(&output),
        vec![("escape".to_string(), EventType::KeyDown)]
    );

    // key_up_when defaults to any: the first release unwinds.
    let (output, consumed) = harness.apply(&key("j", 60, EventType::KeyUp));
    assert!(consumed);
    assert_eq!(
        key_names(&output),
        vec![("escape".to_string(), EventType::KeyUp)]
    );

    // The second release is swallowed, not forwarded.
    let (output, consumed) = harness.apply(&key("k", 90, EventType::KeyUp));
    assert!(consumed);
    assert!(output.is_empty());
    assert!(!harness.manipulator.active());
}

#[test]
fn simultaneous_window_expiry_flushes_buffered_downs() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"simultaneous": [{"key_code": "j"}, {"key_code": "k"}]},
        "to": [{"key_code": "escape"}],
    }));

    harness.apply(&key("j", 0, EventType::KeyDown));
    let output = harness.fire_due(50);
    assert_eq!(key_names(&output), vec![("j".to_string(), EventType::KeyDown)]);
    assert_eq!(output[0].origin, EventOrigin::Original);
}

#[test]
fn simultaneous_strict_order_rejects_inverted_arrival() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {
            "simultaneous": [{"key_code": "j"}, {"key_code": "k"}],
            "simultaneous_options": {"key_down_order": "strict"},
        },
        "to": [{"key_code": "escape"}],
    }));

    harness.apply(&key("k", 0, EventType::KeyDown));
    let (output, _) = harness.apply(&key("j", 20, EventType::KeyDown));
    assert_eq!(
        key_names(&output),
        vec![
            ("k".to_string(), EventType::KeyDown),
            ("j".to_string(), EventType::KeyDown),
        ],
        "rejected chord re-posts the buffered downs in arrival order"
    );
}

#[test]
fn set_variable_key_up_value_emitted_on_release() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "f1"},
        "to": [{"set_variable": {"name": "layer", "value": 1, "key_up_value": 0}}],
    }));

    let (output, _) = harness.apply(&key("f1", 0, EventType::KeyDown));
    assert_eq!(output.len(), 1);
    assert_eq!(
        harness.env.variable("layer"),
        Some(&VariableValue::Integer(1))
    );

    let (output, _) = harness.apply(&key("f1", 50, EventType::KeyUp));
    assert_eq!(output.len(), 1);
    assert_eq!(
        harness.env.variable("layer"),
        Some(&VariableValue::Integer(0))
    );
}

#[test]
fn wind_down_flushes_outstanding_key_ups() {
    let mut harness = Harness::new(json!({
        "type": "basic",
        "from": {"key_code": "caps_lock"},
        "to": [{"key_code": "left_control"}],
    }));

    harness.apply(&key("caps_lock", 0, EventType::KeyDown));
    let output = harness.wind_down(10);
    assert_eq!(
        key_names(&output),
        vec![("left_control".to_string(), EventType::KeyUp)]
    );

    // The physical release now matches nothing and passes through.
    let (output, consumed) = harness.apply(&key("caps_lock", 50, EventType::KeyUp));
    assert!(!consumed);
    assert!(output.is_empty());
}

#[test]
fn contradictory_from_definition_is_rejected() {
    let err = BasicManipulator::make_from_json(
        &json!({
            "type": "basic",
            "from": {"key_code": "a", "shell_command": "x"},
            "to": [{"key_code": "b"}],
        }),
        &Parameters::default(),
    )
    .unwrap_err();
    assert!(err.message().contains("multiple types are specified"));
    assert!(err.message().contains("key_code"));
    assert!(err.message().contains("shell_command"));
}

#[test]
fn unknown_manipulator_key_is_rejected() {
    let err = BasicManipulator::make_from_json(
        &json!({
            "type": "basic",
            "from": {"key_code": "a"},
            "to_sometimes": [{"key_code": "b"}],
        }),
        &Parameters::default(),
    )
    .unwrap_err();
    assert!(err.message().contains("unknown key `to_sometimes`"));
}

#[test]
fn needs_virtual_hid_pointing_scans_every_list() {
    let keyboard_only = BasicManipulator::make_from_json(
        &json!({"type": "basic", "from": {"key_code": "a"}, "to": [{"key_code": "b"}]}),
        &Parameters::default(),
    )
    .unwrap();
    assert!(!keyboard_only.needs_virtual_hid_pointing());

    let pointing = BasicManipulator::make_from_json(
        &json!({
            "type": "basic",
            "from": {"key_code": "a"},
            "to_if_alone": [{"pointing_button": "button1"}],
        }),
        &Parameters::default(),
    )
    .unwrap();
    assert!(pointing.needs_virtual_hid_pointing());
}
