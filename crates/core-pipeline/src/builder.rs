//! Builders: derive manipulators from a profile.
//!
//! Error policy (shared by both builders): a malformed pair or manipulator
//! spec logs one error carrying the offending JSON and is skipped; siblings
//! keep loading. The pipeline always starts with the successfully built
//! subset.

use core_config::{DeviceConfiguration, Profile, parse_jsonc};
use core_events::UnmarshalError;
use core_manipulator::{
    BasicManipulator, Condition, FromEventDefinition, Manipulator, ManipulatorManager,
    MouseBasicManipulator, Parameters, ToEventDefinition,
};
use serde_json::{Value, json};
use tracing::error;

/// Build the simple-modifications stage: device-scoped substitutions (each
/// gated by a `device_if` on its authoring device), synthesized `mouse_basic`
/// rewrites for devices with axis flags, then the profile-scoped
/// substitutions, in that order.
pub fn build_simple_modifications_manager(profile: &Profile) -> ManipulatorManager {
    let mut manager = ManipulatorManager::new();

    for device in &profile.devices {
        for (from, to) in device.simple_modifications.pairs() {
            match make_substitution(from, to) {
                Ok(Some(mut manipulator)) => {
                    manipulator.push_back_condition(Condition::device_if(&device.identifiers));
                    manager.push_back(manipulator);
                }
                Ok(None) => {}
                Err(e) => error!(target: "pipeline", "keymorph.json error: {e}"),
            }
        }

        if device.has_mouse_flags() {
            match make_mouse_basic(device) {
                Ok(mut manipulator) => {
                    manipulator.push_back_condition(Condition::device_if(&device.identifiers));
                    manager.push_back(manipulator);
                }
                Err(e) => error!(target: "pipeline", "keymorph.json error: {e}"),
            }
        }
    }

    for (from, to) in profile.simple_modifications.pairs() {
        match make_substitution(from, to) {
            Ok(Some(manipulator)) => manager.push_back(manipulator),
            Ok(None) => {}
            Err(e) => error!(target: "pipeline", "keymorph.json error: {e}"),
        }
    }

    manager
}

/// Build the complex-modifications stage from the profile's rules, in
/// authoring order. Rule-level `parameters` overlay the profile thresholds
/// per manipulator (the manipulator spec may overlay again).
pub fn build_complex_modifications_manager(profile: &Profile) -> ManipulatorManager {
    let mut manager = ManipulatorManager::new();

    let mut parameters = Parameters::default();
    if let Err(e) = parameters.update_from_json(&profile.complex_modifications.parameters) {
        error!(target: "pipeline", "keymorph.json error: {e}");
    }

    for rule in &profile.complex_modifications.rules {
        let Some(specs) = rule.get("manipulators").and_then(Value::as_array) else {
            error!(
                target: "pipeline",
                "keymorph.json error: `manipulators` is not found in rule `{}`",
                core_events::dump_for_error(rule)
            );
            continue;
        };
        for spec in specs {
            match make_complex_manipulator(spec, &parameters) {
                Ok(manipulator) => manager.push_back(manipulator),
                Err(e) => error!(target: "pipeline", "keymorph.json error: {e}"),
            }
        }
    }

    manager
}

/// One simple substitution: `from` with `optional = [any]` injected, `to`
/// parsed as a single to-definition or an array of them. Pairs with an empty
/// side are ignored without error (half-edited GUI state).
fn make_substitution(
    from_text: &str,
    to_text: &str,
) -> Result<Option<Manipulator>, UnmarshalError> {
    if from_text.is_empty() || to_text.is_empty() {
        return Ok(None);
    }

    let mut from_json = parse_jsonc(from_text)
        .map_err(|e| UnmarshalError::new(format!("`from` is not valid json: {e}")))?;
    let Some(from_object) = from_json.as_object_mut() else {
        return Err(UnmarshalError::new(format!(
            "`from` must be an object, but is `{from_text}`"
        )));
    };
    let modifiers = from_object
        .entry("modifiers")
        .or_insert_with(|| json!({}));
    let Some(modifiers) = modifiers.as_object_mut() else {
        return Err(UnmarshalError::new(format!(
            "`from.modifiers` must be an object, but is `{from_text}`"
        )));
    };
    modifiers.insert("optional".to_string(), json!(["any"]));

    let to_json = parse_jsonc(to_text)
        .map_err(|e| UnmarshalError::new(format!("`to` is not valid json: {e}")))?;

    let from = FromEventDefinition::parse(&from_json)?;
    let to = ToEventDefinition::parse_list(&to_json)?;
    Ok(Some(Manipulator::Basic(BasicManipulator::with_parts(
        from,
        to,
        Parameters::default(),
    ))))
}

/// Synthesize the `mouse_basic` spec from a device's axis flags.
fn make_mouse_basic(device: &DeviceConfiguration) -> Result<Manipulator, UnmarshalError> {
    let mut flip = Vec::new();
    if device.mouse_flip_x {
        flip.push("x");
    }
    if device.mouse_flip_y {
        flip.push("y");
    }
    if device.mouse_flip_vertical_wheel {
        flip.push("vertical_wheel");
    }
    if device.mouse_flip_horizontal_wheel {
        flip.push("horizontal_wheel");
    }

    let mut swap = Vec::new();
    if device.mouse_swap_xy {
        swap.push("xy");
    }
    if device.mouse_swap_wheels {
        swap.push("wheels");
    }

    let mut discard = Vec::new();
    if device.mouse_discard_x {
        discard.push("x");
    }
    if device.mouse_discard_y {
        discard.push("y");
    }
    if device.mouse_discard_vertical_wheel {
        discard.push("vertical_wheel");
    }
    if device.mouse_discard_horizontal_wheel {
        discard.push("horizontal_wheel");
    }

    let spec = json!({
        "type": "mouse_basic",
        "flip": flip,
        "swap": swap,
        "discard": discard,
    });
    Ok(Manipulator::MouseBasic(MouseBasicManipulator::make_from_json(&spec)?))
}

fn make_complex_manipulator(
    spec: &Value,
    parameters: &Parameters,
) -> Result<Manipulator, UnmarshalError> {
    match spec.get("type").and_then(Value::as_str) {
        Some("basic") => Ok(Manipulator::Basic(BasicManipulator::make_from_json(
            spec, parameters,
        )?)),
        Some("mouse_basic") => Ok(Manipulator::MouseBasic(
            MouseBasicManipulator::make_from_json(spec)?,
        )),
        Some(other) => Err(UnmarshalError::new(format!(
            "unknown manipulator type `{other}` in `{}`",
            core_events::dump_for_error(spec)
        ))),
        None => Err(UnmarshalError::new(format!(
            "`type` is not found in `{}`",
            core_events::dump_for_error(spec)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    fn profile_from_json(value: Value) -> Profile {
        Profile::from_json(&value)
    }

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    #[test]
    fn device_scoped_precede_profile_scoped() {
        let profile = profile_from_json(json!({
            "name": "p",
            "devices": [{
                "identifiers": {"vendor_id": 1, "product_id": 2, "is_keyboard": true},
                "simple_modifications": [
                    {"from": {"key_code": "caps_lock"}, "to": [{"key_code": "escape"}]},
                ],
            }],
            "simple_modifications": [
                {"from": {"key_code": "caps_lock"}, "to": [{"key_code": "left_control"}]},
            ],
        }));
        let manager = build_simple_modifications_manager(&profile);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn mouse_flags_synthesize_one_manipulator() {
        let profile = profile_from_json(json!({
            "name": "p",
            "devices": [{
                "identifiers": {"vendor_id": 1, "product_id": 2, "is_pointing_device": true},
                "mouse_flip_x": true,
                "mouse_swap_xy": true,
            }],
        }));
        let manager = build_simple_modifications_manager(&profile);
        assert_eq!(manager.len(), 1);
        assert!(manager.needs_virtual_hid_pointing());
    }

    #[test]
    fn devices_without_flags_or_pairs_contribute_nothing() {
        let profile = profile_from_json(json!({
            "name": "p",
            "devices": [{"identifiers": {"vendor_id": 1, "product_id": 2}}],
        }));
        let manager = build_simple_modifications_manager(&profile);
        assert!(manager.is_empty());
    }

    #[test]
    fn malformed_pair_skipped_siblings_load() {
        let profile = profile_from_json(json!({
            "name": "p",
            "simple_modifications": [
                {"from": {"key_code": "a", "shell_command": "x"}, "to": [{"key_code": "b"}]},
                {"from": {"key_code": "c"}, "to": [{"key_code": "d"}]},
            ],
        }));
        let manager = build_simple_modifications_manager(&profile);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn malformed_pair_logs_with_pipeline_target() {
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::ERROR)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        with_default(subscriber, || {
            let profile = profile_from_json(json!({
                "name": "p",
                "simple_modifications": [
                    {"from": {"key_code": "a", "shell_command": "x"}, "to": [{"key_code": "b"}]},
                ],
            }));
            let manager = build_simple_modifications_manager(&profile);
            assert!(manager.is_empty());
        });

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("ERROR pipeline:"));
        assert!(log_output.contains("keymorph.json error"));
        assert!(log_output.contains("multiple types are specified"));
    }

    #[test]
    fn jsonc_pairs_parse() {
        let mut profile = profile_from_json(json!({"name": "p"}));
        profile.simple_modifications.push_pair(
            "{\"key_code\": \"caps_lock\" /* caps */}",
            "[{\"key_code\": \"escape\"}] // tap",
        );
        let manager = build_simple_modifications_manager(&profile);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn complex_rules_build_in_authoring_order() {
        let profile = profile_from_json(json!({
            "name": "p",
            "complex_modifications": {
                "parameters": {"basic.to_if_alone_timeout_milliseconds": 500},
                "rules": [
                    {"manipulators": [
                        {"type": "basic", "from": {"key_code": "a"}, "to": [{"key_code": "b"}]},
                        {"type": "bogus"},
                        {"type": "mouse_basic", "flip": ["y"]},
                    ]},
                    {"description": "no manipulators key"},
                ],
            },
        }));
        let manager = build_complex_modifications_manager(&profile);
        assert_eq!(manager.len(), 2, "bad manipulator and bad rule are skipped");
    }
}
