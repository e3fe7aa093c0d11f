//! Timing thresholds inherited from the profile, overridable per rule and per
//! manipulator.

use core_events::{UnmarshalError, dump_for_error};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    pub simultaneous_threshold_milliseconds: u64,
    pub to_if_alone_timeout_milliseconds: u64,
    pub to_if_held_down_threshold_milliseconds: u64,
    pub to_delayed_action_delay_milliseconds: u64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            simultaneous_threshold_milliseconds: 50,
            to_if_alone_timeout_milliseconds: 1000,
            to_if_held_down_threshold_milliseconds: 500,
            to_delayed_action_delay_milliseconds: 500,
        }
    }
}

impl Parameters {
    /// Overlay values from a `parameters` object. Unknown keys are logged and
    /// skipped so profiles can carry parameters for collaborators this crate
    /// does not interpret.
    pub fn update_from_json(&mut self, json: &Value) -> Result<(), UnmarshalError> {
        let Some(object) = json.as_object() else {
            return Err(UnmarshalError::new(format!(
                "`parameters` must be an object, but is `{}`",
                dump_for_error(json)
            )));
        };
        for (key, value) in object {
            let slot = match key.as_str() {
                "basic.simultaneous_threshold_milliseconds" => {
                    &mut self.simultaneous_threshold_milliseconds
                }
                "basic.to_if_alone_timeout_milliseconds" => {
                    &mut self.to_if_alone_timeout_milliseconds
                }
                "basic.to_if_held_down_threshold_milliseconds" => {
                    &mut self.to_if_held_down_threshold_milliseconds
                }
                "basic.to_delayed_action_delay_milliseconds" => {
                    &mut self.to_delayed_action_delay_milliseconds
                }
                _ => {
                    debug!(target: "manipulator", %key, "ignoring unknown parameter");
                    continue;
                }
            };
            let Some(milliseconds) = value.as_u64() else {
                return Err(UnmarshalError::new(format!(
                    "`{key}` must be a non-negative integer, but is `{}`",
                    dump_for_error(value)
                )));
            };
            *slot = milliseconds;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_documented_values() {
        let parameters = Parameters::default();
        assert_eq!(parameters.simultaneous_threshold_milliseconds, 50);
        assert_eq!(parameters.to_if_alone_timeout_milliseconds, 1000);
        assert_eq!(parameters.to_if_held_down_threshold_milliseconds, 500);
        assert_eq!(parameters.to_delayed_action_delay_milliseconds, 500);
    }

    #[test]
    fn update_overlays_known_keys() {
        let mut parameters = Parameters::default();
        parameters
            .update_from_json(&json!({
                "basic.to_if_alone_timeout_milliseconds": 250,
                "mouse_motion_to_scroll.speed": 100,
            }))
            .unwrap();
        assert_eq!(parameters.to_if_alone_timeout_milliseconds, 250);
        assert_eq!(parameters.simultaneous_threshold_milliseconds, 50);
    }

    #[test]
    fn update_rejects_bad_values() {
        let mut parameters = Parameters::default();
        assert!(
            parameters
                .update_from_json(&json!({"basic.to_if_alone_timeout_milliseconds": -3}))
                .is_err()
        );
        assert!(parameters.update_from_json(&json!([1, 2])).is_err());
    }
}
