//! The `mouse_basic` manipulator: axis discard/swap/flip for pointing
//! devices. Stateless; every matching `pointing_motion` entry is rewritten
//! independently.

use crate::condition::Condition;
use crate::manipulators::ApplyContext;
use core_events::{Event, EventEntry, PointingMotion, UnmarshalError, dump_for_error};
use serde_json::Value;

#[derive(Debug, Default)]
pub struct MouseBasicManipulator {
    flip_x: bool,
    flip_y: bool,
    flip_vertical_wheel: bool,
    flip_horizontal_wheel: bool,
    swap_xy: bool,
    swap_wheels: bool,
    discard_x: bool,
    discard_y: bool,
    discard_vertical_wheel: bool,
    discard_horizontal_wheel: bool,
    conditions: Vec<Condition>,
}

impl MouseBasicManipulator {
    pub fn make_from_json(json: &Value) -> Result<Self, UnmarshalError> {
        let Some(object) = json.as_object() else {
            return Err(UnmarshalError::new(format!(
                "manipulator must be an object, but is `{}`",
                dump_for_error(json)
            )));
        };

        let mut manipulator = MouseBasicManipulator::default();
        for (key, value) in object {
            match key.as_str() {
                "type" => {
                    if value.as_str() != Some("mouse_basic") {
                        return Err(UnmarshalError::new(format!(
                            "`type` must be `mouse_basic`, but is `{}`",
                            dump_for_error(value)
                        )));
                    }
                }
                "flip" => {
                    for axis in string_set(key, value)? {
                        match axis.as_str() {
                            "x" => manipulator.flip_x = true,
                            "y" => manipulator.flip_y = true,
                            "vertical_wheel" => manipulator.flip_vertical_wheel = true,
                            "horizontal_wheel" => manipulator.flip_horizontal_wheel = true,
                            _ => {
                                return Err(UnmarshalError::new(format!(
                                    "unknown `flip` axis: `{axis}`"
                                )));
                            }
                        }
                    }
                }
                "swap" => {
                    for pair in string_set(key, value)? {
                        match pair.as_str() {
                            "xy" => manipulator.swap_xy = true,
                            "wheels" => manipulator.swap_wheels = true,
                            _ => {
                                return Err(UnmarshalError::new(format!(
                                    "unknown `swap` pair: `{pair}`"
                                )));
                            }
                        }
                    }
                }
                "discard" => {
                    for axis in string_set(key, value)? {
                        match axis.as_str() {
                            "x" => manipulator.discard_x = true,
                            "y" => manipulator.discard_y = true,
                            "vertical_wheel" => manipulator.discard_vertical_wheel = true,
                            "horizontal_wheel" => manipulator.discard_horizontal_wheel = true,
                            _ => {
                                return Err(UnmarshalError::new(format!(
                                    "unknown `discard` axis: `{axis}`"
                                )));
                            }
                        }
                    }
                }
                "conditions" => {
                    let Some(entries) = value.as_array() else {
                        return Err(UnmarshalError::new(format!(
                            "`conditions` must be an array, but is `{}`",
                            dump_for_error(value)
                        )));
                    };
                    for entry in entries {
                        manipulator.conditions.push(Condition::make_from_json(entry)?);
                    }
                }
                // Timing parameters have no meaning for stateless axis
                // rewrites; tolerated for spec uniformity.
                "parameters" => {}
                "description" => {}
                _ => {
                    return Err(UnmarshalError::new(format!(
                        "unknown key `{key}` in `{}`",
                        dump_for_error(json)
                    )));
                }
            }
        }
        Ok(manipulator)
    }

    pub fn push_back_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn apply(&mut self, entry: &EventEntry, consumed: &mut bool, ctx: &mut ApplyContext<'_>) {
        if *consumed {
            return;
        }
        let Some(motion) = entry.event.pointing_motion().copied() else {
            return;
        };
        if !self
            .conditions
            .iter()
            .all(|condition| condition.evaluate(ctx.env))
        {
            return;
        }

        *consumed = true;
        let transformed = self.transform(motion);
        if transformed.is_zero() {
            return;
        }
        ctx.post(entry.manipulated(
            Event::PointingMotion(transformed),
            entry.event_type,
            entry.time,
        ));
    }

    /// Axis pipeline: discard, then swap, then flip.
    fn transform(&self, motion: PointingMotion) -> PointingMotion {
        let mut motion = motion;

        if self.discard_x {
            motion.x = 0;
        }
        if self.discard_y {
            motion.y = 0;
        }
        if self.discard_vertical_wheel {
            motion.vertical_wheel = 0;
        }
        if self.discard_horizontal_wheel {
            motion.horizontal_wheel = 0;
        }

        if self.swap_xy {
            std::mem::swap(&mut motion.x, &mut motion.y);
        }
        if self.swap_wheels {
            std::mem::swap(&mut motion.vertical_wheel, &mut motion.horizontal_wheel);
        }

        if self.flip_x {
            motion.x = -motion.x;
        }
        if self.flip_y {
            motion.y = -motion.y;
        }
        if self.flip_vertical_wheel {
            motion.vertical_wheel = -motion.vertical_wheel;
        }
        if self.flip_horizontal_wheel {
            motion.horizontal_wheel = -motion.horizontal_wheel;
        }

        motion
    }
}

fn string_set(key: &str, value: &Value) -> Result<Vec<String>, UnmarshalError> {
    let Some(items) = value.as_array() else {
        return Err(UnmarshalError::new(format!(
            "`{key}` must be an array of strings, but is `{}`",
            dump_for_error(value)
        )));
    };
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                UnmarshalError::new(format!(
                    "`{key}` entry must be a string, but is `{}`",
                    dump_for_error(item)
                ))
            })
        })
        .collect()
}
