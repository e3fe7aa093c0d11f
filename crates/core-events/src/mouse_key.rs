//! Mouse-key payload: synthetic pointer movement driven from the keyboard.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MouseKey {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub vertical_wheel: i32,
    #[serde(default)]
    pub horizontal_wheel: i32,
    #[serde(default = "MouseKey::default_speed_multiplier")]
    pub speed_multiplier: f64,
}

impl MouseKey {
    fn default_speed_multiplier() -> f64 {
        1.0
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0 && self.vertical_wheel == 0 && self.horizontal_wheel == 0
    }
}

impl Default for MouseKey {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            vertical_wheel: 0,
            horizontal_wheel: 0,
            speed_multiplier: Self::default_speed_multiplier(),
        }
    }
}

// speed_multiplier compares and hashes by bit pattern so MouseKey can sit
// inside the hashable Event value.
impl PartialEq for MouseKey {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.vertical_wheel == other.vertical_wheel
            && self.horizontal_wheel == other.horizontal_wheel
            && self.speed_multiplier.to_bits() == other.speed_multiplier.to_bits()
    }
}

impl Eq for MouseKey {}

impl Hash for MouseKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.hash(state);
        self.y.hash(state);
        self.vertical_wheel.hash(state);
        self.horizontal_wheel.hash(state);
        self.speed_multiplier.to_bits().hash(state);
    }
}
