//! Relative pointing motion: cursor deltas plus wheel ticks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointingMotion {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub vertical_wheel: i32,
    #[serde(default)]
    pub horizontal_wheel: i32,
}

impl PointingMotion {
    pub fn new(x: i32, y: i32, vertical_wheel: i32, horizontal_wheel: i32) -> Self {
        Self {
            x,
            y,
            vertical_wheel,
            horizontal_wheel,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0 && self.vertical_wheel == 0 && self.horizontal_wheel == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_default_to_zero() {
        let motion: PointingMotion = serde_json::from_value(json!({"x": 5})).unwrap();
        assert_eq!(motion, PointingMotion::new(5, 0, 0, 0));
        assert!(!motion.is_zero());
        assert!(PointingMotion::default().is_zero());
    }
}
