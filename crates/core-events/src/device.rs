//! Device identity as seen by the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime handle for a grabbed device. Assigned by the capture collaborator;
/// stable for the lifetime of the grab.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a device, matching the `identifiers` object in the
/// configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentifiers {
    #[serde(default)]
    pub vendor_id: u64,
    #[serde(default)]
    pub product_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_address: Option<String>,
    #[serde(default)]
    pub is_keyboard: bool,
    #[serde(default)]
    pub is_pointing_device: bool,
}

/// Full device description carried by `device_grabbed` events and held by the
/// environment while the device is grabbed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceProperties {
    pub device_id: DeviceId,
    #[serde(default)]
    pub identifiers: DeviceIdentifiers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<u64>,
}
