//! Input-source types: the selector specifier used by `select_input_source`
//! events and the observed properties delivered by the input-source monitor.

use serde::{Deserialize, Serialize};

/// Selector for an input source. Each present field is a regex pattern; the
/// selection collaborator picks the first installed source matching all of
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSourceSpecifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_mode_id: Option<String>,
}

/// Properties of the currently selected input source as reported by the
/// monitor collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSourceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_mode_id: Option<String>,
}
