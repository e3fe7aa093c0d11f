//! Configuration layer for keymorph.
//!
//! Loads `keymorph.json` (JSONC tolerated), models the profile structure the
//! pipeline builders consume, and persists changes atomically with dated
//! backups. Loading is total: a missing file, a parse failure, or an invalid
//! file owner degrade to a default configuration with one selected profile,
//! and the failure is recorded rather than raised.

mod error;
mod jsonc;
mod profile;
mod store;

pub use error::ConfigError;
pub use jsonc::{parse_jsonc, strip_comments};
pub use profile::{
    ComplexModifications, DeviceConfiguration, Profile, SimpleModifications, VirtualHidKeyboard,
};
pub use store::{BACKUP_KEEP_COUNT, BACKUP_PREFIX, make_backup, sync_save_to_file};

use serde_json::{Map, Value, json};
use std::path::Path;
use tracing::{error, warn};

pub const CONFIG_FILE_NAME: &str = "keymorph.json";

#[derive(Debug, Default)]
pub struct CoreConfiguration {
    /// Global (profile-independent) settings, kept raw for round-trip.
    pub global: Value,
    /// Machine-specific settings, opaque to the pipeline.
    pub machine_specific: Value,
    pub profiles: Vec<Profile>,
    loaded: bool,
    parse_error_message: Option<String>,
    /// Unrecognized top-level keys, preserved verbatim.
    extra: Map<String, Value>,
}

impl CoreConfiguration {
    /// Parse from JSON text (possibly JSONC). Never fails; a parse error is
    /// recorded and defaults apply.
    pub fn from_str(text: &str) -> Self {
        match jsonc::parse_jsonc(text) {
            Ok(json) => {
                let mut configuration = Self::from_json(&json);
                configuration.loaded = true;
                configuration
            }
            Err(e) => {
                let mut configuration = Self::default();
                configuration.parse_error_message = Some(e.to_string());
                configuration.ensure_default_profile();
                configuration
            }
        }
    }

    pub fn from_json(json: &Value) -> Self {
        let mut configuration = Self::default();
        if let Some(object) = json.as_object() {
            for (key, value) in object {
                match key.as_str() {
                    "global" => configuration.global = value.clone(),
                    "machine_specific" => configuration.machine_specific = value.clone(),
                    "profiles" => {
                        if let Some(profiles) = value.as_array() {
                            configuration.profiles =
                                profiles.iter().map(Profile::from_json).collect();
                        }
                    }
                    _ => {
                        configuration.extra.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        configuration.ensure_default_profile();
        configuration
    }

    /// Load from disk, refusing files not owned by root or
    /// `expected_file_owner`. Always returns a usable configuration.
    pub fn load(path: &Path, expected_file_owner: u32) -> Self {
        if !path.exists() {
            let mut configuration = Self::default();
            configuration.ensure_default_profile();
            return configuration;
        }

        if let Err(e) = store::check_owner(path, expected_file_owner) {
            warn!(target: "config", path = %path.display(), "{e}");
            let mut configuration = Self::default();
            configuration.ensure_default_profile();
            return configuration;
        }

        match std::fs::read_to_string(path) {
            Ok(text) => {
                let configuration = Self::from_str(&text);
                if let Some(message) = configuration.parse_error_message() {
                    let e = ConfigError::Parse {
                        path: path.to_path_buf(),
                        message: message.to_string(),
                    };
                    error!(target: "config", "{e}");
                }
                configuration
            }
            Err(e) => {
                error!(target: "config", path = %path.display(), error = %e, "failed to open");
                let mut configuration = Self::default();
                configuration.ensure_default_profile();
                configuration
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn parse_error_message(&self) -> Option<&str> {
        self.parse_error_message.as_deref()
    }

    pub fn selected_profile(&self) -> &Profile {
        self.profiles
            .iter()
            .find(|profile| profile.selected)
            .unwrap_or(&self.profiles[0])
    }

    pub fn select_profile(&mut self, index: usize) {
        if index < self.profiles.len() {
            for (i, profile) in self.profiles.iter_mut().enumerate() {
                profile.selected = i == index;
            }
        }
    }

    pub fn to_json(&self) -> Value {
        let mut object = self.extra.clone();
        object.insert("global".into(), self.global.clone());
        if !self.machine_specific.is_null() {
            object.insert("machine_specific".into(), self.machine_specific.clone());
        }
        object.insert(
            "profiles".into(),
            Value::Array(self.profiles.iter().map(Profile::to_json).collect()),
        );
        Value::Object(object)
    }

    /// Save with a dated backup pass first. Be careful calling this while
    /// the user is editing the file externally; a save clobbers their edits.
    pub fn sync_save(&self, path: &Path, backups_directory: &Path) -> Result<(), ConfigError> {
        store::make_backup(path, backups_directory)?;
        store::sync_save_to_file(&self.to_json(), path)
    }

    fn ensure_default_profile(&mut self) {
        if self.profiles.is_empty() {
            self.profiles.push(Profile::from_json(&json!({
                "name": "Default profile",
                "selected": true,
            })));
        }
        if self.global.is_null() {
            self.global = json!({});
        }
    }
}
