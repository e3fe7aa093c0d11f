//! On-disk persistence: ownership check, atomic save with tight permissions,
//! and dated automatic backups.

use crate::error::ConfigError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const BACKUP_PREFIX: &str = "keymorph_";
pub const BACKUP_KEEP_COUNT: usize = 20;

/// The file must belong to root or the expected session user.
pub(crate) fn valid_owner(file_uid: u32, expected_file_owner: u32) -> bool {
    file_uid == 0 || file_uid == expected_file_owner
}

#[cfg(unix)]
pub(crate) fn check_owner(path: &Path, expected_file_owner: u32) -> Result<(), ConfigError> {
    use std::os::unix::fs::MetadataExt;
    let metadata = fs::metadata(path)?;
    if valid_owner(metadata.uid(), expected_file_owner) {
        Ok(())
    } else {
        Err(ConfigError::FileOwner {
            path: path.to_path_buf(),
        })
    }
}

#[cfg(not(unix))]
pub(crate) fn check_owner(_path: &Path, _expected_file_owner: u32) -> Result<(), ConfigError> {
    Ok(())
}

/// Write `json` to `path` atomically: temp file in the same directory, mode
/// 0600, then rename over the target. The parent directory is created with
/// mode 0700.
pub fn sync_save_to_file(json: &Value, path: &Path) -> Result<(), ConfigError> {
    let Some(directory) = path.parent() else {
        return Err(ConfigError::Io(std::io::Error::other(
            "configuration path has no parent directory",
        )));
    };
    create_private_directory(directory)?;

    let mut temp_path = path.to_path_buf();
    temp_path.set_extension("json.tmp");

    let mut serialized = serde_json::to_string_pretty(json).map_err(|e| {
        ConfigError::Io(std::io::Error::other(e))
    })?;
    serialized.push('\n');
    fs::write(&temp_path, serialized)?;
    set_private_file_permissions(&temp_path)?;
    fs::rename(&temp_path, path)?;
    debug!(target: "config", path = %path.display(), "configuration saved");
    Ok(())
}

/// Snapshot the current file to `<backups>/keymorph_YYYYMMDD.json` (one per
/// local day), then prune old backups beyond the newest
/// [`BACKUP_KEEP_COUNT`].
pub fn make_backup(path: &Path, backups_directory: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    create_private_directory(backups_directory)?;

    let stamp = chrono::Local::now().format("%Y%m%d");
    let backup_path = backups_directory.join(format!("{BACKUP_PREFIX}{stamp}.json"));
    if !backup_path.exists() {
        fs::copy(path, &backup_path)?;
        set_private_file_permissions(&backup_path)?;
    }

    remove_old_backups(backups_directory)
}

fn remove_old_backups(backups_directory: &Path) -> Result<(), ConfigError> {
    let mut backups: Vec<PathBuf> = fs::read_dir(backups_directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_backup_file_name(path))
        .collect();
    // Names embed the date as yyyymmdd, so the lexicographic order is the
    // chronological order.
    backups.sort();

    if backups.len() > BACKUP_KEEP_COUNT {
        for stale in &backups[..backups.len() - BACKUP_KEEP_COUNT] {
            if let Err(e) = fs::remove_file(stale) {
                warn!(target: "config", path = %stale.display(), error = %e, "failed to prune backup");
            }
        }
    }
    Ok(())
}

fn is_backup_file_name(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let Some(stamp) = name
        .strip_prefix(BACKUP_PREFIX)
        .and_then(|rest| rest.strip_suffix(".json"))
    else {
        return false;
    };
    stamp.len() == 8 && stamp.bytes().all(|b| b.is_ascii_digit())
}

fn create_private_directory(directory: &Path) -> Result<(), ConfigError> {
    if directory.as_os_str().is_empty() || directory.exists() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(directory)?;
    }
    #[cfg(not(unix))]
    fs::create_dir_all(directory)?;
    Ok(())
}

fn set_private_file_permissions(path: &Path) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn owner_validation() {
        assert!(valid_owner(0, 501), "root always passes");
        assert!(valid_owner(501, 501));
        assert!(!valid_owner(502, 501));
    }

    #[test]
    fn save_is_atomic_and_private() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("keymorph.json");
        sync_save_to_file(&json!({"profiles": []}), &path).unwrap();

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"profiles": []}));
        assert!(!path.with_extension("json.tmp").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(file_mode, 0o600);
            let dir_mode = fs::metadata(path.parent().unwrap())
                .unwrap()
                .permissions()
                .mode()
                & 0o777;
            assert_eq!(dir_mode, 0o700);
        }
    }

    #[test]
    fn backup_created_once_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keymorph.json");
        fs::write(&path, "{}").unwrap();
        let backups = dir.path().join("automatic_backups");

        make_backup(&path, &backups).unwrap();
        make_backup(&path, &backups).unwrap();
        let count = fs::read_dir(&backups).unwrap().count();
        assert_eq!(count, 1);
    }

    #[test]
    fn prune_keeps_the_newest_twenty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keymorph.json");
        fs::write(&path, "{}").unwrap();
        let backups = dir.path().join("automatic_backups");
        fs::create_dir_all(&backups).unwrap();
        for day in 1..=25 {
            fs::write(
                backups.join(format!("{BACKUP_PREFIX}202501{day:02}.json")),
                "{}",
            )
            .unwrap();
        }
        // An unrelated file must survive pruning.
        fs::write(backups.join("notes.txt"), "keep me").unwrap();

        make_backup(&path, &backups).unwrap();

        let mut names: Vec<String> = fs::read_dir(&backups)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert!(names.contains(&"notes.txt".to_string()));
        let backup_count = names
            .iter()
            .filter(|name| name.starts_with(BACKUP_PREFIX))
            .count();
        assert_eq!(backup_count, BACKUP_KEEP_COUNT);
        assert!(
            !names.contains(&format!("{BACKUP_PREFIX}20250101.json")),
            "oldest backups pruned first"
        );
    }

    #[test]
    fn backup_name_filter() {
        assert!(is_backup_file_name(Path::new("keymorph_20250711.json")));
        assert!(!is_backup_file_name(Path::new("keymorph_2025.json")));
        assert!(!is_backup_file_name(Path::new("other_20250711.json")));
        assert!(!is_backup_file_name(Path::new("keymorph_2025071a.json")));
    }
}
