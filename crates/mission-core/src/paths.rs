use crate::error::{MissionError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const MISSION_DIR: &str = ".mission";

pub const BACKLOG_FILE: &str = "backlog.md";
pub const DIAGNOSIS_FILE: &str = "diagnosis.md";
pub const MISSION_FILE: &str = "mission.md";
pub const CONFIG_FILE: &str = "config.yaml";

/// Namespace for checkpoint refs. Each ref is `<prefix><mission>-<n>`.
pub const CHECKPOINT_REF_PREFIX: &str = "refs/checkpoints/";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn mission_dir(root: &Path) -> PathBuf {
    root.join(MISSION_DIR)
}

pub fn backlog_path(root: &Path) -> PathBuf {
    mission_dir(root).join(BACKLOG_FILE)
}

pub fn diagnosis_path(root: &Path) -> PathBuf {
    mission_dir(root).join(DIAGNOSIS_FILE)
}

pub fn mission_path(root: &Path) -> PathBuf {
    mission_dir(root).join(MISSION_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    mission_dir(root).join(CONFIG_FILE)
}

/// Full ref name for a checkpoint, e.g. `refs/checkpoints/m1-3`.
pub fn checkpoint_ref(name: &str) -> String {
    format!("{CHECKPOINT_REF_PREFIX}{name}")
}

/// Ref prefix shared by every checkpoint of `mission_id`.
pub fn checkpoint_ref_prefix(mission_id: &str) -> String {
    format!("{CHECKPOINT_REF_PREFIX}{mission_id}-")
}

// ---------------------------------------------------------------------------
// Mission id validation
// ---------------------------------------------------------------------------

static MISSION_ID_RE: OnceLock<Regex> = OnceLock::new();

fn mission_id_re() -> &'static Regex {
    MISSION_ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-]*$").unwrap())
}

/// Mission ids end up inside git ref names, so they are restricted to a
/// ref-safe alphabet.
pub fn validate_mission_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 128 || !mission_id_re().is_match(id) || id.contains("..") {
        return Err(MissionError::InvalidMissionId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_mission_ids() {
        for id in ["m1", "a3f9c2", "mission-2024.10", "FIX_login"] {
            validate_mission_id(id).unwrap_or_else(|_| panic!("expected valid: {id}"));
        }
    }

    #[test]
    fn invalid_mission_ids() {
        for id in ["", "-m1", "has space", "a/b", "a..b", "refs~1"] {
            assert!(validate_mission_id(id).is_err(), "expected invalid: {id}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            backlog_path(root),
            PathBuf::from("/tmp/proj/.mission/backlog.md")
        );
        assert_eq!(
            diagnosis_path(root),
            PathBuf::from("/tmp/proj/.mission/diagnosis.md")
        );
        assert_eq!(checkpoint_ref("m1-2"), "refs/checkpoints/m1-2");
        assert_eq!(checkpoint_ref_prefix("m1"), "refs/checkpoints/m1-");
    }
}
