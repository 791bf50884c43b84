//! Mission identity, read from the frontmatter of `.mission/mission.md`.
//!
//! The file is written by whatever plans the mission; this module only reads
//! it. The `id` is the namespace for checkpoint refs.

use crate::document::Document;
use crate::error::{MissionError, Result};
use crate::paths;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::path::Path;

/// Status reported when the mission file does not declare one.
pub const UNKNOWN_STATUS: &str = "unknown";
/// Status of a mission that has been archived.
pub const ARCHIVED_STATUS: &str = "archived";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionInfo {
    #[serde(deserialize_with = "scalar_string")]
    pub id: String,
    #[serde(default = "unknown_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

fn unknown_status() -> String {
    UNKNOWN_STATUS.to_string()
}

/// Ids such as `123456` parse as YAML integers; accept any scalar.
fn scalar_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a scalar id, found {other:?}"
        ))),
    }
}

impl MissionInfo {
    pub fn is_archived(&self) -> bool {
        self.status == ARCHIVED_STATUS
    }
}

/// Load the active mission. `MissionNotFound` when there is no mission file.
pub fn load(root: &Path) -> Result<MissionInfo> {
    let path = paths::mission_path(root);
    let doc = Document::load(&path)?.ok_or(MissionError::MissionNotFound)?;
    let info: MissionInfo = serde_yaml::from_value(Value::Mapping(doc.frontmatter))
        .map_err(|e| MissionError::malformed(&path, e.to_string()))?;
    paths::validate_mission_id(&info.id)?;
    Ok(info)
}

/// Id of the active mission.
pub fn current_id(root: &Path) -> Result<String> {
    Ok(load(root)?.id)
}

/// Status of the active mission, `unknown` when there is none.
pub fn status(root: &Path) -> Result<String> {
    match load(root) {
        Ok(info) => Ok(info.status),
        Err(MissionError::MissionNotFound) => Ok(UNKNOWN_STATUS.to_string()),
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
