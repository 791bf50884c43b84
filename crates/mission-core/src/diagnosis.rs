//! Debug investigation document at `.mission/diagnosis.md`.
//!
//! The frontmatter carries `id`, `status`, `confidence` and `created`; the
//! body is a fixed set of `## ` sections. `INVESTIGATION`, `HYPOTHESES` and
//! `AFFECTED FILES` are list sections and grow by appending; every other
//! section is plain text and is replaced wholesale.

use crate::document::Document;
use crate::error::{MissionError, Result};
use crate::{paths, section};
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SYMPTOM: &str = "SYMPTOM";
pub const INVESTIGATION: &str = "INVESTIGATION";
pub const HYPOTHESES: &str = "HYPOTHESES";
pub const ROOT_CAUSE: &str = "ROOT CAUSE";
pub const AFFECTED_FILES: &str = "AFFECTED FILES";
pub const RECOMMENDED_FIX: &str = "RECOMMENDED FIX";

const LIST_SECTIONS: [&str; 3] = [INVESTIGATION, HYPOTHESES, AFFECTED_FILES];

/// Sections every diagnosis must have, in report order.
const REQUIRED: [&str; 5] = [SYMPTOM, INVESTIGATION, HYPOTHESES, ROOT_CAUSE, AFFECTED_FILES];

const VALIDATED: &str = "Diagnosis validated successfully";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosisStatus {
    Investigating,
    Confirmed,
    Inconclusive,
}

impl DiagnosisStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosisStatus::Investigating => "investigating",
            DiagnosisStatus::Confirmed => "confirmed",
            DiagnosisStatus::Inconclusive => "inconclusive",
        }
    }

    /// Investigations conclude once; a concluded diagnosis can be
    /// re-classified but never reopened.
    pub fn can_transition_to(self, next: DiagnosisStatus) -> bool {
        self == next || next != DiagnosisStatus::Investigating
    }
}

impl fmt::Display for DiagnosisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiagnosisStatus {
    type Err = MissionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "investigating" => Ok(DiagnosisStatus::Investigating),
            "confirmed" => Ok(DiagnosisStatus::Confirmed),
            "inconclusive" => Ok(DiagnosisStatus::Inconclusive),
            _ => Err(MissionError::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Confidence {
    type Err = MissionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            _ => Err(MissionError::InvalidConfidence(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnosis
// ---------------------------------------------------------------------------

/// Typed view of the frontmatter. Keys not listed here stay in the
/// underlying document and survive every rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisMeta {
    pub id: String,
    pub status: DiagnosisStatus,
    pub confidence: Confidence,
    #[serde(default)]
    pub created: String,
}

#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub meta: DiagnosisMeta,
    path: PathBuf,
    doc: Document,
}

impl Diagnosis {
    /// Read and type-check the diagnosis at `path`. `Ok(None)` when the file
    /// does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        let Some(doc) = Document::load(path)? else {
            return Ok(None);
        };
        let meta: DiagnosisMeta = serde_yaml::from_value(Value::Mapping(doc.frontmatter.clone()))
            .map_err(|e| MissionError::malformed(path, e.to_string()))?;
        Ok(Some(Self {
            meta,
            path: path.to_path_buf(),
            doc,
        }))
    }

    fn open(root: &Path) -> Result<Self> {
        Self::read(&paths::diagnosis_path(root))?.ok_or(MissionError::DiagnosisNotFound)
    }

    pub fn body(&self) -> &str {
        &self.doc.body
    }

    /// First non-empty line of `## ROOT CAUSE`.
    pub fn root_cause(&self) -> Option<String> {
        section::extract_section(&self.doc.body, ROOT_CAUSE)
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
    }

    /// `- ` entries of `## AFFECTED FILES`, placeholders excluded.
    pub fn affected_files(&self) -> Vec<String> {
        section::extract_section(&self.doc.body, AFFECTED_FILES)
            .lines()
            .filter(|l| !section::is_placeholder(l))
            .filter_map(|l| l.trim().strip_prefix("- "))
            .map(|l| l.trim().to_string())
            .collect()
    }

    /// Required sections with no header in the body, in report order.
    pub fn missing_sections(&self) -> Vec<String> {
        let mut required = REQUIRED.to_vec();
        if self.meta.status == DiagnosisStatus::Confirmed {
            required.push(RECOMMENDED_FIX);
        }
        required
            .into_iter()
            .filter(|name| section::find_section(&self.doc.body, name).is_none())
            .map(str::to_string)
            .collect()
    }

    fn save(&mut self) -> Result<()> {
        self.doc.set("status", self.meta.status.as_str());
        self.doc.set("confidence", self.meta.confidence.as_str());
        self.doc.save(&self.path)
    }
}

fn template(symptom: &str) -> String {
    format!(
        "# Diagnosis\n\
         \n## {SYMPTOM}\n{symptom}\n\
         \n## {INVESTIGATION}\n- [ ] Initial investigation pending\n\
         \n## {HYPOTHESES}\n1. **[UNKNOWN]** Investigation not yet started\n\
         \n## {ROOT_CAUSE}\nTBD\n\
         \n## {AFFECTED_FILES}\n- TBD\n\
         \n## {RECOMMENDED_FIX}\nTBD\n"
    )
}

fn is_list_section(name: &str) -> bool {
    LIST_SECTIONS.contains(&name)
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MissionError::InvalidArgument(format!(
            "{what} must not be empty"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Start a new investigation, replacing any existing diagnosis.
pub fn create(root: &Path, symptom: &str) -> Result<DiagnosisMeta> {
    require(symptom, "symptom")?;
    let path = paths::diagnosis_path(root);
    if path.exists() {
        warn!(path = %path.display(), "replacing existing diagnosis");
    }

    let now = Local::now();
    let meta = DiagnosisMeta {
        id: now.format("DIAG-%Y%m%d-%H%M%S").to_string(),
        status: DiagnosisStatus::Investigating,
        confidence: Confidence::Low,
        created: now.to_rfc3339_opts(SecondsFormat::Secs, false),
    };
    let mut frontmatter = Mapping::new();
    frontmatter.insert("id".into(), meta.id.clone().into());
    frontmatter.insert("status".into(), meta.status.as_str().into());
    frontmatter.insert("confidence".into(), meta.confidence.as_str().into());
    frontmatter.insert("created".into(), meta.created.clone().into());

    Document::new(frontmatter, template(symptom.trim())).save(&path)?;
    info!(id = %meta.id, "diagnosis created");
    Ok(meta)
}

/// Replace a text section, or append one line to a list section.
/// Unknown sections are created at the end of the document.
pub fn update_section(root: &Path, section_name: &str, content: &str) -> Result<()> {
    require(section_name, "section")?;
    require(content, "content")?;
    let mut diag = Diagnosis::open(root)?;
    let name = section::normalize_name(section_name);
    let content = content.trim();

    diag.doc.body = if !is_list_section(&name) {
        section::update_section_content(&diag.doc.body, &name, content)
    } else if section::parse_list_item(content).is_some() {
        section::append_list_line(&diag.doc.body, &name, content)
    } else {
        section::update_section_list(&diag.doc.body, &name, &[content.to_string()], true)
    };
    diag.save()?;
    info!(section = %name, "diagnosis section updated");
    Ok(())
}

/// Write `items` into a section with the section's list formatting.
pub fn update_list(root: &Path, section_name: &str, items: &[String], append: bool) -> Result<()> {
    require(section_name, "section")?;
    if items.is_empty() {
        return Err(MissionError::InvalidArgument(
            "at least one item is required".to_string(),
        ));
    }
    for item in items {
        require(item, "list item")?;
    }
    let items: Vec<String> = items.iter().map(|i| i.trim().to_string()).collect();
    let mut diag = Diagnosis::open(root)?;
    let name = section::normalize_name(section_name);
    diag.doc.body = section::update_section_list(&diag.doc.body, &name, &items, append);
    diag.save()?;
    info!(section = %name, count = items.len(), append, "diagnosis list updated");
    Ok(())
}

/// Change status and/or confidence. At least one must be given.
pub fn update_frontmatter(
    root: &Path,
    status: Option<DiagnosisStatus>,
    confidence: Option<Confidence>,
) -> Result<DiagnosisMeta> {
    if status.is_none() && confidence.is_none() {
        return Err(MissionError::InvalidArgument(
            "at least one of status or confidence is required".to_string(),
        ));
    }
    let mut diag = Diagnosis::open(root)?;
    if let Some(next) = status {
        let current = diag.meta.status;
        if !current.can_transition_to(next) {
            return Err(MissionError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
                reason: "a concluded diagnosis cannot be reopened".to_string(),
            });
        }
        diag.meta.status = next;
    }
    if let Some(c) = confidence {
        diag.meta.confidence = c;
    }
    diag.save()?;
    info!(
        status = %diag.meta.status,
        confidence = %diag.meta.confidence,
        "diagnosis frontmatter updated"
    );
    Ok(diag.meta)
}

/// Completeness check, reported rather than raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeReport {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_sections: Option<Vec<String>>,
    pub message: String,
}

pub fn finalize(root: &Path) -> Result<FinalizeReport> {
    let diag = Diagnosis::open(root)?;
    let missing = diag.missing_sections();
    if missing.is_empty() {
        return Ok(FinalizeReport {
            valid: true,
            missing_sections: None,
            message: VALIDATED.to_string(),
        });
    }
    Ok(FinalizeReport {
        valid: false,
        message: format!("Missing required sections: {}", missing.join(", ")),
        missing_sections: Some(missing),
    })
}

pub fn exists(root: &Path) -> bool {
    paths::diagnosis_path(root).is_file()
}

/// The current diagnosis of `root`.
pub fn load(root: &Path) -> Result<Diagnosis> {
    Diagnosis::open(root)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
