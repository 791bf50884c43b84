//! Markdown documents with an optional YAML frontmatter block.
//!
//! ```text
//! ---
//! key: value
//! ---
//! # Body
//! ```
//!
//! The body is carried byte-for-byte; the frontmatter is a plain
//! `serde_yaml::Mapping` so keys an engine does not interpret survive a
//! rewrite. Section-level helpers over the body live in [`crate::section`].

use crate::error::{MissionError, Result};
use serde_yaml::{Mapping, Value};
use std::path::Path;
use thiserror::Error;

const DELIMITER: &str = "---";

/// Why a document's frontmatter could not be read.
#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("frontmatter opened with '---' but never closed")]
    Unterminated,

    #[error("frontmatter is not a key/value mapping")]
    NotMapping,

    #[error("invalid YAML in frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub frontmatter: Mapping,
    pub body: String,
}

impl Document {
    pub fn new(frontmatter: Mapping, body: impl Into<String>) -> Self {
        Self {
            frontmatter,
            body: body.into(),
        }
    }

    /// Split `content` into frontmatter and body.
    ///
    /// Frontmatter is recognised only when the very first line is exactly
    /// `---`; it runs to the next line that is exactly `---`.
    pub fn parse(content: &str) -> std::result::Result<Self, FrontmatterError> {
        let mut lines = content.split_inclusive('\n');
        let Some(first) = lines.next() else {
            return Ok(Self::default());
        };
        if trim_eol(first) != DELIMITER {
            return Ok(Self::new(Mapping::new(), content));
        }

        let yaml_start = first.len();
        let mut offset = yaml_start;
        for line in lines {
            if trim_eol(line) == DELIMITER {
                let frontmatter = parse_frontmatter(&content[yaml_start..offset])?;
                let body = &content[offset + line.len()..];
                return Ok(Self::new(frontmatter, body));
            }
            offset += line.len();
        }
        Err(FrontmatterError::Unterminated)
    }

    /// Serialise back to text. A document without frontmatter renders as
    /// its body alone.
    pub fn render(&self) -> Result<String> {
        if self.frontmatter.is_empty() {
            return Ok(self.body.clone());
        }
        let yaml = serde_yaml::to_string(&self.frontmatter)?;
        let mut out = String::with_capacity(yaml.len() + self.body.len() + 8);
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(&yaml);
        if !yaml.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(&self.body);
        Ok(out)
    }

    /// Load a document from disk. `Ok(None)` when the file does not exist;
    /// unreadable frontmatter surfaces as [`MissionError::Malformed`].
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let Some(content) = crate::io::read_optional(path)? else {
            return Ok(None);
        };
        Self::parse(&content)
            .map(Some)
            .map_err(|e| MissionError::malformed(path, e.to_string()))
    }

    /// Atomically write the rendered document to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = self.render()?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -- frontmatter accessors ----------------------------------------------

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.frontmatter.get(key)
    }

    /// String value of `key`; numbers and booleans are stringified.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.frontmatter.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.frontmatter
            .insert(Value::String(key.to_string()), value.into());
    }
}

fn trim_eol(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn parse_frontmatter(yaml: &str) -> std::result::Result<Mapping, FrontmatterError> {
    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(m) => Ok(m),
        Value::Null => Ok(Mapping::new()),
        _ => Err(FrontmatterError::NotMapping),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
