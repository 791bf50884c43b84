//! Typed backlog persisted as `.mission/backlog.md`.
//!
//! Layout:
//!
//! ```text
//! ---
//! last_updated: 2026-10-16T09:30:00.000000+02:00
//! last_action: 'Added feature item: Ship v1'
//! ---
//! # Backlog
//!
//! ## FEATURES
//! *New features and capabilities to build*
//! - [ ] Ship v1
//! ...
//! ## COMPLETED
//! *Finished items*
//! - [x] Fix login (Completed: 2026-10-16)
//! ```
//!
//! Each `## ` header maps to an [`ItemType`]. Refactor items may carry a
//! `[PATTERN:<id>][COUNT:<n>]` marker; the count starts at 2 because a
//! pattern is only recorded on its second sighting.

use crate::document::Document;
use crate::error::{MissionError, Result};
use crate::{paths, section};
use chrono::{DateTime, Duration, Local, SecondsFormat};
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

const OPEN: &str = "- [ ] ";
const DONE: &str = "- [x] ";
const EPIC_MARKER: &str = "(from Epic:";

// ---------------------------------------------------------------------------
// ItemType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Feature,
    Bugfix,
    Decomposed,
    Refactor,
    Future,
    Completed,
}

impl ItemType {
    /// Template order of the backlog sections.
    pub const ALL: [ItemType; 6] = [
        ItemType::Feature,
        ItemType::Bugfix,
        ItemType::Decomposed,
        ItemType::Refactor,
        ItemType::Future,
        ItemType::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Feature => "feature",
            ItemType::Bugfix => "bugfix",
            ItemType::Decomposed => "decomposed",
            ItemType::Refactor => "refactor",
            ItemType::Future => "future",
            ItemType::Completed => "completed",
        }
    }

    /// Section header text (without `## `).
    pub fn header(self) -> &'static str {
        match self {
            ItemType::Feature => "FEATURES",
            ItemType::Bugfix => "BUGFIXES",
            ItemType::Decomposed => "DECOMPOSED INTENTS",
            ItemType::Refactor => "REFACTORING OPPORTUNITIES",
            ItemType::Future => "FUTURE ENHANCEMENTS",
            ItemType::Completed => "COMPLETED",
        }
    }

    fn description(self) -> &'static str {
        match self {
            ItemType::Feature => "*New features and capabilities to build*",
            ItemType::Bugfix => "*Defects to fix*",
            ItemType::Decomposed => "*Sub-intents split out of larger epics*",
            ItemType::Refactor => "*Recurring patterns and code-quality improvements*",
            ItemType::Future => "*Ideas deferred to a later mission*",
            ItemType::Completed => "*Finished items*",
        }
    }

    /// Type of a normalised section header, if it is one of ours.
    pub fn from_header(name: &str) -> Option<Self> {
        let name = section::normalize_name(name);
        Self::ALL.into_iter().find(|t| t.header() == name)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemType {
    type Err = MissionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feature" => Ok(ItemType::Feature),
            "bugfix" => Ok(ItemType::Bugfix),
            "decomposed" => Ok(ItemType::Decomposed),
            "refactor" => Ok(ItemType::Refactor),
            "future" => Ok(ItemType::Future),
            "completed" => Ok(ItemType::Completed),
            _ => Err(MissionError::InvalidItemType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// One checklist line of the backlog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogItem {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub done: bool,
    /// Text after the checkbox, markers included.
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<PatternMarker>,
}

impl BacklogItem {
    /// The line as written in the document.
    pub fn line(&self) -> String {
        let checkbox = if self.done { DONE } else { OPEN };
        format!("{checkbox}{}", self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMarker {
    pub id: String,
    pub count: u32,
}

static PATTERN_RE: OnceLock<Regex> = OnceLock::new();

fn pattern_re() -> &'static Regex {
    PATTERN_RE.get_or_init(|| Regex::new(r"\[PATTERN:([^\]]+)\]\[COUNT:(\d+)\]").unwrap())
}

fn parse_marker(text: &str) -> Option<PatternMarker> {
    let caps = pattern_re().captures(text)?;
    Some(PatternMarker {
        id: caps[1].to_string(),
        count: caps[2].parse().ok()?,
    })
}

/// The pattern id of a marker, whether or not its count fits a `u32`.
fn marker_id(text: &str) -> Option<&str> {
    pattern_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn checklist_text(line: &str) -> Option<(bool, &str)> {
    let t = line.trim();
    if let Some(rest) = t.strip_prefix(OPEN) {
        return Some((false, rest));
    }
    t.strip_prefix(DONE)
        .or_else(|| t.strip_prefix("- [X] "))
        .map(|rest| (true, rest))
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

struct Store {
    path: PathBuf,
    doc: Document,
}

impl Store {
    /// Load the backlog, writing the template on first access.
    fn open(root: &Path) -> Result<Self> {
        let path = paths::backlog_path(root);
        match Document::load(&path)? {
            Some(mut doc) => {
                absorb_nested_frontmatter(&mut doc);
                Ok(Self { path, doc })
            }
            None => {
                let mut store = Self {
                    path,
                    doc: Document::new(Mapping::new(), template()),
                };
                store.save("Initialized backlog")?;
                Ok(store)
            }
        }
    }

    fn lines(&self) -> Vec<&str> {
        self.doc.body.lines().collect()
    }

    fn items(&self) -> Vec<BacklogItem> {
        let lines = self.lines();
        let mut items = Vec::new();
        for s in section::outline(&lines) {
            let Some(item_type) = ItemType::from_header(&s.name) else {
                continue;
            };
            for line in &lines[s.content()] {
                if let Some((done, text)) = checklist_text(line) {
                    items.push(BacklogItem {
                        item_type,
                        done,
                        text: text.to_string(),
                        pattern: parse_marker(text),
                    });
                }
            }
        }
        items
    }

    fn append(&mut self, item_type: ItemType, lines: Vec<String>) {
        self.doc.body = section::insert_into_section(&self.doc.body, item_type.header(), &lines);
    }

    /// Stamp the frontmatter and write the document.
    fn save(&mut self, action: &str) -> Result<()> {
        let previous = self.doc.get_str("last_updated");
        let stamp = advance(previous.as_deref());
        self.doc.set(
            "last_updated",
            stamp.to_rfc3339_opts(SecondsFormat::Micros, false),
        );
        self.doc.set("last_action", action);
        self.doc.save(&self.path)?;
        info!(action, "backlog updated");
        Ok(())
    }
}

fn template() -> String {
    let mut body = String::from("# Backlog\n");
    for t in ItemType::ALL {
        body.push_str(&format!("\n## {}\n{}\n", t.header(), t.description()));
    }
    body
}

/// A timestamp strictly after `previous`, normally just "now".
fn advance(previous: Option<&str>) -> DateTime<Local> {
    let now = Local::now();
    match previous.and_then(|p| DateTime::parse_from_rfc3339(p).ok()) {
        Some(prev) if prev.with_timezone(&Local) >= now => {
            prev.with_timezone(&Local) + Duration::microseconds(1)
        }
        _ => now,
    }
}

/// Older writers could prepend a second frontmatter block to a body that
/// already had one. Fold any such block into the real frontmatter so the
/// next write emits exactly one.
fn absorb_nested_frontmatter(doc: &mut Document) {
    while doc.body.starts_with("---\n") || doc.body.starts_with("---\r\n") {
        let Ok(inner) = Document::parse(&doc.body) else {
            break;
        };
        if inner.body == doc.body {
            break;
        }
        for (k, v) in inner.frontmatter {
            if !doc.frontmatter.contains_key(&k) {
                doc.frontmatter.insert(k, v);
            }
        }
        doc.body = inner.body;
    }
}

/// Items are single checklist lines.
fn require_description(description: &str) -> Result<&str> {
    let d = description.trim();
    if d.is_empty() {
        return Err(MissionError::InvalidArgument(
            "description must not be empty".to_string(),
        ));
    }
    if d.contains(['\n', '\r']) {
        return Err(MissionError::InvalidArgument(
            "description must be a single line".to_string(),
        ));
    }
    Ok(d)
}

fn require_open_type(item_type: ItemType) -> Result<()> {
    if item_type == ItemType::Completed {
        return Err(MissionError::InvalidItemType(item_type.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Append `- [ ] <description>` to the section for `item_type`.
pub fn add(root: &Path, description: &str, item_type: ItemType) -> Result<()> {
    require_open_type(item_type)?;
    let description = require_description(description)?;
    let mut store = Store::open(root)?;
    store.append(item_type, vec![format!("{OPEN}{description}")]);
    store.save(&format!("Added {item_type} item: {description}"))
}

/// Like [`add`], but a refactor item with a pattern id bumps the existing
/// pattern marker instead of adding a duplicate line.
///
/// Returns the pattern count after the call, or `None` when no pattern was
/// involved (non-refactor type or empty id).
pub fn add_with_pattern(
    root: &Path,
    description: &str,
    item_type: ItemType,
    pattern_id: &str,
) -> Result<Option<u32>> {
    let pattern_id = pattern_id.trim();
    if item_type != ItemType::Refactor || pattern_id.is_empty() {
        add(root, description, item_type)?;
        return Ok(None);
    }
    if pattern_id.contains([']', '\n', '\r']) {
        return Err(MissionError::InvalidArgument(format!(
            "pattern id '{pattern_id}' must not contain ']' or newlines"
        )));
    }
    let description = require_description(description)?;
    let mut store = Store::open(root)?;

    let lines = store.lines();
    let hits: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| marker_id(l) == Some(pattern_id))
        .map(|(i, _)| i)
        .collect();

    match hits.as_slice() {
        [] => {
            store.append(
                ItemType::Refactor,
                vec![format!("{OPEN}[PATTERN:{pattern_id}][COUNT:2] {description}")],
            );
            store.save(&format!(
                "Added refactor item: {description} (pattern {pattern_id})"
            ))?;
            Ok(Some(2))
        }
        [at] => {
            let at = *at;
            let count = pattern_re()
                .captures(lines[at])
                .and_then(|caps| caps[2].parse::<u32>().ok())
                .and_then(|n| n.checked_add(1))
                .ok_or_else(|| MissionError::CounterOverflow(pattern_id.to_string()))?;
            let mut out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
            out[at] = pattern_re()
                .replace(
                    lines[at],
                    NoExpand(&format!("[PATTERN:{pattern_id}][COUNT:{count}]")),
                )
                .into_owned();
            store.doc.body = join_lines(out);
            store.save(&format!("Incremented pattern {pattern_id} to {count}"))?;
            Ok(Some(count))
        }
        _ => Err(MissionError::DuplicatePattern(pattern_id.to_string())),
    }
}

/// Add several items to one section in a single write.
pub fn add_multiple(root: &Path, descriptions: &[String], item_type: ItemType) -> Result<usize> {
    require_open_type(item_type)?;
    if descriptions.is_empty() {
        return Err(MissionError::InvalidArgument(
            "at least one description is required".to_string(),
        ));
    }
    let lines = descriptions
        .iter()
        .map(|d| require_description(d).map(|d| format!("{OPEN}{d}")))
        .collect::<Result<Vec<_>>>()?;
    let n = lines.len();
    let mut store = Store::open(root)?;
    store.append(item_type, lines);
    store.save(&format!("Added {n} {item_type} items"))?;
    Ok(n)
}

/// Move the first open item containing `item_text` to `## COMPLETED`.
/// Returns the completed line.
pub fn complete(root: &Path, item_text: &str) -> Result<String> {
    let needle = item_text.trim();
    if needle.is_empty() {
        return Err(MissionError::InvalidArgument(
            "item text must not be empty".to_string(),
        ));
    }
    let mut store = Store::open(root)?;
    let lines = store.lines();
    let found = lines.iter().enumerate().find_map(|(i, l)| match checklist_text(l) {
        Some((false, text)) if text.contains(needle) => Some((i, text.to_string())),
        _ => None,
    });
    let Some((at, text)) = found else {
        return Err(MissionError::ItemNotFound(needle.to_string()));
    };

    let date = Local::now().format("%Y-%m-%d");
    let done = format!("{DONE}{text} (Completed: {date})");
    let mut rest: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    rest.remove(at);
    store.doc.body = join_lines(rest);
    store.append(ItemType::Completed, vec![done.clone()]);
    store.save(&format!("Completed item: {text}"))?;
    Ok(done)
}

/// Every checklist item, in document order.
pub fn items(root: &Path) -> Result<Vec<BacklogItem>> {
    Ok(Store::open(root)?.items())
}

/// Checklist lines filtered by type.
///
/// Completed lines appear only when `completed` is explicitly included.
/// Other lines appear unless their type is excluded, and, when `include` is
/// non-empty, only if their type is included.
pub fn list(root: &Path, include: &[ItemType], exclude: &[ItemType]) -> Result<Vec<String>> {
    Ok(items(root)?
        .into_iter()
        .filter(|item| list_filter(item.item_type, include, exclude))
        .map(|item| item.line())
        .collect())
}

/// Whether items of type `t` pass the `include`/`exclude` filter of [`list`].
pub fn list_filter(t: ItemType, include: &[ItemType], exclude: &[ItemType]) -> bool {
    if exclude.contains(&t) {
        return false;
    }
    if t == ItemType::Completed {
        return include.contains(&t);
    }
    include.is_empty() || include.contains(&t)
}

/// Remove completed items. With no type every completed line goes;
/// otherwise only lines matching that type's marker heuristic.
pub fn cleanup(root: &Path, item_type: Option<ItemType>) -> Result<usize> {
    let mut store = Store::open(root)?;
    let lines = store.lines();
    let Some(completed) = section::outline(&lines)
        .into_iter()
        .find(|s| s.name == ItemType::Completed.header())
    else {
        return Ok(0);
    };

    let range = completed.content();
    let mut kept = Vec::with_capacity(lines.len());
    let mut removed = 0;
    for (i, line) in lines.iter().enumerate() {
        let drop = range.contains(&i)
            && checklist_text(line).is_some()
            && cleanup_matches(item_type, line);
        if drop {
            removed += 1;
        } else {
            kept.push(line.to_string());
        }
    }
    if removed == 0 {
        return Ok(0);
    }
    store.doc.body = join_lines(kept);
    let scope = item_type.map_or_else(|| "completed".to_string(), |t| format!("completed {t}"));
    store.save(&format!("Cleaned up {removed} {scope} items"))?;
    Ok(removed)
}

fn cleanup_matches(item_type: Option<ItemType>, line: &str) -> bool {
    match item_type {
        None | Some(ItemType::Completed) => true,
        Some(ItemType::Decomposed) => line.contains(EPIC_MARKER),
        Some(ItemType::Refactor) => {
            let lower = line.to_lowercase();
            lower.contains("refactor") || lower.contains("extract")
        }
        Some(_) => false,
    }
}

/// Current count of a pattern marker, 0 when the pattern is unknown.
pub fn pattern_count(root: &Path, pattern_id: &str) -> Result<u32> {
    let store = Store::open(root)?;
    let pattern_id = pattern_id.trim();
    Ok(store
        .lines()
        .iter()
        .filter_map(|l| parse_marker(l))
        .find(|m| m.id == pattern_id)
        .map_or(0, |m| m.count))
}

fn join_lines(lines: Vec<String>) -> String {
    let mut body = lines.join("\n");
    body.push('\n');
    body
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
