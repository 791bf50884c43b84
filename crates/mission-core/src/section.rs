//! Section-level primitives over a markdown body.
//!
//! A section starts at a `## NAME` header and runs until the next line that
//! begins with `## ` (or the end of the body). Names match
//! case-insensitively and hyphens in a requested name stand in for spaces,
//! so `root-cause` finds `## ROOT CAUSE`.

/// Sentinel lines written into fresh documents. They are dropped as soon as
/// real list content is written to their section.
pub const PLACEHOLDERS: &[&str] = &[
    "- [ ] Initial investigation pending",
    "1. **[UNKNOWN]** Investigation not yet started",
    "- TBD",
];

const HEADER_PREFIX: &str = "## ";

/// Canonical form of a section name: trimmed, hyphens as spaces, uppercase.
pub fn normalize_name(name: &str) -> String {
    name.trim().replace('-', " ").to_uppercase()
}

pub fn is_placeholder(line: &str) -> bool {
    PLACEHOLDERS.contains(&line.trim())
}

fn header_name(line: &str) -> Option<&str> {
    line.trim().strip_prefix(HEADER_PREFIX).map(str::trim)
}

fn is_boundary(line: &str) -> bool {
    line.trim_start().starts_with(HEADER_PREFIX)
}

/// Location of one section inside a body split into lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Header text, normalised.
    pub name: String,
    /// Line index of the `## ` header.
    pub header: usize,
    /// One past the last line of the section.
    pub end: usize,
}

impl Section {
    /// Line range of the section content (excludes the header).
    pub fn content(&self) -> std::ops::Range<usize> {
        self.header + 1..self.end
    }
}

/// Every `## ` section of the body, in document order.
pub fn outline(lines: &[&str]) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if is_boundary(line) {
            if let Some(prev) = sections.last_mut() {
                prev.end = i;
            }
            sections.push(Section {
                name: header_name(line).map(normalize_name).unwrap_or_default(),
                header: i,
                end: lines.len(),
            });
        }
    }
    sections
}

fn locate(lines: &[&str], name: &str) -> Option<Section> {
    let wanted = normalize_name(name);
    let header = lines
        .iter()
        .position(|l| header_name(l).is_some_and(|h| normalize_name(h) == wanted))?;
    let end = lines[header + 1..]
        .iter()
        .position(|l| is_boundary(l))
        .map_or(lines.len(), |off| header + 1 + off);
    Some(Section {
        name: wanted,
        header,
        end,
    })
}

/// Line index of the `## NAME` header, if present.
pub fn find_section(body: &str, name: &str) -> Option<usize> {
    let lines: Vec<&str> = body.lines().collect();
    locate(&lines, name).map(|s| s.header)
}

/// Trimmed text of a section; empty when the section is absent.
pub fn extract_section(body: &str, name: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    match locate(&lines, name) {
        Some(s) => lines[s.content()].join("\n").trim().to_string(),
        None => String::new(),
    }
}

/// Strip a list marker (`- [ ] `, `- [x] `, `- `, `* `, `N. `) from a line.
pub fn parse_list_item(line: &str) -> Option<&str> {
    let t = line.trim();
    for marker in ["- [ ] ", "- [x] ", "- [X] ", "- ", "* "] {
        if let Some(rest) = t.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    let digits = t.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = t[digits..].strip_prefix(". ") {
            return Some(rest.trim());
        }
    }
    None
}

/// Items of every list line in a section.
pub fn extract_list(body: &str, name: &str) -> Vec<String> {
    let lines: Vec<&str> = body.lines().collect();
    let Some(s) = locate(&lines, name) else {
        return Vec::new();
    };
    lines[s.content()]
        .iter()
        .filter_map(|l| parse_list_item(l))
        .map(str::to_string)
        .collect()
}

/// Format `items` the way list sections are written, numbering from `first`
/// where the section is numbered.
pub fn format_items(name: &str, items: &[String], first: usize) -> Vec<String> {
    let name = normalize_name(name);
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match name.as_str() {
            "INVESTIGATION" => format!("- [ ] {item}"),
            "HYPOTHESES" => format!("{}. {item}", first + i),
            _ => format!("- {item}"),
        })
        .collect()
}

/// Replace the text of a section. An absent section is appended at the end
/// of the body after a single blank line.
pub fn update_section_content(body: &str, name: &str, content: &str) -> String {
    let content_lines: Vec<String> = content
        .trim_end_matches('\n')
        .lines()
        .map(str::to_string)
        .collect();
    let lines: Vec<&str> = body.lines().collect();
    match locate(&lines, name) {
        Some(s) => splice(&lines, &s, content_lines),
        None => append_section(body, name, &content_lines),
    }
}

/// Replace (or, with `append`, extend) the list lines of a section with
/// formatted `items`. Placeholder lines are always dropped; non-list text in
/// the section is kept ahead of the list.
pub fn update_section_list(body: &str, name: &str, items: &[String], append: bool) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let Some(s) = locate(&lines, name) else {
        return append_section(body, name, &format_items(name, items, 1));
    };

    let mut text = Vec::new();
    let mut list = Vec::new();
    for line in &lines[s.content()] {
        if line.trim().is_empty() || is_placeholder(line) {
            continue;
        }
        if parse_list_item(line).is_some() {
            list.push(line.to_string());
        } else {
            text.push(line.to_string());
        }
    }
    if !append {
        list.clear();
    }
    let first = list.len() + 1;
    list.extend(format_items(name, items, first));
    text.extend(list);
    splice(&lines, &s, text)
}

/// Append one already-formatted list line to a section, dropping blank and
/// placeholder lines from the existing content.
pub fn append_list_line(body: &str, name: &str, line: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let Some(s) = locate(&lines, name) else {
        return append_section(body, name, &[line.to_string()]);
    };
    let mut content: Vec<String> = lines[s.content()]
        .iter()
        .filter(|l| !l.trim().is_empty() && !is_placeholder(l))
        .map(|l| l.to_string())
        .collect();
    content.push(line.to_string());
    splice(&lines, &s, content)
}

/// Insert `new_lines` before the first blank line of a section (or before
/// the next header), creating the section at the end of the body when it
/// is absent.
pub fn insert_into_section(body: &str, name: &str, new_lines: &[String]) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let Some(s) = locate(&lines, name) else {
        return append_section(body, name, new_lines);
    };
    let at = s
        .content()
        .find(|&i| lines[i].trim().is_empty())
        .unwrap_or(s.end);
    let mut out: Vec<String> = lines[..at].iter().map(|l| l.to_string()).collect();
    out.extend(new_lines.iter().cloned());
    out.extend(lines[at..].iter().map(|l| l.to_string()));
    join(out)
}

/// Rebuild the body with the content of `s` replaced by `content`. A blank
/// line separates the section from whatever follows it.
fn splice(lines: &[&str], s: &Section, content: Vec<String>) -> String {
    let mut out: Vec<String> = lines[..=s.header].iter().map(|l| l.to_string()).collect();
    out.extend(content);
    if s.end < lines.len() {
        out.push(String::new());
        out.extend(lines[s.end..].iter().map(|l| l.to_string()));
    }
    join(out)
}

fn append_section(body: &str, name: &str, content: &[String]) -> String {
    let mut out = body.trim_end().to_string();
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(HEADER_PREFIX);
    out.push_str(&normalize_name(name));
    out.push('\n');
    for line in content {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn join(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
