//! Ini-style text segment patching
//!
//! The one mutation the engine models on file contents: editing a
//! `key=value` line inside a `[section]` of a text file. The edit is a pure
//! function of the input text and the patch parameters, so simulated hashes
//! of patched files are reproducible.

use std::sync::OnceLock;

use regex::Regex;

use crate::doc::PatchMode;

fn section_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[\s*(?<name>[^\]]*?)\s*\]\s*$").expect("valid regex"))
}

/// Apply one section+key edit to ini-style text.
///
/// Sections and keys match case-insensitively, which is how the game
/// engines these files configure treat them. Line endings and unrelated
/// lines pass through untouched. A missing section is created at the end of
/// the file; `Replace` rewrites the first matching key line (or inserts one
/// at the section end), `Append` always inserts at the section end.
pub fn patch_ini(text: &str, section: &str, key: &str, value: &str, mode: PatchMode) -> String {
    let mut lines: Vec<String> = text.lines().map(String::from).collect();
    let had_trailing_newline = text.ends_with('\n') || text.is_empty();

    let (section_start, section_end) = match find_section(&lines, section) {
        Some(range) => range,
        None => {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("[{section}]"));
            let start = lines.len();
            (start, start)
        }
    };

    match mode {
        PatchMode::Replace => {
            let existing = lines[section_start..section_end]
                .iter()
                .position(|line| key_of(line).is_some_and(|k| k.eq_ignore_ascii_case(key)));
            match existing {
                Some(offset) => lines[section_start + offset] = format!("{key}={value}"),
                None => lines.insert(section_end, format!("{key}={value}")),
            }
        }
        PatchMode::Append => {
            lines.insert(section_end, format!("{key}={value}"));
        }
    }

    let mut out = lines.join("\n");
    if had_trailing_newline {
        out.push('\n');
    }
    out
}

/// The half-open line range of a section's body (exclusive of its header).
fn find_section(lines: &[String], section: &str) -> Option<(usize, usize)> {
    let mut start = None;
    for (idx, line) in lines.iter().enumerate() {
        if let Some(caps) = section_re().captures(line) {
            match start {
                None => {
                    if caps["name"].eq_ignore_ascii_case(section) {
                        start = Some(idx + 1);
                    }
                }
                Some(s) => return Some((s, idx)),
            }
        }
    }
    start.map(|s| (s, lines.len()))
}

fn key_of(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with(';') || trimmed.starts_with('#') {
        return None;
    }
    trimmed.split_once('=').map(|(k, _)| k.trim_end())
}
