//! The patch applier: `patch()`.
//!
//! Grounded in `code_tools.py`'s `patch_edit`: parse unified-diff hunks,
//! then for each try an exact match at the expected position, a
//! whitespace-insensitive match at the expected position, an exact search
//! anywhere, a whitespace-insensitive search anywhere, and finally a
//! similarity-ratio best match — pure line-based text matching, with no CST
//! involved at all.

use std::path::Path;

use regex::Regex;
use similar::TextDiff;

use crate::encoding;
use crate::error::{catch_tool_panic, tool_failed, EditError};

const SIMILARITY_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Context,
    Remove,
    Add,
}

#[derive(Debug, Clone)]
struct HunkLine {
    tag: Tag,
    text: String,
}

#[derive(Debug)]
struct Hunk {
    old_start: usize,
    lines: Vec<HunkLine>,
}

impl Hunk {
    fn old_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter(|l| l.tag != Tag::Add)
            .map(|l| l.text.clone())
            .collect()
    }

    fn new_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter(|l| l.tag != Tag::Remove)
            .map(|l| l.text.clone())
            .collect()
    }
}

pub fn patch(file_path: &str, patch_content: &str) -> String {
    match catch_tool_panic(|| patch_inner(file_path, patch_content)) {
        Ok(status) => status,
        Err(err) => tool_failed(err),
    }
}

fn patch_inner(file_path: &str, patch_content: &str) -> Result<String, EditError> {
    let path = Path::new(file_path);
    let decoded = encoding::read_file(path).map_err(EditError::from)?;
    let hunks = parse_hunks(patch_content)?;
    if hunks.is_empty() {
        return Err(EditError::parse("patch contains no hunks"));
    }

    let trailing_newline = decoded.content.ends_with('\n') || decoded.content.is_empty();
    let mut lines: Vec<String> = if decoded.content.is_empty() {
        Vec::new()
    } else {
        decoded.content.trim_end_matches('\n').split('\n').map(str::to_string).collect()
    };

    let mut notes: Vec<String> = Vec::new();
    let mut line_offset: isize = 0;

    for hunk in &hunks {
        let old_lines = hunk.old_lines();
        let new_lines = hunk.new_lines();

        if lines.is_empty() && hunk.old_start == 0 && old_lines.is_empty() {
            lines = new_lines;
            notes.push("created new file content from a pure-addition hunk".to_string());
            continue;
        }

        let expected = (hunk.old_start as isize - 1 + line_offset).max(0) as usize;
        let applied = apply_hunk(&mut lines, &old_lines, &new_lines, expected)?;
        notes.push(applied.note);
        line_offset += new_lines.len() as isize - old_lines.len() as isize;
    }

    let mut output = lines.join("\n");
    if trailing_newline && !output.is_empty() {
        output.push('\n');
    }
    encoding::write_file(path, &output, decoded.encoding).map_err(EditError::from)?;

    Ok(format!(
        "Applied {} hunk(s) to {}. {}",
        hunks.len(),
        file_path,
        notes.join(" ")
    ))
}

struct Applied {
    note: String,
}

fn apply_hunk(
    lines: &mut Vec<String>,
    old_lines: &[String],
    new_lines: &[String],
    expected: usize,
) -> Result<Applied, EditError> {
    let n = old_lines.len();

    // Tier 1: exact match at the expected position.
    if window_matches(lines, expected, old_lines, false) {
        splice(lines, expected, n, new_lines.to_vec());
        return Ok(Applied { note: format!("applied at line {}", expected + 1) });
    }

    // Tier 2: whitespace-insensitive match at the expected position.
    if window_matches(lines, expected, old_lines, true) {
        let reindented = reindent(lines, expected, old_lines, new_lines);
        splice(lines, expected, n, reindented);
        return Ok(Applied {
            note: format!("applied at line {} (had to ignore whitespace)", expected + 1),
        });
    }

    // Tier 3: search anywhere, exact.
    let exact_matches = find_all(lines, old_lines, false);
    match exact_matches.len() {
        0 => {}
        1 => {
            let pos = exact_matches[0];
            splice(lines, pos, n, new_lines.to_vec());
            return Ok(Applied { note: format!("applied at line {} (position shifted)", pos + 1) });
        }
        _ => {
            return Err(EditError::ambiguous_anchor(format!(
                "hunk matches multiple positions: lines {}",
                exact_matches.iter().map(|p| (p + 1).to_string()).collect::<Vec<_>>().join(", ")
            )))
        }
    }

    // Tier 4: search anywhere, whitespace-insensitive.
    let fuzzy_matches = find_all(lines, old_lines, true);
    match fuzzy_matches.len() {
        0 => {}
        1 => {
            let pos = fuzzy_matches[0];
            let reindented = reindent(lines, pos, old_lines, new_lines);
            splice(lines, pos, n, reindented);
            return Ok(Applied {
                note: format!("applied at line {} (ignored whitespace, position shifted)", pos + 1),
            });
        }
        _ => {
            return Err(EditError::ambiguous_anchor(format!(
                "hunk matches multiple positions ignoring whitespace: lines {}",
                fuzzy_matches.iter().map(|p| (p + 1).to_string()).collect::<Vec<_>>().join(", ")
            )))
        }
    }

    // Tier 5: best-effort similarity match.
    if let Some((pos, ratio)) = best_similarity_match(lines, old_lines) {
        if ratio > SIMILARITY_THRESHOLD {
            let reindented = reindent(lines, pos, old_lines, new_lines);
            splice(lines, pos, n, reindented);
            return Ok(Applied {
                note: format!(
                    "no exact match; applied best-effort at line {} (similarity {:.2})",
                    pos + 1,
                    ratio
                ),
            });
        }
    }

    Err(EditError::anchor_not_found("no matching location found for hunk"))
}

fn window_matches(lines: &[String], start: usize, old_lines: &[String], whitespace_insensitive: bool) -> bool {
    if start + old_lines.len() > lines.len() {
        return false;
    }
    (0..old_lines.len()).all(|i| {
        if whitespace_insensitive {
            lines[start + i].trim() == old_lines[i].trim()
        } else {
            lines[start + i] == old_lines[i]
        }
    })
}

fn find_all(lines: &[String], old_lines: &[String], whitespace_insensitive: bool) -> Vec<usize> {
    if old_lines.is_empty() || old_lines.len() > lines.len() {
        return Vec::new();
    }
    (0..=lines.len() - old_lines.len())
        .filter(|&start| window_matches(lines, start, old_lines, whitespace_insensitive))
        .collect()
}

/// Character-level similarity ratio across every same-size window, matching
/// Python's `difflib.SequenceMatcher.ratio()` via `similar`'s equivalent
/// ratio computation.
fn best_similarity_match(lines: &[String], old_lines: &[String]) -> Option<(usize, f64)> {
    if old_lines.is_empty() || lines.is_empty() {
        return None;
    }
    let window = old_lines.len().max(1).min(lines.len());
    let needle = old_lines.join("\n");
    let mut best: Option<(usize, f64)> = None;
    for start in 0..=lines.len() - window {
        let haystack = lines[start..start + window].join("\n");
        let ratio = TextDiff::from_chars(haystack.as_str(), needle.as_str()).ratio() as f64;
        let is_better = match best {
            Some((_, best_ratio)) => ratio > best_ratio,
            None => true,
        };
        if is_better {
            best = Some((start, ratio));
        }
    }
    best
}

fn splice(lines: &mut Vec<String>, start: usize, count: usize, replacement: Vec<String>) {
    lines.splice(start..(start + count).min(lines.len()), replacement);
}

/// Reconstruct indentation for a whitespace-insensitively matched hunk:
/// take the matched file line's indent as the new base and preserve each
/// added line's indentation relative to the hunk's own first old line.
fn reindent(file_lines: &[String], matched_at: usize, old_lines: &[String], new_lines: &[String]) -> Vec<String> {
    let file_base = leading_ws(file_lines.get(matched_at).map(String::as_str).unwrap_or(""));
    let hunk_base = old_lines.first().map(|l| leading_ws(l)).unwrap_or_default();
    new_lines
        .iter()
        .map(|line| {
            let own = leading_ws(line);
            let relative = own.strip_prefix(hunk_base.as_str()).unwrap_or("");
            format!("{file_base}{relative}{}", line.trim_start())
        })
        .collect()
}

fn leading_ws(line: &str) -> String {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').collect()
}

/// Strip the patch body's shared leading-whitespace prefix (callers often
/// paste a patch that is itself indented inside other text) and repair a
/// `@@ ...` header missing its trailing `@@`.
fn dedent_patch(patch_content: &str) -> String {
    let lines: Vec<&str> = patch_content.split('\n').collect();
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| if l.trim().is_empty() { "" } else { &l[indent.min(l.len())..] })
        .collect::<Vec<_>>()
        .join("\n")
        .trim_start_matches('\n')
        .to_string()
}

fn normalize_header(header: &str) -> String {
    let header = header.trim();
    if header.matches("@@").count() < 2 {
        format!("{header} @@")
    } else {
        header.to_string()
    }
}

fn parse_hunks(patch_content: &str) -> Result<Vec<Hunk>, EditError> {
    let header_re = Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap();
    let cleaned = dedent_patch(patch_content);
    let lines: Vec<&str> = cleaned.split('\n').collect();

    let mut hunks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim_start().starts_with("@@") {
            let header = normalize_header(lines[i].trim_start());
            let caps = header_re
                .captures(&header)
                .ok_or_else(|| EditError::parse(format!("malformed hunk header: {header:?}")))?;
            let old_start: usize = caps[1].parse().unwrap_or(0);
            let mut body = Vec::new();
            i += 1;
            while i < lines.len() && !lines[i].trim_start().starts_with("@@") {
                if !lines[i].is_empty() {
                    let (tag, text) = match lines[i].chars().next() {
                        Some(' ') => (Tag::Context, lines[i][1..].to_string()),
                        Some('+') => (Tag::Add, lines[i][1..].to_string()),
                        Some('-') => (Tag::Remove, lines[i][1..].to_string()),
                        _ => (Tag::Context, lines[i].to_string()),
                    };
                    body.push(HunkLine { tag, text });
                }
                i += 1;
            }
            hunks.push(Hunk { old_start, lines: body });
        } else {
            i += 1;
        }
    }
    Ok(hunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn applies_exact_hunk() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "f.py", "line 1\nline 2\nline 3\n");
        let diff = "@@ -1,3 +1,3 @@\n line 1\n-line 2\n+modified line 2\n line 3\n";
        let status = patch(&path.display().to_string(), diff);
        assert!(!status.starts_with("Tool Failed:"), "{status}");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line 1\nmodified line 2\nline 3\n");
    }

    #[test]
    fn applies_with_whitespace_mismatch() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "f.py", "    line 1\n        line 2\n    line 3\n");
        let diff = "@@ -1,3 +1,3 @@\n line 1\n-line 2\n+modified line 2\n line 3\n";
        let status = patch(&path.display().to_string(), diff);
        assert!(!status.starts_with("Tool Failed:"), "{status}");
        assert!(status.contains("ignore whitespace"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "    line 1\n        modified line 2\n    line 3\n"
        );
    }

    #[test]
    fn ambiguous_match_fails() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "f.py", "x = 1\nx = 1\n");
        let diff = "@@ -5,1 +5,1 @@\n-x = 1\n+x = 2\n";
        let status = patch(&path.display().to_string(), diff);
        assert!(status.starts_with("Tool Failed:"));
    }

    #[test]
    fn no_match_fails() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "f.py", "a = 1\n");
        let diff = "@@ -9,1 +9,1 @@\n-totally different content here\n+also different\n";
        let status = patch(&path.display().to_string(), diff);
        assert!(status.starts_with("Tool Failed:"));
    }

    #[test]
    fn creates_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new.py");
        let diff = "@@ -0,0 +1,2 @@\n+line a\n+line b\n";
        let status = patch(&path.display().to_string(), diff);
        assert!(!status.starts_with("Tool Failed:"), "{status}");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line a\nline b\n");
    }
}
