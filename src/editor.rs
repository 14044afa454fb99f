//! The structural editor: `edit()`.
//!
//! Grounded in `python_edit.py`'s `edit_code`: parse the target file and the
//! new code fragment, resolve `target_scope` to a node (or its parent
//! scope, for insertion), then replace / insert-after-anchor / delete, with
//! import hoisting and duplicate-overwrite applied the same way regardless
//! of which of the three the call turns out to be.

use std::path::Path;

use libcst_native::{Module, Statement};

use crate::cst::tree::{self, codegen_module, parse_module};
use crate::encoding::{self, Encoding};
use crate::error::{catch_tool_panic, tool_failed, EditError};
use crate::scope::{Anchor, Target};

const DELETE_THRESHOLD: usize = 100;

pub fn edit(target_scope: &str, code: &str, coscope_with: Option<&str>, delete_a_lot: bool) -> String {
    match catch_tool_panic(|| edit_inner(target_scope, code, coscope_with, delete_a_lot)) {
        Ok(status) => status,
        Err(err) => tool_failed(err),
    }
}

fn edit_inner(
    target_scope: &str,
    code: &str,
    coscope_with: Option<&str>,
    delete_a_lot: bool,
) -> Result<String, EditError> {
    let target = Target::parse(target_scope)?;
    let path = Path::new(&target.file);

    if !target.is_python_file() {
        return handle_non_python_target(&target, code, path);
    }

    let decoded = encoding::read_file(path).map_err(EditError::from)?;
    let dedented = dedent(code);

    if dedented.trim().is_empty() {
        if coscope_with.is_some() {
            return Err(EditError::combination(
                "coscope_with cannot be combined with empty code (which means delete)",
            ));
        }
        return delete(path, &target, &decoded, delete_a_lot);
    }

    match coscope_with {
        Some(anchor_raw) => insert(path, &target, &decoded, &dedented, anchor_raw, delete_a_lot),
        None => replace(path, &target, &decoded, &dedented, delete_a_lot),
    }
}

fn handle_non_python_target(target: &Target, code: &str, path: &Path) -> Result<String, EditError> {
    if !target.path.is_empty() {
        return Err(EditError::path("scoped edits are only supported for .py files"));
    }
    if path.exists() {
        return Err(EditError::path(format!(
            "{} is not a .py file and already exists; this editor cannot modify it",
            target.file
        )));
    }
    encoding::write_file(path, code, Encoding::Utf8 { bom: false }).map_err(EditError::from)?;
    Ok(format!(
        "Wrote {} verbatim. This is not a .py file, so this editor cannot make further structural edits to it.",
        target.file
    ))
}

/// Strip the common leading-whitespace prefix from every non-blank line,
/// mirroring `textwrap.dedent` on the Python side.
fn dedent(code: &str) -> String {
    let lines: Vec<&str> = code.split('\n').collect();
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
}

fn parse_new_code<'a>(dedented: &'a str) -> Result<Module<'a>, EditError> {
    match parse_module(dedented) {
        Ok(m) => Ok(m),
        Err(e) => {
            if dedented.trim_start().starts_with('#') {
                // `parse_module`'s Module borrows from its source string, so the
                // synthesized "pass  # comment" fragment needs a `&'a` home; one
                // leaked allocation per comment-only edit call is the price.
                let comment = dedented.trim();
                let synthesized: &'a str = Box::leak(format!("pass  {comment}\n").into_boxed_str());
                parse_module(synthesized).map_err(|_| EditError::parse(e.to_string()))
            } else {
                Err(EditError::parse(e.to_string()))
            }
        }
    }
}

fn lines_removed_threshold_check(lines_removed: usize, delete_a_lot: bool) -> Result<(), EditError> {
    if lines_removed > DELETE_THRESHOLD && !delete_a_lot {
        return Err(EditError::safety(format!(
            "this edit would remove {lines_removed} lines, exceeding the {DELETE_THRESHOLD}-line safety threshold; pass delete_a_lot=true to proceed"
        )));
    }
    Ok(())
}

fn delete(
    path: &Path,
    target: &Target,
    decoded: &encoding::DecodedFile,
    delete_a_lot: bool,
) -> Result<String, EditError> {
    if target.path.is_empty() {
        let lines_to_delete = decoded.content.lines().count();
        lines_removed_threshold_check(lines_to_delete, delete_a_lot)?;
        encoding::write_file(path, "", decoded.encoding).map_err(EditError::from)?;
        return Ok(format!("Deleted entire contents of {}.", target.file));
    }

    let mut module =
        parse_module(&decoded.content).map_err(|e| EditError::parse(e.to_string()))?;
    let default_newline = module.default_newline;
    let default_indent = module.default_indent;

    let lines_to_delete = {
        let (parent, idx) = tree::find_container(&mut module.body, &target.path).ok_or_else(|| {
            EditError::scope_not_found(format!("scope '{}' not found", target.path.join("::")))
        })?;
        tree::codegen_statement(&parent[idx], default_newline, default_indent)
            .lines()
            .count()
    };
    lines_removed_threshold_check(lines_to_delete, delete_a_lot)?;

    let (parent, idx) = tree::find_container(&mut module.body, &target.path)
        .expect("re-resolved after threshold check, path is unchanged");
    parent.remove(idx);

    let output = codegen_module(&module);
    encoding::write_file(path, &output, decoded.encoding).map_err(EditError::from)?;
    Ok(format!("Deleted scope '{}'.", target.path.join("::")))
}

fn replace(
    path: &Path,
    target: &Target,
    decoded: &encoding::DecodedFile,
    dedented: &str,
    delete_a_lot: bool,
) -> Result<String, EditError> {
    let new_module = parse_new_code(dedented)?;

    if target.path.is_empty() {
        let old_lines = decoded.content.lines().count();
        let new_lines = dedented.lines().count();
        lines_removed_threshold_check(old_lines.saturating_sub(new_lines), delete_a_lot)?;
        let output = codegen_module(&new_module);
        encoding::write_file(path, &output, decoded.encoding).map_err(EditError::from)?;
        return Ok(format!("Replaced entire contents of {}.", target.file));
    }

    let mut module =
        parse_module(&decoded.content).map_err(|e| EditError::parse(e.to_string()))?;
    let default_newline = module.default_newline;
    let default_indent = module.default_indent;
    let last_name = target.path.last().expect("non-empty path").clone();

    let new_body = new_module.body;
    let (imports, mut rest): (Vec<Statement>, Vec<Statement>) =
        new_body.into_iter().partition(tree::is_import_statement);
    let dup_names = tree::top_level_def_names(&rest);
    let target_pos = rest.iter().position(|s| tree::def_name(s) == Some(last_name.as_str()));
    let replacement = target_pos.map(|i| rest.remove(i));
    let mut extras = rest;

    let old_lines = {
        let (parent, idx) = tree::find_container(&mut module.body, &target.path).ok_or_else(|| {
            EditError::scope_not_found(format!("scope '{}' not found", target.path.join("::")))
        })?;
        tree::codegen_statement(&parent[idx], default_newline, default_indent)
            .lines()
            .count()
    };
    let new_lines = replacement
        .as_ref()
        .map(|s| tree::codegen_statement(s, default_newline, default_indent).lines().count())
        .unwrap_or(0)
        + extras
            .iter()
            .map(|s| tree::codegen_statement(s, default_newline, default_indent).lines().count())
            .sum::<usize>();
    lines_removed_threshold_check(old_lines.saturating_sub(new_lines), delete_a_lot)?;

    let mut overwritten = 0usize;
    {
        let (parent, idx) = tree::find_container(&mut module.body, &target.path)
            .expect("re-resolved after threshold check, path is unchanged");

        // Place (or drop) the node at `idx`, keeping its leading comments/blank
        // lines on whatever lands there (spec §4.2.5).
        let original_leading = tree::clone_leading_lines(&parent[idx]);
        let kept_slot = replacement.is_some();
        if let Some(mut new_stmt) = replacement {
            if let Some(lines) = original_leading {
                tree::apply_leading_lines(&mut new_stmt, lines);
            }
            parent[idx] = new_stmt;
        } else {
            parent.remove(idx);
            // No same-named statement in the new code: the leading
            // comments/blank lines still have to land somewhere, so give them
            // to whatever extracted statement ends up taking the slot.
            if let Some(lines) = original_leading {
                if let Some(first) = extras.first_mut() {
                    tree::apply_leading_lines(first, lines);
                }
            }
        }
        // `idx` now marks the replacement node (kept_slot) or the gap where it
        // used to be (!kept_slot); siblings are spliced in right after it.
        let marker = idx;
        let protect = kept_slot.then_some(marker);

        // Remove any *other* existing sibling whose name collides with one
        // introduced by the new code (spec §4.4), without disturbing `marker`.
        let to_remove: Vec<usize> = parent
            .iter()
            .enumerate()
            .filter(|(i, s)| {
                protect != Some(*i)
                    && tree::def_name(s).is_some_and(|n| dup_names.iter().any(|d| d == n))
            })
            .map(|(i, _)| i)
            .collect();
        overwritten = to_remove.len();
        for &i in to_remove.iter().rev() {
            parent.remove(i);
        }
        let base = marker - to_remove.iter().filter(|&&r| r < marker).count() + usize::from(kept_slot);
        let extras_len = extras.len();

        for (offset, stmt) in extras.into_iter().enumerate() {
            parent.insert(base + offset, stmt);
        }

        // Keep the blank line that used to separate a top-level definition
        // from whatever followed it, if the replacement block still ends
        // right before another class/function (spec §4.2.6).
        if target.path.len() == 1 {
            if let Some(following) = parent.get_mut(base + extras_len) {
                if tree::is_class_or_function(following) {
                    tree::ensure_blank_line(following);
                }
            }
        }
    }

    let hoisted = hoist_imports(&mut module, imports, false);

    let output = codegen_module(&module);
    encoding::write_file(path, &output, decoded.encoding).map_err(EditError::from)?;

    let mut status = format!("Replaced scope '{}'.", target.path.join("::"));
    if overwritten > 0 {
        status.push_str(&format!(" Overwrote {overwritten} existing definition(s)."));
    }
    if hoisted > 0 {
        status.push_str(&format!(" Hoisted {hoisted} import statement(s) to module level."));
    }
    Ok(status)
}

fn insert(
    path: &Path,
    target: &Target,
    decoded: &encoding::DecodedFile,
    dedented: &str,
    anchor_raw: &str,
    delete_a_lot: bool,
) -> Result<String, EditError> {
    let anchor = Anchor::parse(anchor_raw)?;
    if matches!(anchor, Anchor::FileStart | Anchor::FileEnd) && !target.path.is_empty() {
        return Err(EditError::combination(
            "__FILE_START__ and __FILE_END__ only apply to whole-file inserts, not a scoped target_scope",
        ));
    }

    let new_module = parse_new_code(dedented)?;
    let mut module =
        parse_module(&decoded.content).map_err(|e| EditError::parse(e.to_string()))?;
    let default_newline = module.default_newline;
    let default_indent = module.default_indent;

    let new_body = new_module.body;
    let (imports, siblings): (Vec<Statement>, Vec<Statement>) =
        new_body.into_iter().partition(tree::is_import_statement);
    let dup_names = tree::top_level_def_names(&siblings);

    let mut overwritten = 0usize;
    let mut lines_removed = 0usize;
    {
        let body = tree::resolve_scope_body_mut(&mut module, &target.path).ok_or_else(|| {
            EditError::scope_not_found(format!("scope '{}' not found", target.path.join("::")))
        })?;

        let mut i = 0;
        while i < body.len() {
            if tree::def_name(&body[i]).is_some_and(|n| dup_names.iter().any(|d| d == n)) {
                lines_removed += tree::codegen_statement(&body[i], default_newline, default_indent)
                    .lines()
                    .count();
                body.remove(i);
                overwritten += 1;
            } else {
                i += 1;
            }
        }
    }
    lines_removed_threshold_check(lines_removed, delete_a_lot)?;

    {
        let body = tree::resolve_scope_body_mut(&mut module, &target.path)
            .expect("re-resolved, path is unchanged");
        let insert_at =
            resolve_anchor_position(body, &target.path, &anchor, default_newline, default_indent)?;
        for (offset, stmt) in siblings.into_iter().enumerate() {
            body.insert(insert_at + offset, stmt);
        }
    }

    let hoisted = hoist_imports(&mut module, imports, matches!(anchor, Anchor::FileStart));

    let output = codegen_module(&module);
    encoding::write_file(path, &output, decoded.encoding).map_err(EditError::from)?;

    let mut status = format!(
        "Inserted after {} in '{}'.",
        describe_anchor(&anchor),
        if target.path.is_empty() { target.file.clone() } else { target.path.join("::") }
    );
    if overwritten > 0 {
        status.push_str(&format!(" Overwrote {overwritten} existing definition(s)."));
    }
    if hoisted > 0 {
        status.push_str(&format!(" Hoisted {hoisted} import statement(s) to module level."));
    }
    Ok(status)
}

fn describe_anchor(anchor: &Anchor) -> String {
    match anchor {
        Anchor::FileStart => "__FILE_START__".to_string(),
        Anchor::FileEnd => "__FILE_END__".to_string(),
        Anchor::ScopeName(segments) => segments.join("::"),
        Anchor::ExpressionPattern(p) => format!("expression matching {p:?}"),
    }
}

/// The index within `body` at which new siblings should be inserted (i.e.
/// the position that currently holds whatever should come *after* the
/// inserted block, or `body.len()` to append).
fn resolve_anchor_position(
    body: &[Statement],
    current_path: &[String],
    anchor: &Anchor,
    default_newline: &str,
    default_indent: &str,
) -> Result<usize, EditError> {
    match anchor {
        Anchor::FileEnd => Ok(body.len()),
        Anchor::FileStart => Ok(tree::position_after_docstring_and_future(body)),
        Anchor::ScopeName(segments) => {
            let name = segments.last().expect("non-empty anchor path");
            let prefix = &segments[..segments.len() - 1];
            if !prefix.is_empty() {
                let matches_prefix = current_path.len() >= prefix.len()
                    && &current_path[current_path.len() - prefix.len()..] == prefix;
                if !matches_prefix {
                    return Err(EditError::anchor_not_found(format!(
                        "coscope_with '{}' does not match the current scope path '{}'",
                        segments.join("::"),
                        current_path.join("::")
                    )));
                }
            }
            body.iter()
                .position(|s| {
                    if name == crate::scope::FIRST_SENTINEL {
                        tree::is_class_or_function(s)
                    } else {
                        tree::def_name(s) == Some(name.as_str())
                    }
                })
                .map(|i| i + 1)
                .ok_or_else(|| EditError::anchor_not_found(format!("no sibling named '{name}' to insert after")))
        }
        Anchor::ExpressionPattern(pattern) => {
            let normalized_pattern = normalize_pattern(pattern);
            body.iter()
                .position(|s| {
                    let text = tree::codegen_statement(s, default_newline, default_indent);
                    let normalized = normalize_pattern(text.trim_end());
                    normalized == normalized_pattern
                        || (!pattern.contains('\n') && normalized.starts_with(&normalized_pattern))
                })
                .map(|i| i + 1)
                .ok_or_else(|| {
                    EditError::anchor_not_found(format!("no statement matching pattern {pattern:?}"))
                })
        }
    }
}

/// Dedent `text` and drop a shared prefix/trailing whitespace so that
/// patterns written at a different absolute indentation than the source
/// still compare equal, matching §4.2's "insensitive to absolute indent".
fn normalize_pattern(text: &str) -> String {
    dedent(text.trim_matches('\n')).trim().to_string()
}

/// Move `imports` out of an inserted/replaced fragment and splice them into
/// `module.body`, deduplicating against every import already present there.
/// `to_file_start` places them right after the docstring/`__future__` block
/// (the `__FILE_START__` anchor's own placement rule); otherwise they go
/// after the last existing top-level import, matching the general rule in
/// §4.5.
fn hoist_imports<'b>(module: &mut Module<'b>, imports: Vec<Statement<'b>>, to_file_start: bool) -> usize {
    let mut added = 0usize;
    let mut cursor = if to_file_start {
        tree::position_after_docstring_and_future(&module.body)
    } else {
        last_import_position(&module.body)
    };
    for stmt in imports {
        let new_module_keys = tree::import_module_keys(&stmt);
        let new_from_keys = tree::import_from_keys(&stmt);
        let is_dup = module.body.iter().any(|existing| {
            tree::import_module_keys(existing)
                .iter()
                .any(|k| new_module_keys.contains(k))
                || tree::import_from_keys(existing)
                    .iter()
                    .any(|k| new_from_keys.contains(k))
        });
        if is_dup {
            continue;
        }
        module.body.insert(cursor, stmt);
        cursor += 1;
        added += 1;
    }
    added
}

fn last_import_position(body: &[Statement]) -> usize {
    let start = tree::position_after_docstring_and_future(body);
    let mut pos = start;
    let mut i = start;
    while i < body.len() {
        if tree::is_import_statement(&body[i]) {
            pos = i + 1;
            i += 1;
        } else {
            break;
        }
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tempfile::tempdir;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn replaces_a_method() {
        let dir = tempdir().unwrap();
        let path = write(
            &dir,
            "f.py",
            indoc! {"
                class C:
                    def m(self):
                        return 1

                    def n(self):
                        return 2
            "},
        );
        let target = format!("{}::C::m", path.display());
        let status = edit(&target, "def m(self):\n    return 42", None, false);
        assert!(!status.starts_with("Tool Failed:"), "{status}");
        let out = std::fs::read_to_string(&path).unwrap();
        assert!(out.contains("return 42"));
        assert!(out.contains("return 2"));
    }

    #[test]
    fn deletes_whole_file() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "f.py", "x = 1\n");
        let status = edit(&path.display().to_string(), "", None, false);
        assert!(!status.starts_with("Tool Failed:"), "{status}");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn safety_gate_blocks_large_deletion() {
        let dir = tempdir().unwrap();
        let big = "x = 1\n".repeat(200);
        let path = write(&dir, "f.py", &big);
        let status = edit(&path.display().to_string(), "", None, false);
        assert!(status.starts_with("Tool Failed:"), "{status}");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), big);
    }

    #[test]
    fn insert_at_file_end_overwrites_duplicate() {
        let dir = tempdir().unwrap();
        let path = write(
            &dir,
            "f.py",
            indoc! {"
                def helper():
                    return 1
            "},
        );
        let target = path.display().to_string();
        let status = edit(
            &target,
            "def helper():\n    return 0",
            Some("__FILE_END__"),
            false,
        );
        assert!(!status.starts_with("Tool Failed:"), "{status}");
        assert!(status.contains("Overwrote 1"));
        let out = std::fs::read_to_string(&path).unwrap();
        assert_eq!(out.matches("def helper").count(), 1);
        assert!(out.contains("return 0"));
    }

    #[test]
    fn file_start_preserves_docstring_and_future_imports() {
        let dir = tempdir().unwrap();
        let path = write(
            &dir,
            "f.py",
            indoc! {r#"
                """Doc"""
                from __future__ import annotations
                import os
            "#},
        );
        let target = path.display().to_string();
        let status = edit(&target, "import sys", Some("__FILE_START__"), false);
        assert!(!status.starts_with("Tool Failed:"), "{status}");
        let out = std::fs::read_to_string(&path).unwrap();
        let doc_pos = out.find("\"\"\"Doc\"\"\"").unwrap();
        let future_pos = out.find("from __future__").unwrap();
        let sys_pos = out.find("import sys").unwrap();
        let os_pos = out.find("import os").unwrap();
        assert!(doc_pos < future_pos);
        assert!(future_pos < sys_pos);
        assert!(sys_pos < os_pos);
    }

    #[test]
    fn coscope_with_prefix_mismatch_fails() {
        let dir = tempdir().unwrap();
        let path = write(
            &dir,
            "f.py",
            indoc! {"
                class C:
                    def m(self):
                        return 1

                class Other:
                    def q(self):
                        return 9
            "},
        );
        let target = format!("{}::C", path.display());
        let status = edit(&target, "def extra():\n    return 0", Some("Other::q"), false);
        assert!(status.starts_with("Tool Failed:"), "{status}");
        let out = std::fs::read_to_string(&path).unwrap();
        assert!(!out.contains("def extra"));
    }

    #[test]
    fn replace_without_name_match_keeps_leading_comment() {
        let dir = tempdir().unwrap();
        let path = write(
            &dir,
            "f.py",
            indoc! {"
                class C:
                    # original note
                    def m(self):
                        return 1

                    def n(self):
                        return 2
            "},
        );
        let target = format!("{}::C::m", path.display());
        let status = edit(&target, "def other():\n    return 2", None, false);
        assert!(!status.starts_with("Tool Failed:"), "{status}");
        let out = std::fs::read_to_string(&path).unwrap();
        assert!(!out.contains("def m"));
        assert!(out.contains("def other"));
        let note_pos = out.find("# original note").expect("comment preserved");
        let other_pos = out.find("def other").unwrap();
        assert!(note_pos < other_pos);
    }

    #[test]
    fn non_python_missing_file_writes_verbatim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let status = edit(&path.display().to_string(), "hello", None, false);
        assert!(!status.starts_with("Tool Failed:"), "{status}");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }
}
