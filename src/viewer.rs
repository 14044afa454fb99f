//! The scope viewer: `view()`.
//!
//! Grounded in `python_edit.py`'s `view_code`/`_create_signature_outline`:
//! return a scope's source verbatim when it's small, otherwise collapse
//! deeper scopes to `...` until it fits, and failing that fall back to a
//! signatures-only outline.

use std::path::Path;

use libcst_native::{CompoundStatement, Module, Statement, Suite};

use crate::cst::tree::{self, codegen_module, codegen_statement, parse_module};
use crate::encoding;
use crate::error::{catch_tool_panic, tool_failed, EditError};
use crate::scope::Target;

const DEFAULT_MAX_LINES: usize = 500;

pub fn view(target_scope: &str, max_lines: i64) -> String {
    match catch_tool_panic(|| view_inner(target_scope, max_lines)) {
        Ok(status) => status,
        Err(err) => tool_failed(err),
    }
}

fn view_inner(target_scope: &str, max_lines: i64) -> Result<String, EditError> {
    let target = Target::parse(target_scope)?;
    let path = Path::new(&target.file);
    if !target.is_python_file() {
        return Err(EditError::path("view only supports .py files"));
    }
    let decoded = encoding::read_file(path).map_err(EditError::from)?;
    let module = parse_module(&decoded.content).map_err(|e| EditError::parse(e.to_string()))?;

    let text = if target.path.is_empty() {
        decoded.content.clone()
    } else {
        let node = tree::find_node(&module.body, &target.path).ok_or_else(|| {
            EditError::scope_not_found(format!("scope '{}' not found", target.path.join("::")))
        })?;
        codegen_statement(node, module.default_newline, module.default_indent)
    };

    if max_lines <= 0 {
        return Ok(text);
    }
    let max_lines = max_lines as usize;
    let line_count = text.lines().count();
    if line_count <= max_lines {
        return Ok(text);
    }

    for depth in (0..=max_depth(&text)).rev() {
        let collapsed = collapse_at_depth(&text, depth);
        if collapsed.lines().count() <= max_lines {
            return Ok(collapsed);
        }
    }

    Ok(signature_outline(&module, max_lines))
}

/// Deepest nesting level of any `ClassDef`/`FunctionDef` in the rendered
/// text, counted by leading-indent width relative to the smallest indent
/// unit observed (falls back to 1 if nothing is indented).
fn max_depth(text: &str) -> usize {
    let indent_unit = text
        .lines()
        .filter(|l| !l.trim().is_empty() && l.starts_with(' '))
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .filter(|&n| n > 0)
        .min()
        .unwrap_or(4)
        .max(1);
    text.lines()
        .filter(|l| {
            let trimmed = l.trim_start();
            trimmed.starts_with("def ")
                || trimmed.starts_with("async def ")
                || trimmed.starts_with("class ")
        })
        .map(|l| (l.len() - l.trim_start().len()) / indent_unit)
        .max()
        .unwrap_or(0)
}

/// Re-render `text`, replacing the body of any `ClassDef`/`FunctionDef` whose
/// nesting level is strictly greater than `depth` with a single `...` line
/// at the body's indent, keeping its signature line intact.
fn collapse_at_depth(text: &str, depth: usize) -> String {
    let Ok(module) = parse_module(text) else {
        return text.to_string();
    };
    let mut module = module;
    collapse_body(&mut module.body, 0, depth);
    codegen_module(&module)
}

fn collapse_body(body: &mut Vec<Statement>, level: usize, depth: usize) {
    for stmt in body.iter_mut() {
        if let Statement::Compound(compound) = stmt {
            let suite = match compound {
                CompoundStatement::ClassDef(cd) => Some(&mut cd.body),
                CompoundStatement::FunctionDef(fd) => Some(&mut fd.body),
                _ => None,
            };
            let Some(suite) = suite else { continue };
            let Suite::IndentedBlock(ib) = suite else { continue };
            if level >= depth {
                collapse_to_ellipsis(ib);
            } else {
                collapse_body(&mut ib.body, level + 1, depth);
            }
        }
    }
}

fn collapse_to_ellipsis(ib: &mut libcst_native::IndentedBlock) {
    if let Ok(placeholder) = libcst_native::parse_statement("...\n") {
        ib.body = vec![placeholder];
    }
}

/// Two-stage degraded outline: imports first (first 3, then a remaining
/// count), then one signature line per top-level definition, with nested
/// methods in a class capped at 3 before a `# ... N more methods ...`
/// marker, and the whole outline capped by a top-level overflow marker.
fn signature_outline(module: &Module, max_lines: usize) -> String {
    let default_newline = module.default_newline;
    let default_indent = module.default_indent;
    let mut lines: Vec<String> = Vec::new();

    let imports: Vec<&Statement> = module.body.iter().filter(|s| tree::is_import_statement(s)).collect();
    for stmt in imports.iter().take(3) {
        lines.push(signature_line(stmt, default_newline, default_indent));
    }
    if imports.len() > 3 {
        lines.push(format!("# ... {} more import(s) ...", imports.len() - 3));
    }

    let defs: Vec<&Statement> = module
        .body
        .iter()
        .filter(|s| tree::is_class_or_function(s))
        .collect();
    let def_budget = max_lines.saturating_sub(lines.len());
    let capped_defs = defs.len().min(def_budget.max(1));

    for stmt in defs.iter().take(capped_defs) {
        lines.push(signature_line(stmt, default_newline, default_indent));
        if let Statement::Compound(CompoundStatement::ClassDef(cd)) = stmt {
            if let Suite::IndentedBlock(ib) = &cd.body {
                let methods: Vec<&Statement> =
                    ib.body.iter().filter(|s| tree::is_class_or_function(s)).collect();
                for method in methods.iter().take(3) {
                    lines.push(format!("    {}", signature_line(method, default_newline, default_indent)));
                }
                if methods.len() > 3 {
                    lines.push(format!("    # ... {} more methods ...", methods.len() - 3));
                }
            }
        }
    }
    if defs.len() > capped_defs {
        lines.push(format!("# ... {} more top-level definitions ...", defs.len() - capped_defs));
    }

    lines.join("\n")
}

/// The `def ...(...):`/`class ...:` line of a definition, without its body.
fn signature_line(stmt: &Statement, default_newline: &str, default_indent: &str) -> String {
    let rendered = codegen_statement(stmt, default_newline, default_indent);
    let mut out = String::new();
    for line in rendered.lines() {
        out.push_str(line);
        if line.trim_end().ends_with(':') {
            break;
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tempfile::tempdir;

    #[test]
    fn returns_source_when_under_budget() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.py");
        std::fs::write(&path, "x = 1\n").unwrap();
        let out = view(&path.display().to_string(), DEFAULT_MAX_LINES as i64);
        assert_eq!(out, "x = 1\n");
    }

    #[test]
    fn negative_max_lines_disables_truncation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.py");
        let body = "def f():\n    return 1\n".repeat(300);
        std::fs::write(&path, &body).unwrap();
        let out = view(&path.display().to_string(), -1);
        assert_eq!(out, body);
    }

    #[test]
    fn truncates_deep_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.py");
        let mut src = String::new();
        for i in 0..100 {
            src.push_str(&format!("class C{i}:\n    def m(self):\n        return {i}\n\n"));
        }
        std::fs::write(&path, &src).unwrap();
        let out = view(&path.display().to_string(), 50);
        assert!(out.lines().count() <= 50, "{}", out.lines().count());
    }

    #[test]
    fn views_a_single_scope() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.py");
        std::fs::write(
            &path,
            indoc! {"
                class C:
                    def m(self):
                        return 1
            "},
        )
        .unwrap();
        let target = format!("{}::C::m", path.display());
        let out = view(&target, DEFAULT_MAX_LINES as i64);
        assert!(out.contains("return 1"));
        assert!(!out.contains("class C"));
    }
}
