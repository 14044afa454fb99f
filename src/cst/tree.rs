//! Scope descent and body-splicing over a parsed [`Module`].
//!
//! The scope resolver (spec: "a visitor parameterized by a path... on
//! entering a ClassDef or FunctionDef whose name matches the next expected
//! element, it pushes and recurses") is expressed here as plain recursive
//! descent over `Vec<Statement>` bodies rather than a visitor object,
//! because `libcst_native`'s tree is mutated in place and then re-emitted
//! via `Codegen`, unlike an offset-addressed AST.

use anyhow::{anyhow, Result};
use libcst_native::{
    Codegen, CodegenState, CompoundStatement, EmptyLine, ImportNames, Module, NameOrAttribute,
    SmallStatement, Statement, Suite,
};

use super::helpers::compose_module_path;
use super::matchers::match_module;
use crate::scope::FIRST_SENTINEL;

pub fn parse_module(source: &str) -> Result<Module<'_>> {
    match_module(source)
}

pub fn codegen_module(module: &Module) -> String {
    let mut state = CodegenState {
        default_newline: module.default_newline,
        default_indent: module.default_indent,
        ..Default::default()
    };
    module.codegen(&mut state);
    state.to_string()
}

/// Serialize a single statement outside the module it came from (e.g. to
/// measure how many lines a scope spans before deleting it). Takes the
/// owning module's newline/indent conventions explicitly rather than a
/// `&Module` reference, so callers already holding a mutable borrow of
/// `module.body` can still call this.
pub fn codegen_statement(stmt: &Statement, default_newline: &str, default_indent: &str) -> String {
    let mut state = CodegenState {
        default_newline,
        default_indent,
        ..Default::default()
    };
    stmt.codegen(&mut state);
    state.to_string()
}

/// The name a scope-bearing statement is addressed by, or `None` for
/// statements that can never be a scope-path element (imports, assignments,
/// bare expressions, control flow, ...).
pub fn def_name<'a>(stmt: &'a Statement) -> Option<&'a str> {
    match stmt {
        Statement::Compound(CompoundStatement::ClassDef(cd)) => Some(cd.name.value),
        Statement::Compound(CompoundStatement::FunctionDef(fd)) => Some(fd.name.value),
        _ => None,
    }
}

pub fn is_class_or_function(stmt: &Statement) -> bool {
    matches!(
        stmt,
        Statement::Compound(CompoundStatement::ClassDef(_))
            | Statement::Compound(CompoundStatement::FunctionDef(_))
    )
}

fn find_index_by_name(body: &[Statement], name: &str) -> Option<usize> {
    if name == FIRST_SENTINEL {
        return body.iter().position(is_class_or_function);
    }
    body.iter().position(|s| def_name(s) == Some(name))
}

fn suite_body_mut<'a, 'b>(stmt: &'a mut Statement<'b>) -> Option<&'a mut Vec<Statement<'b>>> {
    match stmt {
        Statement::Compound(CompoundStatement::ClassDef(cd)) => match &mut cd.body {
            Suite::IndentedBlock(ib) => Some(&mut ib.body),
            Suite::SimpleStatementSuite(_) => None,
        },
        Statement::Compound(CompoundStatement::FunctionDef(fd)) => match &mut fd.body {
            Suite::IndentedBlock(ib) => Some(&mut ib.body),
            Suite::SimpleStatementSuite(_) => None,
        },
        _ => None,
    }
}

fn suite_body<'a, 'b>(stmt: &'a Statement<'b>) -> Option<&'a Vec<Statement<'b>>> {
    match stmt {
        Statement::Compound(CompoundStatement::ClassDef(cd)) => match &cd.body {
            Suite::IndentedBlock(ib) => Some(&ib.body),
            Suite::SimpleStatementSuite(_) => None,
        },
        Statement::Compound(CompoundStatement::FunctionDef(fd)) => match &fd.body {
            Suite::IndentedBlock(ib) => Some(&ib.body),
            Suite::SimpleStatementSuite(_) => None,
        },
        _ => None,
    }
}

/// Descend `path` from `body`, returning the immediate parent body and the
/// index of the target statement within it. `path` must be non-empty.
pub fn find_container<'a, 'b>(
    body: &'a mut Vec<Statement<'b>>,
    path: &[String],
) -> Option<(&'a mut Vec<Statement<'b>>, usize)> {
    let (head, rest) = path.split_first()?;
    let idx = find_index_by_name(body, head)?;
    if rest.is_empty() {
        return Some((body, idx));
    }
    let inner = suite_body_mut(&mut body[idx])?;
    find_container(inner, rest)
}

/// Read-only counterpart of [`find_container`], used when only inspection
/// (not mutation) is needed, e.g. by `view`.
pub fn find_node<'a, 'b>(body: &'a [Statement<'b>], path: &[String]) -> Option<&'a Statement<'b>> {
    let (head, rest) = path.split_first()?;
    let idx = find_index_by_name(body, head)?;
    let node = &body[idx];
    if rest.is_empty() {
        return Some(node);
    }
    find_node(suite_body(node)?, rest)
}

fn leading_lines_of<'a, 'b>(stmt: &'a Statement<'b>) -> Option<&'a Vec<EmptyLine<'b>>> {
    match stmt {
        Statement::Compound(CompoundStatement::ClassDef(cd)) => Some(&cd.leading_lines),
        Statement::Compound(CompoundStatement::FunctionDef(fd)) => Some(&fd.leading_lines),
        Statement::Simple(s) => Some(&s.leading_lines),
        _ => None,
    }
}

fn set_leading_lines<'b>(stmt: &mut Statement<'b>, lines: Vec<EmptyLine<'b>>) {
    match stmt {
        Statement::Compound(CompoundStatement::ClassDef(cd)) => cd.leading_lines = lines,
        Statement::Compound(CompoundStatement::FunctionDef(fd)) => fd.leading_lines = lines,
        Statement::Simple(s) => s.leading_lines = lines,
        _ => {}
    }
}

/// Copy `old`'s leading blank lines/comments onto `new`, the way a
/// replacement keeps the original node's attached comments (spec §4.2.5).
pub fn carry_leading_lines<'b>(old: &Statement<'b>, new: &mut Statement<'b>) {
    if let Some(lines) = leading_lines_of(old) {
        set_leading_lines(new, lines.clone());
    }
}

pub fn clone_leading_lines<'b>(stmt: &Statement<'b>) -> Option<Vec<EmptyLine<'b>>> {
    leading_lines_of(stmt).cloned()
}

pub fn apply_leading_lines<'b>(stmt: &mut Statement<'b>, lines: Vec<EmptyLine<'b>>) {
    set_leading_lines(stmt, lines);
}

pub fn has_leading_blank(stmt: &Statement) -> bool {
    leading_lines_of(stmt).is_some_and(|lines| !lines.is_empty())
}

/// If `stmt` has no leading blank lines/comments, give it exactly one blank
/// line, the way a replaced top-level definition keeps the blank line that
/// used to separate it from its predecessor (spec §4.2.6).
pub fn ensure_blank_line<'b>(stmt: &mut Statement<'b>) {
    if !has_leading_blank(stmt) {
        set_leading_lines(stmt, vec![EmptyLine::default()]);
    }
}

/// The body a `target_scope` addresses: `module.body` itself when `path` is
/// empty, otherwise the indented block of the `ClassDef`/`FunctionDef` found
/// by descending `path`.
pub fn resolve_scope_body_mut<'a, 'b>(
    module: &'a mut Module<'b>,
    path: &[String],
) -> Option<&'a mut Vec<Statement<'b>>> {
    if path.is_empty() {
        return Some(&mut module.body);
    }
    let (parent, idx) = find_container(&mut module.body, path)?;
    suite_body_mut(&mut parent[idx])
}

/// Index into `body` right after the module docstring (if any) and any
/// consecutive `from __future__ import ...` statements. Used both to place
/// `__FILE_START__` insertions and as the fallback import-hoisting target
/// when a file has no existing imports yet.
pub fn position_after_docstring_and_future(body: &[Statement]) -> usize {
    let mut i = 0;
    if body.first().is_some_and(is_docstring_stmt) {
        i = 1;
    }
    while i < body.len() && is_future_import(&body[i]) {
        i += 1;
    }
    i
}

pub fn is_import_statement(stmt: &Statement) -> bool {
    matches!(stmt, Statement::Simple(s) if s.body.iter().any(|small| matches!(small, SmallStatement::Import(_) | SmallStatement::ImportFrom(_))))
}

/// Is this a bare string-literal expression statement? (i.e. a docstring,
/// when it is also the first statement in a body.)
pub fn is_docstring_stmt(stmt: &Statement) -> bool {
    let Statement::Simple(s) = stmt else {
        return false;
    };
    matches!(
        s.body.first(),
        Some(SmallStatement::Expr(expr)) if matches!(&*expr.value, libcst_native::Expression::SimpleString(_) | libcst_native::Expression::ConcatenatedString(_))
    )
}

pub fn is_future_import(stmt: &Statement) -> bool {
    let Statement::Simple(s) = stmt else {
        return false;
    };
    s.body.iter().any(|small| {
        matches!(small, SmallStatement::ImportFrom(import_from)
            if import_from.module.as_ref().is_some_and(|m| compose_module_path(m) == "__future__"))
    })
}

/// `import a.b.c` / `import a.b.c as d` dedup keys: the fully-qualified
/// module path for every alias in an `Import` statement.
pub fn import_module_keys(stmt: &Statement) -> Vec<String> {
    let Statement::Simple(s) = stmt else {
        return Vec::new();
    };
    let mut keys = Vec::new();
    for small in &s.body {
        if let SmallStatement::Import(import) = small {
            for alias in &import.names {
                keys.push(compose_module_path(&alias.name));
            }
        }
    }
    keys
}

/// `from M import N` dedup keys: `(M, N)` pairs, including `*`.
pub fn import_from_keys(stmt: &Statement) -> Vec<(String, String)> {
    let Statement::Simple(s) = stmt else {
        return Vec::new();
    };
    let mut keys = Vec::new();
    for small in &s.body {
        if let SmallStatement::ImportFrom(import_from) = small {
            let module = import_from
                .module
                .as_ref()
                .map(compose_module_path)
                .unwrap_or_default();
            match &import_from.names {
                ImportNames::Aliases(aliases) => {
                    for alias in aliases {
                        let name = match &alias.name {
                            NameOrAttribute::N(n) => n.value.to_string(),
                            NameOrAttribute::A(a) => compose_module_path(&NameOrAttribute::A(a.clone())),
                        };
                        keys.push((module.clone(), name));
                    }
                }
                ImportNames::Star(_) => keys.push((module.clone(), "*".to_string())),
            }
        }
    }
    keys
}

/// Every top-level `ClassDef`/`FunctionDef` name in a parsed fragment, in
/// source order, used by duplicate detection (spec §4.4) and the
/// additional-siblings rule (spec §4.2.4).
pub fn top_level_def_names(body: &[Statement]) -> Vec<String> {
    body.iter().filter_map(|s| def_name(s).map(str::to_string)).collect()
}

pub fn require_indented_block<'a, 'b>(suite: &'a Suite<'b>) -> Result<&'a Vec<Statement<'b>>> {
    match suite {
        Suite::IndentedBlock(ib) => Ok(&ib.body),
        Suite::SimpleStatementSuite(_) => {
            Err(anyhow!("expected an indented block, found an inline suite"))
        }
    }
}
