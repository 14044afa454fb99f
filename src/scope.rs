//! Scope-path and anchor-token parsing.
//!
//! `target_scope` is always `file.py` or `file.py::a::b::c`; `coscope_with`
//! carries the anchor for an insertion and is parsed independently since its
//! grammar (identifiers, dotted paths, quoted patterns, file sentinels) is
//! richer than a plain scope path.

use crate::error::EditError;

pub const FIRST_SENTINEL: &str = "__FIRST__";
pub const FILE_START_SENTINEL: &str = "__FILE_START__";
pub const FILE_END_SENTINEL: &str = "__FILE_END__";

/// A `file.py::a::b::c` target, split into the file and its scope path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub file: String,
    pub path: Vec<String>,
}

impl Target {
    pub fn parse(target_scope: &str) -> Result<Target, EditError> {
        let mut parts = target_scope.split("::");
        let file = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EditError::path("target_scope is missing a file path"))?
            .to_string();
        let path: Vec<String> = parts.map(str::to_string).collect();

        if path.iter().any(|p| p == FILE_START_SENTINEL || p == FILE_END_SENTINEL) {
            return Err(EditError::path(format!(
                "{FILE_START_SENTINEL} and {FILE_END_SENTINEL} are only valid as coscope_with, not in a scope path"
            )));
        }
        if path.iter().any(|p| p == FIRST_SENTINEL) && path.len() > 1 {
            return Err(EditError::path(format!(
                "{FIRST_SENTINEL} must be the sole element of a scope path"
            )));
        }
        for p in &path {
            if p != FIRST_SENTINEL && !is_python_identifier(p) {
                return Err(EditError::path(format!("'{p}' is not a valid identifier in scope path")));
            }
        }

        Ok(Target { file, path })
    }

    pub fn is_python_file(&self) -> bool {
        self.file.ends_with(".py")
    }
}

pub fn is_python_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

/// Where inserted code is spliced relative to the scope addressed by
/// `target_scope`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Insert after the child named `name` (possibly dotted, `outer::inner::name`).
    ScopeName(Vec<String>),
    /// Insert after the first statement whose source matches `pattern`.
    ExpressionPattern(String),
    FileStart,
    FileEnd,
}

impl Anchor {
    pub fn parse(raw: &str) -> Result<Anchor, EditError> {
        if raw == FILE_START_SENTINEL {
            return Ok(Anchor::FileStart);
        }
        if raw == FILE_END_SENTINEL {
            return Ok(Anchor::FileEnd);
        }
        if (raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2)
            || (raw.starts_with('\'') && raw.ends_with('\'') && raw.len() >= 2)
        {
            let pattern = &raw[1..raw.len() - 1];
            return Ok(Anchor::ExpressionPattern(pattern.to_string()));
        }
        let segments: Vec<String> = raw.split("::").map(str::to_string).collect();
        for seg in &segments {
            if !is_python_identifier(seg) {
                return Err(EditError::path(format!(
                    "'{raw}' is not a valid coscope_with: not a sentinel, quoted pattern, or dotted identifier path"
                )));
            }
        }
        Ok(Anchor::ScopeName(segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_file() {
        let t = Target::parse("f.py").unwrap();
        assert_eq!(t.file, "f.py");
        assert!(t.path.is_empty());
    }

    #[test]
    fn parses_nested_path() {
        let t = Target::parse("f.py::C::m").unwrap();
        assert_eq!(t.path, vec!["C".to_string(), "m".to_string()]);
    }

    #[test]
    fn rejects_file_start_in_scope_path() {
        assert!(Target::parse("f.py::__FILE_START__").is_err());
    }

    #[test]
    fn rejects_first_with_siblings() {
        assert!(Target::parse("f.py::__FIRST__::m").is_err());
    }

    #[test]
    fn anchor_sentinels() {
        assert_eq!(Anchor::parse("__FILE_START__").unwrap(), Anchor::FileStart);
        assert_eq!(Anchor::parse("__FILE_END__").unwrap(), Anchor::FileEnd);
    }

    #[test]
    fn anchor_quoted_pattern() {
        assert_eq!(
            Anchor::parse("\"x = 1\"").unwrap(),
            Anchor::ExpressionPattern("x = 1".to_string())
        );
        assert_eq!(
            Anchor::parse("'x = 1'").unwrap(),
            Anchor::ExpressionPattern("x = 1".to_string())
        );
    }

    #[test]
    fn anchor_dotted_name() {
        assert_eq!(
            Anchor::parse("outer::inner::name").unwrap(),
            Anchor::ScopeName(vec!["outer".into(), "inner".into(), "name".into()])
        );
    }
}
