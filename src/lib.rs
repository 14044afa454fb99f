//! `pyedit`: a structural Python source editor.
//!
//! Three operations, each returning a human-readable status string instead
//! of raising across the boundary (see [`error`]): [`edit`] locates a
//! pytest-style scope path (`file.py::Class::method`) in a lossless CST and
//! replaces, inserts beside, or deletes it; [`view`] extracts a scope with
//! depth-aware truncation; [`patch`] applies a unified diff with fuzzy
//! fallback matching.

pub mod args;
pub mod cst;
pub mod editor;
pub mod encoding;
pub mod error;
pub mod logging;
pub mod patcher;
pub mod scope;
pub mod viewer;

/// Replace, insert beside, or delete the Python construct addressed by
/// `target_scope`. See the crate's `SPEC_FULL.md` §4.2/§6 for the full
/// semantics of `coscope_with` and `delete_a_lot`.
pub fn edit(target_scope: &str, code: &str, coscope_with: Option<&str>, delete_a_lot: bool) -> String {
    editor::edit(target_scope, code, coscope_with, delete_a_lot)
}

/// Extract a scope's source, or a depth-aware truncated outline if it
/// exceeds `max_lines` (`max_lines <= 0` disables truncation).
pub fn view(target_scope: &str, max_lines: i64) -> String {
    viewer::view(target_scope, max_lines)
}

/// Apply a unified-diff `patch_content` to `file_path`, falling back to
/// whitespace-insensitive and position-free matching with similarity-based
/// disambiguation.
pub fn patch(file_path: &str, patch_content: &str) -> String {
    patcher::patch(file_path, patch_content)
}
