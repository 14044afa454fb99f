//! Thin wrapper around `libcst_native`, the lossless concrete-syntax-tree
//! parser this crate builds on (the same `libcst` family the original
//! Python implementation imports as `import libcst as cst`).

pub(crate) mod helpers;
pub(crate) mod matchers;
pub mod tree;
