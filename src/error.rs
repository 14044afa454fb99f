//! The closed error type for the three public entry points.
//!
//! Everything beneath `edit`/`view`/`patch` propagates `anyhow::Result` the
//! way the rest of this crate's CST plumbing does; only the boundary
//! functions convert to [`EditError`] and then to the `Tool Failed: ...`
//! strings callers actually see.

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("{0}")]
    Path(String),
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    ScopeNotFound(String),
    #[error("{0}")]
    AnchorNotFound(String),
    #[error("{0}")]
    AmbiguousAnchor(String),
    #[error("{0}")]
    Safety(String),
    #[error("{0}")]
    Combination(String),
    #[error("{0}")]
    Other(String),
}

impl EditError {
    pub fn path(msg: impl fmt::Display) -> Self {
        Self::Path(msg.to_string())
    }

    pub fn io(msg: impl fmt::Display) -> Self {
        Self::Io(msg.to_string())
    }

    pub fn parse(msg: impl fmt::Display) -> Self {
        Self::Parse(msg.to_string())
    }

    pub fn scope_not_found(msg: impl fmt::Display) -> Self {
        Self::ScopeNotFound(msg.to_string())
    }

    pub fn anchor_not_found(msg: impl fmt::Display) -> Self {
        Self::AnchorNotFound(msg.to_string())
    }

    pub fn ambiguous_anchor(msg: impl fmt::Display) -> Self {
        Self::AmbiguousAnchor(msg.to_string())
    }

    pub fn safety(msg: impl fmt::Display) -> Self {
        Self::Safety(msg.to_string())
    }

    pub fn combination(msg: impl fmt::Display) -> Self {
        Self::Combination(msg.to_string())
    }
}

impl From<anyhow::Error> for EditError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

/// Render as the `Tool Failed: ...` string every public entry point returns
/// on error, instead of propagating the error type across the boundary.
pub fn tool_failed(err: impl fmt::Display) -> String {
    format!("Tool Failed: {err}")
}

/// Run `f`, converting a caught panic (e.g. a CST-library invariant
/// violation) into the same `Tool Failed:` shape as an ordinary error,
/// instead of letting it unwind into the caller's process.
pub fn catch_tool_panic<F, R>(f: F) -> Result<R, EditError>
where
    F: FnOnce() -> Result<R, EditError> + std::panic::UnwindSafe,
{
    match std::panic::catch_unwind(f) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "internal panic".to_string());
            Err(EditError::Other(message))
        }
    }
}
