use crate::nodes::Key;

/// A result whose error defaults to the crate [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while building, reconciling or scheduling views.
///
/// Structural violations are programmer errors: they are reported to the caller of the operation that found them
/// and never retried. User callback failures are wrapped with the name of whatever raised them. The host tree may be
/// left partially updated for the subtree being reconciled when an error surfaces; recovery (usually a remount) is up
/// to the application.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two siblings in one (fragment-flattened) child list share a key.
    #[error("duplicate key `{key}` in one child list")]
    DuplicateKey { key: Key },

    /// The selector passed to the builder could not be parsed.
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector {
        selector: String,
        reason: &'static str,
    },

    /// The render surface has no host mapping for this tag.
    #[error("the render surface has no host mapping for tag `{tag}`")]
    UnknownTag { tag: String },

    /// A view was reconciled against a render-tree binding that was already released.
    #[error("cannot reconcile against a detached {kind}")]
    Detached { kind: &'static str },

    /// `mount` was called on a dom that already has a root.
    #[error("the virtual dom already has a mounted root")]
    AlreadyMounted,

    /// An operation needed a mounted root but there is none.
    #[error("the virtual dom has no mounted root")]
    NotMounted,

    /// The redraw mode was changed after the first redraw request.
    #[error("the redraw mode can only be changed before the first redraw")]
    ModeLocked,

    /// A component generator failed.
    #[error("component `{name}` failed to render")]
    Render {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A lifecycle hook failed.
    #[error("`{hook}` hook of `{name}` failed")]
    Hook {
        name: String,
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// An event handler failed.
    #[error("handler for `{event}` failed")]
    Handler {
        event: String,
        #[source]
        source: anyhow::Error,
    },
}
