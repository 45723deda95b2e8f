//! Typed failure modes for layout construction, decode and encode.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LayoutError>;

/// Every way a layout can fail during construction, decode, or encode.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Buffer too short to decode/encode at the given offset, a value out of
    /// the declared width/signedness, or a `max_span` overrun on UTF-8
    /// encode.
    #[error("range error at offset {offset}: {reason}")]
    Range { offset: usize, reason: String },

    /// `span_of` was invoked on a variable-span node without buffer context.
    #[error("span of variable-span layout {property:?} requires a buffer")]
    UnresolvedSpan { property: Option<String> },

    /// Union decode saw an unregistered tag and there is no default layout.
    #[error("unknown union variant tag {tag}")]
    UnknownVariant { tag: i64 },

    /// `get_source_variant` could not uniquely identify a variant for an
    /// encode source.
    #[error("source value does not unambiguously identify a union variant")]
    AmbiguousVariant,

    /// A construction-time violation: unnamed variable-span structure field,
    /// bit-field wider than its word, variant whose inner span exceeds the
    /// union's default, a sequence count that is neither an integer nor an
    /// `is_count()` external layout, or a colliding union property name.
    #[error("schema error: {0}")]
    Schema(String),

    /// An input value had the wrong shape for the layout encoding it.
    #[error("type error: expected {expected}, found {found}")]
    Type {
        expected: &'static str,
        found: &'static str,
    },

    /// Invalid UTF-8 encountered while decoding a string leaf.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

impl LayoutError {
    pub(crate) fn range(offset: usize, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::debug!(offset, %reason, "layout range error");
        LayoutError::Range {
            offset,
            reason,
        }
    }

    pub(crate) fn schema(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(%reason, "layout schema error");
        LayoutError::Schema(reason)
    }
}
