//! Crate-wide error type.
//!
//! Every failure in the core is local and synchronous: it is returned to the
//! caller of the mutating operation that triggered it and never retried.

use crate::dom::bindspec::BindSpecError;

/// Errors raised by the data model, widgets, and the reference renderer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The node is not currently held by the collection.
    #[error("node is not a member of this collection")]
    NotAMember,

    /// A keyed collection has no entry under the key.
    #[error("key `{0}` is not present in this collection")]
    MissingKey(String),

    /// A keyed collection already holds a different element under the key.
    #[error("key `{key}` is already occupied by a different element")]
    DuplicateKey { key: String },

    /// A widget (or widget group) was removed twice.
    #[error("widget has already been removed")]
    DoubleRemove,

    /// A widget was used after it was removed.
    #[error("widget has been removed")]
    WidgetRemoved,

    /// A widget group received a "remove" for a child it never rendered.
    #[error("widget group has no rendered widget for removed child (id: {id:?})")]
    Desync { id: Option<String> },

    /// The container has no template registered under the name.
    #[error("missing template `{template}`")]
    MissingTemplate { template: String },

    /// A morph or unmorph function failed.
    #[error("transform failed: {0}")]
    Transform(String),

    /// A patch nests deeper than the merge limit.
    #[error("patch nesting exceeds {limit} levels")]
    MergeTooDeep { limit: usize },

    /// `set` was called on a record while its own change notification ran.
    #[error("record updated while its own change notification is in progress")]
    ReentrantUpdate,

    /// A record was built from a JSON value that is not an object.
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// A widget group was handed a child that is not a record.
    #[error("widget groups only render records")]
    NotARecord,

    /// A widget group was built over something that is not a collection.
    #[error("widget groups observe ordered or keyed collections")]
    NotACollection,

    /// The renderer does not know the element.
    #[error("unknown element")]
    UnknownElement,

    /// The renderer could not apply a binding.
    #[error("render error: {0}")]
    Render(String),

    /// A bind spec failed to parse.
    #[error(transparent)]
    BindSpec(#[from] BindSpecError),
}

impl Error {
    /// Build a [`Error::Transform`] from any displayable message.
    pub fn transform(message: impl std::fmt::Display) -> Self {
        Self::Transform(message.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_message() {
        let err = Error::DuplicateKey { key: "a".into() };
        assert_eq!(err.to_string(), "key `a` is already occupied by a different element");
    }

    #[test]
    fn transform_helper_formats() {
        let err = Error::transform(format_args!("bad {}", 3));
        assert_eq!(err, Error::Transform("bad 3".into()));
    }

    #[test]
    fn bindspec_error_is_transparent() {
        let inner = BindSpecError::UnexpectedEnd { rule: 2 };
        let err: Error = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
    }
}
