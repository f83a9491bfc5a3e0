//! Objects subjected to access control.

use std::borrow::Cow;

use portcullis_types::PermissionSpec;
use serde_json::Value;

use crate::error::{AuthzError, Result};

/// A domain object that knows its own permission specification.
///
/// Lets callers compute a spec lazily instead of passing a literal one.
pub trait Subject {
    fn permissions(&self) -> PermissionSpec;
}

/// Where a privilege decision takes its permission specification from.
#[derive(Clone, Copy)]
pub enum Permissions<'a> {
    /// A decoded specification.
    Spec(&'a PermissionSpec),

    /// A subject asked for its specification on demand.
    Subject(&'a dyn Subject),

    /// Raw JSON, decoded and validated before use.
    Value(&'a Value),
}

impl<'a> Permissions<'a> {
    /// Wraps any subject.
    pub fn subject<S: Subject>(subject: &'a S) -> Self {
        Permissions::Subject(subject)
    }

    /// Decodes raw JSON, failing with `InvalidArgument` if it is not a spec.
    ///
    /// Subjects are not consulted here.
    pub(crate) fn validate(self) -> Result<Source<'a>> {
        match self {
            Permissions::Spec(spec) => Ok(Source::Literal(Cow::Borrowed(spec))),
            Permissions::Subject(subject) => Ok(Source::Subject(subject)),
            Permissions::Value(value) => PermissionSpec::try_from(value)
                .map(|spec| Source::Literal(Cow::Owned(spec)))
                .map_err(|e| {
                    AuthzError::InvalidArgument(format!(
                        "permissions should be a specification or a subject: {e}"
                    ))
                }),
        }
    }
}

impl<'a> From<&'a PermissionSpec> for Permissions<'a> {
    fn from(spec: &'a PermissionSpec) -> Self {
        Permissions::Spec(spec)
    }
}

impl<'a> From<&'a dyn Subject> for Permissions<'a> {
    fn from(subject: &'a dyn Subject) -> Self {
        Permissions::Subject(subject)
    }
}

impl<'a> From<&'a Value> for Permissions<'a> {
    fn from(value: &'a Value) -> Self {
        Permissions::Value(value)
    }
}

/// A validated permission source.
pub(crate) enum Source<'a> {
    Literal(Cow<'a, PermissionSpec>),
    Subject(&'a dyn Subject),
}

impl<'a> Source<'a> {
    /// Produces the specification, calling the subject exactly once.
    pub(crate) fn into_spec(self) -> Cow<'a, PermissionSpec> {
        match self {
            Source::Literal(spec) => spec,
            Source::Subject(subject) => Cow::Owned(subject.permissions()),
        }
    }
}
