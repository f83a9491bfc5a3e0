//! Session identities.
//!
//! An identity is the acting party resolved from a session. The only thing
//! the decision layer asks of it is which groups it belongs to.

use std::fmt::Debug;

use serde_json::{Map, Value};

/// Field holding the opaque identifier.
pub const ID_FIELD: &str = "id";

/// Field holding the email address, which doubles as a personal group.
pub const EMAIL_FIELD: &str = "email";

/// Field holding the declared authorization groups.
pub const GROUPS_FIELD: &str = "authz_groups";

/// The acting party of a session.
pub trait Identity: Debug {
    /// Returns the authorization groups of this identity.
    ///
    /// Order is significant for display only; matchers treat the result
    /// as a set. Duplicates are preserved.
    fn groups(&self) -> Vec<String>;

    /// Returns an application-specific attribute, if the identity carries one.
    fn attribute(&self, _name: &str) -> Option<&Value> {
        None
    }
}

/// Identity backed by the raw record it was built from.
///
/// Every field of the record is kept, so applications can attach their own
/// attributes without schema changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordIdentity {
    fields: Map<String, Value>,
}

impl RecordIdentity {
    /// Builds an identity by copying every field of `data`.
    pub fn from_data(data: Map<String, Value>) -> Self {
        Self { fields: data }
    }

    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.fields.get(EMAIL_FIELD).and_then(Value::as_str)
    }

    /// Returns the declared groups, skipping entries that are not strings.
    ///
    /// A missing or non-array `authz_groups` field declares no groups.
    pub fn declared_groups(&self) -> impl Iterator<Item = &str> {
        self.fields
            .get(GROUPS_FIELD)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    /// Returns the record this identity was built from.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl Identity for RecordIdentity {
    fn groups(&self) -> Vec<String> {
        self.declared_groups()
            .chain(self.email())
            .map(str::to_string)
            .collect()
    }

    fn attribute(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
