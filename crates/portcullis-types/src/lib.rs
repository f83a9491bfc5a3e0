//! # portcullis-types: Core types for `Portcullis`
//!
//! This crate contains the value types shared across the `Portcullis` system:
//! - Session input ([`SessionRecord`])
//! - Identity kinds ([`IdentityKind`])
//! - Permission specifications ([`PermissionSpec`], [`MEMBERSHIP_PRIVILEGE`])
//! - Requested privileges ([`Privileges`])
//!
//! None of these types perform authorization themselves; they are the
//! vocabulary the authorizer and the pipeline gate speak.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;


/// Errors raised while building the shared value types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// A session record must be a JSON object.
    #[error("session record must be an object, found {0}")]
    NotAnObject(&'static str),

    /// The identity kind tag is not one of `user` / `party`.
    #[error("unknown identity kind: {0:?}")]
    UnknownKind(String),

    /// A permission specification could not be decoded.
    #[error("invalid permission specification: {0}")]
    InvalidSpec(String),
}

/// Returns a short name for the JSON type of `value`, used in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Session Record
// ============================================================================

/// Immutable key/value record describing the current session.
///
/// At most one of the well-known keys `user` or `party` is meaningful;
/// absence of both means the session is anonymous. The record is never
/// mutated after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionRecord(Map<String, Value>);

impl SessionRecord {
    /// Creates a session record from a JSON object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Creates an empty (anonymous) session record.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    ///
    /// A JSON `null` is reported as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    /// Returns whether a non-null value is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the kind of identity the session carries.
    ///
    /// The first kind in [`IdentityKind::PRECEDENCE`] with a non-null value
    /// wins, whatever the shape of that value.
    pub fn identity_kind(&self) -> Option<IdentityKind> {
        IdentityKind::PRECEDENCE
            .into_iter()
            .find(|kind| self.contains_key(kind.session_key()))
    }

    /// Returns the identity data stored for `kind`, if it is an object.
    ///
    /// Scalars and arrays under `user` / `party` cannot describe an
    /// identity and are reported as absent.
    pub fn identity_data(&self, kind: IdentityKind) -> Option<&Map<String, Value>> {
        self.get(kind.session_key()).and_then(Value::as_object)
    }

    /// Returns the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the record and returns the underlying map.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for SessionRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for SessionRecord {
    type Error = TypesError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(TypesError::NotAnObject(json_type_name(&other))),
        }
    }
}

// ============================================================================
// Identity Kind
// ============================================================================

/// Which session key an identity was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    /// An authenticated user (`user` session key).
    User,

    /// A represented party such as a visitor or counterparty (`party` session key).
    Party,
}

impl IdentityKind {
    /// Kinds in resolution order. `User` wins when both keys are present.
    pub const PRECEDENCE: [IdentityKind; 2] = [IdentityKind::User, IdentityKind::Party];

    /// Returns the session key this kind is read from.
    pub fn session_key(self) -> &'static str {
        match self {
            IdentityKind::User => "user",
            IdentityKind::Party => "party",
        }
    }
}

impl Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.session_key())
    }
}

impl FromStr for IdentityKind {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(IdentityKind::User),
            "party" => Ok(IdentityKind::Party),
            other => Err(TypesError::UnknownKind(other.to_string())),
        }
    }
}

// ============================================================================
// Permission Specification
// ============================================================================

/// Privilege granted by a singleton membership spec.
///
/// Group checks are answered by the same matcher as privilege checks: the
/// spec `{group: [MEMBERSHIP_PRIVILEGE]}` grants this privilege exactly
/// when the group set matches `group`.
pub const MEMBERSHIP_PRIVILEGE: &str = "member";

/// Wire shape of one spec entry: a single privilege or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Mapping from group pattern to the privileges that group is granted.
///
/// ```json
/// { "user": ["read"], "/organizations/889900/users": "write", "admin": ["full"] }
/// ```
///
/// The authorizer never inspects a spec; it only forwards it to the
/// permission matcher together with the resolved group set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionSpec {
    entries: BTreeMap<String, Vec<String>>,
}

impl<'de> Deserialize<'de> for PermissionSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = BTreeMap::<String, OneOrMany>::deserialize(deserializer)?;
        let entries = raw
            .into_iter()
            .map(|(group, privileges)| {
                let privileges = match privileges {
                    OneOrMany::One(privilege) => vec![privilege],
                    OneOrMany::Many(privileges) => privileges,
                };
                (group, privileges)
            })
            .collect();
        Ok(Self { entries })
    }
}

impl PermissionSpec {
    /// Creates an empty specification (grants nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the singleton spec used for group-membership checks.
    pub fn membership(group: impl Into<String>) -> Self {
        Self::new().grant(group, [MEMBERSHIP_PRIVILEGE])
    }

    /// Adds privileges for a group pattern.
    pub fn grant<I, S>(mut self, group: impl Into<String>, privileges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .entry(group.into())
            .or_default()
            .extend(privileges.into_iter().map(Into::into));
        self
    }

    /// Returns the privileges listed for an exact group pattern.
    pub fn privileges_for(&self, group: &str) -> Option<&[String]> {
        self.entries.get(group).map(Vec::as_slice)
    }

    /// Iterates over `(group pattern, privileges)` entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(group, privileges)| (group.as_str(), privileges.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<&Value> for PermissionSpec {
    type Error = TypesError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        if !value.is_object() {
            return Err(TypesError::InvalidSpec(format!(
                "expected an object, found {}",
                json_type_name(value)
            )));
        }

        serde_json::from_value(value.clone()).map_err(|e| TypesError::InvalidSpec(e.to_string()))
    }
}

impl<G, I, S> FromIterator<(G, I)> for PermissionSpec
where
    G: Into<String>,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (G, I)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(), |spec, (group, privileges)| spec.grant(group, privileges))
    }
}

// ============================================================================
// Requested Privileges
// ============================================================================

/// One or more privileges a caller asks about.
///
/// A decision succeeds when at least one of them is granted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Privileges(Vec<String>);

impl Privileges {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns whether any requested privilege appears in `granted`.
    pub fn intersects(&self, granted: &BTreeSet<String>) -> bool {
        self.0.iter().any(|privilege| granted.contains(privilege))
    }
}

impl Display for Privileges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("|"))
    }
}

impl From<&str> for Privileges {
    fn from(privilege: &str) -> Self {
        Self(vec![privilege.to_string()])
    }
}

impl From<String> for Privileges {
    fn from(privilege: String) -> Self {
        Self(vec![privilege])
    }
}

impl From<&[&str]> for Privileges {
    fn from(privileges: &[&str]) -> Self {
        Self(privileges.iter().map(|p| (*p).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Privileges {
    fn from(privileges: [&str; N]) -> Self {
        Self(privileges.iter().map(|p| (*p).to_string()).collect())
    }
}

impl From<Vec<String>> for Privileges {
    fn from(privileges: Vec<String>) -> Self {
        Self(privileges)
    }
}
