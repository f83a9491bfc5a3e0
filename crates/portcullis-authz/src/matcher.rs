//! Permission matching.
//!
//! A matcher turns a permission specification and a group set into the set
//! of privileges that group set unlocks. The authorizer depends only on the
//! [`PermissionMatcher`] contract; [`GroupMatcher`] is the built-in
//! implementation.

use std::{collections::BTreeSet, rc::Rc, sync::Arc};

use portcullis_types::PermissionSpec;

/// Resolves granted privileges for a group set.
///
/// Implementations must be deterministic, must treat `groups` as an
/// unordered set, and must return an empty set (never fail) when nothing
/// is granted.
pub trait PermissionMatcher {
    fn matches(&self, spec: &PermissionSpec, groups: &[String]) -> BTreeSet<String>;
}

impl<M: PermissionMatcher + ?Sized> PermissionMatcher for Rc<M> {
    fn matches(&self, spec: &PermissionSpec, groups: &[String]) -> BTreeSet<String> {
        (**self).matches(spec, groups)
    }
}

impl<M: PermissionMatcher + ?Sized> PermissionMatcher for Arc<M> {
    fn matches(&self, spec: &PermissionSpec, groups: &[String]) -> BTreeSet<String> {
        (**self).matches(spec, groups)
    }
}

/// Matches spec keys as group patterns.
///
/// **Pattern syntax:**
/// - `"admin"` - exact group name
/// - `"/organizations/*/users"` - `*` matches any run of characters
/// - `"!user"` - applies when no group matches `user`
///
/// The privileges of every applying entry are unioned.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupMatcher;

impl GroupMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Returns whether a spec key applies to the group set.
    pub fn applies(pattern: &str, groups: &[String]) -> bool {
        match pattern.strip_prefix('!') {
            Some(negated) => !groups.iter().any(|group| glob_matches(negated, group)),
            None => groups.iter().any(|group| glob_matches(pattern, group)),
        }
    }
}

impl PermissionMatcher for GroupMatcher {
    fn matches(&self, spec: &PermissionSpec, groups: &[String]) -> BTreeSet<String> {
        spec.iter()
            .filter(|(pattern, _)| Self::applies(pattern, groups))
            .flat_map(|(_, privileges)| privileges.iter().cloned())
            .collect()
    }
}

/// Wildcard match where `*` matches any (possibly empty) run of characters.
fn glob_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` seen and the text index it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star, tried)) = backtrack {
            p = star + 1;
            t = tried + 1;
            backtrack = Some((star, tried + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
