//! Authorizer tests.
//!
//! Most tests use a recording matcher so they pin down exactly what the
//! authorizer forwards; the `real_matcher` tests run the built-in one.

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeSet, VecDeque},
    rc::Rc,
    sync::Arc,
};

use portcullis_types::{IdentityKind, MEMBERSHIP_PRIVILEGE, PermissionSpec, SessionRecord};
use serde_json::{Map, Value, json};

use crate::{
    Authorizer, AuthzError, FactoryError, FactoryKind, GenericFactory, Identity,
    PermissionMatcher, Permissions, RecordIdentity, Subject,
};

// ============================================================================
// Fixtures
// ============================================================================

fn session(value: Value) -> SessionRecord {
    SessionRecord::try_from(value).expect("fixture is an object")
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

fn permissions() -> PermissionSpec {
    PermissionSpec::new()
        .grant("user", ["read"])
        .grant("/organizations/889900/users", ["write"])
        .grant("admin", ["full"])
}

/// Matcher that records its calls and replays canned answers.
#[derive(Default)]
struct RecordingMatcher {
    answers: RefCell<VecDeque<BTreeSet<String>>>,
    fallback: BTreeSet<String>,
    calls: RefCell<Vec<(PermissionSpec, Vec<String>)>>,
}

impl RecordingMatcher {
    fn returning(granted: &[&str]) -> Rc<Self> {
        Rc::new(Self {
            fallback: set(granted),
            ..Self::default()
        })
    }

    fn answering(answers: &[&[&str]]) -> Rc<Self> {
        Rc::new(Self {
            answers: RefCell::new(answers.iter().map(|a| set(a)).collect()),
            ..Self::default()
        })
    }

    fn calls(&self) -> Vec<(PermissionSpec, Vec<String>)> {
        self.calls.borrow().clone()
    }
}

impl PermissionMatcher for RecordingMatcher {
    fn matches(&self, spec: &PermissionSpec, groups: &[String]) -> BTreeSet<String> {
        self.calls.borrow_mut().push((spec.clone(), groups.to_vec()));
        self.answers
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

fn authorizer(value: Value, matcher: &Rc<RecordingMatcher>) -> Authorizer {
    Authorizer::new(session(value)).with_matcher(Rc::clone(matcher))
}

/// Subject that counts how often it is asked for its permissions.
struct Document {
    permissions: PermissionSpec,
    asked: Cell<usize>,
}

impl Subject for Document {
    fn permissions(&self) -> PermissionSpec {
        self.asked.set(self.asked.get() + 1);
        self.permissions.clone()
    }
}

#[derive(Debug)]
struct StubIdentity;

impl Identity for StubIdentity {
    fn groups(&self) -> Vec<String> {
        vec!["stub".to_string()]
    }
}

type Invocations = Rc<RefCell<Vec<(IdentityKind, Map<String, Value>)>>>;

/// Factory closure that records invocations and always returns the same identity.
fn recording_factory(
    identity: Arc<dyn Identity>,
) -> (
    impl Fn(IdentityKind, &Map<String, Value>) -> Result<Arc<dyn Identity>, FactoryError>,
    Invocations,
) {
    let invocations: Invocations = Rc::default();
    let seen = Rc::clone(&invocations);
    let factory = move |kind: IdentityKind,
                         data: &Map<String, Value>|
          -> Result<Arc<dyn Identity>, FactoryError> {
        seen.borrow_mut().push((kind, data.clone()));
        Ok(Arc::clone(&identity))
    };
    (factory, invocations)
}

// ============================================================================
// Session & identity resolution
// ============================================================================

#[test]
fn session_is_returned_unchanged() {
    let authz = Authorizer::new(session(json!({ "id": "eksdfiue" })));
    assert_eq!(authz.session().get("id"), Some(&json!("eksdfiue")));
}

#[test]
fn anonymous_session_has_no_identity() {
    let authz = Authorizer::new(SessionRecord::anonymous());

    assert!(authz.identity().unwrap().is_none());
    assert!(!authz.has_identity().unwrap());
    assert!(authz.groups().unwrap().is_empty());
}

#[test]
fn user_session_builds_identity_from_user_data() {
    let authz = Authorizer::new(session(json!({
        "user": {
            "id": "12345",
            "email": "john@example.com",
            "authz_groups": ["user", "/users/12345", "/organizations/889900/users"]
        }
    })));

    let identity = authz.identity().unwrap().expect("user identity");
    assert_eq!(identity.attribute("id"), Some(&json!("12345")));
    assert_eq!(
        identity.groups(),
        vec![
            "user",
            "/users/12345",
            "/organizations/889900/users",
            "john@example.com"
        ]
    );
}

#[test]
fn party_session_builds_identity_from_party_data() {
    let authz = Authorizer::new(session(json!({ "party": { "email": "john@example.com" } })));

    let identity = authz.identity().unwrap().expect("party identity");
    assert_eq!(identity.attribute("email"), Some(&json!("john@example.com")));
    assert_eq!(identity.groups(), vec!["john@example.com"]);
}

#[test]
fn user_takes_precedence_over_party() {
    let (factory, invocations) = recording_factory(Arc::new(StubIdentity));
    let authz = Authorizer::new(session(json!({
        "party": { "email": "party@example.com" },
        "user": { "email": "user@example.com" },
    })))
    .with_factory(factory);

    authz.identity().unwrap();

    let invocations = invocations.borrow();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].0, IdentityKind::User);
    assert_eq!(invocations[0].1.get("email"), Some(&json!("user@example.com")));
}

#[test]
fn malformed_user_does_not_fall_back_to_party() {
    let (factory, invocations) = recording_factory(Arc::new(StubIdentity));
    let authz = Authorizer::new(session(json!({
        "user": "john",
        "party": { "email": "party@example.com" },
    })))
    .with_factory(factory);

    assert!(authz.identity().unwrap().is_none());
    assert!(!authz.is_in_group("party@example.com").unwrap());
    assert!(!authz.is_in_group("stub").unwrap());
    assert!(invocations.borrow().is_empty());
}

#[test]
fn null_user_falls_back_to_party() {
    let (factory, invocations) = recording_factory(Arc::new(StubIdentity));
    let authz = Authorizer::new(session(json!({
        "user": null,
        "party": { "email": "party@example.com" },
    })))
    .with_factory(factory);

    assert!(authz.has_identity().unwrap());
    assert_eq!(invocations.borrow()[0].0, IdentityKind::Party);
}

#[test]
fn factory_runs_once_for_users() {
    let identity: Arc<dyn Identity> = Arc::new(StubIdentity);
    let (factory, invocations) = recording_factory(Arc::clone(&identity));
    let user = json!({ "id": "12345", "email": "john@example.com" });
    let authz = Authorizer::new(session(json!({ "user": user.clone() }))).with_factory(factory);

    let first = authz.identity().unwrap().expect("identity");
    let second = authz.identity().unwrap().expect("identity");

    assert!(Arc::ptr_eq(&first, &identity));
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(invocations.borrow().len(), 1);
    assert_eq!(invocations.borrow()[0].0, IdentityKind::User);
    assert_eq!(Value::Object(invocations.borrow()[0].1.clone()), user);
}

#[test]
fn factory_runs_once_for_parties() {
    let (factory, invocations) = recording_factory(Arc::new(StubIdentity));
    let authz = Authorizer::new(session(json!({ "party": { "email": "john@example.com" } })))
        .with_factory(factory);

    authz.identity().unwrap();
    authz.is_in_group("stub").unwrap();
    authz.identity().unwrap();

    assert_eq!(invocations.borrow().len(), 1);
    assert_eq!(invocations.borrow()[0].0, IdentityKind::Party);
}

#[test]
fn anonymous_outcome_is_memoized() {
    let (factory, invocations) = recording_factory(Arc::new(StubIdentity));
    let authz = Authorizer::new(SessionRecord::anonymous()).with_factory(factory);

    assert!(authz.identity().unwrap().is_none());
    assert!(authz.identity().unwrap().is_none());
    assert!(invocations.borrow().is_empty());
}

#[test]
fn factory_failure_propagates_and_is_retried() {
    let attempts = Rc::new(Cell::new(0));
    let counter = Rc::clone(&attempts);
    let factory = move |_: IdentityKind,
                        data: &Map<String, Value>|
          -> Result<Arc<dyn Identity>, FactoryError> {
        counter.set(counter.get() + 1);
        if counter.get() == 1 {
            return Err(FactoryError::new("directory unavailable"));
        }
        Ok(Arc::new(RecordIdentity::from_data(data.clone())))
    };
    let authz = Authorizer::new(session(json!({ "user": { "email": "john@example.com" } })))
        .with_factory(factory);

    let err = authz.identity().unwrap_err();
    assert!(matches!(err, AuthzError::Factory { kind: IdentityKind::User, .. }));
    assert_eq!(
        err.to_string(),
        "failed to build user identity: directory unavailable"
    );

    assert!(authz.identity().unwrap().is_some());
    assert_eq!(attempts.get(), 2);
}

#[test]
fn factory_kind_selects_builtin_factory() {
    let party = json!({ "party": { "id": "p-1", "email": "john@example.com", "authz_groups": ["user"] } });

    let generic = Authorizer::new(session(party.clone())).with_factory_kind(FactoryKind::Generic);
    assert_eq!(generic.groups().unwrap(), vec!["user", "john@example.com"]);

    let private = Authorizer::new(session(party)).with_factory_kind(FactoryKind::PrivacyPreserving);
    assert_eq!(private.groups().unwrap(), vec!["john@example.com"]);
}

// ============================================================================
// Group membership
// ============================================================================

#[test]
fn is_in_group_without_identity() {
    let matcher = RecordingMatcher::returning(&[]);
    let authz = authorizer(json!({}), &matcher);

    assert!(!authz.is_in_group("user").unwrap());
    assert_eq!(
        matcher.calls(),
        vec![(PermissionSpec::membership("user"), Vec::new())]
    );
}

#[test]
fn is_in_group_with_user() {
    let matcher = RecordingMatcher::answering(&[&[MEMBERSHIP_PRIVILEGE], &[]]);
    let authz = authorizer(
        json!({ "user": { "email": "john@example.com", "authz_groups": ["user"] } }),
        &matcher,
    );

    assert!(authz.is_in_group("user").unwrap());
    assert!(!authz.is_in_group("admin").unwrap());

    let groups = vec!["user".to_string(), "john@example.com".to_string()];
    assert_eq!(
        matcher.calls(),
        vec![
            (PermissionSpec::membership("user"), groups.clone()),
            (PermissionSpec::membership("admin"), groups),
        ]
    );
}

#[test]
fn is_in_group_with_party_ignores_declared_groups() {
    let matcher = RecordingMatcher::returning(&[]);
    let authz = authorizer(
        json!({ "party": { "email": "john@example.com", "authz_groups": ["user"] } }),
        &matcher,
    );

    assert!(!authz.is_in_group("user").unwrap());
    assert_eq!(
        matcher.calls(),
        vec![(
            PermissionSpec::membership("user"),
            vec!["john@example.com".to_string()]
        )]
    );
}

// ============================================================================
// Privilege decisions
// ============================================================================

#[test]
fn is_allowed_without_identity() {
    let matcher = RecordingMatcher::returning(&[]);
    let authz = authorizer(json!({}), &matcher);
    let spec = permissions();

    assert!(!authz.is_allowed("read", &spec).unwrap());
    assert!(!authz.is_allowed("write", &spec).unwrap());
    assert!(!authz.is_allowed("full", &spec).unwrap());
    assert!(!authz.is_allowed(["write", "full"], &spec).unwrap());

    let calls = matcher.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|(s, groups)| *s == spec && groups.is_empty()));
}

#[test]
fn is_allowed_with_user() {
    let matcher = RecordingMatcher::returning(&["read"]);
    let authz = authorizer(json!({ "user": { "authz_groups": ["user"] } }), &matcher);
    let spec = permissions();

    assert!(authz.is_allowed("read", &spec).unwrap());
    assert!(!authz.is_allowed("write", &spec).unwrap());
    assert!(!authz.is_allowed("full", &spec).unwrap());
    assert!(!authz.is_allowed(["write", "full"], &spec).unwrap());

    assert!(matcher.calls().iter().all(|(_, groups)| *groups == vec!["user".to_string()]));
}

#[test]
fn is_allowed_with_organization_user() {
    let matcher = RecordingMatcher::returning(&["read", "write"]);
    let authz = authorizer(
        json!({ "user": { "authz_groups": ["user", "/organizations/889900/users"] } }),
        &matcher,
    );
    let spec = permissions();

    assert!(authz.is_allowed("read", &spec).unwrap());
    assert!(authz.is_allowed("write", &spec).unwrap());
    assert!(!authz.is_allowed("full", &spec).unwrap());
    assert!(authz.is_allowed(["write", "full"], &spec).unwrap());
}

#[test]
fn is_allowed_with_admin() {
    let matcher = RecordingMatcher::returning(&["full"]);
    let authz = authorizer(json!({ "user": { "authz_groups": ["admin"] } }), &matcher);
    let spec = permissions();

    assert!(!authz.is_allowed("read", &spec).unwrap());
    assert!(!authz.is_allowed("write", &spec).unwrap());
    assert!(authz.is_allowed("full", &spec).unwrap());
    assert!(authz.is_allowed(["write", "full"], &spec).unwrap());
}

#[test]
fn is_allowed_with_party() {
    let matcher = RecordingMatcher::returning(&["read"]);
    let authz = authorizer(json!({ "party": { "email": "john@example.com" } }), &matcher);
    let spec = PermissionSpec::new()
        .grant("user", ["read"])
        .grant("john@example.com", ["read"])
        .grant("/organizations/889900/users", ["write"]);

    assert!(authz.is_allowed("read", &spec).unwrap());
    assert!(!authz.is_allowed("write", &spec).unwrap());

    let calls = matcher.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(_, groups)| *groups == vec!["john@example.com".to_string()]));
}

#[test]
fn is_allowed_with_empty_grant_denies_everything() {
    let matcher = RecordingMatcher::returning(&[]);
    let authz = authorizer(json!({ "user": { "authz_groups": ["admin"] } }), &matcher);
    let spec = permissions();

    for privilege in ["read", "write", "full", "anything"] {
        assert!(!authz.is_allowed(privilege, &spec).unwrap());
    }
}

#[test]
fn is_allowed_with_subject_asks_once() {
    let matcher = RecordingMatcher::returning(&[]);
    let authz = authorizer(json!({}), &matcher);
    let document = Document {
        permissions: permissions(),
        asked: Cell::new(0),
    };

    assert!(!authz.is_allowed("read", Permissions::subject(&document)).unwrap());

    assert_eq!(document.asked.get(), 1);
    assert_eq!(matcher.calls(), vec![(permissions(), Vec::new())]);
}

#[test]
fn is_allowed_with_json_spec() {
    let matcher = RecordingMatcher::returning(&["write"]);
    let authz = authorizer(json!({ "user": { "authz_groups": ["user"] } }), &matcher);
    let spec = json!({ "user": ["read"], "/organizations/889900/users": "write" });

    assert!(authz.is_allowed(["write", "full"], &spec).unwrap());
    assert_eq!(
        matcher.calls()[0].0,
        PermissionSpec::new()
            .grant("user", ["read"])
            .grant("/organizations/889900/users", ["write"])
    );
}

#[test]
fn is_allowed_with_invalid_spec_fails_before_matching() {
    let matcher = RecordingMatcher::returning(&["read"]);
    let (factory, invocations) = recording_factory(Arc::new(StubIdentity));
    let authz = authorizer(json!({ "user": {} }), &matcher).with_factory(factory);

    let err = authz.is_allowed("read", &json!(42)).unwrap_err();

    assert!(matches!(err, AuthzError::InvalidArgument(_)));
    assert!(matcher.calls().is_empty());
    assert!(invocations.borrow().is_empty());
}

// ============================================================================
// Built-in matcher
// ============================================================================

mod real_matcher {
    use super::*;

    #[test]
    fn is_in_group() {
        let authz = Authorizer::new(session(json!({ "user": { "authz_groups": ["user"] } })));

        assert!(authz.is_in_group("user").unwrap());
        assert!(!authz.is_in_group("admin").unwrap());
    }

    #[test]
    fn is_allowed() {
        let authz = Authorizer::new(session(json!({ "user": { "authz_groups": ["user"] } })));
        let spec = PermissionSpec::new()
            .grant("user", ["read"])
            .grant("/organizations/889900/users", ["write"]);

        assert!(authz.is_allowed("read", &spec).unwrap());
        assert!(!authz.is_allowed("write", &spec).unwrap());
    }

    #[test]
    fn email_acts_as_personal_group() {
        let authz = Authorizer::new(session(json!({ "party": { "email": "john@example.com" } })))
            .with_factory(GenericFactory);
        let spec = PermissionSpec::new().grant("*@example.com", ["comment"]);

        assert!(authz.is_in_group("john@example.com").unwrap());
        assert!(authz.is_allowed("comment", &spec).unwrap());
    }

    #[test]
    fn anonymous_is_never_in_a_group() {
        let authz = Authorizer::new(SessionRecord::anonymous());

        for group in ["user", "admin", "*", ""] {
            assert!(!authz.is_in_group(group).unwrap());
        }
    }

    #[test]
    fn granted_set_is_deduplicated() {
        let authz = Authorizer::new(session(json!({ "user": { "authz_groups": ["a", "b"] } })));
        let spec = PermissionSpec::new().grant("a", ["read"]).grant("b", ["read"]);

        assert!(authz.is_allowed(["read"], &spec).unwrap());
    }
}
