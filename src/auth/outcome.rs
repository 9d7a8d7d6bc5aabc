use serde_json::Value;

/// The result of the most recent authentication attempt.
///
/// `Resolved` carries whatever identity the application's authenticator
/// produced. `Rejected` carries its reason; both are opaque to the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome<V> {
    Pending,
    Resolved(V),
    Rejected(String),
}

impl<V> AuthOutcome<V> {
    pub fn is_settled(&self) -> bool {
        !matches!(self, AuthOutcome::Pending)
    }

    /// The value handed to restriction predicates: the resolved identity, or
    /// nothing when authentication was rejected or has not settled.
    pub fn value(&self) -> Option<&V> {
        match self {
            AuthOutcome::Resolved(value) => Some(value),
            _ => None,
        }
    }
}

impl<V: AuthValue> AuthOutcome<V> {
    /// True only for a resolved, truthy identity.
    pub fn is_authenticated(&self) -> bool {
        self.value().is_some_and(AuthValue::is_authenticated)
    }
}

/// Identity values produced by an authenticator.
///
/// `is_authenticated` decides whether a denied navigation means "log in first"
/// (false) or "you are logged in and still not allowed" (true). Application
/// types that always represent a real user can rely on the default.
pub trait AuthValue: Clone + Send + Sync + 'static {
    fn is_authenticated(&self) -> bool {
        true
    }
}

/// JSON identities follow JavaScript truthiness: `null`, `false`, `0` and `""`
/// are anonymous, everything else (including empty objects) is a user.
impl AuthValue for Value {
    fn is_authenticated(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

impl AuthValue for bool {
    fn is_authenticated(&self) -> bool {
        *self
    }
}

impl AuthValue for String {
    fn is_authenticated(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: AuthValue> AuthValue for Option<T> {
    fn is_authenticated(&self) -> bool {
        self.as_ref().is_some_and(AuthValue::is_authenticated)
    }
}
