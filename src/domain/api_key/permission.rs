//! Scoped permissions and the matching rules applied to them
//!
//! A scope names an authorizable action as a dot-separated path, e.g.
//! `admin.keys.read`. A held scope ending in `.*` covers every path under
//! its prefix, and the bare `*` covers everything.

use serde::{Deserialize, Serialize};

use super::validation::{validate_scope, ScopeParseError};

/// A validated scope string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scope(String);

impl Scope {
    /// Create a new scope after validation
    pub fn new(scope: impl Into<String>) -> Result<Self, ScopeParseError> {
        let scope = scope.into();
        validate_scope(&scope)?;
        Ok(Self(scope))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this scope is the bare superuser wildcard
    pub fn is_superuser(&self) -> bool {
        self.0 == "*"
    }

    /// Whether this held scope covers the `required` scope path.
    ///
    /// Comparison is byte-exact; there is no case folding and no partial
    /// matching beyond the trailing-wildcard rule.
    pub fn covers(&self, required: &str) -> bool {
        if self.0 == "*" {
            return true;
        }

        if let Some(prefix) = self.0.strip_suffix('*') {
            // Validation guarantees the wildcard sits on a segment
            // boundary, so the prefix ends with the separator.
            if prefix.ends_with('.') {
                return required.starts_with(prefix);
            }
        }

        self.0 == required
    }
}

impl TryFrom<String> for Scope {
    type Error = ScopeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.0
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The set of scopes held by an API key
///
/// Stored as an ordered list for stable serialization; ordering carries no
/// meaning and duplicates are harmless.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSet(Vec<Scope>);

impl ScopeSet {
    /// Create an empty scope set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope set holding only the superuser wildcard
    pub fn superuser() -> Self {
        Self(vec![Scope::new("*").expect("bare wildcard is a valid scope")])
    }

    /// Parse a list of scope strings into a set
    pub fn parse(scopes: impl IntoIterator<Item = impl Into<String>>) -> Result<Self, ScopeParseError> {
        let scopes = scopes
            .into_iter()
            .map(Scope::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(scopes))
    }

    /// Whether any held scope covers the required scope path
    pub fn matches(&self, required: &str) -> bool {
        self.0.iter().any(|held| held.covers(required))
    }

    /// The held scopes, in stored order
    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<Scope>> for ScopeSet {
    fn from(scopes: Vec<Scope>) -> Self {
        Self(scopes)
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<T: IntoIterator<Item = Scope>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Authorization policy applied on top of raw scope matching.
///
/// Cross-namespace rule: a key that holds the full admin namespace
/// (`admin.*`, or the bare `*`) is additionally granted every `public.*`
/// scope. This is the one deliberate implication between namespaces; it
/// lives here so routes never have to special-case admin keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopePolicy;

const PUBLIC_NAMESPACE: &str = "public.";
const ADMIN_NAMESPACE_WILDCARD: &str = "admin.*";

impl ScopePolicy {
    /// Whether `held` authorizes the `required` scope under this policy
    pub fn authorizes(held: &ScopeSet, required: &str) -> bool {
        if held.matches(required) {
            return true;
        }

        required.starts_with(PUBLIC_NAMESPACE) && held.matches(ADMIN_NAMESPACE_WILDCARD)
    }
}
