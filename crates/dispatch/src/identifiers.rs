//! Newtype identifiers.
//!
//! Every name that takes part in routing or isolation is a distinct newtype
//! wrapping a `String`. This prevents accidentally interchanging, for example,
//! a [`GroupKey`] with a [`CommandKey`] even though both are strings under the
//! hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Wraps a value the caller has already proven non-empty.
            #[allow(dead_code)]
            pub(crate) fn from_non_empty(value: String) -> Self {
                debug_assert!(!value.is_empty());
                Self(value)
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: declared names
// ---------------------------------------------------------------------------

string_id! {
    /// Stable name of a remote service (the client's target).
    ///
    /// Doubles as the fault-isolation group: every method bound against the
    /// same service shares this name as its [`GroupKey`].
    ServiceName
}

string_id! {
    /// Name of a declared remote interface (the contract a client is bound to).
    InterfaceName
}

string_id! {
    /// Name of a method declared on a remote interface.
    ///
    /// Overloads share a name; they are told apart by parameter types.
    MethodName
}

// ---------------------------------------------------------------------------
// Identifiers: isolation keys
// ---------------------------------------------------------------------------

string_id! {
    /// Fault-isolation group of an endpoint; derived from the target's
    /// [`ServiceName`].
    GroupKey
}

string_id! {
    /// Collision-resistant key of one method declaration, scoped to its
    /// interface. Format: `Interface#method(T1,T2)`.
    CommandKey
}

impl From<&ServiceName> for GroupKey {
    fn from(service: &ServiceName) -> Self {
        Self(service.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single invocation of a bound method.
///
/// Generated fresh for every call; recorded on the invocation span so the
/// request, response, retry, and failure events of one call can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Generates a new random invocation identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
