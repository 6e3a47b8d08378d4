//! Static interface descriptions and the endpoint identities derived from them.
//!
//! A remote interface is described up front as an enumerable list of method
//! declarations ([`InterfaceDescriptor`]). Nothing is discovered at call time:
//! identities are derived once from `(name, parameter types)` tuples and kept
//! in an immutable [`EndpointIndex`].
//!
//! An [`EndpointIdentity`] pairs the target's service name (the isolation
//! group) with a command key unique to the method declaration. The request
//! mapping carried by a [`MethodDescriptor`] (request line, bindings) plays no
//! part in the identity, so changing how a method maps onto HTTP never moves
//! it to a different bulkhead.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{CommandKey, ConfigError, GroupKey, InterfaceName, MethodName, Target};

// ---------------------------------------------------------------------------
// Method declarations
// ---------------------------------------------------------------------------

/// Where an argument goes in the outgoing request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamBinding {
    /// Substituted for the `{name}` placeholder in the request path.
    Path(String),
    /// Appended as a `name=value` query pair.
    Query(String),
    /// Sent as the header `name`.
    Header(String),
    /// Encoded as the request body.
    Body,
}

/// One declared parameter: its type (part of the identity) and its binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub type_name: String,
    pub binding: ParamBinding,
}

/// The identity-relevant part of a method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: MethodName,
    /// Parameter type names in declaration order, whitespace removed.
    pub param_types: Vec<String>,
}

/// Declaration of one remote method.
///
/// Built fluently:
///
/// ```
/// use dispatch::{MethodDescriptor, MethodName};
///
/// let get = MethodDescriptor::new(MethodName::new("getVehicle").unwrap())
///     .request_line("GET /vehicles/{id}")
///     .header("Accept: application/json")
///     .path_param("id", "i64")
///     .returns("VehicleDto");
/// assert_eq!(get.params().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    name: MethodName,
    request_line: Option<String>,
    headers: Vec<String>,
    params: Vec<ParamDescriptor>,
    return_type: Option<String>,
}

impl MethodDescriptor {
    pub fn new(name: MethodName) -> Self {
        Self {
            name,
            request_line: None,
            headers: Vec::new(),
            params: Vec::new(),
            return_type: None,
        }
    }

    /// Sets the request line, e.g. `"GET /vehicles/{id}"`.
    pub fn request_line(mut self, line: impl Into<String>) -> Self {
        self.request_line = Some(line.into());
        self
    }

    /// Adds a static header line, e.g. `"Accept: application/json"`.
    pub fn header(mut self, line: impl Into<String>) -> Self {
        self.headers.push(line.into());
        self
    }

    pub fn path_param(self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.param(type_name, ParamBinding::Path(name.into()))
    }

    pub fn query_param(self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.param(type_name, ParamBinding::Query(name.into()))
    }

    pub fn header_param(self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.param(type_name, ParamBinding::Header(name.into()))
    }

    pub fn body(self, type_name: impl Into<String>) -> Self {
        self.param(type_name, ParamBinding::Body)
    }

    /// Adds a parameter with an explicit binding.
    pub fn param(mut self, type_name: impl Into<String>, binding: ParamBinding) -> Self {
        self.params.push(ParamDescriptor {
            type_name: type_name.into(),
            binding,
        });
        self
    }

    /// Declared return type; informational only.
    pub fn returns(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = Some(type_name.into());
        self
    }

    pub fn name(&self) -> &MethodName {
        &self.name
    }

    pub fn request_line_str(&self) -> Option<&str> {
        self.request_line.as_deref()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    pub fn return_type(&self) -> Option<&str> {
        self.return_type.as_deref()
    }

    /// The `(name, parameter types)` tuple the identity is derived from.
    pub fn signature(&self) -> MethodSignature {
        MethodSignature {
            name: self.name.clone(),
            param_types: self
                .params
                .iter()
                .map(|p| p.type_name.split_whitespace().collect::<String>())
                .collect(),
        }
    }
}

/// A remote interface: a name plus its method declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    name: InterfaceName,
    methods: Vec<MethodDescriptor>,
}

impl InterfaceDescriptor {
    pub fn new(name: InterfaceName) -> Self {
        Self {
            name,
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn name(&self) -> &InterfaceName {
        &self.name
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Command key for a method declaration: `Interface#method(T1,T2)`.
pub fn config_key(interface: &InterfaceName, signature: &MethodSignature) -> CommandKey {
    CommandKey::from_non_empty(format!(
        "{}#{}({})",
        interface,
        signature.name,
        signature.param_types.join(",")
    ))
}

/// Stable key of one remote method on one target service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointIdentity {
    group_key: GroupKey,
    command_key: CommandKey,
}

impl EndpointIdentity {
    pub fn new(group_key: GroupKey, command_key: CommandKey) -> Self {
        Self {
            group_key,
            command_key,
        }
    }

    /// Derives the identity of `method` when called on `target`.
    ///
    /// Pure: the same declaration always yields the same identity. Distinct
    /// signatures can still render to the same command key (a type named
    /// `A,B` against types `A` and `B`); [`EndpointIndex::build`] rejects those.
    pub fn identify(target: &Target, method: &MethodDescriptor) -> Self {
        Self {
            group_key: GroupKey::from(target.name()),
            command_key: config_key(target.interface(), &method.signature()),
        }
    }

    pub fn group_key(&self) -> &GroupKey {
        &self.group_key
    }

    pub fn command_key(&self) -> &CommandKey {
        &self.command_key
    }
}

impl std::fmt::Display for EndpointIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.group_key, self.command_key)
    }
}

/// Identities of every method of an interface bound to a target, computed once.
#[derive(Debug, Clone)]
pub struct EndpointIndex {
    entries: HashMap<MethodSignature, EndpointIdentity>,
}

impl EndpointIndex {
    /// Computes the identity of every declared method.
    ///
    /// Fails if the interface is not the one the target serves, or if two
    /// declarations share a signature or a command key.
    pub fn build(target: &Target, interface: &InterfaceDescriptor) -> Result<Self, ConfigError> {
        if target.interface() != interface.name() {
            return Err(ConfigError::InterfaceMismatch {
                expected: target.interface().clone(),
                actual: interface.name().clone(),
            });
        }

        let mut entries = HashMap::with_capacity(interface.methods().len());
        let mut command_keys = HashSet::with_capacity(interface.methods().len());
        for method in interface.methods() {
            let identity = EndpointIdentity::identify(target, method);
            if !command_keys.insert(identity.command_key.clone())
                || entries.insert(method.signature(), identity.clone()).is_some()
            {
                return Err(ConfigError::DuplicateMethod {
                    command_key: identity.command_key,
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, signature: &MethodSignature) -> Option<&EndpointIdentity> {
        self.entries.get(signature)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MethodSignature, &EndpointIdentity)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceName;

    fn method(name: &str) -> MethodDescriptor {
        MethodDescriptor::new(MethodName::new(name).unwrap())
    }

    fn target() -> Target {
        Target::named(
            InterfaceName::new("Vehicles").unwrap(),
            ServiceName::new("trafficsoft").unwrap(),
            "https://api.example.com",
        )
        .unwrap()
    }

    #[test]
    fn command_key_includes_interface_name_and_types() {
        let m = method("search").query_param("q", "String").query_param("limit", "u32");
        let id = EndpointIdentity::identify(&target(), &m);
        assert_eq!(id.group_key().as_str(), "trafficsoft");
        assert_eq!(id.command_key().as_str(), "Vehicles#search(String,u32)");
    }

    #[test]
    fn identity_is_stable_across_calls() {
        let m = method("get").path_param("id", "i64");
        assert_eq!(
            EndpointIdentity::identify(&target(), &m),
            EndpointIdentity::identify(&target(), &m)
        );
    }

    #[test]
    fn overloads_get_distinct_identities() {
        let by_id = method("get").path_param("id", "i64");
        let by_name = method("get").query_param("name", "String");
        let no_args = method("get");
        let a = EndpointIdentity::identify(&target(), &by_id);
        let b = EndpointIdentity::identify(&target(), &by_name);
        let c = EndpointIdentity::identify(&target(), &no_args);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn bindings_do_not_affect_identity() {
        let as_path = method("get").path_param("id", "i64").request_line("GET /a/{id}");
        let as_query = method("get").query_param("id", "i64").request_line("GET /b");
        assert_eq!(
            EndpointIdentity::identify(&target(), &as_path),
            EndpointIdentity::identify(&target(), &as_query)
        );
    }

    #[test]
    fn whitespace_in_type_names_is_ignored() {
        let a = method("put").body("HashMap<String, u32>");
        let b = method("put").body("HashMap<String,u32>");
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn index_rejects_duplicate_signatures() {
        let interface = InterfaceDescriptor::new(InterfaceName::new("Vehicles").unwrap())
            .method(method("get").path_param("id", "i64").request_line("GET /a/{id}"))
            .method(method("get").query_param("id", "i64").request_line("GET /b"));
        assert!(matches!(
            EndpointIndex::build(&target(), &interface),
            Err(ConfigError::DuplicateMethod { .. })
        ));
    }

    #[test]
    fn index_rejects_signatures_rendering_to_one_command_key() {
        let joined = InterfaceDescriptor::new(InterfaceName::new("Vehicles").unwrap())
            .method(method("find").param("A,B", ParamBinding::Query("q".into())))
            .method(
                method("find")
                    .param("A", ParamBinding::Query("a".into()))
                    .param("B", ParamBinding::Query("b".into())),
            );
        assert!(matches!(
            EndpointIndex::build(&target(), &joined),
            Err(ConfigError::DuplicateMethod { command_key }) if command_key.as_str() == "Vehicles#find(A,B)"
        ));

        let empty_type = InterfaceDescriptor::new(InterfaceName::new("Vehicles").unwrap())
            .method(method("list"))
            .method(method("list").param("", ParamBinding::Body));
        assert!(matches!(
            EndpointIndex::build(&target(), &empty_type),
            Err(ConfigError::DuplicateMethod { .. })
        ));
    }

    #[test]
    fn index_rejects_foreign_interface() {
        let interface = InterfaceDescriptor::new(InterfaceName::new("Drivers").unwrap());
        assert!(matches!(
            EndpointIndex::build(&target(), &interface),
            Err(ConfigError::InterfaceMismatch { .. })
        ));
    }

    #[test]
    fn index_holds_every_method() {
        let interface = InterfaceDescriptor::new(InterfaceName::new("Vehicles").unwrap())
            .method(method("list"))
            .method(method("get").path_param("id", "i64"));
        let index = EndpointIndex::build(&target(), &interface).unwrap();
        assert_eq!(index.len(), 2);
        let sig = method("list").signature();
        assert_eq!(
            index.get(&sig).unwrap().command_key().as_str(),
            "Vehicles#list()"
        );
    }
}
