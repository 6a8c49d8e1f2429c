//! Deferred references and their resolution into template expressions
//!
//! A property that holds "the identifier of another resource" is a [DeferredRef], never a string. The target may not
//! be named yet when the property is declared, and its concrete identifier only exists once deployed. [Resolver]
//! rewrites each reference into an ARM template expression (`[resourceId(...)]`, `[reference(...)]`) the platform
//! evaluates at deployment time.
//!
//! Role assignments ([Grant]) additionally need a name that is identical on every run, otherwise each deployment
//! would try to create a duplicate assignment. It is derived with the platform's `guid()` function from the
//! (scope, role, grantee) triple, see [grant_identifier].
use crate::error::{Issue, SynthesisError};
use crate::resource::{BoundaryKind, BoundaryRecord, ResourceRecord};
use crate::tree::{Capability, ConstructTree, NodeId, NodePath};
use crate::value::Value;
use indexmap::IndexMap;

/// Property value of a resource before resolution
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Literal(Value),
    Deferred(DeferredRef),
    Array(Vec<Property>),
    Object(IndexMap<String, Property>),
}

impl Property {
    pub fn object<K: Into<String>, V: Into<Property>>(
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Property::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn array<V: Into<Property>>(items: impl IntoIterator<Item = V>) -> Self {
        Property::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::Literal(value) => value.as_str(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Property::Literal(value) => value.as_i64(),
            _ => None,
        }
    }

    /// Field of an object, literal or not
    pub fn get(&self, key: &str) -> Option<Property> {
        match self {
            Property::Object(object) => object.get(key).cloned(),
            Property::Literal(Value::Object(object)) => {
                object.get(key).cloned().map(Property::Literal)
            }
            _ => None,
        }
    }

    /// Elements of an array, literal or not
    pub fn elements(&self) -> Option<Vec<Property>> {
        match self {
            Property::Array(array) => Some(array.clone()),
            Property::Literal(Value::Array(array)) => {
                Some(array.iter().cloned().map(Property::Literal).collect())
            }
            _ => None,
        }
    }
}

macro_rules! literal_property {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Property {
                fn from(value: $ty) -> Self {
                    Property::Literal(value.into())
                }
            }
        )+
    };
}

literal_property!(Value, String, &str, bool, i64, f64);

impl From<DeferredRef> for Property {
    fn from(value: DeferredRef) -> Self {
        Property::Deferred(value)
    }
}

/// What a [DeferredRef] asks of its target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Request {
    /// Resource identifier
    Id,
    /// Resource name
    Name,
    /// Principal of the target's managed identity, known after deployment
    PrincipalId,
    /// Any other runtime property, e.g. `properties.primaryEndpoints.blob`
    Output(String),
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Request::Id => f.write_str("id"),
            Request::Name => f.write_str("name"),
            Request::PrincipalId => f.write_str("principal_id"),
            Request::Output(path) => f.write_str(path),
        }
    }
}

/// Placeholder for another node's identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_new::new)]
pub struct DeferredRef {
    pub target: NodePath,
    pub request: Request,
}

impl DeferredRef {
    pub fn id(target: NodePath) -> Self {
        Self::new(target, Request::Id)
    }

    pub fn name(target: NodePath) -> Self {
        Self::new(target, Request::Name)
    }

    pub fn principal_id(target: NodePath) -> Self {
        Self::new(target, Request::PrincipalId)
    }

    pub fn output(target: NodePath, path: impl Into<String>) -> Self {
        Self::new(target, Request::Output(path.into()))
    }
}

impl std::fmt::Display for DeferredRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.target, self.request)
    }
}

/// A role granted to a principal on a scope
#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    /// Resource (or resource group) the role applies to
    pub scope: DeferredRef,
    /// Role definition GUID
    pub role: String,
    /// A principal GUID, or the id of a node carrying a managed identity
    pub grantee: Property,
    pub principal_type: Option<String>,
}

impl Grant {
    pub fn new(scope: DeferredRef, role: impl Into<String>, grantee: impl Into<Property>) -> Self {
        Self {
            scope,
            role: role.into(),
            grantee: grantee.into(),
            principal_type: None,
        }
    }

    pub fn with_principal_type(mut self, principal_type: impl Into<String>) -> Self {
        self.principal_type = Some(principal_type.into());
        self
    }
}

/// Well-known built-in role definition ids
pub mod roles {
    pub const READER: &str = "acdd72a7-3385-48ef-bd42-f606fba81ae7";
    pub const CONTRIBUTOR: &str = "b24988ac-6180-42a0-ab88-20f7382dd24c";
    pub const STORAGE_BLOB_DATA_CONTRIBUTOR: &str = "ba92f5b4-2d11-453d-a403-e96b0029c9fe";
    pub const KEY_VAULT_SECRETS_USER: &str = "4633458b-17de-408a-b874-0445c86b69e6";
}

/// Stable name of a role assignment
///
/// Arguments are template expressions (without the enclosing brackets) or quoted literals.
pub fn grant_identifier(scope: &str, role: &str, grantee: &str) -> String {
    format!("[guid({scope}, {}, {grantee})]", quote(role))
}

/// Template string literal
pub fn quote(literal: &str) -> String {
    format!("'{}'", literal.replace('\'', "''"))
}

/// Rewrites [DeferredRef]s into template expressions
///
/// Expressions depend on where they are emitted: a target in the same resource group is addressed by type and name
/// alone, one in another resource group is qualified with that group's name.
#[derive(derive_new::new)]
pub struct Resolver<'a> {
    tree: &'a ConstructTree,
    records: &'a IndexMap<NodeId, ResourceRecord>,
    boundaries: &'a IndexMap<NodeId, BoundaryRecord>,
}

impl<'a> Resolver<'a> {
    /// Resolves `reference`, declared on `consumer`
    pub fn resolve(&self, consumer: NodeId, reference: &DeferredRef) -> Result<String, SynthesisError> {
        let target = self.target(consumer, reference)?;

        if let Some(boundary) = self.boundaries.get(&target) {
            return match &reference.request {
                Request::Id => Ok(format!("[{}]", self.boundary_id(consumer, target)?)),
                Request::Name => boundary.name().map(str::to_string).ok_or_else(|| {
                    self.unresolved(consumer, reference, "a subscription has no name")
                }),
                _ => Err(self.unresolved(consumer, reference, "deployment scopes have no outputs")),
            };
        }

        let Some(record) = self.records.get(&target) else {
            return Err(self.unresolved(consumer, reference, "target is not a resource"));
        };

        match &reference.request {
            Request::Id => Ok(format!("[{}]", self.resource_id(consumer, target)?)),
            Request::Name => Ok(record.name().to_string()),
            Request::PrincipalId => {
                if !self.tree.node(target).has(Capability::Grantable) {
                    return Err(self.unresolved(consumer, reference, "target has no managed identity"));
                }

                let id = self.resource_id(consumer, target)?;
                if record.is_identity() {
                    Ok(format!(
                        "[reference({id}, {}).principalId]",
                        quote(record.api_version())
                    ))
                } else {
                    Ok(format!(
                        "[reference({id}, {}, 'full').identity.principalId]",
                        quote(record.api_version())
                    ))
                }
            }
            Request::Output(path) => {
                let id = self.resource_id(consumer, target)?;
                Ok(format!(
                    "[reference({id}, {}).{path}]",
                    quote(record.api_version())
                ))
            }
        }
    }

    /// Resolves every reference within `property`
    pub fn resolve_property(&self, consumer: NodeId, property: &Property) -> Result<Value, SynthesisError> {
        Ok(match property {
            Property::Literal(value) => value.clone(),
            Property::Deferred(reference) => Value::String(self.resolve(consumer, reference)?),
            Property::Array(array) => Value::Array(
                array
                    .iter()
                    .map(|element| self.resolve_property(consumer, element))
                    .collect::<Result<_, _>>()?,
            ),
            Property::Object(object) => Value::Object(
                object
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), self.resolve_property(consumer, value)?)))
                    .collect::<Result<_, SynthesisError>>()?,
            ),
        })
    }

    /// Scope expression of a role assignment, `None` when it is the resource group being deployed
    pub fn grant_scope(&self, consumer: NodeId, grant: &Grant) -> Result<Option<String>, SynthesisError> {
        let target = self.target(consumer, &grant.scope)?;
        if Some(target) == self.unit(consumer) {
            return Ok(None);
        }

        if self.boundaries.contains_key(&target) {
            return Ok(Some(format!("[{}]", self.boundary_id(consumer, target)?)));
        }
        Ok(Some(format!("[{}]", self.resource_id(consumer, target)?)))
    }

    /// Name of a role assignment, see [grant_identifier]
    pub fn grant_identifier(&self, consumer: NodeId, grant: &Grant) -> Result<String, SynthesisError> {
        let scope_target = self.target(consumer, &grant.scope)?;
        let scope = if self.boundaries.contains_key(&scope_target) {
            self.boundary_id(consumer, scope_target)?
        } else {
            self.resource_id(consumer, scope_target)?
        };

        let grantee = match &grant.grantee {
            Property::Literal(Value::String(principal)) => quote(principal),
            Property::Deferred(reference @ DeferredRef { request: Request::Id, .. }) => {
                let target = self.target(consumer, reference)?;
                self.resource_id(consumer, target)?
            }
            other => {
                return Err(SynthesisError::Invalid(
                    Issue::UnstableGrantee {
                        path: self.tree.path(consumer),
                        grantee: format!("{other:?}"),
                    }
                    .into(),
                ))
            }
        };

        Ok(grant_identifier(&scope, &grant.role, &grantee))
    }

    /// `resourceId(...)` expression of a resource (without brackets)
    pub fn resource_id(&self, consumer: NodeId, target: NodeId) -> Result<String, SynthesisError> {
        let record = self.records.get(&target).ok_or_else(|| SynthesisError::UnresolvedReference {
            consumer: self.tree.path(consumer),
            target: self.tree.path(target),
            reason: "target is not a resource",
        })?;

        let names: Vec<String> = self
            .name_segments(target, record)
            .into_iter()
            .map(quote)
            .collect();

        let mut arguments = vec![];
        let target_unit = self.unit(target);
        if target_unit != self.unit(consumer) {
            match target_unit.and_then(|unit| self.boundaries.get(&unit).map(|b| (unit, b))) {
                Some((_, boundary)) if boundary.kind() == BoundaryKind::ResourceGroup => {
                    arguments.push(quote(boundary.name().unwrap_or_default()));
                }
                _ => {
                    arguments.push(quote(record.resource_type()));
                    arguments.extend(names);
                    return Ok(format!("subscriptionResourceId({})", arguments.join(", ")));
                }
            }
        }

        arguments.push(quote(record.resource_type()));
        arguments.extend(names);
        Ok(format!("resourceId({})", arguments.join(", ")))
    }

    /// Template name of a resource, child resources are named `parent/child`
    pub fn segmented_name(&self, target: NodeId) -> Option<String> {
        let record = self.records.get(&target)?;
        Some(self.name_segments(target, record).join("/"))
    }

    /// Names of `record` and all its resource ancestors, outermost first
    fn name_segments<'r>(&'r self, target: NodeId, record: &'r ResourceRecord) -> Vec<&'r str> {
        let mut names = vec![record.name()];
        let mut current = target;
        let mut child_record = record;
        while child_record.is_child() {
            let Some(parent) = self.tree.node(current).parent() else {
                break;
            };
            let Some(parent_record) = self.records.get(&parent) else {
                break;
            };
            names.push(parent_record.name());
            current = parent;
            child_record = parent_record;
        }
        names.reverse();
        names
    }

    fn boundary_id(&self, consumer: NodeId, target: NodeId) -> Result<String, SynthesisError> {
        let boundary = &self.boundaries[&target];
        match boundary.kind() {
            BoundaryKind::Subscription => Ok("subscription().id".to_string()),
            BoundaryKind::ResourceGroup if Some(target) == self.unit(consumer) => {
                Ok("resourceGroup().id".to_string())
            }
            BoundaryKind::ResourceGroup => Ok(format!(
                "subscriptionResourceId('Microsoft.Resources/resourceGroups', {})",
                quote(boundary.name().unwrap_or_default())
            )),
        }
    }

    fn target(&self, consumer: NodeId, reference: &DeferredRef) -> Result<NodeId, SynthesisError> {
        self.tree
            .lookup(&reference.target)
            .ok_or_else(|| self.unresolved(consumer, reference, "no such node"))
    }

    /// Deployment boundary `node` is emitted in
    fn unit(&self, node: NodeId) -> Option<NodeId> {
        self.tree
            .find_ancestor(node, Capability::DeploymentBoundary)
            .ok()
    }

    fn unresolved(&self, consumer: NodeId, reference: &DeferredRef, reason: &'static str) -> SynthesisError {
        SynthesisError::UnresolvedReference {
            consumer: self.tree.path(consumer),
            target: reference.target.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn grant_identifier_is_idempotent() {
        let scope = "resourceId('Microsoft.Storage/storageAccounts', 'stdata')";
        let grantee = "resourceId('Microsoft.ManagedIdentity/userAssignedIdentities', 'id-app')";

        let first = grant_identifier(scope, roles::READER, grantee);
        let second = grant_identifier(scope, roles::READER, grantee);
        assert_eq!(first, second);
        assert_eq!(
            first,
            "[guid(resourceId('Microsoft.Storage/storageAccounts', 'stdata'), \
             'acdd72a7-3385-48ef-bd42-f606fba81ae7', \
             resourceId('Microsoft.ManagedIdentity/userAssignedIdentities', 'id-app'))]"
        );
        assert_ne!(first, grant_identifier(scope, roles::CONTRIBUTOR, grantee));
    }

    #[test]
    fn quoting_escapes_single_quotes() {
        assert_eq!(quote("it's"), "'it''s'");
    }

    #[test]
    fn property_accessors() {
        let property = Property::object([
            ("name", Property::from("rule")),
            ("priority", Property::from(100i64)),
            ("target", Property::from(DeferredRef::id("/a/b".parse().unwrap()))),
        ]);

        assert_eq!(property.get("name").unwrap().as_str(), Some("rule"));
        assert_eq!(property.get("priority").unwrap().as_i64(), Some(100));
        assert_eq!(property.get("target").unwrap().as_str(), None);
        assert_eq!(property.get("missing"), None);

        let literal = Property::Literal(Value::from(vec![1i64, 2]));
        assert_eq!(literal.elements().map(|e| e.len()), Some(2));
    }
}
