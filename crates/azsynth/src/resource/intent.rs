use super::catalog::RoleAssignment;
use super::{Draft, Identity, ResourceRecord, ResourceSchema, Sku};
use crate::error::Issue;
use crate::naming;
use crate::reference::{Grant, Property, Request};
use crate::resource::ValidationError;
use crate::tree::{Capability, ConstructTree, NodeId, NodePath};
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;

/// A resource as declared on the tree
///
/// Only what the user states is kept here. Everything else (name, location, tags, defaults) is filled in by
/// [Intent::realize] from the node's position in the tree.
#[derive(Debug, Clone)]
pub struct Intent {
    schema: Arc<dyn ResourceSchema>,
    name: Option<String>,
    kind: Option<String>,
    sku: Option<Sku>,
    identity: Option<Identity>,
    properties: Option<IndexMap<String, Property>>,
    depends_on: Vec<NodePath>,
    grant: Option<Grant>,
}

impl Intent {
    pub fn new(schema: Arc<dyn ResourceSchema>) -> Self {
        Self {
            schema,
            name: None,
            kind: None,
            sku: None,
            identity: None,
            properties: None,
            depends_on: vec![],
            grant: None,
        }
    }

    /// A role assignment
    pub fn grant(grant: Grant) -> Self {
        let mut intent = Self::new(Arc::new(RoleAssignment));
        intent.grant = Some(grant);
        intent
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_sku(mut self, sku: Sku) -> Self {
        self.sku = Some(sku);
        self
    }

    pub fn with_system_identity(mut self) -> Self {
        self.identity.get_or_insert_with(Default::default).system_assigned = true;
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Property>) -> Self {
        self.properties
            .get_or_insert_with(Default::default)
            .insert(key.into(), value.into());
        self
    }

    /// Explicit ordering constraint on another node
    pub fn depends_on(mut self, path: NodePath) -> Self {
        self.depends_on.push(path);
        self
    }

    pub fn schema(&self) -> &dyn ResourceSchema {
        self.schema.as_ref()
    }

    pub fn properties(&self) -> Option<&IndexMap<String, Property>> {
        self.properties.as_ref()
    }

    pub fn grant_ref(&self) -> Option<&Grant> {
        self.grant.as_ref()
    }

    /// Carries (or is) a managed identity that roles can be granted to
    pub fn is_grantable(&self) -> bool {
        self.schema.is_identity()
            || self
                .identity
                .as_ref()
                .is_some_and(|identity| identity.system_assigned)
    }

    /// Builds the record of the resource declared at `node`
    ///
    /// All problems are returned, not just the first one.
    #[tracing::instrument(level = "trace", skip_all, fields(path = %tree.path(node)))]
    pub fn realize(&self, tree: &ConstructTree, node: NodeId) -> Result<ResourceRecord, Vec<Issue>> {
        let path = tree.path(node);
        let schema = self.schema();
        let mut issues = vec![];
        let validation = |error: ValidationError| Issue::Validation {
            path: path.clone(),
            error,
        };

        if let Some(parent_type) = schema.parent_type() {
            let parent_matches = tree
                .node(node)
                .parent()
                .and_then(|parent| tree.node(parent).intent())
                .is_some_and(|parent| parent.schema().type_name() == parent_type);
            if !parent_matches {
                issues.push(validation(ValidationError::new(
                    "parent",
                    format!("must be declared inside a {parent_type}"),
                )));
            }
        }

        if tree
            .find_ancestor(node, Capability::DeploymentBoundary)
            .is_err()
        {
            issues.push(validation(ValidationError::new(
                "scope",
                "must be declared inside a subscription or resource group",
            )));
        }

        let mut unnamed = false;
        let name = match (&self.name, schema.named()) {
            (Some(name), _) => name.clone(),
            (None, false) => tree.node(node).id().to_string(),
            (None, true) => match tree
                .find_nearest(node, Capability::HasNamingContext)
                .ok()
                .and_then(|context| tree.node(context).naming())
            {
                Some(context) => naming::generate(
                    context,
                    schema.abbreviation(),
                    tree.node(node).id(),
                    &schema.constraints(),
                ),
                None => {
                    issues.push(Issue::UnresolvableNamingContext { path: path.clone() });
                    unnamed = true;
                    tree.node(node).id().to_string()
                }
            },
        };

        if let Some(grant) = &self.grant {
            if let Some(grantee) = unstable_grantee(tree, grant) {
                issues.push(Issue::UnstableGrantee {
                    path: path.clone(),
                    grantee,
                });
            }
        }

        let location = if schema.located() {
            tree.find_nearest(node, Capability::HasLocation)
                .ok()
                .and_then(|located| tree.node(located).location())
                .map(str::to_string)
        } else {
            None
        };

        let tags = Some(tree.node(node).tags())
            .filter(|tags| schema.tagged() && !tags.is_empty())
            .cloned();

        let mut draft = Draft {
            name,
            location,
            sku: self.sku.clone(),
            kind: self.kind.clone(),
            identity: self.identity.clone(),
            properties: self.properties.clone(),
            tags,
            grant: self.grant.clone(),
            depends_on: self.depends_on.clone(),
        };
        schema.apply_defaults(&mut draft);

        match ResourceRecord::construct(schema, draft) {
            Ok(record) if issues.is_empty() => Ok(record),
            Ok(_) => Err(issues),
            Err(errors) => {
                issues.extend(
                    errors
                        .into_iter()
                        // the placeholder name of an unnamed resource says nothing
                        .filter(|error| !(unnamed && error.field == "name"))
                        .map(validation),
                );
                Err(issues)
            }
        }
    }
}

/// Description of the grantee when it is not known before deployment
///
/// References to nodes that do not exist are left to the planner, which reports them as unresolved.
fn unstable_grantee(tree: &ConstructTree, grant: &Grant) -> Option<String> {
    match &grant.grantee {
        Property::Literal(Value::String(_)) => None,
        Property::Deferred(reference) if reference.request == Request::Id => tree
            .lookup(&reference.target)
            .filter(|target| !tree.node(*target).has(Capability::Grantable))
            .map(|_| reference.to_string()),
        Property::Deferred(reference) => Some(reference.to_string()),
        other => Some(format!("{other:?}")),
    }
}
