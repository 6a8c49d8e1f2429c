//! Template synthesis
//!
//! [synthesize] turns a [ConstructTree] into a [Document]: one ARM template per deployable unit (subscription or
//! resource group container).
//!
//! 1. every resource intent and every boundary is realized into a record. Issues of all nodes are collected and
//!    reported together. Within a unit no two resources of one type may share a name.
//! 2. the [Plan] decides emission order, inlining and `dependsOn` edges.
//! 3. each record is rendered as a template entry, every deferred reference resolved into a template expression.
//!
//! The output only depends on the tree: synthesizing the same tree twice yields identical documents.
use crate::error::{Issue, Issues, SynthesisError};
use crate::naming;
use crate::plan::Plan;
use crate::reference::Resolver;
use crate::resource::{BoundaryKind, BoundaryRecord, ResourceRecord, Sku, ValidationError};
use crate::tree::{Capability, ConstructTree, Kind, NodeId, Tags};
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;

pub const SUBSCRIPTION_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2018-05-01/subscriptionDeploymentTemplate.json#";
pub const RESOURCE_GROUP_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#";
pub const CONTENT_VERSION: &str = "1.0.0.0";

/// Templates by the node path of their deployable unit
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct Document {
    templates: IndexMap<String, Template>,
}

impl Document {
    pub fn get(&self, unit: &str) -> Option<&Template> {
        self.templates.get(unit)
    }

    pub fn templates(&self) -> impl Iterator<Item = (&str, &Template)> {
        self.templates
            .iter()
            .map(|(unit, template)| (unit.as_str(), template))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub content_version: String,
    pub resources: Vec<Entry>,
}

/// One resource of a template
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub api_version: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

/// Synthesizes all deployable units of `tree`
#[tracing::instrument(level = "debug", skip_all)]
pub fn synthesize(tree: &ConstructTree) -> Result<Document, SynthesisError> {
    let (records, boundaries) = realize(tree)?;
    let resolver = Resolver::new(tree, &records, &boundaries);
    check_unique_names(tree, &resolver, &records)?;
    let plan = Plan::new(tree, &records)?;

    let mut document = Document::default();
    for (&unit, boundary) in &boundaries {
        let mut resources = vec![];

        if boundary.kind() == BoundaryKind::Subscription {
            for (&group, group_record) in &boundaries {
                if group_record.kind() == BoundaryKind::ResourceGroup
                    && unit_of(tree, group) == Some(unit)
                {
                    resources.push(resource_group_entry(group_record));
                }
            }
        }

        for &node in plan.order() {
            if unit_of(tree, node) == Some(unit) {
                resources.push(entry(&plan, &resolver, &records, node)?);
            }
        }

        let schema = match boundary.kind() {
            BoundaryKind::Subscription => SUBSCRIPTION_SCHEMA,
            BoundaryKind::ResourceGroup => RESOURCE_GROUP_SCHEMA,
        };
        let path = tree.path(unit).to_string();
        tracing::debug!(unit = %path, resources = resources.len(), "template");
        document.templates.insert(
            path,
            Template {
                schema: schema.to_string(),
                content_version: CONTENT_VERSION.to_string(),
                resources,
            },
        );
    }

    tracing::info!(templates = document.len(), "synthesized");
    Ok(document)
}

type Records = (
    IndexMap<NodeId, ResourceRecord>,
    IndexMap<NodeId, BoundaryRecord>,
);

/// Realizes every node, in declaration order
fn realize(tree: &ConstructTree) -> Result<Records, SynthesisError> {
    let mut issues = Issues::new();
    let mut records = IndexMap::new();
    let mut boundaries = IndexMap::new();

    for node in tree.descendants() {
        match tree.node(node).kind() {
            Kind::Resource(intent) => match intent.realize(tree, node) {
                Ok(record) => {
                    records.insert(node, record);
                }
                Err(found) => issues.extend(found),
            },
            Kind::Subscription => {
                boundaries.insert(node, BoundaryRecord::subscription());
            }
            Kind::ResourceGroup { name } => match resource_group(tree, node, name.as_deref()) {
                Ok(record) => {
                    boundaries.insert(node, record);
                }
                Err(found) => issues.extend(found),
            },
            Kind::Group => {}
        }
    }

    if !issues.is_empty() {
        tracing::debug!(issues = issues.len(), "realization failed");
        return Err(SynthesisError::Invalid(issues));
    }
    Ok((records, boundaries))
}

/// Two resources of the same type and name in one unit would be deployed as one
fn check_unique_names(
    tree: &ConstructTree,
    resolver: &Resolver,
    records: &IndexMap<NodeId, ResourceRecord>,
) -> Result<(), SynthesisError> {
    let mut issues = Issues::new();
    let mut seen: HashMap<(Option<NodeId>, String, String), NodeId> = HashMap::new();

    for (&node, record) in records {
        // role assignment names are derived from scope, role and grantee
        if record.grant().is_some() {
            continue;
        }

        let name = resolver
            .segmented_name(node)
            .unwrap_or_else(|| record.name().to_string());
        let key = (
            unit_of(tree, node),
            record.resource_type().to_ascii_lowercase(),
            name.to_ascii_lowercase(),
        );
        match seen.get(&key) {
            Some(&first) => issues.log(Issue::Validation {
                path: tree.path(node),
                error: ValidationError::new(
                    "name",
                    format!("`{name}` is already used by {}", tree.path(first)),
                ),
            }),
            None => {
                seen.insert(key, node);
            }
        }
    }

    if !issues.is_empty() {
        return Err(SynthesisError::Invalid(issues));
    }
    Ok(())
}

fn resource_group(
    tree: &ConstructTree,
    node: NodeId,
    explicit: Option<&str>,
) -> Result<BoundaryRecord, Vec<Issue>> {
    let path = tree.path(node);
    let name = match explicit {
        Some(name) => name.to_string(),
        None => {
            let context = tree
                .find_nearest(node, Capability::HasNamingContext)
                .ok()
                .and_then(|context| tree.node(context).naming());
            let Some(context) = context else {
                return Err(vec![Issue::UnresolvableNamingContext { path }]);
            };
            naming::generate(
                context,
                BoundaryRecord::RESOURCE_GROUP_ABBREVIATION,
                tree.node(node).id(),
                &BoundaryRecord::RESOURCE_GROUP_CONSTRAINTS,
            )
        }
    };

    let location = tree
        .find_nearest(node, Capability::HasLocation)
        .ok()
        .and_then(|located| tree.node(located).location())
        .map(str::to_string);

    BoundaryRecord::resource_group(name, location, tree.node(node).tags().clone()).map_err(|errors| {
        errors
            .into_iter()
            .map(|error| Issue::Validation {
                path: path.clone(),
                error,
            })
            .collect()
    })
}

fn unit_of(tree: &ConstructTree, node: NodeId) -> Option<NodeId> {
    tree.find_ancestor(node, Capability::DeploymentBoundary).ok()
}

fn resource_group_entry(record: &BoundaryRecord) -> Entry {
    Entry {
        resource_type: BoundaryRecord::RESOURCE_GROUP_TYPE.to_string(),
        api_version: BoundaryRecord::RESOURCE_GROUP_API_VERSION.to_string(),
        name: record.name().unwrap_or_default().to_string(),
        scope: None,
        location: record.location().map(str::to_string),
        sku: None,
        kind: None,
        identity: None,
        depends_on: vec![],
        properties: None,
        tags: Some(record.tags().clone()).filter(|tags| !tags.is_empty()),
    }
}

fn entry(
    plan: &Plan,
    resolver: &Resolver,
    records: &IndexMap<NodeId, ResourceRecord>,
    node: NodeId,
) -> Result<Entry, SynthesisError> {
    let record = &records[&node];

    let (name, scope) = match record.grant() {
        Some(grant) => (
            resolver.grant_identifier(node, grant)?,
            resolver.grant_scope(node, grant)?,
        ),
        None => (
            resolver
                .segmented_name(node)
                .unwrap_or_else(|| record.name().to_string()),
            None,
        ),
    };

    let identity = match record.identity() {
        None => None,
        Some(identity) => {
            let mut object = IndexMap::new();
            object.insert("type".to_string(), Value::from(identity.type_name()));
            if !identity.user_assigned.is_empty() {
                let mut assigned = IndexMap::new();
                for reference in &identity.user_assigned {
                    assigned.insert(
                        resolver.resolve(node, reference)?,
                        Value::Object(IndexMap::new()),
                    );
                }
                object.insert("userAssignedIdentities".to_string(), Value::Object(assigned));
            }
            Some(Value::Object(object))
        }
    };

    let depends_on: Vec<String> = plan
        .depends_on(node)
        .iter()
        .map(|producer| Ok(format!("[{}]", resolver.resource_id(node, *producer)?)))
        .collect::<Result<_, SynthesisError>>()?;

    Ok(Entry {
        resource_type: record.resource_type().to_string(),
        api_version: record.api_version().to_string(),
        name,
        scope,
        location: record.location().map(str::to_string),
        sku: record.sku().cloned(),
        kind: record.kind().map(str::to_string),
        identity,
        depends_on,
        properties: properties(plan, resolver, records, node)?,
        tags: record.tags().cloned(),
    })
}

/// Resolved properties of `node` with its inlined children appended to their collections
fn properties(
    plan: &Plan,
    resolver: &Resolver,
    records: &IndexMap<NodeId, ResourceRecord>,
    node: NodeId,
) -> Result<Option<Value>, SynthesisError> {
    let mut resolved = match records[&node].properties() {
        Some(properties) => properties
            .iter()
            .map(|(key, value)| Ok((key.clone(), resolver.resolve_property(node, value)?)))
            .collect::<Result<IndexMap<_, _>, SynthesisError>>()?,
        None => IndexMap::new(),
    };

    for (collection, child) in plan.inlined(node) {
        let mut body = IndexMap::new();
        body.insert("name".to_string(), Value::from(records[child].name()));
        if let Some(child_properties) = properties(plan, resolver, records, *child)? {
            body.insert("properties".to_string(), child_properties);
        }

        let slot = resolved
            .entry(collection.clone())
            .or_insert_with(|| Value::Array(vec![]));
        match slot {
            Value::Array(elements) => elements.push(Value::Object(body)),
            // a literal that is not a list is replaced
            other => *other = Value::Array(vec![Value::Object(body)]),
        }
    }

    if resolved.is_empty() && records[&node].properties().is_none() {
        return Ok(None);
    }
    Ok(Some(Value::Object(resolved)))
}
