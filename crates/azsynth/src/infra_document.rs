//! Declaration frontend: HCL documents into a [ConstructTree]
//!
//! Runs in two passes over the documents:
//! 1. collect the path of every declared node, so references can be told apart from their attribute part
//!    (`main.core.vnet.id` is the `id` of node `/main/core/vnet`)
//! 2. build the tree, converting attribute expressions into [Property]s
//!
//! Problems are collected in [ParseErrors] and reported together.
use crate::hcl_documents::HclDocuments;
use crate::naming::{NamingContext, NamingError};
use crate::reference::{DeferredRef, Grant, Property, Request};
use crate::resource::catalog::Catalog;
use crate::resource::{Identity, Intent, Sku};
use crate::tree::{ConstructTree, NodeId, NodePath, Scope, Tags, TreeError};
use crate::value::Value;
use hcl_edit::structure::{Attribute, Block, Body};

/// Declarations loaded from HCL
#[derive(Debug)]
pub struct InfraDocument {
    tree: ConstructTree,
}

impl InfraDocument {
    pub fn new(hcl_documents: &HclDocuments, catalog: &Catalog) -> Result<Self, ParseErrors> {
        let mut e = ParseErrors::new();

        let mut declared = Declared::default();
        for (_, _, block) in hcl_documents.blocks() {
            declared.collect(&NodePath::default(), block);
        }

        for (index, _source, _attribute) in hcl_documents.attributes() {
            e.log(Issue::RootAttribute(index))
        }

        let mut root = Scope::group();
        for (_, _, block) in hcl_documents.blocks() {
            match block.ident.value().as_str() {
                "naming" => {
                    if let Some(naming) = naming(&NodePath::default(), block, &mut e) {
                        root = root.with_naming(naming);
                    }
                }
                "tags" => root = root.with_tags(tags(&NodePath::default(), &block.body, &mut e)),
                _ => {}
            }
        }

        let mut builder = Builder {
            tree: ConstructTree::new(root),
            catalog,
            declared: &declared,
            e,
        };

        let root = builder.tree.root();
        for (_, _, block) in hcl_documents.blocks() {
            match block.ident.value().as_str() {
                "naming" | "tags" => {}
                _ => builder.child(root, block),
            }
        }

        let Builder { tree, e, .. } = builder;
        if !e.issues.is_empty() {
            return Err(e);
        }

        tracing::debug!(nodes = tree.len(), "declarations loaded");
        Ok(Self { tree })
    }

    pub fn tree(&self) -> &ConstructTree {
        &self.tree
    }

    pub fn into_tree(self) -> ConstructTree {
        self.tree
    }
}

/// Block kinds that declare a node, and the index of the label holding its id
fn node_label(ident: &str) -> Option<usize> {
    match ident {
        "subscription" | "resource_group" | "group" | "grant" => Some(0),
        "resource" => Some(1),
        _ => None,
    }
}

struct Builder<'a> {
    tree: ConstructTree,
    catalog: &'a Catalog,
    declared: &'a Declared,
    e: ParseErrors,
}

impl<'a> Builder<'a> {
    /// Declares `block` below `parent`
    fn child(&mut self, parent: NodeId, block: &Block) {
        let parent_path = self.tree.path(parent);
        let ident = block.ident.value().as_str();

        let Some(label) = node_label(ident) else {
            self.e.log(Issue::UnknownBlockType {
                path: parent_path,
                ident: ident.to_string(),
            });
            return;
        };

        let Some(id) = block.labels.get(label) else {
            self.e.log(Issue::LabelMissing {
                path: parent_path,
                ident: ident.to_string(),
            });
            return;
        };
        let path = parent_path.child(id.as_str());

        let scope = match ident {
            "subscription" => Some(self.container(&path, Scope::subscription(), &block.body, false)),
            "resource_group" => Some(self.container(&path, Scope::resource_group(), &block.body, true)),
            "group" => Some(self.container(&path, Scope::group(), &block.body, false)),
            "grant" => self.grant(&path, &block.body).map(|grant| Scope::resource(Intent::grant(grant))),
            _ => {
                let resource_type = block.labels[0].as_str();
                match self.catalog.get(resource_type) {
                    Some(schema) => Some(self.resource(&path, Intent::new(schema), &block.body)),
                    None => {
                        self.e.log(Issue::UnknownResourceType {
                            path,
                            resource_type: resource_type.to_string(),
                        });
                        return;
                    }
                }
            }
        };

        // a broken declaration is reported, its children are still checked
        let node = match self.tree.attach(parent, id.as_str(), scope.unwrap_or_else(Scope::group)) {
            Ok(node) => node,
            Err(error) => {
                self.e.log(Issue::Tree(error));
                return;
            }
        };

        for nested in block.body.blocks() {
            match nested.ident.value().as_str() {
                "naming" | "tags" if ident != "resource" && ident != "grant" => {}
                "sku" | "identity" | "tags" if ident == "resource" => {}
                _ => self.child(node, nested),
            }
        }
    }

    /// subscription, resource group or group
    fn container(&mut self, path: &NodePath, mut scope: Scope, body: &Body, named: bool) -> Scope {
        for attribute in body.attributes() {
            let key = attribute.key.value().as_str();
            match key {
                "location" => {
                    if let Some(location) = self.string(path, attribute) {
                        scope = scope.located(location);
                    }
                }
                "name" if named => {
                    if let Some(name) = self.string(path, attribute) {
                        scope = scope.named(name);
                    }
                }
                _ => self.unexpected(path, key.to_string()),
            }
        }

        for block in body.blocks() {
            match block.ident.value().as_str() {
                "naming" => {
                    if let Some(naming) = naming(path, block, &mut self.e) {
                        scope = scope.with_naming(naming);
                    }
                }
                "tags" => scope = scope.with_tags(tags(path, &block.body, &mut self.e)),
                _ => {}
            }
        }

        scope
    }

    fn resource(&mut self, path: &NodePath, mut intent: Intent, body: &Body) -> Scope {
        let mut name = None;
        let mut location = None;
        let mut own_tags = Tags::new();

        for attribute in body.attributes() {
            let key = attribute.key.value().as_str();
            match key {
                "name" => name = self.string(path, attribute),
                "location" => location = self.string(path, attribute),
                "kind" => {
                    if let Some(kind) = self.string(path, attribute) {
                        intent = intent.with_kind(kind);
                    }
                }
                "depends_on" => {
                    for target in self.node_paths(path, attribute) {
                        intent = intent.depends_on(target);
                    }
                }
                _ => {
                    if let Some(property) = self.property(path, attribute) {
                        intent = intent.with_property(key, property);
                    }
                }
            }
        }

        for block in body.blocks() {
            match block.ident.value().as_str() {
                "sku" => intent = intent.with_sku(self.sku(path, &block.body)),
                "identity" => intent = intent.with_identity(self.identity(path, &block.body)),
                "tags" => own_tags.extend(tags(path, &block.body, &mut self.e)),
                _ => {}
            }
        }

        let mut scope = Scope::resource(intent).with_tags(own_tags);
        if let Some(name) = name {
            scope = scope.named(name);
        }
        if let Some(location) = location {
            scope = scope.located(location);
        }
        scope
    }

    fn grant(&mut self, path: &NodePath, body: &Body) -> Option<Grant> {
        let mut scope = None;
        let mut role = None;
        let mut grantee = None;
        let mut principal_type = None;

        for attribute in body.attributes() {
            let key = attribute.key.value().as_str();
            match key {
                "scope" => match self.property(path, attribute) {
                    Some(Property::Deferred(reference)) => scope = Some(reference),
                    Some(_) => self.unsupported(path, key, "must reference a node"),
                    None => {}
                },
                "role" => role = self.string(path, attribute),
                "grantee" => grantee = self.property(path, attribute),
                "principal_type" => principal_type = self.string(path, attribute),
                _ => self.unexpected(path, key.to_string()),
            }
        }

        for (attribute, present) in [
            ("scope", scope.is_some()),
            ("role", role.is_some()),
            ("grantee", grantee.is_some()),
        ] {
            if !present {
                self.e.log(Issue::MissingAttribute {
                    path: path.clone(),
                    attribute: attribute.to_string(),
                });
            }
        }

        let grant = Grant::new(scope?, role?, grantee?);
        Some(match principal_type {
            Some(principal_type) => grant.with_principal_type(principal_type),
            None => grant,
        })
    }

    fn sku(&mut self, path: &NodePath, body: &Body) -> Sku {
        let mut sku = Sku::default();
        for attribute in body.attributes() {
            let key = attribute.key.value().as_str();
            match key {
                "name" => sku.name = self.string(path, attribute),
                "tier" => sku.tier = self.string(path, attribute),
                "capacity" => {
                    if let Some(property) = self.property(path, attribute) {
                        match property.as_i64() {
                            Some(capacity) => sku.capacity = Some(capacity),
                            None => self.unsupported(path, "sku.capacity", "must be an integer"),
                        }
                    }
                }
                _ => self.unexpected(path, format!("sku.{key}")),
            }
        }
        sku
    }

    fn identity(&mut self, path: &NodePath, body: &Body) -> Identity {
        let mut identity = Identity::default();
        for attribute in body.attributes() {
            let key = attribute.key.value().as_str();
            match key {
                "system_assigned" => match self.property(path, attribute) {
                    Some(Property::Literal(Value::Boolean(enabled))) => {
                        identity.system_assigned = enabled
                    }
                    Some(_) => self.unsupported(path, key, "must be a boolean"),
                    None => {}
                },
                "user_assigned" => {
                    let elements = match self.property(path, attribute) {
                        Some(Property::Array(elements)) => elements,
                        None => continue,
                        Some(_) => {
                            self.unsupported(path, key, "must list references");
                            continue;
                        }
                    };
                    for element in elements {
                        match element {
                            Property::Deferred(reference) => identity.user_assigned.push(reference),
                            _ => self.unsupported(path, key, "must list references"),
                        }
                    }
                }
                _ => self.unexpected(path, format!("identity.{key}")),
            }
        }
        identity
    }

    fn property(&mut self, path: &NodePath, attribute: &Attribute) -> Option<Property> {
        let expression: hcl::Expression = attribute.value.clone().into();
        match self.declared.property(expression) {
            Ok(property) => Some(property),
            Err(reason) => {
                self.unsupported(path, attribute.key.value().as_str(), reason);
                None
            }
        }
    }

    fn string(&mut self, path: &NodePath, attribute: &Attribute) -> Option<String> {
        match self.property(path, attribute)? {
            Property::Literal(Value::String(value)) => Some(value),
            _ => {
                self.unsupported(path, attribute.key.value().as_str(), "must be a string");
                None
            }
        }
    }

    /// A list of node references without attribute, as in `depends_on = [main.core.vnet]`
    fn node_paths(&mut self, path: &NodePath, attribute: &Attribute) -> Vec<NodePath> {
        let expression: hcl::Expression = attribute.value.clone().into();
        let hcl::Expression::Array(elements) = expression else {
            self.unsupported(path, "depends_on", "must be a list of nodes");
            return vec![];
        };

        let mut paths = vec![];
        for element in elements {
            match traversal_path(&element) {
                Some(segments) => paths.push(NodePath::new(segments)),
                None => self.unsupported(path, "depends_on", "must be a list of nodes"),
            }
        }
        paths
    }

    fn unexpected(&mut self, path: &NodePath, attribute: impl Into<String>) {
        self.e.log(Issue::UnexpectedAttribute {
            path: path.clone(),
            attribute: attribute.into(),
        });
    }

    fn unsupported(&mut self, path: &NodePath, attribute: &str, reason: impl Into<String>) {
        self.e.log(Issue::UnsupportedExpression {
            path: path.clone(),
            attribute: attribute.to_string(),
            reason: reason.into(),
        });
    }
}

fn naming(path: &NodePath, block: &Block, e: &mut ParseErrors) -> Option<NamingContext> {
    let mut fields: indexmap::IndexMap<&str, hcl::Expression> = Default::default();
    for attribute in block.body.attributes() {
        fields.insert(attribute.key.value().as_str(), attribute.value.clone().into());
    }

    let mut text = |field: &'static str| match fields.get(field) {
        Some(hcl::Expression::String(value)) => Some(value.clone()),
        _ => {
            e.log(Issue::UnsupportedExpression {
                path: path.clone(),
                attribute: format!("naming.{field}"),
                reason: "must be a string".to_string(),
            });
            None
        }
    };
    let organization = text("organization");
    let project = text("project");
    let environment = text("environment");
    let geography = text("geography");

    let instance = match fields.get("instance") {
        Some(hcl::Expression::Number(number)) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        None => Some(1),
        _ => None,
    };
    if instance.is_none() {
        e.log(Issue::UnsupportedExpression {
            path: path.clone(),
            attribute: "naming.instance".to_string(),
            reason: "must be a positive number".to_string(),
        });
    }

    match NamingContext::new(organization?, project?, environment?, geography?, instance?) {
        Ok(naming) => Some(naming),
        Err(error) => {
            e.log(Issue::InvalidNaming {
                path: path.clone(),
                error,
            });
            None
        }
    }
}

fn tags(path: &NodePath, body: &Body, e: &mut ParseErrors) -> Tags {
    let mut tags = Tags::new();
    for attribute in body.attributes() {
        let key = attribute.key.value().as_str().to_string();
        match hcl::Expression::from(attribute.value.clone()) {
            hcl::Expression::String(value) => {
                tags.insert(key, value);
            }
            _ => e.log(Issue::UnsupportedExpression {
                path: path.clone(),
                attribute: format!("tags.{key}"),
                reason: "must be a string".to_string(),
            }),
        }
    }
    tags
}

/// `a.b.c` as segments, `None` for anything that is not a plain attribute traversal
fn traversal_path(expression: &hcl::Expression) -> Option<Vec<String>> {
    match expression {
        hcl::Expression::Variable(variable) => Some(vec![variable.to_string()]),
        hcl::Expression::Traversal(traversal) => {
            let mut segments = traversal_path(&traversal.expr)?;
            for operator in &traversal.operators {
                let hcl::TraversalOperator::GetAttr(ident) = operator else {
                    return None;
                };
                segments.push(ident.to_string());
            }
            Some(segments)
        }
        _ => None,
    }
}

/// Every declared node path, for longest prefix lookups
#[derive(Debug, Default)]
struct Declared {
    root: Node,
}

#[derive(Debug, Default)]
struct Node {
    declared: bool,
    children: indexmap::IndexMap<String, Node>,
}

impl Node {
    /// Length of the longest declared prefix of `path`
    fn get(&self, path: &[String]) -> Option<usize> {
        let deeper = path.first().and_then(|first| {
            self.children
                .get(first)
                .and_then(|child| child.get(&path[1..]))
                .map(|length| length + 1)
        });
        deeper.or(self.declared.then_some(0))
    }

    fn get_or_insert(&mut self, path: &[String]) -> &mut Node {
        match path.split_first() {
            None => self,
            Some((first, rest)) => self
                .children
                .entry(first.clone())
                .or_default()
                .get_or_insert(rest),
        }
    }
}

impl Declared {
    fn collect(&mut self, parent: &NodePath, block: &Block) {
        let Some(id) = node_label(block.ident.value().as_str()).and_then(|label| block.labels.get(label)) else {
            return;
        };

        let path = parent.child(id.as_str());
        self.root.get_or_insert(path.segments()).declared = true;
        for nested in block.body.blocks() {
            self.collect(&path, nested);
        }
    }

    /// Splits a traversal into the referenced node and the requested attribute
    fn reference(&self, segments: Vec<String>) -> Result<DeferredRef, &'static str> {
        // an undeclared target is assumed to end before the last segment, synthesis reports it as unresolved
        let length = match self.root.get(&segments) {
            Some(0) | None => segments.len().saturating_sub(1),
            Some(length) => length,
        };
        let (target, request) = segments.split_at(length);

        let request = match request {
            [] => return Err("a reference must name an attribute, e.g. `.id`"),
            [single] if single == "id" => Request::Id,
            [single] if single == "name" => Request::Name,
            [single] if single == "principal_id" => Request::PrincipalId,
            output => Request::Output(output.join(".")),
        };
        Ok(DeferredRef::new(NodePath::new(target.iter().cloned()), request))
    }

    fn property(&self, expression: hcl::Expression) -> Result<Property, &'static str> {
        use hcl::Expression;

        Ok(match expression {
            Expression::Null => return Err("null is not supported, omit the attribute instead"),
            Expression::Bool(value) => Property::from(value),
            Expression::Number(value) => Property::Literal(value.into()),
            Expression::String(value) => Property::from(value),
            Expression::Array(elements) => Property::Array(
                elements
                    .into_iter()
                    .map(|element| self.property(element))
                    .collect::<Result<_, _>>()?,
            ),
            Expression::Object(object) => Property::Object(
                object
                    .into_iter()
                    .map(|(key, value)| {
                        let key = match key {
                            hcl::ObjectKey::Identifier(ident) => ident.to_string(),
                            hcl::ObjectKey::Expression(Expression::String(key)) => key,
                            _ => return Err("object keys must be identifiers or strings"),
                        };
                        Ok((key, self.property(value)?))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            Expression::TemplateExpr(template) => {
                let template = hcl::Template::from_expr(&template)
                    .map_err(|_| "invalid string template")?;
                let mut text = String::new();
                for element in template.elements() {
                    match element {
                        hcl::template::Element::Literal(literal) => text.push_str(literal),
                        _ => return Err("interpolation is not supported"),
                    }
                }
                Property::from(text)
            }
            Expression::Parenthesis(inner) => self.property(*inner)?,
            expression @ (Expression::Variable(_) | Expression::Traversal(_)) => {
                let segments = traversal_path(&expression)
                    .ok_or("only attribute traversals are supported, e.g. `a.b.id`")?;
                Property::Deferred(self.reference(segments)?)
            }
            _ => return Err("functions, operators and conditionals are not supported"),
        })
    }
}

#[derive(derive_new::new, Debug)]
pub struct ParseErrors {
    #[new(default)]
    issues: Vec<Issue>,
}

impl ParseErrors {
    pub fn log(&mut self, issue: Issue) {
        tracing::trace!(?issue, "issue found");
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }
}

impl std::error::Error for ParseErrors {}

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} problem(s) in declarations", self.issues.len())?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Issue {
    #[error("root attribute #{0}: attributes must be declared inside a block")]
    RootAttribute(usize),
    #[error("{path}: unknown block type `{ident}`")]
    UnknownBlockType { path: NodePath, ident: String },
    #[error("{path}: `{ident}` block is missing its label")]
    LabelMissing { path: NodePath, ident: String },
    #[error("{path}: unknown resource type `{resource_type}`")]
    UnknownResourceType {
        path: NodePath,
        resource_type: String,
    },
    #[error(transparent)]
    Tree(TreeError),
    #[error("{path}: invalid naming context: {error}")]
    InvalidNaming { path: NodePath, error: NamingError },
    #[error("{path}: `{attribute}` {reason}")]
    UnsupportedExpression {
        path: NodePath,
        attribute: String,
        reason: String,
    },
    #[error("{path}: `{attribute}` is required")]
    MissingAttribute { path: NodePath, attribute: String },
    #[error("{path}: unexpected attribute `{attribute}`")]
    UnexpectedAttribute { path: NodePath, attribute: String },
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hcl_documents;
    use crate::tree::Capability;
    use pretty_assertions::assert_eq;

    fn parse_errors_for(doc: HclDocuments) -> ParseErrors {
        InfraDocument::new(&doc, &Catalog::builtin()).expect_err("must error")
    }

    fn tree_for(doc: HclDocuments) -> ConstructTree {
        InfraDocument::new(&doc, &Catalog::builtin())
            .expect("must be valid")
            .into_tree()
    }

    #[test]
    fn root_attribute_errors() {
        let errors = parse_errors_for(hcl_documents! {"root_attr = 1"});
        assert_eq!(errors.issues(), &[Issue::RootAttribute(0)]);
    }

    #[test]
    fn all_issues_are_reported() {
        let errors = parse_errors_for(hcl_documents! {r#"
        unknown_block_type {}
        subscription {}
        group "g" {
          resource "warp_drive" "engine" {}
          group "g2" {}
          group "g2" {}
        }
        "#});
        assert_eq!(
            errors.issues(),
            &[
                Issue::UnknownBlockType {
                    path: NodePath::default(),
                    ident: "unknown_block_type".to_string()
                },
                Issue::LabelMissing {
                    path: NodePath::default(),
                    ident: "subscription".to_string()
                },
                Issue::UnknownResourceType {
                    path: "/g/engine".parse().unwrap(),
                    resource_type: "warp_drive".to_string()
                },
                Issue::Tree(TreeError::DuplicateId {
                    parent: "/g".parse().unwrap(),
                    id: "g2".to_string()
                }),
            ]
        );
    }

    #[test]
    fn invalid_naming_context() {
        let errors = parse_errors_for(hcl_documents! {r#"
        naming {
          organization = "CTSO"
          project      = "web"
          environment  = "prod"
          geography    = "eus"
        }
        "#});
        assert!(matches!(
            errors.issues(),
            [Issue::InvalidNaming { error: NamingError::InvalidToken { field: "organization", .. }, .. }]
        ));
    }

    #[test]
    fn declarations_become_nodes() {
        let tree = tree_for(hcl_documents! {r#"
        naming {
          organization = "ctso"
          project      = "web"
          environment  = "nonprod"
          geography    = "eus"
          instance     = 2
        }

        tags {
          owner = "platform"
        }

        subscription "main" {
          resource_group "core" {
            location = "eastus"
            name     = "rg-core"

            resource "virtual_network" "vnet" {
              addressSpace = { addressPrefixes = ["10.0.0.0/16"] }
              tags {
                tier = "network"
              }

              resource "subnet" "web" {
                addressPrefix = "10.0.1.0/24"
              }
            }
          }
        }
        "#});

        let root = tree.root();
        assert!(tree.node(root).has(Capability::HasNamingContext));
        assert_eq!(tree.node(root).naming().unwrap().instance(), "02");

        let vnet = tree.lookup(&"/main/core/vnet".parse().unwrap()).unwrap();
        assert_eq!(tree.node(vnet).tags()["owner"], "platform");
        assert_eq!(tree.node(vnet).tags()["tier"], "network");

        let intent = tree.node(vnet).intent().unwrap();
        assert_eq!(intent.schema().type_name(), "Microsoft.Network/virtualNetworks");
        assert_eq!(
            intent.properties().unwrap()["addressSpace"],
            Property::object([("addressPrefixes", Property::array(["10.0.0.0/16"]))])
        );

        let subnet = tree.lookup(&"/main/core/vnet/web".parse().unwrap()).unwrap();
        assert_eq!(tree.node(subnet).parent(), Some(vnet));

        let rg = tree.lookup(&"/main/core".parse().unwrap()).unwrap();
        assert!(tree.node(rg).has(Capability::DeploymentBoundary));
        assert_eq!(tree.node(rg).location(), Some("eastus"));
    }

    #[test]
    fn traversals_become_references() {
        let tree = tree_for(hcl_documents! {r#"
        subscription "main" {
          resource_group "core" {
            resource "user_assigned_identity" "identity" {}
            resource "storage_account" "data" {
              client   = main.core.identity.clientId
              owner    = main.core.identity.principal_id
              depends_on = [main.core.identity]
            }
            grant "reader" {
              scope   = main.core.data.id
              role    = "acdd72a7-3385-48ef-bd42-f606fba81ae7"
              grantee = main.core.identity.id
            }
          }
        }
        "#});

        let data = tree.lookup(&"/main/core/data".parse().unwrap()).unwrap();
        let properties = tree.node(data).intent().unwrap().properties().unwrap();
        let identity: NodePath = "/main/core/identity".parse().unwrap();
        assert_eq!(
            properties["client"],
            Property::Deferred(DeferredRef::output(identity.clone(), "clientId"))
        );
        assert_eq!(
            properties["owner"],
            Property::Deferred(DeferredRef::principal_id(identity.clone()))
        );

        let reader = tree.lookup(&"/main/core/reader".parse().unwrap()).unwrap();
        let grant = tree.node(reader).intent().unwrap().grant_ref().unwrap();
        assert_eq!(grant.scope, DeferredRef::id(tree.path(data)));
        assert_eq!(grant.grantee, Property::Deferred(DeferredRef::id(identity)));
    }

    #[test]
    fn unsupported_expressions() {
        let errors = parse_errors_for(hcl_documents! {r#"
        resource_group "core" {
          resource "storage_account" "data" {
            a = null
            b = "${main.core}"
            c = 1 + 2
            d = core
          }
          grant "reader" {
            role = "acdd72a7-3385-48ef-bd42-f606fba81ae7"
          }
        }
        "#});
        let attributes: Vec<_> = errors
            .issues()
            .iter()
            .map(|issue| match issue {
                Issue::UnsupportedExpression { attribute, .. }
                | Issue::MissingAttribute { attribute, .. } => attribute.as_str(),
                _ => "other",
            })
            .collect();
        assert_eq!(attributes, vec!["a", "b", "c", "d", "scope", "grantee"]);
    }
}
