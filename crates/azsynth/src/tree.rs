//! Construct tree
//!
//! Every declaration lives in a [Node]: subscription and resource group containers, plain groups and resources.
//! Nodes are stored in an arena and addressed by [NodeId]. Ids are only unique among siblings; the [NodePath] from the
//! root identifies a node globally.
//!
//! The tree is write-once. [ConstructTree::attach] is the only way to add nodes and nothing can be removed; it is
//! rebuilt for each synthesis run.
//!
//! Ancestor lookups test a [Capability] ("has a location", "is a deployment boundary", ...) and never the concrete kind
//! of a node, so a resource declared deep inside plain groups still finds its resource group and naming context.
use crate::naming::NamingContext;
use crate::resource::Intent;
use indexmap::IndexMap;
use std::collections::BTreeSet;

pub type Tags = IndexMap<String, String>;

/// Index of a node in its [ConstructTree]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Ids from the root (exclusive) down to a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn new<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn child(&self, id: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(id.into());
        Self(segments)
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }

        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for NodePath {
    type Err = std::convert::Infallible;

    /// Parses `/a/b/c` (the leading slash is optional)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.split('/').filter(|segment| !segment.is_empty())))
    }
}

/// What a node declares
#[derive(Debug, Clone)]
pub enum Kind {
    /// Grouping only, no deployment semantics
    Group,
    /// Subscription level deployment
    Subscription,
    /// Resource group level deployment
    ResourceGroup { name: Option<String> },
    Resource(Box<Intent>),
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Group => f.write_str("group"),
            Kind::Subscription => f.write_str("subscription"),
            Kind::ResourceGroup { .. } => f.write_str("resource group"),
            Kind::Resource(intent) => write!(f, "resource {}", intent.schema().type_name()),
        }
    }
}

/// Structural trait of a node, used for ancestor lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    HasLocation,
    HasNamingContext,
    /// Emitted as its own template
    DeploymentBoundary,
    ResourceGroup,
    /// Carries a managed identity that can be granted roles
    Grantable,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::HasLocation => f.write_str("location"),
            Capability::HasNamingContext => f.write_str("naming context"),
            Capability::DeploymentBoundary => f.write_str("deployment boundary"),
            Capability::ResourceGroup => f.write_str("resource group"),
            Capability::Grantable => f.write_str("managed identity"),
        }
    }
}

/// Declaration passed to [ConstructTree::attach]
#[derive(Debug, Clone)]
pub struct Scope {
    kind: Kind,
    location: Option<String>,
    naming: Option<NamingContext>,
    tags: Tags,
}

impl Scope {
    fn of(kind: Kind) -> Self {
        Self {
            kind,
            location: None,
            naming: None,
            tags: Default::default(),
        }
    }

    pub fn group() -> Self {
        Self::of(Kind::Group)
    }

    pub fn subscription() -> Self {
        Self::of(Kind::Subscription)
    }

    pub fn resource_group() -> Self {
        Self::of(Kind::ResourceGroup { name: None })
    }

    pub fn resource(intent: Intent) -> Self {
        Self::of(Kind::Resource(Box::new(intent)))
    }

    /// Explicit name, skipping name generation
    ///
    /// Only resource groups and resources carry a name.
    pub fn named(mut self, explicit: impl Into<String>) -> Self {
        match &mut self.kind {
            Kind::ResourceGroup { name } => *name = Some(explicit.into()),
            Kind::Resource(intent) => intent.set_name(explicit.into()),
            Kind::Group | Kind::Subscription => {
                tracing::debug!(kind=%self.kind, "ignoring name of unnamed scope")
            }
        }
        self
    }

    pub fn located(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_naming(mut self, naming: NamingContext) -> Self {
        self.naming = Some(naming);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags.extend(tags);
        self
    }
}

#[derive(Debug)]
pub struct Node {
    id: String,
    parent: Option<NodeId>,
    children: IndexMap<String, NodeId>,
    kind: Kind,
    location: Option<String>,
    naming: Option<NamingContext>,
    /// merged with all ancestors at construction time
    tags: Tags,
}

impl Node {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn intent(&self) -> Option<&Intent> {
        match &self.kind {
            Kind::Resource(intent) => Some(intent),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn naming(&self) -> Option<&NamingContext> {
        self.naming.as_ref()
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::HasLocation => self.location.is_some(),
            Capability::HasNamingContext => self.naming.is_some(),
            Capability::DeploymentBoundary => {
                matches!(self.kind, Kind::Subscription | Kind::ResourceGroup { .. })
            }
            Capability::ResourceGroup => matches!(self.kind, Kind::ResourceGroup { .. }),
            Capability::Grantable => self.intent().is_some_and(Intent::is_grantable),
        }
    }

    pub fn capabilities(&self) -> BTreeSet<Capability> {
        [
            Capability::HasLocation,
            Capability::HasNamingContext,
            Capability::DeploymentBoundary,
            Capability::ResourceGroup,
            Capability::Grantable,
        ]
        .into_iter()
        .filter(|capability| self.has(*capability))
        .collect()
    }
}

#[derive(Debug)]
pub struct ConstructTree {
    nodes: Vec<Node>,
}

impl ConstructTree {
    /// Creates a tree whose root is declared by `root`
    pub fn new(root: Scope) -> Self {
        let Scope {
            kind,
            location,
            naming,
            tags,
        } = root;

        Self {
            nodes: vec![Node {
                id: String::new(),
                parent: None,
                children: Default::default(),
                kind,
                location,
                naming,
                tags,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Adds a child below `parent`
    pub fn attach(
        &mut self,
        parent: NodeId,
        id: impl Into<String>,
        scope: Scope,
    ) -> Result<NodeId, TreeError> {
        let id = id.into();

        if id.is_empty() || id.contains('/') {
            return Err(TreeError::InvalidId {
                parent: self.path(parent),
                id,
            });
        }

        if self.nodes[parent.0].children.contains_key(&id) {
            return Err(TreeError::DuplicateId {
                parent: self.path(parent),
                id,
            });
        }

        let Scope {
            kind,
            location,
            naming,
            tags,
        } = scope;

        let node = NodeId(self.nodes.len());
        let tags = self.merge_tags(parent, &tags);
        tracing::trace!(parent=%self.path(parent), %id, %kind, "attach");

        self.nodes[parent.0].children.insert(id.clone(), node);
        self.nodes.push(Node {
            id,
            parent: Some(parent),
            children: Default::default(),
            kind,
            location,
            naming,
            tags,
        });

        Ok(node)
    }

    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[node.0].children.values().copied()
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[node.0].parent, |current| {
            self.nodes[current.0].parent
        })
    }

    /// Nearest strict ancestor with `capability`
    pub fn find_ancestor(&self, node: NodeId, capability: Capability) -> Result<NodeId, TreeError> {
        self.ancestors(node)
            .find(|ancestor| self.node(*ancestor).has(capability))
            .ok_or_else(|| TreeError::NotFound {
                path: self.path(node),
                capability,
            })
    }

    /// Like [Self::find_ancestor] but tests `node` itself first
    pub fn find_nearest(&self, node: NodeId, capability: Capability) -> Result<NodeId, TreeError> {
        if self.node(node).has(capability) {
            return Ok(node);
        }
        self.find_ancestor(node, capability)
    }

    /// Union of all tags from `parent` up, `own` wins on collisions
    ///
    /// Nodes store their merged tags, so the parent's map already contains all of its ancestors.
    pub fn merge_tags(&self, parent: NodeId, own: &Tags) -> Tags {
        let mut merged = self.nodes[parent.0].tags.clone();
        for (key, value) in own {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    pub fn path(&self, node: NodeId) -> NodePath {
        let mut segments: Vec<String> = std::iter::once(node)
            .chain(self.ancestors(node))
            .filter(|current| *current != self.root())
            .map(|current| self.nodes[current.0].id.clone())
            .collect();
        segments.reverse();
        NodePath(segments)
    }

    pub fn lookup(&self, path: &NodePath) -> Option<NodeId> {
        path.segments()
            .iter()
            .try_fold(self.root(), |current, segment| {
                self.nodes[current.0].children.get(segment).copied()
            })
    }

    /// All nodes in declaration order, parents before children
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node.0].children.values().rev().copied());
        }
        order
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("`{id}` is already declared in {parent}")]
    DuplicateId { parent: NodePath, id: String },
    #[error("`{id}` is not a valid id (in {parent})")]
    InvalidId { parent: NodePath, id: String },
    #[error("no {capability} found above {path}")]
    NotFound {
        path: NodePath,
        capability: Capability,
    },
}
