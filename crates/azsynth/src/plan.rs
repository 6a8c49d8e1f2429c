//! Ordering planner
//!
//! Decides where each resource is emitted and in which order:
//! - children of conflict-unsafe types (see [MutationProfile::Unsafe]) are inlined into their parent's collection
//!   and never emitted on their own. The top-level resource they end up in is their *host*.
//! - every deferred reference, every nesting of a resource in another one and every explicit `depends_on` is a
//!   dependency [Edge] between two hosts.
//! - hosts are ordered depth-first, producers before consumers, ties broken by declaration order. A cycle aborts
//!   planning.
use crate::error::SynthesisError;
use crate::reference::DeferredRef;
use crate::resource::{MutationProfile, ResourceRecord};
use crate::tree::{Capability, ConstructTree, Kind, NodeId, NodePath};
use crate::visit::VisitReferences;
use indexmap::{IndexMap, IndexSet};

/// `producer` must exist before `consumer`
#[derive(derive_new::new, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub producer: NodeId,
    pub consumer: NodeId,
}

#[derive(Debug, Default)]
pub struct Plan {
    /// emitted resources, producers first
    order: Vec<NodeId>,
    /// resource -> its top-level resource
    hosts: IndexMap<NodeId, NodeId>,
    /// parent -> (collection, child) of the children embedded in it
    inlined: IndexMap<NodeId, Vec<(String, NodeId)>>,
    edges: IndexSet<Edge>,
    /// consumer -> producers within the same deployable unit
    depends_on: IndexMap<NodeId, Vec<NodeId>>,
}

impl Plan {
    /// Plans every resource of `tree` that has a record
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(
        tree: &ConstructTree,
        records: &IndexMap<NodeId, ResourceRecord>,
    ) -> Result<Self, SynthesisError> {
        let mut plan = Plan::default();
        let resources: Vec<NodeId> = tree
            .descendants()
            .into_iter()
            .filter(|node| records.contains_key(node))
            .collect();

        for &node in &resources {
            let host = match inline_collection(tree, node) {
                Some((parent, collection)) => {
                    plan.inlined
                        .entry(parent)
                        .or_default()
                        .push((collection, node));
                    // parents precede their children, their host is known
                    plan.host(parent).unwrap_or(parent)
                }
                None => node,
            };
            plan.hosts.insert(node, host);
        }

        for &node in &resources {
            let consumer = plan.hosts[&node];

            if let Some(parent) = tree.node(node).parent().filter(|p| records.contains_key(p)) {
                plan.add_edge(plan.hosts[&parent], consumer);
            }

            let mut targets: Vec<NodePath> = vec![];
            records[&node].visit_references(&mut |reference: &DeferredRef| {
                targets.push(reference.target.clone())
            });
            targets.extend(records[&node].depends_on().iter().cloned());

            for target in targets {
                let Some(producer) = producer(tree, node, &target)? else {
                    continue;
                };
                // a target without record never passed realization, nothing to order
                let Some(&producer) = plan.hosts.get(&producer) else {
                    continue;
                };
                plan.add_edge(producer, consumer);
            }
        }

        plan.order = plan.sort(tree)?;

        for edge in &plan.edges {
            if unit(tree, edge.producer) == unit(tree, edge.consumer) {
                let producers = plan.depends_on.entry(edge.consumer).or_default();
                if !producers.contains(&edge.producer) {
                    producers.push(edge.producer);
                }
            }
        }

        tracing::debug!(
            resources = resources.len(),
            emitted = plan.order.len(),
            edges = plan.edges.len(),
            "planned"
        );
        Ok(plan)
    }

    fn add_edge(&mut self, producer: NodeId, consumer: NodeId) {
        if producer != consumer {
            self.edges.insert(Edge::new(producer, consumer));
        }
    }

    /// Depth-first over hosts in declaration order, producers first
    fn sort(&self, tree: &ConstructTree) -> Result<Vec<NodeId>, SynthesisError> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Visiting,
            Done,
        }

        fn visit(
            plan: &Plan,
            tree: &ConstructTree,
            node: NodeId,
            states: &mut IndexMap<NodeId, State>,
            stack: &mut Vec<NodeId>,
            order: &mut Vec<NodeId>,
        ) -> Result<(), SynthesisError> {
            match states.get(&node) {
                Some(State::Done) => return Ok(()),
                Some(State::Visiting) => {
                    let start = stack.iter().position(|n| *n == node).unwrap_or_default();
                    let chain = stack[start..]
                        .iter()
                        .chain(std::iter::once(&node))
                        .map(|n| tree.path(*n))
                        .collect();
                    return Err(SynthesisError::DependencyCycle { chain });
                }
                None => {}
            }

            states.insert(node, State::Visiting);
            stack.push(node);
            for producer in plan.producers(node) {
                visit(plan, tree, producer, states, stack, order)?;
            }
            stack.pop();
            states.insert(node, State::Done);
            order.push(node);
            Ok(())
        }

        let mut states = IndexMap::new();
        let mut stack = vec![];
        let mut order = vec![];
        for host in self.hosts.values().copied().collect::<IndexSet<_>>() {
            visit(self, tree, host, &mut states, &mut stack, &mut order)?;
        }
        Ok(order)
    }

    fn producers(&self, consumer: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |edge| edge.consumer == consumer)
            .map(|edge| edge.producer)
    }

    /// Emitted resources, producers before consumers
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn host(&self, node: NodeId) -> Option<NodeId> {
        self.hosts.get(&node).copied()
    }

    /// Children embedded in `parent`, by collection
    pub fn inlined(&self, parent: NodeId) -> &[(String, NodeId)] {
        self.inlined.get(&parent).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Producers `consumer` must name in its `dependsOn`
    pub fn depends_on(&self, consumer: NodeId) -> &[NodeId] {
        self.depends_on
            .get(&consumer)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Parent and collection when `node` must be embedded in its parent
fn inline_collection(tree: &ConstructTree, node: NodeId) -> Option<(NodeId, String)> {
    let intent = tree.node(node).intent()?;
    let parent_type = intent.schema().parent_type()?;
    let parent = tree.node(node).parent()?;
    let parent_schema = tree.node(parent).intent()?.schema();
    if parent_schema.type_name() != parent_type {
        return None;
    }

    match parent_schema.mutation_profile() {
        MutationProfile::Unsafe { collection } => Some((parent, collection)),
        MutationProfile::Safe => None,
    }
}

/// Resource `target` refers to, `None` for deployment boundaries
fn producer(
    tree: &ConstructTree,
    consumer: NodeId,
    target: &NodePath,
) -> Result<Option<NodeId>, SynthesisError> {
    let unresolved = |reason| SynthesisError::UnresolvedReference {
        consumer: tree.path(consumer),
        target: target.clone(),
        reason,
    };

    let node = tree.lookup(target).ok_or_else(|| unresolved("no such node"))?;
    match tree.node(node).kind() {
        Kind::Resource(_) => Ok(Some(node)),
        // boundaries are deployed before anything inside them
        Kind::Subscription | Kind::ResourceGroup { .. } => Ok(None),
        Kind::Group => Err(unresolved("a group has no identity")),
    }
}

fn unit(tree: &ConstructTree, node: NodeId) -> Option<NodeId> {
    tree.find_ancestor(node, Capability::DeploymentBoundary).ok()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reference::Property;
    use crate::resource::catalog::{StorageAccount, Subnet, UserAssignedIdentity, VirtualNetwork};
    use crate::resource::Intent;
    use crate::tree::Scope;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn tree() -> (ConstructTree, NodeId) {
        let naming = crate::naming::NamingContext::new("ctso", "web", "nonprod", "eus", 1).unwrap();
        let mut tree = ConstructTree::new(Scope::subscription().with_naming(naming));
        let rg = tree
            .attach(tree.root(), "core", Scope::resource_group().located("eastus"))
            .unwrap();
        (tree, rg)
    }

    fn realize(tree: &ConstructTree) -> IndexMap<NodeId, ResourceRecord> {
        tree.descendants()
            .into_iter()
            .filter_map(|node| {
                let intent = tree.node(node).intent()?;
                Some((node, intent.realize(tree, node).unwrap()))
            })
            .collect()
    }

    fn storage(reference: Option<DeferredRef>) -> Scope {
        let mut intent = Intent::new(Arc::new(StorageAccount));
        if let Some(reference) = reference {
            intent = intent.with_property("dependency", reference);
        }
        Scope::resource(intent)
    }

    #[test]
    fn producers_come_first() {
        let (mut tree, rg) = tree();
        let consumer = tree
            .attach(rg, "consumer", storage(Some(DeferredRef::id("/core/producer".parse().unwrap()))))
            .unwrap();
        let producer = tree.attach(rg, "producer", storage(None)).unwrap();
        let other = tree.attach(rg, "other", storage(None)).unwrap();

        let plan = Plan::new(&tree, &realize(&tree)).unwrap();
        assert_eq!(plan.order(), &[producer, consumer, other]);
        assert_eq!(plan.depends_on(consumer), &[producer]);
        assert!(plan.depends_on(producer).is_empty());
    }

    #[test]
    fn cycles_are_reported_with_their_chain() {
        let (mut tree, rg) = tree();
        tree.attach(rg, "a", storage(Some(DeferredRef::id("/core/b".parse().unwrap()))))
            .unwrap();
        tree.attach(rg, "b", storage(Some(DeferredRef::name("/core/a".parse().unwrap()))))
            .unwrap();

        let error = Plan::new(&tree, &realize(&tree)).unwrap_err();
        assert_eq!(
            error,
            SynthesisError::DependencyCycle {
                chain: vec![
                    "/core/a".parse().unwrap(),
                    "/core/b".parse().unwrap(),
                    "/core/a".parse().unwrap()
                ]
            }
        );
        assert_eq!(
            error.to_string(),
            "dependency cycle: /core/a -> /core/b -> /core/a"
        );
    }

    #[test]
    fn dangling_references_abort() {
        let (mut tree, rg) = tree();
        tree.attach(rg, "a", storage(Some(DeferredRef::id("/core/missing".parse().unwrap()))))
            .unwrap();
        tree.attach(rg, "network", Scope::group()).unwrap();
        tree.attach(rg, "b", storage(Some(DeferredRef::id("/core/network".parse().unwrap()))))
            .unwrap();

        let error = Plan::new(&tree, &realize(&tree)).unwrap_err();
        assert_eq!(
            error,
            SynthesisError::UnresolvedReference {
                consumer: "/core/a".parse().unwrap(),
                target: "/core/missing".parse().unwrap(),
                reason: "no such node"
            }
        );
    }

    #[test]
    fn unsafe_children_are_inlined() {
        let (mut tree, rg) = tree();
        let vnet = tree
            .attach(
                rg,
                "hub",
                Scope::resource(Intent::new(Arc::new(VirtualNetwork)).with_property(
                    "addressSpace",
                    Property::object([("addressPrefixes", Property::array(["10.0.0.0/16"]))]),
                )),
            )
            .unwrap();
        let subnets: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .enumerate()
            .map(|(index, id)| {
                let intent = Intent::new(Arc::new(Subnet))
                    .with_property("addressPrefix", format!("10.0.{index}.0/24"));
                tree.attach(vnet, id, Scope::resource(intent)).unwrap()
            })
            .collect();
        let subnet = tree.path(subnets[1]);
        let identity = tree
            .attach(
                rg,
                "identity",
                Scope::resource(Intent::new(Arc::new(UserAssignedIdentity)).depends_on(subnet)),
            )
            .unwrap();

        let plan = Plan::new(&tree, &realize(&tree)).unwrap();
        assert_eq!(plan.order(), &[vnet, identity]);
        assert_eq!(
            plan.inlined(vnet),
            &subnets
                .iter()
                .map(|subnet| ("subnets".to_string(), *subnet))
                .collect::<Vec<_>>()[..]
        );
        assert!(subnets.iter().all(|subnet| plan.host(*subnet) == Some(vnet)));
        // depending on an inlined child means depending on its host
        assert_eq!(plan.depends_on(identity), &[vnet]);
    }

    #[test]
    fn boundaries_are_not_producers() {
        let (mut tree, rg) = tree();
        let node = tree
            .attach(rg, "a", storage(Some(DeferredRef::id("/core".parse().unwrap()))))
            .unwrap();
        let plan = Plan::new(&tree, &realize(&tree)).unwrap();
        assert_eq!(plan.order(), &[node]);
        assert_eq!(plan.edges().count(), 0);
    }
}
