use std::collections::HashMap;

use ocm_spec::{Component, Identity};
use petgraph::graphmap::DiGraphMap;

use crate::error::ConstructError;

use super::vertex::{Vertex, VertexId, VertexSource};

/// The component-reference dependency graph for one build. An edge
/// `component -> target` means `component` carries a `Reference` to
/// `target`, so `target` must be fully processed (descriptor + digest known)
/// before `component` can be.
pub struct Dag {
    vertices: Vec<Vertex>,
    index_of: HashMap<String, VertexId>,
    graph: DiGraphMap<VertexId, ()>,
}

impl Dag {
    /// Build the graph from the constructor document's components (§4.B).
    /// Every `Reference` target becomes a vertex, local if a component of
    /// that identity is present in `components`, external otherwise.
    /// Returns [`ConstructError::CycleDetected`] naming the full cycle path
    /// if the reference graph is not acyclic (invariant I1).
    pub fn build(components: Vec<Component>) -> Result<Self, ConstructError> {
        let mut vertices = Vec::new();
        let mut index_of = HashMap::new();
        let mut graph = DiGraphMap::new();

        for component in &components {
            let identity = component.to_identity();
            intern(&mut vertices, &mut index_of, &mut graph, identity, None);
        }
        for (slot, component) in components.into_iter().enumerate() {
            let component_id = vertices[slot].id;
            for reference in &component.references {
                let target_identity = reference.to_component_identity();
                let target_id = intern(
                    &mut vertices,
                    &mut index_of,
                    &mut graph,
                    target_identity,
                    None,
                );
                graph.add_edge(component_id, target_id, ());
            }
            vertices[slot].source = VertexSource::Local(Box::new(component));
        }

        if let Some(cycle) = detect_cycle(&graph, &vertices) {
            return Err(ConstructError::CycleDetected { identities: cycle });
        }

        Ok(Self {
            vertices,
            index_of,
            graph,
        })
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id as usize]
    }

    pub fn find(&self, identity: &Identity) -> Option<VertexId> {
        self.index_of.get(&identity.canonical_string()).copied()
    }

    /// The vertices `id` directly depends on (its reference targets).
    pub fn dependencies(&self, id: VertexId) -> Vec<VertexId> {
        self.graph.neighbors(id).collect()
    }

    /// The vertices that directly depend on `id`.
    pub fn dependents(&self, id: VertexId) -> Vec<VertexId> {
        self.graph
            .neighbors_directed(id, petgraph::Direction::Incoming)
            .collect()
    }

    /// A processing order in which every vertex appears after all of its
    /// dependencies (reference targets first, §4.D). Acyclicity was already
    /// established in [`Dag::build`].
    pub fn reverse_topological_order(&self) -> Vec<VertexId> {
        let mut order = petgraph::algo::toposort(&self.graph, None)
            .expect("Dag::build already rejected cyclic graphs");
        order.reverse();
        order
    }
}

fn intern(
    vertices: &mut Vec<Vertex>,
    index_of: &mut HashMap<String, VertexId>,
    graph: &mut DiGraphMap<VertexId, ()>,
    identity: Identity,
    source: Option<VertexSource>,
) -> VertexId {
    let key = identity.canonical_string();
    if let Some(&id) = index_of.get(&key) {
        return id;
    }
    let id = vertices.len() as VertexId;
    vertices.push(Vertex {
        id,
        identity,
        source: source.unwrap_or(VertexSource::External),
    });
    index_of.insert(key, id);
    graph.add_node(id);
    id
}

/// Depth-first cycle detection reporting the full offending path (plural
/// identities, per §7), rather than just the two endpoints `petgraph`'s own
/// `toposort` error would give us.
fn detect_cycle(graph: &DiGraphMap<VertexId, ()>, vertices: &[Vertex]) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color = vec![Color::White; vertices.len()];
    let mut path = Vec::new();

    fn visit(
        node: VertexId,
        graph: &DiGraphMap<VertexId, ()>,
        color: &mut [Color],
        path: &mut Vec<VertexId>,
    ) -> Option<Vec<VertexId>> {
        color[node as usize] = Color::Gray;
        path.push(node);
        for next in graph.neighbors(node) {
            match color[next as usize] {
                Color::White => {
                    if let Some(cycle) = visit(next, graph, color, path) {
                        return Some(cycle);
                    }
                }
                Color::Gray => {
                    let start = path.iter().position(|&n| n == next).expect("gray node is on the path");
                    let mut cycle = path[start..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                Color::Black => {}
            }
        }
        path.pop();
        color[node as usize] = Color::Black;
        None
    }

    for id in vertices.iter().map(|v| v.id) {
        if color[id as usize] == Color::White {
            if let Some(cycle) = visit(id, graph, &mut color, &mut path) {
                return Some(
                    cycle
                        .into_iter()
                        .map(|id| vertices[id as usize].identity.canonical_string())
                        .collect(),
                );
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocm_spec::{ElementMeta, Reference};

    fn component(name: &str, version: &str, refs: Vec<(&str, &str)>) -> Component {
        Component {
            name: name.to_string(),
            version: version.to_string(),
            provider: None,
            labels: Vec::new(),
            resources: Vec::new(),
            sources: Vec::new(),
            references: refs
                .into_iter()
                .map(|(n, v)| Reference {
                    meta: ElementMeta {
                        name: format!("dep-{n}"),
                        ..Default::default()
                    },
                    component: n.to_string(),
                    version: v.to_string(),
                })
                .collect(),
            creation_time: None,
        }
    }

    #[test]
    fn diamond_references_build_without_cycle() {
        let components = vec![
            component("root", "v1", vec![("mid-a", "v1"), ("mid-b", "v1")]),
            component("mid-a", "v1", vec![("leaf", "v1")]),
            component("mid-b", "v1", vec![("leaf", "v1")]),
            component("leaf", "v1", vec![]),
        ];
        let dag = Dag::build(components).unwrap();
        assert_eq!(dag.len(), 4);
        let order = dag.reverse_topological_order();
        let leaf_id = dag.find(&Identity::component("leaf", "v1")).unwrap();
        let root_id = dag.find(&Identity::component("root", "v1")).unwrap();
        let leaf_pos = order.iter().position(|&id| id == leaf_id).unwrap();
        let root_pos = order.iter().position(|&id| id == root_id).unwrap();
        assert!(leaf_pos < root_pos, "leaf must be processed before root");
    }

    #[test]
    fn direct_self_reference_cycle_is_detected() {
        let components = vec![component("a", "v1", vec![("a", "v1")])];
        let err = Dag::build(components).unwrap_err();
        match err {
            ConstructError::CycleDetected { identities } => {
                assert!(identities.contains(&"name=a,version=v1".to_string()));
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn two_component_cycle_is_detected() {
        let components = vec![
            component("a", "v1", vec![("b", "v1")]),
            component("b", "v1", vec![("a", "v1")]),
        ];
        let err = Dag::build(components).unwrap_err();
        assert!(matches!(err, ConstructError::CycleDetected { .. }));
    }

    #[test]
    fn external_reference_target_becomes_external_vertex() {
        let components = vec![component("a", "v1", vec![("external-dep", "v9")])];
        let dag = Dag::build(components).unwrap();
        let ext_id = dag.find(&Identity::component("external-dep", "v9")).unwrap();
        assert!(!dag.vertex(ext_id).is_local());
    }
}
