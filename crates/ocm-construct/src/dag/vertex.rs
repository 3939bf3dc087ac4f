use ocm_spec::{Component, Identity};

/// A node in the dependency graph: one component version, numbered densely
/// from zero so it can serve as a `petgraph::graphmap::DiGraphMap` node
/// weight (which must be `Copy + Ord + Hash`, ruling out `Identity`/`String`
/// directly).
pub type VertexId = u32;

/// Where a vertex's definition came from.
#[derive(Debug)]
pub enum VertexSource {
    /// Defined in the constructor document that was handed to `Construct`.
    Local(Box<Component>),
    /// Only referenced by some local component; its descriptor must already
    /// exist, either in the target repository or an external repository.
    External,
}

#[derive(Debug)]
pub struct Vertex {
    pub id: VertexId,
    pub identity: Identity,
    pub source: VertexSource,
}

impl Vertex {
    pub fn is_local(&self) -> bool {
        matches!(self.source, VertexSource::Local(_))
    }

    pub fn local_component(&self) -> Option<&Component> {
        match &self.source {
            VertexSource::Local(component) => Some(component),
            VertexSource::External => None,
        }
    }
}
