mod builder;
mod vertex;

pub use builder::Dag;
pub use vertex::{Vertex, VertexId, VertexSource};
