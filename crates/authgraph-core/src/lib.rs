pub mod graph;
pub mod schema;

pub use graph::{
    BuildError, Edge, Graph, GraphBuildError, GraphSnapshot, Node, NodeType, SchemaGraphBuilder,
};
pub use schema::types::Schema;
pub use schema::{ParseError, ValidationError, parse_schema, validate_references};
