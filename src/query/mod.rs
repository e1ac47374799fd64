mod load;
mod model;

pub use load::{load_query_graph, parse_query_graph};
pub use model::{ColumnLineage, NodeKind, ParseIssue, QueryEdge, QueryGraph, QueryNode};
