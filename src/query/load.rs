use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use super::model::QueryGraph;

pub fn load_query_graph(path: impl AsRef<Path>) -> Result<QueryGraph> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading query graph from {}", path.display()))?;
    parse_query_graph(&raw).with_context(|| format!("parsing query graph from {}", path.display()))
}

pub fn parse_query_graph(raw: &str) -> Result<QueryGraph> {
    let graph: QueryGraph = serde_json::from_str(raw).context("invalid query graph JSON")?;

    let mut seen = HashSet::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            bail!("duplicate node id {:?} in query graph", node.id);
        }
    }

    Ok(graph)
}
