use std::collections::HashMap;

use eframe::egui::{Rect, pos2, vec2};

use crate::query::NodeKind;

use super::ViewModel;
use super::cluster::{cluster_graph, group_by_kind};

/// Render arena rebuilt on graph load and on cluster expand/collapse. All
/// components read and write node geometry through it by index or id.
#[derive(Debug, Default)]
pub struct SceneGraph {
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    pub index_by_id: HashMap<String, usize>,
    pub outgoing: Vec<Vec<usize>>,
    pub incoming: Vec<Vec<usize>>,
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub rect: Rect,
    pub expanded: bool,
    pub collapsible: bool,
    pub has_children: bool,
    /// Number of hidden members when this is a collapsed cluster node.
    pub cluster_size: usize,
    pub start_line: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct SceneEdge {
    pub id: String,
    pub source: usize,
    pub target: usize,
    pub source_id: String,
    pub target_id: String,
    pub sql_clause: Option<String>,
    pub clause_type: Option<String>,
    pub start_line: Option<u32>,
}

impl SceneGraph {
    pub fn node(&self, id: &str) -> Option<&SceneNode> {
        self.index_by_id.get(id).and_then(|&index| self.nodes.get(index))
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut SceneNode> {
        match self.index_by_id.get(id) {
            Some(&index) => self.nodes.get_mut(index),
            None => None,
        }
    }

    pub fn edge_id_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges
            .iter()
            .map(|edge| (edge.source_id.as_str(), edge.target_id.as_str()))
    }
}

impl ViewModel {
    /// Rebuilds the scene from the source graph: clustering first (carrying
    /// expanded flags over by id), then indices and adjacency.
    pub fn rebuild_scene(&mut self) {
        self.scene_revision = self.scene_revision.wrapping_add(1);
        self.search_match_cache = None;

        let candidates = group_by_kind(&self.graph);
        let outcome = cluster_graph(
            &self.graph.nodes,
            &self.graph.edges,
            &candidates,
            &self.clusters,
        );
        self.clusters = outcome.clusters;

        let mut nodes = Vec::with_capacity(outcome.nodes.len());
        let mut index_by_id = HashMap::with_capacity(outcome.nodes.len());
        for node in &outcome.nodes {
            let mut rect = Rect::from_min_size(pos2(node.x, node.y), vec2(node.width, node.height));
            if let Some(&origin) = self.cluster_positions.get(&node.id) {
                rect = Rect::from_min_size(origin, rect.size());
            }

            index_by_id.insert(node.id.clone(), nodes.len());
            nodes.push(SceneNode {
                id: node.id.clone(),
                kind: node.kind,
                label: node.display_label().to_owned(),
                rect,
                expanded: node.expanded,
                collapsible: node.collapsible,
                has_children: !node.children.is_empty(),
                cluster_size: self
                    .clusters
                    .get(&node.id)
                    .map(|cluster| cluster.node_ids.len())
                    .unwrap_or(0),
                start_line: node.start_line,
            });
        }

        let mut edges = Vec::with_capacity(outcome.edges.len());
        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        for edge in &outcome.edges {
            // Edges referencing nodes absent from the current graph are
            // skipped silently; stale references are expected after reloads.
            let (Some(&source), Some(&target)) = (
                index_by_id.get(&edge.source),
                index_by_id.get(&edge.target),
            ) else {
                continue;
            };

            outgoing[source].push(target);
            incoming[target].push(source);
            edges.push(SceneEdge {
                id: edge.id.clone(),
                source,
                target,
                source_id: edge.source.clone(),
                target_id: edge.target.clone(),
                sql_clause: edge.sql_clause.clone(),
                clause_type: edge.clause_type.clone(),
                start_line: edge.start_line,
            });
        }

        self.scene = Some(SceneGraph {
            nodes,
            edges,
            index_by_id,
            outgoing,
            incoming,
        });
        self.display.clear();
        self.virtualizer.invalidate_all();
        self.scene_dirty = false;
        self.refresh_focus_origin();
    }
}
