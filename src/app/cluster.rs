use std::collections::{HashMap, HashSet};

use eframe::egui::{Rect, pos2};

use crate::query::{NodeKind, QueryEdge, QueryGraph, QueryNode};

use super::ViewModel;
use super::camera::union_bounds;

/// Clustering only engages above this node count; smaller graphs pass
/// through untouched.
pub const CLUSTER_MIN_NODES: usize = 30;
/// A candidate needs at least this many present members to collapse.
pub const CLUSTER_MIN_MEMBERS: usize = 3;

/// Collaborator-supplied grouping: a partition of node ids into candidate
/// clusters. The engine decides collapse state but never invents groups.
#[derive(Clone, Debug)]
pub struct ClusterCandidate {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub member_ids: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct NodeCluster {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub bounds: Rect,
    /// Member ids are retained even while hidden so collapse is lossless.
    pub node_ids: HashSet<String>,
    pub expanded: bool,
}

#[derive(Clone, Debug)]
pub struct ClusterOutcome {
    pub nodes: Vec<QueryNode>,
    pub edges: Vec<QueryEdge>,
    pub clusters: HashMap<String, NodeCluster>,
}

/// Replaces collapsed candidate groups with synthetic cluster nodes and
/// rewrites edges onto them. Expanded flags are carried over from `prior`
/// by cluster id so toggling one cluster leaves the rest untouched.
pub fn cluster_graph(
    nodes: &[QueryNode],
    edges: &[QueryEdge],
    candidates: &[ClusterCandidate],
    prior: &HashMap<String, NodeCluster>,
) -> ClusterOutcome {
    if nodes.len() <= CLUSTER_MIN_NODES {
        return ClusterOutcome {
            nodes: nodes.to_vec(),
            edges: edges.to_vec(),
            clusters: HashMap::new(),
        };
    }

    let node_rects: HashMap<&str, Rect> = nodes
        .iter()
        .map(|node| (node.id.as_str(), node_rect(node)))
        .collect();

    let mut clusters = HashMap::new();
    let mut membership: HashMap<&str, &str> = HashMap::new();
    let mut claimed: HashSet<&str> = HashSet::new();

    for candidate in candidates {
        // First candidate wins a contested member; the collapsed sets must
        // stay a partition.
        let members = candidate
            .member_ids
            .iter()
            .filter(|id| node_rects.contains_key(id.as_str()) && !claimed.contains(id.as_str()))
            .map(String::as_str)
            .collect::<Vec<_>>();
        if members.len() < CLUSTER_MIN_MEMBERS {
            continue;
        }

        let expanded = prior
            .get(&candidate.id)
            .is_some_and(|cluster| cluster.expanded);
        let Some(bounds) = union_bounds(members.iter().map(|id| node_rects[id])) else {
            continue;
        };

        claimed.extend(members.iter().copied());
        if !expanded {
            for member in &members {
                membership.insert(member, candidate.id.as_str());
            }
        }

        clusters.insert(
            candidate.id.clone(),
            NodeCluster {
                id: candidate.id.clone(),
                kind: candidate.kind,
                label: candidate.label.clone(),
                bounds,
                node_ids: members.iter().map(|id| (*id).to_owned()).collect(),
                expanded,
            },
        );
    }

    let mut out_nodes = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !membership.contains_key(node.id.as_str()) {
            out_nodes.push(node.clone());
        }
    }
    for cluster in clusters.values() {
        if !cluster.expanded {
            out_nodes.push(synthetic_node(cluster));
        }
    }
    out_nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut seen_pairs = HashSet::new();
    let mut out_edges = Vec::with_capacity(edges.len());
    for edge in edges {
        let source = membership
            .get(edge.source.as_str())
            .copied()
            .unwrap_or(edge.source.as_str());
        let target = membership
            .get(edge.target.as_str())
            .copied()
            .unwrap_or(edge.target.as_str());

        if source == target {
            continue;
        }
        if !seen_pairs.insert((source.to_owned(), target.to_owned())) {
            continue;
        }

        let mut rewritten = edge.clone();
        rewritten.source = source.to_owned();
        rewritten.target = target.to_owned();
        out_edges.push(rewritten);
    }

    ClusterOutcome {
        nodes: out_nodes,
        edges: out_edges,
        clusters,
    }
}

fn node_rect(node: &QueryNode) -> Rect {
    Rect::from_min_size(pos2(node.x, node.y), eframe::egui::vec2(node.width, node.height))
}

fn synthetic_node(cluster: &NodeCluster) -> QueryNode {
    let mut node = QueryNode::new(
        cluster.id.clone(),
        NodeKind::Cluster,
        cluster.bounds.min.x,
        cluster.bounds.min.y,
    );
    node.label = Some(cluster.label.clone());
    node.width = cluster.bounds.width();
    node.height = cluster.bounds.height();
    node.collapsible = true;
    node
}

/// Demo grouping collaborator: buckets plain nodes by kind. Containers,
/// results and prior synthetic nodes are never grouped.
pub fn group_by_kind(graph: &QueryGraph) -> Vec<ClusterCandidate> {
    let mut buckets: HashMap<NodeKind, Vec<String>> = HashMap::new();
    for node in &graph.nodes {
        if node.kind.is_container()
            || matches!(node.kind, NodeKind::Result | NodeKind::Cluster)
        {
            continue;
        }
        buckets.entry(node.kind).or_default().push(node.id.clone());
    }

    let mut candidates = buckets
        .into_iter()
        .filter(|(_, members)| members.len() >= CLUSTER_MIN_MEMBERS)
        .map(|(kind, member_ids)| ClusterCandidate {
            id: format!("cluster-{}", kind.label()),
            kind,
            label: format!("{} {} nodes", member_ids.len(), kind.label()),
            member_ids,
        })
        .collect::<Vec<_>>();
    candidates.sort_by(|a, b| a.id.cmp(&b.id));
    candidates
}

impl ViewModel {
    /// Expand/collapse one cluster; every other cluster keeps its state
    /// across the resulting re-render.
    pub fn toggle_cluster(&mut self, cluster_id: &str) {
        let Some(cluster) = self.clusters.get_mut(cluster_id) else {
            return;
        };
        cluster.expanded = !cluster.expanded;
        self.scene_dirty = true;
    }
}
