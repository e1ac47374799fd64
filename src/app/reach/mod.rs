use std::collections::{HashMap, HashSet, VecDeque};

mod cycle;
mod lineage;

pub use cycle::{HopDirection, NeighborCycle};
pub(in crate::app) use cycle::cycle_neighbor;
pub use lineage::lineage_path_nodes;

use super::{FocusState, ViewModel};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReachMode {
    Upstream,
    Downstream,
    All,
}

impl ReachMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Downstream => "downstream",
            Self::All => "all connected",
        }
    }
}

/// Transitive closure of nodes connected to `origin` along directed edges.
/// The origin itself is not part of the result. Terminates on cycles.
pub fn connected<'a, I>(origin: &str, edges: I, mode: ReachMode) -> HashSet<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut forward: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut backward: HashMap<&str, Vec<&str>> = HashMap::new();
    for (source, target) in edges {
        forward.entry(source).or_default().push(target);
        backward.entry(target).or_default().push(source);
    }

    let mut out = HashSet::new();
    if matches!(mode, ReachMode::Downstream | ReachMode::All) {
        walk(origin, &forward, &mut out);
    }
    if matches!(mode, ReachMode::Upstream | ReachMode::All) {
        walk(origin, &backward, &mut out);
    }
    out.remove(origin);
    out
}

fn walk(origin: &str, adjacency: &HashMap<&str, Vec<&str>>, out: &mut HashSet<String>) {
    let mut queue = VecDeque::from([origin]);
    let mut visited = HashSet::from([origin]);

    while let Some(node) = queue.pop_front() {
        let Some(neighbors) = adjacency.get(node) else {
            continue;
        };
        for &next in neighbors {
            if visited.insert(next) {
                out.insert(next.to_owned());
                queue.push_back(next);
            }
        }
    }
}

impl ViewModel {
    pub fn enter_focus(&mut self, mode: ReachMode) {
        let Some(origin) = self.selected.clone() else {
            return;
        };

        let lit = match &self.scene {
            Some(scene) => connected(&origin, scene.edge_id_pairs(), mode),
            None => HashSet::new(),
        };
        self.focus = Some(FocusState { origin, mode, lit });
    }

    pub fn exit_focus(&mut self) {
        self.focus = None;
    }

    /// Toggles focus mode on the selected node; selecting the same mode twice
    /// turns it off. A discrete action, so it lands in the layout history.
    pub fn toggle_focus(&mut self, mode: ReachMode) {
        match &self.focus {
            Some(focus) if focus.mode == mode => self.focus = None,
            _ => self.enter_focus(mode),
        }
        self.record_action();
    }

    pub fn node_dimmed(&self, id: &str) -> bool {
        if let Some(focus) = &self.focus {
            return focus.origin != id && !focus.lit.contains(id);
        }
        if !self.lineage_nodes.is_empty() {
            return !self.lineage_nodes.contains(id);
        }
        false
    }

    /// Moves the selection to the next 1-hop neighbor in `direction`,
    /// advancing through ties on repeated presses rather than oscillating.
    pub fn cycle_selection(&mut self, direction: HopDirection) {
        let Some(selected) = self.selected.clone() else {
            let first = self
                .scene
                .as_ref()
                .and_then(|scene| scene.nodes.first())
                .map(|node| node.id.clone());
            if first.is_some() {
                self.set_selected(first);
            }
            return;
        };

        let next = match self.scene.as_ref() {
            Some(scene) => cycle_neighbor(scene, &selected, direction, &mut self.neighbor_cycle),
            None => None,
        };

        if let Some(next) = next {
            self.selected = Some(next);
            self.refresh_focus_origin();
        }
    }

    /// Highlights the first found path from each declared lineage source of
    /// `column` to the query's terminal node. `None` clears the highlight.
    pub fn highlight_lineage(&mut self, column: Option<String>) {
        self.lineage_column = column.clone();
        self.lineage_nodes.clear();

        let Some(column) = column else {
            return;
        };
        let Some(sources) = self
            .graph
            .lineage
            .iter()
            .find(|entry| entry.column == column)
            .map(|entry| entry.source_ids.clone())
        else {
            return;
        };
        let Some(terminal) = self.graph.terminal_node_id().map(str::to_owned) else {
            return;
        };

        if let Some(scene) = &self.scene {
            self.lineage_nodes = lineage_path_nodes(
                sources.iter().map(String::as_str),
                &terminal,
                scene.edge_id_pairs(),
            );
        }
    }

    pub(in crate::app) fn refresh_focus_origin(&mut self) {
        if let Some(focus) = &self.focus {
            let mode = focus.mode;
            self.enter_focus(mode);
        }
    }
}
