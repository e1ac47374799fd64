use super::super::scene::SceneGraph;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HopDirection {
    Upstream,
    Downstream,
}

/// Per-direction tie-breaking index for keyboard neighbor cycling.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeighborCycle {
    upstream: usize,
    downstream: usize,
}

impl NeighborCycle {
    pub fn reset(&mut self) {
        self.upstream = 0;
        self.downstream = 0;
    }

    fn slot_mut(&mut self, direction: HopDirection) -> &mut usize {
        match direction {
            HopDirection::Upstream => &mut self.upstream,
            HopDirection::Downstream => &mut self.downstream,
        }
    }
}

/// Picks the next direct neighbor of `origin` in `direction`. Neighbors are
/// ordered by id so the cycle order is stable across calls and rebuilds.
pub(in crate::app) fn cycle_neighbor(
    scene: &SceneGraph,
    origin: &str,
    direction: HopDirection,
    state: &mut NeighborCycle,
) -> Option<String> {
    let &index = scene.index_by_id.get(origin)?;
    let adjacent = match direction {
        HopDirection::Upstream => &scene.incoming[index],
        HopDirection::Downstream => &scene.outgoing[index],
    };

    let mut neighbors = adjacent
        .iter()
        .filter_map(|&neighbor| scene.nodes.get(neighbor).map(|node| node.id.as_str()))
        .collect::<Vec<_>>();
    neighbors.sort_unstable();
    neighbors.dedup();

    if neighbors.is_empty() {
        return None;
    }

    let slot = state.slot_mut(direction);
    let pick = neighbors[*slot % neighbors.len()];
    *slot = slot.wrapping_add(1);
    Some(pick.to_owned())
}
