use std::collections::HashSet;

use eframe::egui::{Rect, Vec2, pos2};

use super::ViewModel;
use super::camera::Camera;
use super::scene::{SceneEdge, SceneGraph, SceneNode};
use super::sched::FrameThrottle;
use super::surface::RenderSurface;

/// Below this node count everything is always materialized; the culling
/// overhead is not worth it for small graphs.
pub const VIRTUALIZE_MIN_NODES: usize = 40;
/// Extra screen pixels around the viewport that still count as visible.
pub const VIRTUALIZE_MARGIN: f32 = 100.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OffscreenCounts {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl OffscreenCounts {
    pub fn total(&self) -> usize {
        self.top + self.bottom + self.left + self.right
    }
}

/// Pure function of (camera, viewport, scene); never persisted.
#[derive(Clone, Debug, Default)]
pub struct VirtualizationResult {
    pub visible_nodes: Vec<usize>,
    pub visible_ids: HashSet<String>,
    pub visible_edges: Vec<usize>,
    pub offscreen: OffscreenCounts,
    pub total_nodes: usize,
}

pub fn compute_visible(
    camera: &Camera,
    viewport: Vec2,
    nodes: &[SceneNode],
    edges: &[SceneEdge],
    margin: f32,
    hidden: &HashSet<String>,
) -> VirtualizationResult {
    if nodes.len() <= VIRTUALIZE_MIN_NODES {
        return materialize_all(nodes, edges, hidden);
    }

    let view_rect = Rect::from_min_max(
        camera.screen_to_graph(pos2(-margin, -margin)),
        camera.screen_to_graph(pos2(viewport.x + margin, viewport.y + margin)),
    );

    let mut result = VirtualizationResult {
        total_nodes: nodes.len(),
        ..Default::default()
    };

    for (index, node) in nodes.iter().enumerate() {
        if hidden.contains(&node.id) {
            continue;
        }
        if node.rect.intersects(view_rect) {
            result.visible_nodes.push(index);
            result.visible_ids.insert(node.id.clone());
        } else {
            // A non-intersecting box puts its center beyond at least one edge.
            let center = node.rect.center();
            if center.y < view_rect.min.y {
                result.offscreen.top += 1;
            } else if center.y > view_rect.max.y {
                result.offscreen.bottom += 1;
            } else if center.x < view_rect.min.x {
                result.offscreen.left += 1;
            } else {
                result.offscreen.right += 1;
            }
        }
    }

    collect_visible_edges(&mut result, nodes, edges);
    result
}

/// Everything materialized, no off-screen indicators. Used for small graphs
/// and when virtualization is disabled.
pub fn materialize_all(
    nodes: &[SceneNode],
    edges: &[SceneEdge],
    hidden: &HashSet<String>,
) -> VirtualizationResult {
    let mut result = VirtualizationResult {
        total_nodes: nodes.len(),
        ..Default::default()
    };
    for (index, node) in nodes.iter().enumerate() {
        if hidden.contains(&node.id) {
            continue;
        }
        result.visible_nodes.push(index);
        result.visible_ids.insert(node.id.clone());
    }
    collect_visible_edges(&mut result, nodes, edges);
    result
}

fn collect_visible_edges(
    result: &mut VirtualizationResult,
    nodes: &[SceneNode],
    edges: &[SceneEdge],
) {
    // An edge is visible iff both endpoints are. Edges whose curve would
    // cross the viewport with both ends outside are dropped on purpose.
    for (index, edge) in edges.iter().enumerate() {
        let source_visible = nodes
            .get(edge.source)
            .is_some_and(|node| result.visible_ids.contains(&node.id));
        let target_visible = nodes
            .get(edge.target)
            .is_some_and(|node| result.visible_ids.contains(&node.id));
        if source_visible && target_visible {
            result.visible_edges.push(index);
        }
    }
}

/// Owns the materialized set and drives incremental add/remove against the
/// render surface.
#[derive(Debug)]
pub struct Virtualizer {
    pub enabled: bool,
    materialized: HashSet<String>,
    drawn_edges: Vec<String>,
    edges_stale: bool,
    throttle: FrameThrottle,
    last: Option<VirtualizationResult>,
}

impl Default for Virtualizer {
    fn default() -> Self {
        Self {
            enabled: true,
            materialized: HashSet::new(),
            drawn_edges: Vec::new(),
            edges_stale: false,
            throttle: FrameThrottle::default(),
            last: None,
        }
    }
}

impl Virtualizer {
    pub fn request(&mut self, now: f64) -> bool {
        self.throttle.request(now)
    }

    pub fn poll(&mut self, now: f64) -> bool {
        self.throttle.poll(now)
    }

    pub fn note_run(&mut self, now: f64) {
        self.throttle.note_run(now);
    }

    pub fn last(&self) -> Option<&VirtualizationResult> {
        self.last.as_ref()
    }

    /// Forget everything materialized; the next apply starts from scratch.
    pub fn invalidate_all(&mut self) {
        self.materialized.clear();
        self.drawn_edges.clear();
        self.edges_stale = false;
        self.last = None;
    }

    /// Node geometry changed without entering/leaving visibility; the whole
    /// edge set is rebuilt on the next apply.
    pub fn mark_edges_stale(&mut self) {
        self.edges_stale = true;
    }

    pub fn apply(
        &mut self,
        scene: &SceneGraph,
        camera: &Camera,
        viewport: Vec2,
        hidden: &HashSet<String>,
        surface: &mut dyn RenderSurface,
    ) -> (usize, usize) {
        surface.set_transform(camera);

        let result = if self.enabled {
            compute_visible(
                camera,
                viewport,
                &scene.nodes,
                &scene.edges,
                VIRTUALIZE_MARGIN,
                hidden,
            )
        } else {
            materialize_all(&scene.nodes, &scene.edges, hidden)
        };

        let mut changed = self.edges_stale;
        self.edges_stale = false;

        for &index in &result.visible_nodes {
            let node = &scene.nodes[index];
            if !self.materialized.contains(&node.id) {
                surface.draw_node(node);
                changed = true;
            }
        }

        let leaving = self
            .materialized
            .iter()
            .filter(|id| !result.visible_ids.contains(*id))
            .cloned()
            .collect::<Vec<_>>();
        for id in leaving {
            surface.remove(&id);
            self.materialized.remove(&id);
            changed = true;
        }
        for &index in &result.visible_nodes {
            self.materialized.insert(scene.nodes[index].id.clone());
        }

        if changed {
            // Edges are cheap enough to rebuild wholesale whenever any node
            // entered or left.
            for id in std::mem::take(&mut self.drawn_edges) {
                surface.remove(&id);
            }
            for &index in &result.visible_edges {
                let edge = &scene.edges[index];
                surface.draw_edge(
                    edge,
                    scene.nodes[edge.source].rect,
                    scene.nodes[edge.target].rect,
                );
                self.drawn_edges.push(edge.id.clone());
            }
        }

        let counts = (result.visible_nodes.len(), result.visible_edges.len());
        self.last = Some(result);
        counts
    }
}

impl ViewModel {
    /// Throttled during continuous pan/zoom: at most one pass per frame,
    /// with a trailing pass picked up by `tick`.
    pub fn refresh_virtualization(&mut self, now: f64, throttled: bool) {
        if throttled && !self.virtualizer.request(now) {
            return;
        }
        self.run_virtualization_pass();
    }

    pub(in crate::app) fn force_virtual_refresh(&mut self, now: f64) {
        self.virtualizer.note_run(now);
        self.run_virtualization_pass();
    }

    pub(in crate::app) fn run_virtualization_pass(&mut self) {
        let Some(scene) = self.scene.as_ref() else {
            self.visible_node_count = 0;
            self.visible_edge_count = 0;
            return;
        };

        let (visible_nodes, visible_edges) = self.virtualizer.apply(
            scene,
            &self.camera,
            self.container_size,
            &self.hidden_nodes,
            &mut self.display,
        );
        self.visible_node_count = visible_nodes;
        self.visible_edge_count = visible_edges;
    }

    /// Disabling materializes everything; re-enabling culls immediately
    /// instead of waiting for the next camera change.
    pub fn set_virtualization(&mut self, enabled: bool, now: f64) {
        if self.virtualizer.enabled == enabled {
            return;
        }
        self.virtualizer.enabled = enabled;
        self.force_virtual_refresh(now);
    }
}
