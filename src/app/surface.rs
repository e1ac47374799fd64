use std::collections::HashMap;

use eframe::egui::Rect;

use super::camera::Camera;
use super::scene::{SceneEdge, SceneNode};

/// Sink for incremental materialization. The virtualizer only issues
/// add/remove deltas; the surface owns whatever retained state it needs.
pub trait RenderSurface {
    fn set_transform(&mut self, camera: &Camera);
    fn draw_node(&mut self, node: &SceneNode);
    fn draw_edge(&mut self, edge: &SceneEdge, source: Rect, target: Rect);
    fn remove(&mut self, id: &str);
}

/// Outbound notifications to whatever embeds the viewer.
pub trait HostNotifier {
    fn navigate_to_line(&mut self, line: u32);
    fn history_changed(&mut self, can_undo: bool, can_redo: bool);
}

#[derive(Clone, Debug)]
pub struct EdgeSprite {
    pub edge: SceneEdge,
    pub source_rect: Rect,
    pub target_rect: Rect,
}

/// Retained display list painted each frame. Nodes keep insertion order so
/// repeated upserts do not shuffle z-order.
#[derive(Debug, Default)]
pub struct DisplayList {
    nodes: HashMap<String, SceneNode>,
    order: Vec<String>,
    edges: Vec<EdgeSprite>,
    camera: Camera,
}

impl DisplayList {
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.order.clear();
        self.edges.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn nodes_in_order(&self) -> impl Iterator<Item = &SceneNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn edges(&self) -> &[EdgeSprite] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl RenderSurface for DisplayList {
    fn set_transform(&mut self, camera: &Camera) {
        self.camera = *camera;
    }

    fn draw_node(&mut self, node: &SceneNode) {
        if self.nodes.insert(node.id.clone(), node.clone()).is_none() {
            self.order.push(node.id.clone());
        }
    }

    fn draw_edge(&mut self, edge: &SceneEdge, source: Rect, target: Rect) {
        self.edges.push(EdgeSprite {
            edge: edge.clone(),
            source_rect: source,
            target_rect: target,
        });
    }

    fn remove(&mut self, id: &str) {
        if self.nodes.remove(id).is_some() {
            self.order.retain(|entry| entry != id);
        }
        self.edges.retain(|sprite| {
            sprite.edge.id != id && sprite.edge.source_id != id && sprite.edge.target_id != id
        });
    }
}

/// Recording notifier for tests and headless use.
#[derive(Debug, Default)]
pub struct HostLog {
    pub navigations: Vec<u32>,
    pub last_history: Option<(bool, bool)>,
}

impl HostNotifier for HostLog {
    fn navigate_to_line(&mut self, line: u32) {
        self.navigations.push(line);
    }

    fn history_changed(&mut self, can_undo: bool, can_redo: bool) {
        self.last_history = Some((can_undo, can_redo));
    }
}
