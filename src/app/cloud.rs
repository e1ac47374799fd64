use std::collections::HashMap;

use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};

use super::ViewModel;
use super::camera::Camera;

/// Panel size in graph units at scale 1.
pub const PANEL_WIDTH: f32 = 280.0;
pub const PANEL_HEIGHT: f32 = 200.0;
/// Default gap between a container node and its panel.
pub const PANEL_GAP: f32 = 40.0;

/// Per-container nested viewport: its own camera over the child coordinate
/// space, independent of the primary camera.
#[derive(Clone, Copy, Debug, Default)]
pub struct CloudViewState {
    pub camera: Camera,
}

/// Nested viewport state for expanded containers. Offsets are anchored to
/// the owning node, so dragging the node drags the panel along for free.
#[derive(Debug, Default)]
pub struct CloudManager {
    views: HashMap<String, CloudViewState>,
    offsets: HashMap<String, Vec2>,
}

impl CloudManager {
    /// Idempotent: reopening an existing panel keeps its camera and offset.
    pub fn open(&mut self, container_id: &str) {
        self.views.entry(container_id.to_owned()).or_default();
    }

    pub fn view_mut(&mut self, container_id: &str) -> Option<&mut CloudViewState> {
        self.views.get_mut(container_id)
    }

    pub fn view(&self, container_id: &str) -> Option<&CloudViewState> {
        self.views.get(container_id)
    }

    pub fn offset_for(&self, container_id: &str, node_rect: Rect) -> Vec2 {
        self.offsets
            .get(container_id)
            .copied()
            .unwrap_or_else(|| default_offset(node_rect))
    }

    /// Moves the panel relative to its anchor node. The node itself does
    /// not move.
    pub fn drag_panel(&mut self, container_id: &str, node_rect: Rect, delta: Vec2) {
        let current = self.offset_for(container_id, node_rect);
        self.offsets.insert(container_id.to_owned(), current + delta);
    }

    pub fn offsets(&self) -> impl Iterator<Item = (&str, Vec2)> {
        self.offsets.iter().map(|(id, &offset)| (id.as_str(), offset))
    }

    pub fn replace_offsets(&mut self, offsets: impl IntoIterator<Item = (String, Vec2)>) {
        self.offsets = offsets.into_iter().collect();
    }

    pub fn reset(&mut self) {
        self.views.clear();
        self.offsets.clear();
    }
}

/// Panel sits to the right of the node, vertically centered.
pub fn default_offset(node_rect: Rect) -> Vec2 {
    vec2(
        node_rect.width() + PANEL_GAP,
        (node_rect.height() - PANEL_HEIGHT) / 2.0,
    )
}

/// Panel rectangle in graph coordinates, anchored to the node's top-left.
pub fn panel_rect_graph(node_rect: Rect, offset: Vec2) -> Rect {
    Rect::from_min_size(node_rect.min + offset, vec2(PANEL_WIDTH, PANEL_HEIGHT))
}

/// Composes the nested camera with the primary one: child-local coordinates
/// to screen pixels.
pub fn local_to_screen(
    primary: &Camera,
    node_rect: Rect,
    offset: Vec2,
    nested: &Camera,
    local: Pos2,
) -> Pos2 {
    let inner = nested.graph_to_screen(local);
    let panel_min = node_rect.min + offset;
    primary.graph_to_screen(pos2(panel_min.x + inner.x, panel_min.y + inner.y))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelSide {
    Top,
    Bottom,
    Left,
    Right,
}

/// The connector runs between the facing sides of panel and node, chosen by
/// the dominant axis of their center-to-center vector.
pub fn facing_sides(panel: Rect, node: Rect) -> (PanelSide, PanelSide) {
    let delta = node.center() - panel.center();
    if delta.x.abs() >= delta.y.abs() {
        if delta.x >= 0.0 {
            (PanelSide::Right, PanelSide::Left)
        } else {
            (PanelSide::Left, PanelSide::Right)
        }
    } else if delta.y >= 0.0 {
        (PanelSide::Bottom, PanelSide::Top)
    } else {
        (PanelSide::Top, PanelSide::Bottom)
    }
}

pub fn side_midpoint(rect: Rect, side: PanelSide) -> Pos2 {
    match side {
        PanelSide::Top => pos2(rect.center().x, rect.min.y),
        PanelSide::Bottom => pos2(rect.center().x, rect.max.y),
        PanelSide::Left => pos2(rect.min.x, rect.center().y),
        PanelSide::Right => pos2(rect.max.x, rect.center().y),
    }
}

pub fn connector_endpoints(panel: Rect, node: Rect) -> (Pos2, Pos2) {
    let (panel_side, node_side) = facing_sides(panel, node);
    (side_midpoint(panel, panel_side), side_midpoint(node, node_side))
}

impl ViewModel {
    /// Expand/collapse a CTE or subquery container. Expanding opens (or
    /// reuses) its nested viewport; collapsing keeps the viewport state for
    /// the next expand.
    pub fn toggle_container(&mut self, node_id: &str) {
        let Some(node) = self.graph.node_mut(node_id) else {
            return;
        };
        if !node.kind.is_container() || node.children.is_empty() {
            return;
        }
        node.expanded = !node.expanded;
        if node.expanded {
            self.clouds.open(node_id);
        }
        self.scene_dirty = true;
    }

    pub fn drag_panel(&mut self, container_id: &str, delta: Vec2) {
        let Some(node_rect) = self
            .scene
            .as_ref()
            .and_then(|scene| scene.node(container_id))
            .map(|node| node.rect)
        else {
            return;
        };
        self.clouds.drag_panel(container_id, node_rect, delta);
    }
}
