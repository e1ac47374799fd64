use std::collections::HashSet;

use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};

use super::ViewModel;
use super::cloud;

pub const SCALE_MIN: f32 = 0.05;
pub const SCALE_MAX: f32 = 6.0;

/// Chrome reserved around the fitted bounding box, in screen pixels per side.
pub const FIT_MARGIN: f32 = 80.0;
pub const FIT_SCALE_CAP: f32 = 1.5;
const MIN_FIT_EXTENT: f32 = 32.0;
const SINGLE_NODE_PADDING: f32 = 220.0;

pub const NEIGHBOR_ZOOM_PADDING: f32 = 120.0;
pub const NEIGHBOR_ZOOM_SCALE_CAP: f32 = 2.5;
pub const NEIGHBOR_ZOOM_BASELINE_FACTOR: f32 = 2.0;

/// Affine graph-to-screen map: `screen = graph * scale + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub scale: f32,
    pub offset: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Vec2::ZERO,
        }
    }
}

impl Camera {
    pub fn graph_to_screen(&self, point: Pos2) -> Pos2 {
        pos2(
            point.x * self.scale + self.offset.x,
            point.y * self.scale + self.offset.y,
        )
    }

    pub fn screen_to_graph(&self, point: Pos2) -> Pos2 {
        pos2(
            (point.x - self.offset.x) / self.scale,
            (point.y - self.offset.y) / self.scale,
        )
    }

    pub fn graph_rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.graph_to_screen(rect.min), self.graph_to_screen(rect.max))
    }

    pub fn pan(&mut self, delta: Vec2) {
        if delta.x.is_finite() && delta.y.is_finite() {
            self.offset += delta;
        }
    }

    /// Zooms around `pivot` (screen space) so the graph point under it stays fixed.
    pub fn zoom_around(&mut self, factor: f32, pivot: Pos2) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }

        let new_scale = (self.scale * factor).clamp(SCALE_MIN, SCALE_MAX);
        if !new_scale.is_finite() {
            return;
        }

        let ratio = new_scale / self.scale;
        self.offset = pivot.to_vec2() - (pivot.to_vec2() - self.offset) * ratio;
        self.scale = new_scale;
    }

    pub fn clamped(self) -> Self {
        let scale = if self.scale.is_finite() {
            self.scale.clamp(SCALE_MIN, SCALE_MAX)
        } else {
            1.0
        };
        let offset = if self.offset.x.is_finite() && self.offset.y.is_finite() {
            self.offset
        } else {
            Vec2::ZERO
        };
        Self { scale, offset }
    }
}

pub(crate) fn rect_is_finite(rect: Rect) -> bool {
    rect.min.x.is_finite()
        && rect.min.y.is_finite()
        && rect.max.x.is_finite()
        && rect.max.y.is_finite()
}

pub fn union_bounds(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    let mut bounds: Option<Rect> = None;
    for rect in rects {
        if !rect_is_finite(rect) {
            continue;
        }
        bounds = Some(match bounds {
            Some(acc) => acc.union(rect),
            None => rect,
        });
    }
    bounds.filter(|acc| rect_is_finite(*acc))
}

/// Centers `bounds` inside `container` minus the chrome margins. Degenerate
/// input falls back to the identity camera rather than an error.
pub fn fit_camera(bounds: Rect, container: Vec2) -> Camera {
    if !rect_is_finite(bounds) || container.x <= 0.0 || container.y <= 0.0 {
        return Camera::default();
    }

    let width = bounds.width().max(MIN_FIT_EXTENT);
    let height = bounds.height().max(MIN_FIT_EXTENT);
    let usable_x = (container.x - FIT_MARGIN * 2.0).max(1.0);
    let usable_y = (container.y - FIT_MARGIN * 2.0).max(1.0);

    let scale = (usable_x / width)
        .min(usable_y / height)
        .min(FIT_SCALE_CAP)
        .clamp(SCALE_MIN, SCALE_MAX);

    let center = bounds.center();
    let offset = vec2(
        container.x * 0.5 - center.x * scale,
        container.y * 0.5 - center.y * scale,
    );

    Camera { scale, offset }
}

fn centered_camera(bounds: Rect, container: Vec2, scale: f32) -> Camera {
    let center = bounds.center();
    Camera {
        scale,
        offset: vec2(
            container.x * 0.5 - center.x * scale,
            container.y * 0.5 - center.y * scale,
        ),
    }
}

impl ViewModel {
    /// Fits every (non-hidden) scene node plus the panels of expanded
    /// containers into `container`, and records the resulting scale as the
    /// 100% baseline for `zoom_level`.
    pub fn fit_to_view(&mut self, container: Vec2, now: f64) {
        self.container_size = container;

        let mut rects = Vec::new();
        if let Some(scene) = &self.scene {
            for node in &scene.nodes {
                if self.hidden_nodes.contains(&node.id) {
                    continue;
                }
                rects.push(node.rect);
                if node.expanded && node.kind.is_container() {
                    let offset = self.clouds.offset_for(&node.id, node.rect);
                    rects.push(cloud::panel_rect_graph(node.rect, offset));
                }
            }
        }

        self.camera = match union_bounds(rects.iter().copied()) {
            Some(mut bounds) => {
                if rects.len() == 1 {
                    bounds = bounds.expand(SINGLE_NODE_PADDING);
                }
                fit_camera(bounds, container)
            }
            None => Camera::default(),
        };
        self.baseline_scale = self.camera.scale;
        self.force_virtual_refresh(now);
    }

    /// Zoom percentage relative to the fit-to-view baseline, not raw scale.
    pub fn zoom_level(&self) -> f32 {
        if self.baseline_scale > 0.0 {
            self.camera.scale / self.baseline_scale * 100.0
        } else {
            100.0
        }
    }

    /// Toggle: first call zooms to the 1-hop neighborhood of `node_id` and
    /// hides everything else; the next call restores full visibility and
    /// re-fits the whole graph.
    pub fn zoom_to_node(&mut self, node_id: &str, now: f64) {
        if self.zoom_focus.take().is_some() {
            self.hidden_nodes.clear();
            self.fit_to_view(self.container_size, now);
            return;
        }

        let container = self.container_size;
        let Some(scene) = self.scene.as_ref() else {
            return;
        };
        let Some(&index) = scene.index_by_id.get(node_id) else {
            return;
        };

        let mut keep = HashSet::from([index]);
        keep.extend(scene.outgoing[index].iter().copied());
        keep.extend(scene.incoming[index].iter().copied());

        let Some(bounds) = union_bounds(
            keep.iter()
                .filter_map(|&neighbor| scene.nodes.get(neighbor).map(|node| node.rect)),
        ) else {
            return;
        };

        let hidden = scene
            .nodes
            .iter()
            .enumerate()
            .filter(|(neighbor, _)| !keep.contains(neighbor))
            .map(|(_, node)| node.id.clone())
            .collect::<HashSet<_>>();

        let padded = bounds.expand(NEIGHBOR_ZOOM_PADDING);
        let mut camera = fit_camera(padded, container);
        let cap = (self.baseline_scale * NEIGHBOR_ZOOM_BASELINE_FACTOR)
            .min(NEIGHBOR_ZOOM_SCALE_CAP)
            .clamp(SCALE_MIN, SCALE_MAX);
        if camera.scale > cap {
            camera = centered_camera(padded, container, cap);
        }

        self.hidden_nodes = hidden;
        self.camera = camera;
        self.zoom_focus = Some(node_id.to_owned());
        self.force_virtual_refresh(now);
    }
}
