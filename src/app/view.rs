use eframe::egui::{
    self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, StrokeKind, Ui, pos2, vec2,
};

use crate::query::QueryNode;
use crate::util::clause_excerpt;

use super::cloud;
use super::render::{
    blend_color, dim_color, dist_to_segment, draw_arrow, draw_background, kind_color, rect_anchor,
};
use super::surface::HostNotifier;
use super::{DragTarget, ViewModel};

const SELECTION_COLOR: Color32 = Color32::from_rgb(255, 200, 80);
const SEARCH_COLOR: Color32 = Color32::from_rgb(120, 220, 160);
const EDGE_COLOR: Color32 = Color32::from_rgb(130, 140, 155);
const PANEL_FILL: Color32 = Color32::from_rgb(26, 32, 41);
const PANEL_HEADER_FILL: Color32 = Color32::from_rgb(40, 50, 64);
const PANEL_BORDER: Color32 = Color32::from_rgb(90, 105, 130);
const BADGE_FILL: Color32 = Color32::from_rgb(45, 55, 70);
const EDGE_LABEL_MIN_SCALE: f32 = 0.55;
const PANEL_HEADER_HEIGHT: f32 = 20.0;

struct PanelGeometry {
    container_id: String,
    node_rect: Rect,
    offset: egui::Vec2,
    screen: Rect,
    header: Rect,
}

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        let now = ui.input(|input| input.time);

        self.resize(rect.size(), now);
        self.tick(now);

        draw_background(&painter, rect, &self.camera);

        let panels = self.panel_geometry(rect);
        let pointer = ui.input(|input| input.pointer.hover_pos());

        let hovered_node = pointer.and_then(|pointer| self.node_at(rect, pointer));
        let hovered_panel = pointer.and_then(|pointer| {
            panels
                .iter()
                .rev()
                .find(|panel| panel.screen.contains(pointer))
        });
        let hovered_panel_body = hovered_panel
            .filter(|panel| !panel.header.contains(pointer.unwrap_or(Pos2::ZERO)))
            .map(|panel| panel.container_id.clone());
        let hovered_panel_header = hovered_panel
            .filter(|panel| panel.header.contains(pointer.unwrap_or(Pos2::ZERO)))
            .map(|panel| panel.container_id.clone());

        // Panels sit above nodes, headers above bodies.
        let hit = if let Some(id) = hovered_panel_header.clone() {
            Some(DragTarget::Panel(id))
        } else if let Some(id) = hovered_panel_body.clone() {
            Some(DragTarget::PanelContent(id))
        } else {
            hovered_node.clone().map(DragTarget::Node)
        };

        self.handle_wheel_zoom(ui, rect, hovered_panel_body.clone(), now);
        self.handle_drag(&response, hit, now);
        self.handle_keys(ui, now);

        self.hovered = hovered_node.clone();
        if hovered_node.is_some() || hovered_panel_header.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        if response.clicked_by(egui::PointerButton::Primary) && hovered_panel.is_none() {
            self.set_selected(hovered_node.clone());
        }
        if response.double_clicked_by(egui::PointerButton::Primary) {
            if let Some(id) = hovered_node.clone() {
                if self.clusters.contains_key(&id) {
                    self.toggle_cluster(&id);
                } else if self
                    .graph
                    .node(&id)
                    .is_some_and(|node| node.kind.is_container() && !node.children.is_empty())
                {
                    self.toggle_container(&id);
                    self.record_action();
                } else {
                    self.activate_node(&id);
                }
            } else if let Some(pointer) = pointer
                && let Some(line) = self.edge_line_at(rect, pointer)
            {
                self.host.navigate_to_line(line);
            }
        }

        let search_matches = self.cached_search_matches();
        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());

        for sprite in self.display.edges() {
            let source = self.camera.graph_rect_to_screen(sprite.source_rect);
            let target = self.camera.graph_rect_to_screen(sprite.target_rect);
            let source = source.translate(rect.min.to_vec2());
            let target = target.translate(rect.min.to_vec2());

            let start = rect_anchor(source, target.center());
            let end = rect_anchor(target, source.center());

            let dimmed = self.node_dimmed(&sprite.edge.source_id)
                || self.node_dimmed(&sprite.edge.target_id);
            let mut color = EDGE_COLOR;
            if dimmed {
                color = dim_color(color, 0.25);
            }
            draw_arrow(&painter, start, end, Stroke::new(1.2, color));

            if self.camera.scale >= EDGE_LABEL_MIN_SCALE
                && !dimmed
                && let Some(clause) = sprite.edge.sql_clause.as_deref()
            {
                let mid = start + (end - start) * 0.5;
                let hovered_edge = pointer
                    .is_some_and(|pointer| dist_to_segment(pointer, start, end) < 6.0);
                let excerpt = clause_excerpt(clause, if hovered_edge { 120 } else { 32 });
                painter.text(
                    mid,
                    Align2::CENTER_CENTER,
                    excerpt,
                    FontId::proportional(10.0),
                    Color32::from_rgb(170, 180, 195),
                );
            }
        }

        for node in self.display.nodes_in_order() {
            let screen = self
                .camera
                .graph_rect_to_screen(node.rect)
                .translate(rect.min.to_vec2());

            let mut fill = kind_color(node.kind);
            let dimmed = self.node_dimmed(&node.id)
                || (search_active
                    && search_matches
                        .as_ref()
                        .is_some_and(|matches| !matches.contains(&node.id)));
            if dimmed {
                fill = dim_color(fill, 0.3);
            }
            let selected = self.selected.as_deref() == Some(node.id.as_str());
            let matched = search_active
                && search_matches
                    .as_ref()
                    .is_some_and(|matches| matches.contains(&node.id));
            if matched {
                fill = blend_color(fill, SEARCH_COLOR, 0.35);
            }

            painter.rect_filled(screen, 4.0, fill);
            let stroke = if selected {
                Stroke::new(2.0, SELECTION_COLOR)
            } else {
                Stroke::new(1.0, Color32::from_rgb(30, 36, 45))
            };
            painter.rect_stroke(screen, 4.0, stroke, StrokeKind::Inside);

            if self.camera.scale >= 0.3 {
                let label_color = if dimmed {
                    Color32::from_rgb(120, 125, 135)
                } else {
                    Color32::WHITE
                };
                painter.text(
                    screen.center(),
                    Align2::CENTER_CENTER,
                    &node.label,
                    FontId::proportional((12.0 * self.camera.scale).clamp(8.0, 16.0)),
                    label_color,
                );
            }

            if node.cluster_size > 0 {
                painter.text(
                    screen.right_top() + vec2(-4.0, 4.0),
                    Align2::RIGHT_TOP,
                    format!("{}", node.cluster_size),
                    FontId::proportional(10.0),
                    Color32::from_rgb(210, 215, 225),
                );
            }
            if node.has_children && node.kind.is_container() {
                let glyph = if node.expanded { "−" } else { "+" };
                painter.text(
                    screen.left_top() + vec2(6.0, 4.0),
                    Align2::LEFT_TOP,
                    glyph,
                    FontId::proportional(12.0),
                    Color32::from_rgb(220, 225, 235),
                );
            }
        }

        for panel in &panels {
            self.draw_cloud_panel(&painter, rect, panel);
        }

        self.draw_offscreen_badges(&painter, rect);

        if let Some(id) = &self.hovered
            && let Some(node) = self.scene.as_ref().and_then(|scene| scene.node(id))
        {
            let screen = self
                .camera
                .graph_rect_to_screen(node.rect)
                .translate(rect.min.to_vec2());
            painter.text(
                screen.center_bottom() + vec2(0.0, 6.0),
                Align2::CENTER_TOP,
                &node.id,
                FontId::proportional(10.0),
                Color32::from_rgb(160, 170, 185),
            );
        }

        if self.scene_dirty
            || self.deferred_refresh
            || self.resize_debounce.pending()
            || self.zoom_settle.pending()
            || response.dragged()
        {
            ui.ctx().request_repaint();
        }
    }

    fn panel_geometry(&self, rect: Rect) -> Vec<PanelGeometry> {
        let Some(scene) = &self.scene else {
            return Vec::new();
        };

        let mut panels = Vec::new();
        for node in &scene.nodes {
            if !node.expanded || !node.kind.is_container() || self.hidden_nodes.contains(&node.id)
            {
                continue;
            }
            let offset = self.clouds.offset_for(&node.id, node.rect);
            let graph_rect = cloud::panel_rect_graph(node.rect, offset);
            let screen = self
                .camera
                .graph_rect_to_screen(graph_rect)
                .translate(rect.min.to_vec2());
            let header_height = (PANEL_HEADER_HEIGHT * self.camera.scale).clamp(12.0, 28.0);
            let header = Rect::from_min_size(screen.min, vec2(screen.width(), header_height));
            panels.push(PanelGeometry {
                container_id: node.id.clone(),
                node_rect: node.rect,
                offset,
                screen,
                header,
            });
        }
        panels
    }

    fn draw_cloud_panel(&self, painter: &egui::Painter, rect: Rect, panel: &PanelGeometry) {
        let node_screen = self
            .camera
            .graph_rect_to_screen(panel.node_rect)
            .translate(rect.min.to_vec2());
        let (from, to) = cloud::connector_endpoints(panel.screen, node_screen);
        painter.line_segment(
            [from, to],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(120, 135, 160, 160)),
        );

        painter.rect_filled(panel.screen, 4.0, PANEL_FILL);
        painter.rect_filled(panel.header, 4.0, PANEL_HEADER_FILL);
        painter.rect_stroke(panel.screen, 4.0, Stroke::new(1.0, PANEL_BORDER), StrokeKind::Inside);

        let Some(container) = self.graph.node(&panel.container_id) else {
            return;
        };
        painter.text(
            panel.header.left_center() + vec2(6.0, 0.0),
            Align2::LEFT_CENTER,
            container.display_label(),
            FontId::proportional(11.0),
            Color32::from_rgb(215, 222, 232),
        );

        let Some(view) = self.clouds.view(&panel.container_id) else {
            return;
        };
        let body = Rect::from_min_max(
            pos2(panel.screen.min.x, panel.header.max.y),
            panel.screen.max,
        );
        let clipped = painter.with_clip_rect(body);

        let child_screen = |child: &QueryNode| {
            let min = cloud::local_to_screen(
                &self.camera,
                panel.node_rect,
                panel.offset,
                &view.camera,
                pos2(child.x, child.y),
            ) + rect.min.to_vec2();
            let max = cloud::local_to_screen(
                &self.camera,
                panel.node_rect,
                panel.offset,
                &view.camera,
                pos2(child.x + child.width, child.y + child.height),
            ) + rect.min.to_vec2();
            Rect::from_min_max(min, max)
        };

        for edge in &container.child_edges {
            let (Some(source), Some(target)) = (
                container.children.iter().find(|child| child.id == edge.source),
                container.children.iter().find(|child| child.id == edge.target),
            ) else {
                continue;
            };
            let source = child_screen(source);
            let target = child_screen(target);
            draw_arrow(
                &clipped,
                rect_anchor(source, target.center()),
                rect_anchor(target, source.center()),
                Stroke::new(1.0, dim_color(EDGE_COLOR, 0.8)),
            );
        }

        for child in &container.children {
            let screen = child_screen(child);
            clipped.rect_filled(screen, 3.0, kind_color(child.kind));
            clipped.rect_stroke(
                screen,
                3.0,
                Stroke::new(1.0, Color32::from_rgb(30, 36, 45)),
                StrokeKind::Inside,
            );
            let effective_scale = self.camera.scale * view.camera.scale;
            if effective_scale >= 0.3 {
                clipped.text(
                    screen.center(),
                    Align2::CENTER_CENTER,
                    child.display_label(),
                    FontId::proportional((10.0 * effective_scale).clamp(7.0, 13.0)),
                    Color32::WHITE,
                );
            }
        }
    }

    fn draw_offscreen_badges(&self, painter: &egui::Painter, rect: Rect) {
        let Some(result) = self.virtualizer.last() else {
            return;
        };
        let counts = result.offscreen;
        if counts.total() == 0 {
            return;
        }

        let badge = |painter: &egui::Painter, position: Pos2, count: usize, arrow: &str| {
            if count == 0 {
                return;
            }
            let text = format!("{arrow} {count}");
            let galley_rect = Rect::from_center_size(position, vec2(46.0, 18.0));
            painter.rect_filled(galley_rect, 9.0, BADGE_FILL);
            painter.text(
                position,
                Align2::CENTER_CENTER,
                text,
                FontId::proportional(11.0),
                Color32::from_rgb(200, 210, 225),
            );
        };

        badge(painter, pos2(rect.center().x, rect.top() + 16.0), counts.top, "↑");
        badge(
            painter,
            pos2(rect.center().x, rect.bottom() - 16.0),
            counts.bottom,
            "↓",
        );
        badge(painter, pos2(rect.left() + 30.0, rect.center().y), counts.left, "←");
        badge(
            painter,
            pos2(rect.right() - 30.0, rect.center().y),
            counts.right,
            "→",
        );
    }

    /// Source line of the edge under the pointer, when it carries one.
    fn edge_line_at(&self, rect: Rect, pointer: Pos2) -> Option<u32> {
        for sprite in self.display.edges() {
            let source = self
                .camera
                .graph_rect_to_screen(sprite.source_rect)
                .translate(rect.min.to_vec2());
            let target = self
                .camera
                .graph_rect_to_screen(sprite.target_rect)
                .translate(rect.min.to_vec2());
            let start = rect_anchor(source, target.center());
            let end = rect_anchor(target, source.center());
            if dist_to_segment(pointer, start, end) < 6.0
                && let Some(line) = sprite.edge.start_line
            {
                return Some(line);
            }
        }
        None
    }

    fn node_at(&self, rect: Rect, pointer: Pos2) -> Option<String> {
        let mut found = None;
        for node in self.display.nodes_in_order() {
            let screen = self
                .camera
                .graph_rect_to_screen(node.rect)
                .translate(rect.min.to_vec2());
            if screen.contains(pointer) {
                found = Some(node.id.clone());
            }
        }
        found
    }
}
