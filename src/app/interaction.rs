use eframe::egui::{self, Rect, Ui, Vec2};

use super::reach::{HopDirection, ReachMode};
use super::sched::ZOOM_SETTLE_DEBOUNCE;
use super::{DragState, DragTarget, ViewModel};

impl ViewModel {
    /// Wheel zoom around the pointer. `pointer` is canvas-local; `nested`
    /// routes the zoom into a cloud panel's own camera instead of the
    /// primary one.
    pub(in crate::app) fn handle_wheel_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        hovered_panel: Option<String>,
        now: f64,
    ) {
        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let local = pointer - rect.min.to_vec2();
        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);

        if let Some(panel_id) = hovered_panel {
            // Pivot in panel-local units so the child point under the
            // pointer stays fixed inside the panel.
            let Some(node_rect) = self
                .scene
                .as_ref()
                .and_then(|scene| scene.node(&panel_id))
                .map(|node| node.rect)
            else {
                return;
            };
            let offset = self.clouds.offset_for(&panel_id, node_rect);
            let graph_pointer = self.camera.screen_to_graph(local);
            let pivot = graph_pointer - (node_rect.min + offset).to_vec2();
            if let Some(view) = self.clouds.view_mut(&panel_id) {
                view.camera.zoom_around(zoom_factor, pivot);
            }
            return;
        }

        self.camera.zoom_around(zoom_factor, local);
        self.refresh_virtualization(now, true);
        self.zoom_settle.bump(now, ZOOM_SETTLE_DEBOUNCE);
    }

    pub(in crate::app) fn handle_drag(
        &mut self,
        response: &egui::Response,
        hit: Option<DragTarget>,
        now: f64,
    ) {
        if response.drag_started_by(egui::PointerButton::Primary) {
            self.drag = hit.map(|target| DragState {
                target,
                moved: false,
            });
        }

        if response.dragged_by(egui::PointerButton::Primary) {
            let delta = response.drag_delta();
            if delta != Vec2::ZERO
                && let Some(drag) = self.drag.take()
            {
                self.apply_drag(&drag.target, delta, now);
                self.drag = Some(DragState {
                    target: drag.target,
                    moved: true,
                });
            }
        } else if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            let delta = response.drag_delta();
            if delta != Vec2::ZERO {
                self.camera.pan(delta);
                self.refresh_virtualization(now, true);
            }
        }

        if response.drag_stopped_by(egui::PointerButton::Primary)
            && let Some(drag) = self.drag.take()
            && drag.moved
        {
            self.record_action();
        }
    }

    fn apply_drag(&mut self, target: &DragTarget, delta: Vec2, now: f64) {
        match target {
            DragTarget::Node(id) => {
                let graph_delta = delta / self.camera.scale;
                self.move_node(id, graph_delta, now);
            }
            DragTarget::Panel(id) => {
                let graph_delta = delta / self.camera.scale;
                self.drag_panel(id, graph_delta);
            }
            DragTarget::PanelContent(id) => {
                if let Some(view) = self.clouds.view_mut(id) {
                    view.camera.pan(delta / self.camera.scale);
                }
            }
        }
    }

    /// Moves one node in graph space, keeping the source graph, the scene
    /// and the display list in agreement without a full rebuild.
    pub(in crate::app) fn move_node(&mut self, id: &str, graph_delta: Vec2, now: f64) {
        if let Some(node) = self.graph.node_mut(id) {
            node.x += graph_delta.x;
            node.y += graph_delta.y;
        } else if let Some(origin) = self
            .scene
            .as_ref()
            .and_then(|scene| scene.node(id))
            .map(|node| node.rect.min)
            .filter(|_| self.clusters.contains_key(id))
        {
            self.cluster_positions.insert(id.to_owned(), origin + graph_delta);
        }

        let mut moved = None;
        if let Some(scene) = self.scene.as_mut()
            && let Some(node) = scene.node_mut(id)
        {
            node.rect = node.rect.translate(graph_delta);
            moved = Some(node.clone());
        }

        // A dragged node stays materialized even while the throttle holds
        // the full pass back.
        if let Some(node) = moved
            && self.display.contains(id)
        {
            use super::surface::RenderSurface;
            self.display.draw_node(&node);
        }
        self.virtualizer.mark_edges_stale();
        self.refresh_virtualization(now, true);
    }

    pub(in crate::app) fn handle_keys(&mut self, ui: &Ui, now: f64) {
        if ui.ctx().wants_keyboard_input() {
            return;
        }

        let (up, down, focus_key, zoom_key, escape, undo_key, redo_key) = ui.input(|input| {
            let ctrl = input.modifiers.command;
            let shift = input.modifiers.shift;
            (
                input.key_pressed(egui::Key::ArrowUp) || input.key_pressed(egui::Key::ArrowLeft),
                input.key_pressed(egui::Key::ArrowDown)
                    || input.key_pressed(egui::Key::ArrowRight),
                input.key_pressed(egui::Key::F) && !ctrl,
                input.key_pressed(egui::Key::Z) && !ctrl,
                input.key_pressed(egui::Key::Escape),
                ctrl && !shift && input.key_pressed(egui::Key::Z),
                (ctrl && shift && input.key_pressed(egui::Key::Z))
                    || (ctrl && input.key_pressed(egui::Key::Y)),
            )
        });

        if up {
            self.cycle_selection(HopDirection::Upstream);
        }
        if down {
            self.cycle_selection(HopDirection::Downstream);
        }
        if focus_key {
            self.toggle_focus(ReachMode::All);
        }
        if zoom_key && let Some(selected) = self.selected.clone() {
            self.zoom_to_node(&selected, now);
        }
        if escape {
            if self.focus.is_some() {
                self.exit_focus();
            } else {
                self.set_selected(None);
            }
        }
        if undo_key {
            self.undo();
        }
        if redo_key {
            self.redo();
        }
    }
}
