use eframe::egui::{self, Ui};

use crate::util::short_name;

use super::super::ViewModel;
use super::super::reach::ReachMode;
use super::super::surface::HostNotifier;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        let now = ui.input(|input| input.time);

        ui.heading("View");
        ui.horizontal(|ui| {
            ui.label("Search:");
            if ui.text_edit_singleline(&mut self.search).changed() {
                self.search_match_cache = None;
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Fit to view").clicked() {
                self.fit_to_view(self.container_size, now);
                self.record_action();
            }
            let undo_button = ui.add_enabled(self.history.can_undo(), egui::Button::new("Undo"));
            if undo_button.clicked() {
                self.undo();
            }
            let redo_button = ui.add_enabled(self.history.can_redo(), egui::Button::new("Redo"));
            if redo_button.clicked() {
                self.redo();
            }
        });
        let mut virtualization = self.virtualizer.enabled;
        if ui
            .checkbox(&mut virtualization, "Virtualize offscreen nodes")
            .changed()
        {
            self.set_virtualization(virtualization, now);
        }

        ui.separator();
        ui.heading("Focus");
        ui.horizontal(|ui| {
            let has_selection = self.selected.is_some();
            for mode in [ReachMode::Upstream, ReachMode::Downstream, ReachMode::All] {
                let active = self.focus.as_ref().is_some_and(|focus| focus.mode == mode);
                let button = ui.add_enabled(
                    has_selection || active,
                    egui::Button::new(mode.label()).selected(active),
                );
                if button.clicked() {
                    self.toggle_focus(mode);
                }
            }
        });
        if let Some(focus) = &self.focus {
            ui.label(format!(
                "{} of {} ({} nodes)",
                focus.mode.label(),
                short_name(&focus.origin),
                focus.lit.len()
            ));
        }

        if !self.graph.lineage.is_empty() {
            ui.separator();
            ui.heading("Column lineage");
            let columns = self
                .graph
                .lineage
                .iter()
                .map(|entry| entry.column.clone())
                .collect::<Vec<_>>();
            for column in columns {
                let active = self.lineage_column.as_deref() == Some(column.as_str());
                if ui.selectable_label(active, &column).clicked() {
                    let next = if active { None } else { Some(column.clone()) };
                    self.highlight_lineage(next);
                }
            }
        }

        if !self.clusters.is_empty() {
            ui.separator();
            ui.heading("Clusters");
            let mut rows = self
                .clusters
                .values()
                .map(|cluster| (cluster.id.clone(), cluster.label.clone(), cluster.expanded))
                .collect::<Vec<_>>();
            rows.sort_by(|a, b| a.0.cmp(&b.0));
            for (id, label, expanded) in rows {
                let text = if expanded {
                    format!("▾ {label}")
                } else {
                    format!("▸ {label}")
                };
                if ui.selectable_label(expanded, text).clicked() {
                    self.toggle_cluster(&id);
                }
            }
        }

        ui.separator();
        ui.heading("Selection");
        match self.selected.clone() {
            Some(id) => {
                ui.label(short_name(&id));
                let node = self.graph.node(&id).cloned();
                if let Some(node) = node {
                    ui.label(format!("kind: {}", node.kind.label()));
                    if !node.children.is_empty() {
                        ui.label(format!("children: {}", node.children.len()));
                        let toggle_text = if node.expanded { "Collapse" } else { "Expand" };
                        if ui.button(toggle_text).clicked() {
                            self.toggle_container(&id);
                            self.record_action();
                        }
                    }
                    if let Some(line) = node.start_line
                        && ui.button(format!("Jump to line {line}")).clicked()
                    {
                        self.host.navigate_to_line(line);
                    }
                } else if let Some(cluster) = self.clusters.get(&id) {
                    ui.label(format!("cluster of {} nodes", cluster.node_ids.len()));
                }
                ui.horizontal(|ui| {
                    if ui.button("Zoom to node").clicked() {
                        self.zoom_to_node(&id, now);
                    }
                    if ui.button("Deselect").clicked() {
                        self.set_selected(None);
                    }
                });
            }
            None => {
                ui.label("Click a node, or use arrow keys to walk the flow.");
            }
        }

        if !self.graph.hints.is_empty() {
            ui.separator();
            ui.heading("Hints");
            for hint in &self.graph.hints {
                ui.label(hint);
            }
        }
    }
}
