use eframe::egui::{self, Align, Color32, Context, Layout, RichText};

use crate::util::short_name;

use super::super::ViewModel;
use super::super::surface::HostNotifier;

impl ViewModel {
    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        query_file: &str,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("flowscope");
                    ui.separator();
                    ui.label(format!("query: {query_file}"));
                    ui.label(format!("nodes: {}", self.graph.node_count()));
                    ui.label(format!("edges: {}", self.graph.edge_count()));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload query"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!("zoom: {:.0}%", self.zoom_level()));
                        ui.label(format!(
                            "visible: {} nodes / {} edges",
                            self.visible_node_count, self.visible_edge_count
                        ));
                        if let Some(hovered) = &self.hovered {
                            ui.label(format!("hover: {}", short_name(hovered)));
                        }
                    });
                });
            });

        if let Some(error) = self.graph.error.clone() {
            egui::TopBottomPanel::top("parse_error")
                .resizable(false)
                .show(ctx, |ui| {
                    let location = error
                        .line
                        .map(|line| format!(" (line {line})"))
                        .unwrap_or_default();
                    ui.colored_label(
                        Color32::from_rgb(235, 120, 110),
                        format!("SQL parse error{location}: {}", error.message),
                    );
                    if error.line.is_some() && ui.button("Jump to error").clicked() {
                        if let Some(line) = error.line {
                            self.host.navigate_to_line(line);
                        }
                    }
                });
        }

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_controls(ui));
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.graph.nodes.is_empty() {
                ui.vertical_centered(|ui| {
                    ui.add_space(80.0);
                    ui.label(RichText::new("Query graph is empty").heading());
                    for hint in &self.graph.hints {
                        ui.label(hint);
                    }
                });
            } else {
                self.draw_graph(ui);
            }
        });
    }
}
