use eframe::egui::{Vec2, pos2};

use super::ViewModel;
use super::camera::Camera;
use super::reach::ReachMode;
use super::surface::HostNotifier;

pub const HISTORY_CAP: usize = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutSnapshot {
    pub camera: Camera,
    pub selected: Option<String>,
    /// `Some(mode)` when focus mode was active; the origin is `selected`.
    pub focus: Option<ReachMode>,
    pub layout_name: String,
    pub positions: Vec<(String, f32, f32)>,
    pub cloud_offsets: Vec<(String, Vec2)>,
}

/// Linear undo stack with a cursor pointing at the current snapshot.
#[derive(Debug, Default)]
pub struct LayoutHistory {
    entries: Vec<LayoutSnapshot>,
    cursor: usize,
}

impl LayoutHistory {
    /// Sets the baseline without consuming an undo slot; no-op once one exists.
    pub fn initialize(&mut self, snapshot: LayoutSnapshot) {
        if self.entries.is_empty() {
            self.entries.push(snapshot);
            self.cursor = 0;
        }
    }

    pub fn record(&mut self, snapshot: LayoutSnapshot) {
        if self.entries.is_empty() {
            self.entries.push(snapshot);
            self.cursor = 0;
            return;
        }

        // The redo tail dies on every record, even when the snapshot turns
        // out to be a no-op against the current entry.
        self.entries.truncate(self.cursor + 1);
        if self.entries[self.cursor] == snapshot {
            return;
        }

        self.entries.push(snapshot);
        if self.entries.len() > HISTORY_CAP {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len() - 1;
    }

    pub fn undo(&mut self) -> Option<LayoutSnapshot> {
        if self.cursor == 0 || self.entries.is_empty() {
            return None;
        }
        self.cursor -= 1;
        Some(self.entries[self.cursor].clone())
    }

    pub fn redo(&mut self) -> Option<LayoutSnapshot> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor].clone())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

impl ViewModel {
    pub fn snapshot(&self) -> LayoutSnapshot {
        let positions = match &self.scene {
            Some(scene) => scene
                .nodes
                .iter()
                .map(|node| (node.id.clone(), node.rect.min.x, node.rect.min.y))
                .collect(),
            None => Vec::new(),
        };

        let mut cloud_offsets = self
            .clouds
            .offsets()
            .map(|(id, offset)| (id.to_owned(), offset))
            .collect::<Vec<_>>();
        cloud_offsets.sort_by(|a, b| a.0.cmp(&b.0));

        LayoutSnapshot {
            camera: self.camera,
            selected: self.selected.clone(),
            focus: self.focus.as_ref().map(|focus| focus.mode),
            layout_name: self.layout_name.clone(),
            positions,
            cloud_offsets,
        }
    }

    /// Restores a snapshot wholesale. Position entries whose id is no longer
    /// present are skipped; stale references are expected across reloads.
    pub fn apply_snapshot(&mut self, snapshot: &LayoutSnapshot) {
        self.camera = snapshot.camera.clamped();
        self.layout_name = snapshot.layout_name.clone();

        for (id, x, y) in &snapshot.positions {
            if let Some(node) = self.graph.node_mut(id) {
                node.x = *x;
                node.y = *y;
            } else if self.clusters.contains_key(id) {
                self.cluster_positions.insert(id.clone(), pos2(*x, *y));
            }
        }

        self.clouds
            .replace_offsets(snapshot.cloud_offsets.iter().cloned());
        self.selected = snapshot.selected.clone();
        self.neighbor_cycle.reset();

        match snapshot.focus {
            Some(mode) => self.enter_focus(mode),
            None => self.focus = None,
        }

        self.scene_dirty = true;
    }

    /// Records the current state as a discrete-action snapshot.
    pub fn record_action(&mut self) {
        let snapshot = self.snapshot();
        self.history.record(snapshot);
        self.notify_history();
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.apply_snapshot(&snapshot);
                self.notify_history();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.apply_snapshot(&snapshot);
                self.notify_history();
                true
            }
            None => false,
        }
    }

    pub(in crate::app) fn notify_history(&mut self) {
        let can_undo = self.history.can_undo();
        let can_redo = self.history.can_redo();
        self.host.history_changed(can_undo, can_redo);
    }
}
