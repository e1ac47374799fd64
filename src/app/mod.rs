use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Pos2, Vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::query::{QueryGraph, load_query_graph};

pub mod camera;
pub mod cloud;
pub mod cluster;
pub mod history;
pub mod reach;
pub mod scene;
pub mod sched;
pub mod surface;
pub mod virtualize;

mod interaction;
mod render;
mod ui;
mod view;

use camera::Camera;
use cloud::CloudManager;
use cluster::NodeCluster;
use history::LayoutHistory;
use reach::{NeighborCycle, ReachMode};
use scene::SceneGraph;
use sched::Debouncer;
use surface::{DisplayList, HostLog, HostNotifier};
use virtualize::Virtualizer;

pub struct FlowScopeApp {
    query_file: String,
    state: AppState,
    reload_rx: Option<Receiver<Result<QueryGraph, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<QueryGraph, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

/// All exploration state for one loaded query graph. Methods live in the
/// per-concern submodules.
pub struct ViewModel {
    pub graph: QueryGraph,
    pub scene: Option<SceneGraph>,
    pub(in crate::app) scene_dirty: bool,
    pub(in crate::app) scene_revision: u64,

    pub camera: Camera,
    pub(in crate::app) baseline_scale: f32,
    pub(in crate::app) container_size: Vec2,
    pub hidden_nodes: HashSet<String>,
    pub(in crate::app) zoom_focus: Option<String>,

    pub clusters: HashMap<String, NodeCluster>,
    pub(in crate::app) cluster_positions: HashMap<String, Pos2>,
    pub clouds: CloudManager,

    pub selected: Option<String>,
    pub(in crate::app) hovered: Option<String>,
    pub focus: Option<FocusState>,
    pub(in crate::app) neighbor_cycle: NeighborCycle,
    pub(in crate::app) lineage_column: Option<String>,
    pub(in crate::app) lineage_nodes: HashSet<String>,

    pub(in crate::app) layout_name: String,
    pub history: LayoutHistory,

    pub(in crate::app) virtualizer: Virtualizer,
    pub display: DisplayList,
    pub(in crate::app) visible_node_count: usize,
    pub(in crate::app) visible_edge_count: usize,

    pub host: HostLog,

    pub(in crate::app) search: String,
    pub(in crate::app) search_match_cache: Option<SearchMatchCache>,

    pub(in crate::app) initial_fit_pending: bool,
    pub(in crate::app) deferred_refresh: bool,
    pub(in crate::app) resize_debounce: Debouncer,
    pub(in crate::app) zoom_settle: Debouncer,
    pub(in crate::app) drag: Option<DragState>,
}

#[derive(Clone, Debug)]
pub struct FocusState {
    pub origin: String,
    pub mode: ReachMode,
    pub lit: HashSet<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) enum DragTarget {
    Node(String),
    Panel(String),
    PanelContent(String),
}

#[derive(Clone, Debug)]
pub(in crate::app) struct DragState {
    pub target: DragTarget,
    pub moved: bool,
}

pub(in crate::app) struct SearchMatchCache {
    query: String,
    scene_revision: u64,
    matches: Arc<HashSet<String>>,
}

impl ViewModel {
    pub fn new(graph: QueryGraph) -> Self {
        Self {
            graph,
            scene: None,
            scene_dirty: true,
            scene_revision: 0,
            camera: Camera::default(),
            baseline_scale: 1.0,
            container_size: Vec2::ZERO,
            hidden_nodes: HashSet::new(),
            zoom_focus: None,
            clusters: HashMap::new(),
            cluster_positions: HashMap::new(),
            clouds: CloudManager::default(),
            selected: None,
            hovered: None,
            focus: None,
            neighbor_cycle: NeighborCycle::default(),
            lineage_column: None,
            lineage_nodes: HashSet::new(),
            layout_name: "default".to_owned(),
            history: LayoutHistory::default(),
            virtualizer: Virtualizer::default(),
            display: DisplayList::default(),
            visible_node_count: 0,
            visible_edge_count: 0,
            host: HostLog::default(),
            search: String::new(),
            search_match_cache: None,
            initial_fit_pending: true,
            deferred_refresh: false,
            resize_debounce: Debouncer::default(),
            zoom_settle: Debouncer::default(),
            drag: None,
        }
    }

    /// Per-frame housekeeping. Deferred work from the previous frame runs
    /// first so a scene rebuilt last frame is measured before any new
    /// rebuild is triggered.
    pub fn tick(&mut self, now: f64) {
        if self.deferred_refresh {
            self.deferred_refresh = false;
            if self.initial_fit_pending {
                self.initial_fit_pending = false;
                self.fit_to_view(self.container_size, now);
                let baseline = self.snapshot();
                self.history.initialize(baseline);
                self.notify_history();
            } else {
                self.force_virtual_refresh(now);
            }
        }

        if self.scene_dirty {
            self.rebuild_scene();
            self.deferred_refresh = true;
        }

        if self.resize_debounce.fire(now) {
            self.fit_to_view(self.container_size, now);
        }
        if self.zoom_settle.fire(now) {
            self.record_action();
        }
        if self.virtualizer.poll(now) {
            self.run_virtualization_pass();
        }
    }

    /// Container size changes re-fit after a quiet period rather than on
    /// every intermediate size.
    pub fn resize(&mut self, size: Vec2, now: f64) {
        if (size - self.container_size).abs().max_elem() < 0.5 {
            return;
        }
        let first = self.container_size == Vec2::ZERO;
        self.container_size = size;
        if !first && !self.initial_fit_pending {
            self.resize_debounce.bump(now, sched::RESIZE_DEBOUNCE);
        }
    }

    pub fn set_selected(&mut self, id: Option<String>) {
        self.selected = id;
        self.neighbor_cycle.reset();
        self.refresh_focus_origin();
    }

    /// Double-click / Enter: select the node and ask the host to jump to
    /// its source line when it has one.
    pub fn activate_node(&mut self, id: &str) {
        self.set_selected(Some(id.to_owned()));
        if let Some(line) = self.scene.as_ref().and_then(|scene| scene.node(id)).and_then(|node| node.start_line)
        {
            self.host.navigate_to_line(line);
        }
    }

    /// Replaces the loaded graph and resets every piece of exploration
    /// state that refers to the old one.
    pub fn load_graph(&mut self, graph: QueryGraph) {
        self.graph = graph;
        self.scene = None;
        self.scene_dirty = true;
        self.camera = Camera::default();
        self.baseline_scale = 1.0;
        self.hidden_nodes.clear();
        self.zoom_focus = None;
        self.clusters.clear();
        self.cluster_positions.clear();
        self.clouds.reset();
        self.selected = None;
        self.hovered = None;
        self.focus = None;
        self.neighbor_cycle.reset();
        self.lineage_column = None;
        self.lineage_nodes.clear();
        self.history.clear();
        self.display.clear();
        self.virtualizer.invalidate_all();
        self.search_match_cache = None;
        self.initial_fit_pending = true;
        self.deferred_refresh = false;
        self.resize_debounce.cancel();
        self.zoom_settle.cancel();
        self.drag = None;
        self.notify_history();
    }

    pub(in crate::app) fn cached_search_matches(&mut self) -> Option<Arc<HashSet<String>>> {
        let search_query = self.search.trim();
        if search_query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.scene_revision == self.scene_revision
            && cached.query == search_query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let scene = self.scene.as_ref()?;
        let matcher = SkimMatcherV2::default();
        let matches = scene
            .nodes
            .iter()
            .filter(|node| fuzzy_match_score(&matcher, &node.label, search_query).is_some())
            .map(|node| node.id.clone())
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: search_query.to_owned(),
            scene_revision: self.scene_revision,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl FlowScopeApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, query_file: String) -> Self {
        let state = Self::start_load(query_file.clone());
        Self {
            query_file,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(query_file: String) -> Receiver<Result<QueryGraph, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_query_graph(&query_file).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(query_file: String) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(query_file),
        }
    }
}

impl eframe::App for FlowScopeApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(graph) => AppState::Ready(Box::new(ViewModel::new(graph))),
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading query graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load query graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.query_file.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.query_file, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.query_file.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => match result {
                            Ok(graph) => model.load_graph(graph),
                            Err(error) => transition = Some(AppState::Error(error)),
                        },
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(AppState::Error("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
