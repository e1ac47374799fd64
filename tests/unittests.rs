use std::collections::{HashMap, HashSet};

use eframe::egui::{Rect, pos2, vec2};

use flowscope::app::ViewModel;
use flowscope::app::camera::{Camera, FIT_MARGIN, SCALE_MAX, SCALE_MIN, fit_camera, union_bounds};
use flowscope::app::cloud::{self, CloudManager, PanelSide};
use flowscope::app::cluster::{ClusterCandidate, cluster_graph};
use flowscope::app::history::{LayoutHistory, LayoutSnapshot};
use flowscope::app::reach::{HopDirection, ReachMode, connected, lineage_path_nodes};
use flowscope::app::scene::{SceneEdge, SceneGraph, SceneNode};
use flowscope::app::sched::{Debouncer, FrameThrottle};
use flowscope::app::virtualize::{Virtualizer, compute_visible, materialize_all};
use flowscope::query::{
    ColumnLineage, NodeKind, QueryEdge, QueryGraph, QueryNode, parse_query_graph,
};
use flowscope::util::{clause_excerpt, short_name};

fn node(id: &str, kind: NodeKind, x: f32, y: f32) -> QueryNode {
    QueryNode::new(id, kind, x, y)
}

fn edge(id: &str, source: &str, target: &str) -> QueryEdge {
    QueryEdge::new(id, source, target)
}

fn graph_of(nodes: Vec<QueryNode>, edges: Vec<QueryEdge>) -> QueryGraph {
    QueryGraph {
        nodes,
        edges,
        ..Default::default()
    }
}

/// Model with a built scene, fitted into an 800x600 container.
fn fitted_model(graph: QueryGraph) -> ViewModel {
    let mut model = ViewModel::new(graph);
    model.resize(vec2(800.0, 600.0), 0.0);
    model.tick(0.0);
    model.tick(0.1);
    model
}

fn scene_node(id: &str, x: f32, y: f32) -> SceneNode {
    SceneNode {
        id: id.to_owned(),
        kind: NodeKind::Table,
        label: id.to_owned(),
        rect: Rect::from_min_size(pos2(x, y), vec2(20.0, 10.0)),
        expanded: false,
        collapsible: false,
        has_children: false,
        cluster_size: 0,
        start_line: None,
    }
}

fn scene_of(nodes: Vec<SceneNode>, pairs: &[(usize, usize)]) -> SceneGraph {
    let index_by_id: HashMap<String, usize> = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.clone(), index))
        .collect();
    let mut outgoing = vec![Vec::new(); nodes.len()];
    let mut incoming = vec![Vec::new(); nodes.len()];
    let mut edges = Vec::new();
    for (edge_index, &(source, target)) in pairs.iter().enumerate() {
        outgoing[source].push(target);
        incoming[target].push(source);
        edges.push(SceneEdge {
            id: format!("e{edge_index}"),
            source,
            target,
            source_id: nodes[source].id.clone(),
            target_id: nodes[target].id.clone(),
            sql_clause: None,
            clause_type: None,
            start_line: None,
        });
    }
    SceneGraph {
        nodes,
        edges,
        index_by_id,
        outgoing,
        incoming,
    }
}

#[test]
fn camera_round_trips_points() {
    let camera = Camera {
        scale: 1.7,
        offset: vec2(40.0, -25.0),
    };
    let original = pos2(123.0, -456.0);
    let round_tripped = camera.screen_to_graph(camera.graph_to_screen(original));
    assert!((round_tripped.x - original.x).abs() < 1e-3);
    assert!((round_tripped.y - original.y).abs() < 1e-3);
}

#[test]
fn wheel_zoom_keeps_pointer_anchor_fixed() {
    let mut camera = Camera {
        scale: 0.8,
        offset: vec2(-30.0, 12.0),
    };
    let pivot = pos2(250.0, 140.0);
    let anchor = camera.screen_to_graph(pivot);

    camera.zoom_around(1.3, pivot);
    let after = camera.graph_to_screen(anchor);
    assert!((after.x - pivot.x).abs() < 1e-2);
    assert!((after.y - pivot.y).abs() < 1e-2);

    camera.zoom_around(0.6, pivot);
    let after = camera.graph_to_screen(anchor);
    assert!((after.x - pivot.x).abs() < 1e-2);
    assert!((after.y - pivot.y).abs() < 1e-2);
}

#[test]
fn zoom_scale_stays_clamped() {
    let mut camera = Camera::default();
    for _ in 0..100 {
        camera.zoom_around(1.15, pos2(10.0, 10.0));
    }
    assert!(camera.scale <= SCALE_MAX);
    for _ in 0..300 {
        camera.zoom_around(0.85, pos2(10.0, 10.0));
    }
    assert!(camera.scale >= SCALE_MIN);
}

#[test]
fn union_bounds_skips_non_finite_rects() {
    let bounds = union_bounds([
        Rect::from_min_size(pos2(0.0, 0.0), vec2(10.0, 10.0)),
        Rect::from_min_size(pos2(f32::NAN, 0.0), vec2(10.0, 10.0)),
        Rect::from_min_size(pos2(40.0, 40.0), vec2(10.0, 10.0)),
    ])
    .expect("finite rects should produce bounds");
    assert_eq!(bounds.min, pos2(0.0, 0.0));
    assert_eq!(bounds.max, pos2(50.0, 50.0));
    assert!(union_bounds(std::iter::empty()).is_none());
}

#[test]
fn fit_centers_graph_with_margin() {
    let model = fitted_model(graph_of(
        vec![
            node("a", NodeKind::Table, 0.0, 0.0),
            node("b", NodeKind::Join, 190.0, 36.0),
            node("c", NodeKind::Result, 380.0, 72.0),
        ],
        vec![edge("e1", "a", "b"), edge("e2", "b", "c")],
    ));

    assert!((model.zoom_level() - 100.0).abs() < 0.5);

    let scene = model.scene.as_ref().expect("scene built");
    for node in &scene.nodes {
        let screen = model.camera.graph_rect_to_screen(node.rect);
        assert!(screen.min.x >= FIT_MARGIN - 0.5, "left margin violated");
        assert!(screen.min.y >= FIT_MARGIN - 0.5, "top margin violated");
        assert!(screen.max.x <= 800.0 - FIT_MARGIN + 0.5, "right margin violated");
        assert!(screen.max.y <= 600.0 - FIT_MARGIN + 0.5, "bottom margin violated");
    }
}

#[test]
fn fit_of_empty_scene_is_identity() {
    let model = fitted_model(graph_of(vec![], vec![]));
    assert_eq!(model.camera, Camera::default());
}

#[test]
fn fit_of_single_node_centers_it() {
    let model = fitted_model(graph_of(vec![node("only", NodeKind::Table, 1000.0, 1000.0)], vec![]));
    let scene = model.scene.as_ref().expect("scene built");
    let center = model.camera.graph_to_screen(scene.nodes[0].rect.center());
    assert!((center.x - 400.0).abs() < 1.0);
    assert!((center.y - 300.0).abs() < 1.0);
    assert!(model.camera.scale <= 1.5);
}

#[test]
fn degenerate_fit_input_falls_back_to_identity() {
    let camera = fit_camera(
        Rect::from_min_size(pos2(f32::NAN, 0.0), vec2(10.0, 10.0)),
        vec2(800.0, 600.0),
    );
    assert_eq!(camera, Camera::default());
    let camera = fit_camera(Rect::from_min_size(pos2(0.0, 0.0), vec2(10.0, 10.0)), vec2(0.0, 0.0));
    assert_eq!(camera, Camera::default());
}

#[test]
fn zoom_to_node_is_a_toggle_back_to_fit() {
    let mut model = fitted_model(graph_of(
        vec![
            node("a", NodeKind::Table, 0.0, 0.0),
            node("b", NodeKind::Filter, 200.0, 0.0),
            node("c", NodeKind::Join, 400.0, 0.0),
            node("d", NodeKind::Aggregate, 600.0, 0.0),
            node("e", NodeKind::Result, 800.0, 0.0),
        ],
        vec![
            edge("e1", "a", "b"),
            edge("e2", "b", "c"),
            edge("e3", "c", "d"),
            edge("e4", "d", "e"),
        ],
    ));
    let fitted_camera = model.camera;

    model.zoom_to_node("c", 1.0);
    assert_eq!(
        model.hidden_nodes,
        HashSet::from(["a".to_owned(), "e".to_owned()]),
        "only the 1-hop neighborhood of c should stay visible"
    );
    assert_ne!(model.camera, fitted_camera);
    assert!(!model.display.contains("a"));
    assert!(model.display.contains("b"));
    assert!(model.display.contains("c"));

    model.zoom_to_node("c", 2.0);
    assert!(model.hidden_nodes.is_empty());
    assert_eq!(model.camera, fitted_camera);
    assert!(model.display.contains("a"));
}

#[test]
fn visible_set_is_subset_of_full_materialization() {
    let mut nodes = Vec::new();
    for index in 0..60 {
        nodes.push(scene_node(&format!("n{index}"), index as f32 * 300.0, 0.0));
    }
    let scene = scene_of(nodes, &[]);
    let camera = Camera::default();
    let hidden = HashSet::from(["n3".to_owned()]);

    let culled = compute_visible(&camera, vec2(800.0, 600.0), &scene.nodes, &scene.edges, 100.0, &hidden);
    let full = materialize_all(&scene.nodes, &scene.edges, &hidden);

    assert!(culled.visible_ids.is_subset(&full.visible_ids));
    assert!(!culled.visible_ids.contains("n3"));
    assert_eq!(
        culled.visible_nodes.len() + culled.offscreen.total(),
        scene.nodes.len() - hidden.len()
    );
}

#[test]
fn offscreen_counts_partition_the_hidden_remainder() {
    let mut nodes = Vec::new();
    for index in 0..40 {
        nodes.push(scene_node(&format!("in{index}"), (index % 8) as f32 * 90.0, (index / 8) as f32 * 60.0));
    }
    for index in 0..3 {
        nodes.push(scene_node(&format!("top{index}"), 100.0 + index as f32, -5000.0));
    }
    for index in 0..3 {
        nodes.push(scene_node(&format!("bot{index}"), 100.0 + index as f32, 5000.0));
    }
    for index in 0..2 {
        nodes.push(scene_node(&format!("left{index}"), -5000.0, 100.0 + index as f32));
    }
    for index in 0..2 {
        nodes.push(scene_node(&format!("right{index}"), 5000.0, 100.0 + index as f32));
    }
    let scene = scene_of(nodes, &[]);

    let result = compute_visible(
        &Camera::default(),
        vec2(800.0, 600.0),
        &scene.nodes,
        &scene.edges,
        0.0,
        &HashSet::new(),
    );
    assert_eq!(result.visible_nodes.len(), 40);
    assert_eq!(result.offscreen.top, 3);
    assert_eq!(result.offscreen.bottom, 3);
    assert_eq!(result.offscreen.left, 2);
    assert_eq!(result.offscreen.right, 2);
    assert_eq!(result.offscreen.total(), 10);
}

#[test]
fn edges_need_both_endpoints_visible() {
    let mut nodes = Vec::new();
    for index in 0..45 {
        nodes.push(scene_node(&format!("n{index}"), (index % 8) as f32 * 90.0, (index / 8) as f32 * 60.0));
    }
    nodes.push(scene_node("far", 50000.0, 0.0));
    let far_index = nodes.len() - 1;
    let scene = scene_of(nodes, &[(0, 1), (0, far_index)]);

    let result = compute_visible(
        &Camera::default(),
        vec2(800.0, 600.0),
        &scene.nodes,
        &scene.edges,
        100.0,
        &HashSet::new(),
    );
    assert_eq!(result.visible_edges, vec![0]);
}

#[test]
fn virtualizer_applies_incremental_node_diffs() {
    let mut nodes = Vec::new();
    for index in 0..50 {
        nodes.push(scene_node(&format!("n{index}"), index as f32 * 300.0, 0.0));
    }
    let scene = scene_of(nodes, &[(0, 1), (1, 2)]);
    let mut virtualizer = Virtualizer::default();
    let mut display = flowscope::app::surface::DisplayList::default();
    let hidden = HashSet::new();

    let camera = Camera::default();
    let (visible, _) = virtualizer.apply(&scene, &camera, vec2(800.0, 600.0), &hidden, &mut display);
    assert!(visible < scene.nodes.len());
    assert_eq!(display.node_count(), visible);
    assert!(display.contains("n0"));
    assert!(!display.contains("n49"));

    // Pan to the far end: early nodes leave, late nodes enter.
    let camera = Camera {
        scale: 1.0,
        offset: vec2(-49.0 * 300.0, 0.0),
    };
    let (visible, _) = virtualizer.apply(&scene, &camera, vec2(800.0, 600.0), &hidden, &mut display);
    assert_eq!(display.node_count(), visible);
    assert!(!display.contains("n0"));
    assert!(display.contains("n49"));
}

#[test]
fn disabling_virtualization_materializes_everything() {
    let mut nodes = Vec::new();
    for index in 0..50 {
        nodes.push(scene_node(&format!("n{index}"), index as f32 * 300.0, 0.0));
    }
    let scene = scene_of(nodes, &[]);
    let mut virtualizer = Virtualizer::default();
    virtualizer.enabled = false;
    let mut display = flowscope::app::surface::DisplayList::default();

    let (visible, _) = virtualizer.apply(
        &scene,
        &Camera::default(),
        vec2(800.0, 600.0),
        &HashSet::new(),
        &mut display,
    );
    assert_eq!(visible, 50);
    assert_eq!(display.node_count(), 50);
}

#[test]
fn small_graphs_bypass_clustering() {
    let nodes = vec![
        node("a", NodeKind::Table, 0.0, 0.0),
        node("b", NodeKind::Table, 10.0, 0.0),
        node("c", NodeKind::Table, 20.0, 0.0),
    ];
    let outcome = cluster_graph(
        &nodes,
        &[edge("e1", "a", "b")],
        &[ClusterCandidate {
            id: "cluster-table".to_owned(),
            kind: NodeKind::Table,
            label: "tables".to_owned(),
            member_ids: vec!["a".to_owned(), "b".to_owned(), "c".to_owned()],
        }],
        &HashMap::new(),
    );
    assert_eq!(outcome.nodes.len(), 3);
    assert!(outcome.clusters.is_empty());
}

#[test]
fn collapsed_cluster_rewrites_and_dedupes_edges() {
    let mut nodes = Vec::new();
    for index in 0..30 {
        nodes.push(node(&format!("t{index}"), NodeKind::Table, index as f32 * 10.0, 0.0));
    }
    for index in 0..5 {
        nodes.push(node(&format!("agg{index}"), NodeKind::Aggregate, index as f32 * 10.0, 100.0));
    }
    let edges = vec![
        edge("e1", "t0", "agg0"),
        edge("e2", "t0", "agg1"),
        edge("e3", "agg0", "agg1"),
        edge("e4", "agg2", "t5"),
    ];
    let candidates = vec![ClusterCandidate {
        id: "cluster-agg".to_owned(),
        kind: NodeKind::Aggregate,
        label: "5 aggregate nodes".to_owned(),
        member_ids: (0..5).map(|index| format!("agg{index}")).collect(),
    }];

    let outcome = cluster_graph(&nodes, &edges, &candidates, &HashMap::new());

    assert!(outcome.nodes.iter().all(|node| !node.id.starts_with("agg")));
    assert!(outcome.nodes.iter().any(|node| node.id == "cluster-agg"));
    assert_eq!(outcome.nodes.len(), 31);

    let pairs = outcome
        .edges
        .iter()
        .map(|edge| (edge.source.as_str(), edge.target.as_str()))
        .collect::<Vec<_>>();
    // e1/e2 collapse to one edge, e3 becomes a dropped self-loop.
    assert_eq!(pairs, vec![("t0", "cluster-agg"), ("cluster-agg", "t5")]);
}

#[test]
fn contested_members_go_to_the_first_candidate() {
    let mut nodes = Vec::new();
    for index in 0..31 {
        nodes.push(node(&format!("t{index}"), NodeKind::Table, index as f32 * 10.0, 0.0));
    }
    for index in 0..8 {
        nodes.push(node(&format!("f{index}"), NodeKind::Filter, index as f32 * 10.0, 100.0));
    }
    // f3 and f4 appear in both candidates.
    let candidates = vec![
        ClusterCandidate {
            id: "cluster-one".to_owned(),
            kind: NodeKind::Filter,
            label: "one".to_owned(),
            member_ids: (0..5).map(|index| format!("f{index}")).collect(),
        },
        ClusterCandidate {
            id: "cluster-two".to_owned(),
            kind: NodeKind::Filter,
            label: "two".to_owned(),
            member_ids: (3..8).map(|index| format!("f{index}")).collect(),
        },
    ];

    let outcome = cluster_graph(&nodes, &[], &candidates, &HashMap::new());

    let one = &outcome.clusters["cluster-one"].node_ids;
    let two = &outcome.clusters["cluster-two"].node_ids;
    assert_eq!(
        *one,
        (0..5).map(|index| format!("f{index}")).collect::<HashSet<_>>()
    );
    assert_eq!(
        *two,
        (5..8).map(|index| format!("f{index}")).collect::<HashSet<_>>()
    );
    assert!(one.is_disjoint(two), "collapsed member sets must partition");
    assert!(outcome.nodes.iter().all(|node| !node.id.starts_with('f')));
}

#[test]
fn recollapsing_a_cluster_restores_the_same_members() {
    let mut nodes = Vec::new();
    for index in 0..31 {
        nodes.push(node(&format!("t{index}"), NodeKind::Table, index as f32 * 10.0, 0.0));
    }
    for index in 0..8 {
        nodes.push(node(&format!("f{index}"), NodeKind::Filter, index as f32 * 10.0, 100.0));
    }
    let candidates = vec![
        ClusterCandidate {
            id: "cluster-one".to_owned(),
            kind: NodeKind::Filter,
            label: "one".to_owned(),
            member_ids: (0..5).map(|index| format!("f{index}")).collect(),
        },
        ClusterCandidate {
            id: "cluster-two".to_owned(),
            kind: NodeKind::Filter,
            label: "two".to_owned(),
            member_ids: (3..8).map(|index| format!("f{index}")).collect(),
        },
    ];

    let collapsed = cluster_graph(&nodes, &[], &candidates, &HashMap::new());
    let original_members = collapsed.clusters["cluster-one"].node_ids.clone();

    // Expanding the first cluster must not let the second one claim the
    // contested f3/f4 in the meantime.
    let mut prior = collapsed.clusters;
    prior.get_mut("cluster-one").unwrap().expanded = true;
    let expanded = cluster_graph(&nodes, &[], &candidates, &prior);
    assert_eq!(expanded.clusters["cluster-one"].node_ids, original_members);
    assert!(!expanded.clusters["cluster-two"].node_ids.contains("f3"));
    assert!(expanded.nodes.iter().any(|node| node.id == "f3"));

    let mut prior = expanded.clusters;
    prior.get_mut("cluster-one").unwrap().expanded = false;
    let recollapsed = cluster_graph(&nodes, &[], &candidates, &prior);
    assert_eq!(recollapsed.clusters["cluster-one"].node_ids, original_members);
    assert!(
        recollapsed
            .clusters["cluster-one"]
            .node_ids
            .is_disjoint(&recollapsed.clusters["cluster-two"].node_ids)
    );
}

#[test]
fn expanded_state_survives_unrelated_rebuilds() {
    let mut nodes = Vec::new();
    for index in 0..30 {
        nodes.push(node(&format!("t{index}"), NodeKind::Table, index as f32 * 10.0, 0.0));
    }
    for index in 0..5 {
        nodes.push(node(&format!("agg{index}"), NodeKind::Aggregate, index as f32 * 10.0, 100.0));
    }
    let candidates = vec![ClusterCandidate {
        id: "cluster-agg".to_owned(),
        kind: NodeKind::Aggregate,
        label: "aggs".to_owned(),
        member_ids: (0..5).map(|index| format!("agg{index}")).collect(),
    }];

    let first = cluster_graph(&nodes, &[], &candidates, &HashMap::new());
    assert!(!first.clusters["cluster-agg"].expanded);

    let mut prior = first.clusters;
    prior.get_mut("cluster-agg").unwrap().expanded = true;

    let second = cluster_graph(&nodes, &[], &candidates, &prior);
    assert!(second.clusters["cluster-agg"].expanded);
    assert!(second.nodes.iter().any(|node| node.id == "agg0"));
    assert!(second.nodes.iter().all(|node| node.id != "cluster-agg"));
}

#[test]
fn cluster_toggle_rebuilds_scene_with_members() {
    let mut nodes = Vec::new();
    for index in 0..32 {
        nodes.push(node(&format!("t{index}"), NodeKind::Table, index as f32 * 50.0, 0.0));
    }
    nodes.push(node("result", NodeKind::Result, 0.0, 200.0));
    let mut model = fitted_model(graph_of(nodes, vec![]));

    let scene = model.scene.as_ref().expect("scene built");
    assert_eq!(scene.nodes.len(), 2, "tables collapse into one cluster node");
    assert!(scene.node("cluster-table").is_some());

    model.toggle_cluster("cluster-table");
    model.tick(1.0);
    model.tick(1.1);
    let scene = model.scene.as_ref().expect("scene rebuilt");
    assert_eq!(scene.nodes.len(), 33);
}

#[test]
fn reachability_on_a_diamond() {
    let edges = [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")];
    assert_eq!(
        connected("a", edges, ReachMode::Downstream),
        HashSet::from(["b".to_owned(), "c".to_owned(), "d".to_owned()])
    );
    assert_eq!(
        connected("b", edges, ReachMode::Upstream),
        HashSet::from(["a".to_owned()])
    );
    assert_eq!(
        connected("b", edges, ReachMode::All),
        HashSet::from(["a".to_owned(), "d".to_owned()])
    );
}

#[test]
fn reachability_terminates_on_cycles() {
    let edges = [("a", "b"), ("b", "c"), ("c", "a")];
    assert_eq!(
        connected("a", edges, ReachMode::Downstream),
        HashSet::from(["b".to_owned(), "c".to_owned()])
    );
}

#[test]
fn focus_mode_dims_unreached_nodes() {
    let mut model = fitted_model(graph_of(
        vec![
            node("a", NodeKind::Table, 0.0, 0.0),
            node("b", NodeKind::Filter, 200.0, 0.0),
            node("c", NodeKind::Result, 400.0, 0.0),
            node("stray", NodeKind::Table, 0.0, 200.0),
        ],
        vec![edge("e1", "a", "b"), edge("e2", "b", "c")],
    ));

    model.set_selected(Some("b".to_owned()));
    model.toggle_focus(ReachMode::All);
    assert!(!model.node_dimmed("b"));
    assert!(!model.node_dimmed("a"));
    assert!(!model.node_dimmed("c"));
    assert!(model.node_dimmed("stray"));

    // Same mode again toggles the focus off.
    model.toggle_focus(ReachMode::All);
    assert!(model.focus.is_none());
    assert!(!model.node_dimmed("stray"));
}

#[test]
fn lineage_highlights_first_path_to_terminal() {
    let edges = [("t1", "join"), ("t2", "join"), ("join", "result")];
    let lit = lineage_path_nodes(["t1"], "result", edges);
    assert_eq!(
        lit,
        HashSet::from(["t1".to_owned(), "join".to_owned(), "result".to_owned()])
    );

    let unreachable = lineage_path_nodes(["result"], "t1", edges);
    assert!(unreachable.is_empty());
}

#[test]
fn lineage_selection_dims_everything_else() {
    let mut model = fitted_model(QueryGraph {
        nodes: vec![
            node("t1", NodeKind::Table, 0.0, 0.0),
            node("t2", NodeKind::Table, 0.0, 100.0),
            node("join", NodeKind::Join, 200.0, 50.0),
            node("result", NodeKind::Result, 400.0, 50.0),
        ],
        edges: vec![
            edge("e1", "t1", "join"),
            edge("e2", "t2", "join"),
            edge("e3", "join", "result"),
        ],
        lineage: vec![ColumnLineage {
            column: "total".to_owned(),
            source_ids: vec!["t1".to_owned()],
        }],
        terminal_id: Some("result".to_owned()),
        ..Default::default()
    });

    model.highlight_lineage(Some("total".to_owned()));
    assert!(!model.node_dimmed("t1"));
    assert!(!model.node_dimmed("join"));
    assert!(!model.node_dimmed("result"));
    assert!(model.node_dimmed("t2"));

    model.highlight_lineage(None);
    assert!(!model.node_dimmed("t2"));
}

#[test]
fn arrow_keys_walk_neighbors_in_id_order() {
    let mut model = fitted_model(graph_of(
        vec![
            node("a", NodeKind::Table, 0.0, 0.0),
            node("b", NodeKind::Filter, 200.0, 0.0),
            node("c", NodeKind::Filter, 200.0, 100.0),
        ],
        vec![edge("e1", "a", "b"), edge("e2", "a", "c")],
    ));

    // No selection: first scene node gets selected.
    model.cycle_selection(HopDirection::Downstream);
    assert_eq!(model.selected.as_deref(), Some("a"));

    model.cycle_selection(HopDirection::Downstream);
    assert_eq!(model.selected.as_deref(), Some("b"));

    model.cycle_selection(HopDirection::Upstream);
    assert_eq!(model.selected.as_deref(), Some("a"));

    // Selecting a again through the cycle keeps the downstream slot, so the
    // next press picks the other branch.
    model.cycle_selection(HopDirection::Downstream);
    assert_eq!(model.selected.as_deref(), Some("c"));
}

#[test]
fn history_undo_redo_walks_linearly() {
    let base = LayoutSnapshot {
        camera: Camera::default(),
        selected: None,
        focus: None,
        layout_name: "s0".to_owned(),
        positions: Vec::new(),
        cloud_offsets: Vec::new(),
    };
    let mut s1 = base.clone();
    s1.layout_name = "s1".to_owned();
    let mut s2 = base.clone();
    s2.layout_name = "s2".to_owned();
    let mut s3 = base.clone();
    s3.layout_name = "s3".to_owned();

    let mut history = LayoutHistory::default();
    history.initialize(base.clone());
    assert!(!history.can_undo());
    assert!(history.undo().is_none());

    history.record(s1.clone());
    history.record(s2.clone());
    assert_eq!(history.undo().map(|s| s.layout_name), Some("s1".to_owned()));
    assert_eq!(history.undo().map(|s| s.layout_name), Some("s0".to_owned()));
    assert!(history.undo().is_none());
    assert!(history.can_redo());

    // Recording after undo discards the redo branch.
    history.record(s3.clone());
    assert!(history.redo().is_none());
    assert_eq!(history.undo().map(|s| s.layout_name), Some("s0".to_owned()));

    // Identical snapshots are not recorded twice.
    let mut history = LayoutHistory::default();
    history.initialize(base.clone());
    history.record(base.clone());
    assert!(!history.can_undo());
}

#[test]
fn recording_the_current_state_still_drops_the_redo_branch() {
    let base = LayoutSnapshot {
        camera: Camera::default(),
        selected: None,
        focus: None,
        layout_name: "s0".to_owned(),
        positions: Vec::new(),
        cloud_offsets: Vec::new(),
    };
    let mut s1 = base.clone();
    s1.layout_name = "s1".to_owned();

    let mut history = LayoutHistory::default();
    history.initialize(base.clone());
    history.record(s1);
    assert_eq!(history.undo().map(|s| s.layout_name), Some("s0".to_owned()));
    assert!(history.can_redo());

    // A discrete action that reproduces the current state records nothing
    // new but still kills the redo tail.
    history.record(base);
    assert!(!history.can_redo());
    assert!(!history.can_undo());
    assert_eq!(history.len(), 1);
}

#[test]
fn undo_restores_camera_and_notifies_host() {
    let mut model = fitted_model(graph_of(
        vec![
            node("a", NodeKind::Table, 0.0, 0.0),
            node("b", NodeKind::Result, 300.0, 0.0),
        ],
        vec![edge("e1", "a", "b")],
    ));
    let fitted_camera = model.camera;
    assert_eq!(model.host.last_history, Some((false, false)));

    model.camera.pan(vec2(120.0, -40.0));
    model.record_action();
    assert_eq!(model.host.last_history, Some((true, false)));

    assert!(model.undo());
    assert_eq!(model.camera, fitted_camera);
    assert_eq!(model.host.last_history, Some((false, true)));

    assert!(model.redo());
    assert_ne!(model.camera, fitted_camera);
    assert!(!model.redo());
}

#[test]
fn snapshot_restore_skips_unknown_node_ids() {
    let mut model = fitted_model(graph_of(
        vec![node("a", NodeKind::Table, 5.0, 7.0)],
        vec![],
    ));
    let mut snapshot = model.snapshot();
    snapshot.positions.push(("ghost".to_owned(), 1.0, 2.0));
    snapshot.positions.push(("a".to_owned(), 50.0, 60.0));

    model.apply_snapshot(&snapshot);
    model.tick(1.0);
    let moved = model.graph.node("a").expect("node a");
    assert_eq!((moved.x, moved.y), (50.0, 60.0));
    assert!(model.graph.node("ghost").is_none());
}

#[test]
fn cloud_open_is_idempotent_and_keeps_offsets() {
    let mut clouds = CloudManager::default();
    let node_rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(160.0, 48.0));

    clouds.open("cte1");
    let default_offset = clouds.offset_for("cte1", node_rect);
    clouds.drag_panel("cte1", node_rect, vec2(30.0, -10.0));
    clouds.open("cte1");
    assert_eq!(
        clouds.offset_for("cte1", node_rect),
        default_offset + vec2(30.0, -10.0)
    );
}

#[test]
fn panel_drag_moves_panel_but_not_node() {
    let mut container = node("cte1", NodeKind::Cte, 100.0, 100.0);
    container.children = vec![node("inner", NodeKind::Table, 0.0, 0.0)];
    let mut model = fitted_model(graph_of(
        vec![container, node("result", NodeKind::Result, 400.0, 100.0)],
        vec![edge("e1", "cte1", "result")],
    ));

    model.toggle_container("cte1");
    model.tick(1.0);
    model.tick(1.1);
    assert!(model.graph.node("cte1").is_some_and(|node| node.expanded));
    assert!(model.clouds.view("cte1").is_some());

    let node_rect = model.scene.as_ref().unwrap().node("cte1").unwrap().rect;
    let before = model.clouds.offset_for("cte1", node_rect);
    model.drag_panel("cte1", vec2(25.0, 5.0));
    let after = model.clouds.offset_for("cte1", node_rect);
    assert_eq!(after, before + vec2(25.0, 5.0));
    assert_eq!(
        model.scene.as_ref().unwrap().node("cte1").unwrap().rect,
        node_rect,
        "dragging the panel must not move the anchor node"
    );
}

#[test]
fn connector_runs_between_facing_sides() {
    let node_rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 50.0));
    let panel = Rect::from_min_size(pos2(300.0, 0.0), vec2(200.0, 150.0));
    assert_eq!(cloud::facing_sides(panel, node_rect), (PanelSide::Left, PanelSide::Right));

    let (from, to) = cloud::connector_endpoints(panel, node_rect);
    assert_eq!(from, pos2(300.0, 75.0));
    assert_eq!(to, pos2(100.0, 25.0));

    let panel_below = Rect::from_min_size(pos2(0.0, 300.0), vec2(200.0, 150.0));
    assert_eq!(
        cloud::facing_sides(panel_below, node_rect),
        (PanelSide::Top, PanelSide::Bottom)
    );
}

#[test]
fn frame_throttle_runs_leading_and_trailing() {
    let mut throttle = FrameThrottle::default();
    assert!(throttle.request(0.0));
    assert!(!throttle.request(0.005), "second request in same frame is suppressed");
    assert!(!throttle.poll(0.01), "trailing run waits out the frame interval");
    assert!(throttle.poll(0.02));
    assert!(!throttle.poll(0.03), "trailing run fires once");
}

#[test]
fn debouncer_fires_once_after_quiet_period() {
    let mut debounce = Debouncer::default();
    debounce.bump(0.0, 0.15);
    assert!(!debounce.fire(0.1));
    debounce.bump(0.1, 0.15);
    assert!(!debounce.fire(0.2));
    assert!(debounce.fire(0.26));
    assert!(!debounce.fire(0.3));
    assert!(!debounce.pending());
}

#[test]
fn parse_accepts_camel_case_export() {
    let raw = r#"{
        "nodes": [
            {"id": "t:users", "type": "table", "x": 10, "y": 20, "startLine": 3},
            {"id": "res", "type": "result"}
        ],
        "edges": [
            {"id": "e1", "source": "t:users", "target": "res", "sqlClause": "FROM users", "clauseType": "from"}
        ],
        "terminalId": "res"
    }"#;
    let graph = parse_query_graph(raw).expect("valid graph");
    assert_eq!(graph.node_count(), 2);
    let users = graph.node("t:users").unwrap();
    assert_eq!(users.width, 160.0);
    assert_eq!(users.height, 48.0);
    assert_eq!(users.start_line, Some(3));
    assert_eq!(graph.terminal_node_id(), Some("res"));
    assert_eq!(graph.edges[0].sql_clause.as_deref(), Some("FROM users"));
}

#[test]
fn parse_rejects_duplicate_node_ids() {
    let raw = r#"{
        "nodes": [
            {"id": "dup", "type": "table"},
            {"id": "dup", "type": "filter"}
        ]
    }"#;
    let error = parse_query_graph(raw).expect_err("duplicate ids must fail");
    assert!(error.to_string().contains("duplicate node id"));
}

#[test]
fn short_name_strips_kind_prefix() {
    assert_eq!(short_name("table:users"), "users");
    assert_eq!(short_name("plain"), "plain");
}

#[test]
fn clause_excerpt_flattens_and_truncates() {
    assert_eq!(clause_excerpt("SELECT *\n   FROM t", 64), "SELECT * FROM t");
    let truncated = clause_excerpt("SELECT a, b, c FROM somewhere", 10);
    assert_eq!(truncated.chars().count(), 10);
    assert!(truncated.ends_with('…'));
}
