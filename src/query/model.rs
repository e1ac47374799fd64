use serde::Deserialize;

use crate::util::short_name;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Table,
    Filter,
    Join,
    Aggregate,
    Sort,
    Limit,
    Select,
    Result,
    Cte,
    Union,
    Subquery,
    Window,
    Case,
    Cluster,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Filter => "filter",
            Self::Join => "join",
            Self::Aggregate => "aggregate",
            Self::Sort => "sort",
            Self::Limit => "limit",
            Self::Select => "select",
            Self::Result => "result",
            Self::Cte => "cte",
            Self::Union => "union",
            Self::Subquery => "subquery",
            Self::Window => "window",
            Self::Case => "case",
            Self::Cluster => "cluster",
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, Self::Cte | Self::Subquery)
    }
}

fn default_node_width() -> f32 {
    160.0
}

fn default_node_height() -> f32 {
    48.0
}

#[derive(Clone, Debug, Deserialize)]
pub struct QueryNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "default_node_width")]
    pub width: f32,
    #[serde(default = "default_node_height")]
    pub height: f32,
    #[serde(default)]
    pub children: Vec<QueryNode>,
    #[serde(default, rename = "childEdges")]
    pub child_edges: Vec<QueryEdge>,
    #[serde(default)]
    pub expanded: bool,
    #[serde(default)]
    pub collapsible: bool,
    #[serde(default, rename = "startLine")]
    pub start_line: Option<u32>,
}

impl QueryNode {
    pub fn new(id: impl Into<String>, kind: NodeKind, x: f32, y: f32) -> Self {
        Self {
            id: id.into(),
            kind,
            label: None,
            x,
            y,
            width: default_node_width(),
            height: default_node_height(),
            children: Vec::new(),
            child_edges: Vec::new(),
            expanded: false,
            collapsible: kind.is_container(),
            start_line: None,
        }
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or_else(|| short_name(&self.id))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct QueryEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, rename = "sqlClause")]
    pub sql_clause: Option<String>,
    #[serde(default, rename = "clauseType")]
    pub clause_type: Option<String>,
    #[serde(default, rename = "startLine")]
    pub start_line: Option<u32>,
}

impl QueryEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            sql_clause: None,
            clause_type: None,
            start_line: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ParseIssue {
    pub message: String,
    #[serde(default)]
    pub line: Option<u32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ColumnLineage {
    pub column: String,
    #[serde(rename = "sourceIds")]
    pub source_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct QueryGraph {
    #[serde(default)]
    pub nodes: Vec<QueryNode>,
    #[serde(default)]
    pub edges: Vec<QueryEdge>,
    #[serde(default)]
    pub error: Option<ParseIssue>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub lineage: Vec<ColumnLineage>,
    #[serde(default, rename = "terminalId")]
    pub terminal_id: Option<String>,
}

impl QueryGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &str) -> Option<&QueryNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut QueryNode> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn terminal_node_id(&self) -> Option<&str> {
        self.terminal_id.as_deref().or_else(|| {
            self.nodes
                .iter()
                .find(|node| node.kind == NodeKind::Result)
                .map(|node| node.id.as_str())
        })
    }
}
