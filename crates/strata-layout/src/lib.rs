//! Layered layout for Strata architecture graphs.
//!
//! The pipeline runs in one synchronous pass:
//!
//! 1. [`layer`] maps every node category to a layer (a column, left to right).
//! 2. [`order`] reorders nodes inside each layer to reduce edge crossings.
//! 3. [`geometry`] turns layer and order into pixel coordinates.
//! 4. [`persist`] optionally overlays manually saved positions.
//! 5. [`route`] assigns edge ports and computes curved connectors.
//!
//! The result is handed to a [`surface::Surface`]. [`session::Session`]
//! wraps the same pipeline for interactive dragging.
//!
//! # Example
//!
//! ```
//! use strata_core::{Category, Edge, Node};
//! use strata_layout::{compute_layout, config::LayoutConfig, Graph};
//!
//! let graph = Graph::new(
//!     vec![
//!         Node::new("web", Category::Frontend, "Web"),
//!         Node::new("api", Category::Service, "API"),
//!     ],
//!     vec![Edge::new("web-api", "web", "api")],
//! );
//! let layout = compute_layout(&graph, &LayoutConfig::default(), None);
//! assert_eq!(layout.routes().len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod order;
pub mod persist;
pub mod route;
pub mod session;
pub mod surface;

pub use error::{ConfigError, StoreError};

use std::collections::HashSet;

use log::{debug, info};

use strata_core::{Document, Edge, Node};

use config::LayoutConfig;
use geometry::{canvas_size, resolve, NodeGeometries, Size};
use order::{order_layers, Ordering};
use persist::{layout_key, merge_layout, SavedLayout};
use route::{route_edges, Route};
use surface::Surface;

/// The nodes and edges a layout is computed from.
///
/// Node and edge ids are unique within a graph; repeats are dropped, first
/// occurrence wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut seen = HashSet::new();
        let nodes: Vec<Node> = nodes
            .into_iter()
            .filter(|node| seen.insert(node.id.clone()))
            .collect();
        let mut seen = HashSet::new();
        let edges: Vec<Edge> = edges
            .into_iter()
            .filter(|edge| seen.insert(edge.id.clone()))
            .collect();
        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Identity of the node set, used to look up saved layouts.
    pub fn key(&self) -> String {
        layout_key(self.nodes.iter().map(|node| node.id.as_str()))
    }
}

impl From<&Document> for Graph {
    fn from(document: &Document) -> Self {
        Self::new(document.nodes.clone(), document.edges.clone())
    }
}

impl From<Document> for Graph {
    fn from(document: Document) -> Self {
        Self::new(document.nodes, document.edges)
    }
}

/// A finished layout: ordering, node geometry, routed edges and canvas size.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    key: String,
    ordering: Ordering,
    geometries: NodeGeometries,
    routes: Vec<Route>,
    canvas: Size,
    applied: usize,
}

impl Layout {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ordering(&self) -> &Ordering {
        &self.ordering
    }

    pub fn geometries(&self) -> &NodeGeometries {
        &self.geometries
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    /// Nodes that took a saved position instead of the computed one.
    pub fn applied_overrides(&self) -> usize {
        self.applied
    }

    pub fn draw<S: Surface + ?Sized>(&self, graph: &Graph, surface: &mut S) {
        surface::draw(graph, &self.geometries, &self.routes, self.canvas, surface);
    }
}

/// Run the whole pipeline over `graph`.
///
/// `saved` is merged before routing, so routes and canvas reflect the saved
/// positions. A record for a different node set is ignored.
pub fn compute_layout(graph: &Graph, config: &LayoutConfig, saved: Option<&SavedLayout>) -> Layout {
    info!(nodes = graph.nodes().len(), edges = graph.edges().len(); "Computing layout");

    let ordering = order_layers(graph.nodes(), graph.edges(), &config.layers, config.rounds);
    let mut geometries = resolve(&ordering, graph.nodes(), &config.shapes, &config.spacing);

    let mut applied = 0;
    if let Some(saved) = saved {
        let merged = merge_layout(&geometries, saved);
        geometries = merged.geometries;
        applied = merged.applied;
    }

    let routes = route_edges(graph.edges(), &geometries, &config.routing);
    let canvas = canvas_size(&geometries, config.spacing.margin);
    debug!(
        layers = ordering.layers().len(),
        crossings = ordering.crossings(),
        routes = routes.len(),
        applied = applied;
        "Layout computed"
    );

    Layout {
        key: graph.key(),
        ordering,
        geometries,
        routes,
        canvas,
        applied,
    }
}
