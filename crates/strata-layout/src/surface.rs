//! Output sinks.
//!
//! Static export and the live session share one drawing pass; only the
//! [`Surface`] receiving the calls differs.

use std::collections::HashMap;

use serde::Serialize;

use strata_core::{Direction, Edge, Node};

use crate::{
    geometry::{NodeGeometries, NodeGeometry, ShapeKind, Size},
    route::{Port, Route},
    Graph,
};

/// Something that consumes finished geometry.
pub trait Surface {
    fn begin(&mut self, _canvas: Size) {}

    fn node(&mut self, node: &Node, geometry: &NodeGeometry);

    fn edge(&mut self, edge: &Edge, route: &Route);

    fn finish(&mut self) {}
}

/// Feed one snapshot of geometry to `surface`: nodes first, then edges.
pub(crate) fn draw<S: Surface + ?Sized>(
    graph: &Graph,
    geometries: &NodeGeometries,
    routes: &[Route],
    canvas: Size,
    surface: &mut S,
) {
    surface.begin(canvas);
    for node in graph.nodes() {
        if let Some(geometry) = geometries.get(node.id.as_str()) {
            surface.node(node, geometry);
        }
    }
    let edges: HashMap<&str, &Edge> = graph
        .edges()
        .iter()
        .map(|edge| (edge.id.as_str(), edge))
        .collect();
    for route in routes {
        if let Some(edge) = edges.get(route.edge_id.as_str()) {
            surface.edge(edge, route);
        }
    }
    surface.finish();
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportNode {
    pub id: String,
    pub label: String,
    pub category: String,
    pub shape: ShapeKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub layer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: String,
    pub direction: Direction,
    pub source_port: Port,
    pub target_port: Port,
    /// SVG path data of the connector.
    pub path: String,
}

/// Static document sink: plain geometry, ready to serialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub canvas: Size,
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

impl ExportDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Surface for ExportDocument {
    fn begin(&mut self, canvas: Size) {
        self.canvas = canvas;
        self.nodes.clear();
        self.edges.clear();
    }

    fn node(&mut self, node: &Node, geometry: &NodeGeometry) {
        self.nodes.push(ExportNode {
            id: node.id.clone(),
            label: node.label.clone(),
            category: node.category.to_string(),
            shape: geometry.shape.shape,
            x: geometry.placement.x,
            y: geometry.placement.y,
            width: geometry.shape.width,
            height: geometry.shape.height,
            layer: geometry.placement.layer,
        });
    }

    fn edge(&mut self, edge: &Edge, route: &Route) {
        self.edges.push(ExportEdge {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            kind: edge.kind.to_string(),
            direction: edge.direction,
            source_port: route.source,
            target_port: route.target,
            path: route.curve.svg_path(),
        });
    }
}
