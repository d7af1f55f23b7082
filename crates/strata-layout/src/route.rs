//! Port assignment and curved connectors.
//!
//! Routing only reads node geometry, so it is cheap enough to re-run on
//! every pointer move while a node is dragged.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use strata_core::{Edge, Position};

use crate::{
    config::RoutingConfig,
    geometry::{NodeGeometries, NodeGeometry},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Horizontal direction pointing away from the node on this side.
    fn outward(self) -> f64 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

/// Where an edge touches a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Port {
    pub side: Side,
    /// Distance from the node's top edge.
    pub offset: f64,
    pub point: Position,
}

/// Cubic Bézier from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Curve {
    pub start: Position,
    pub control1: Position,
    pub control2: Position,
    pub end: Position,
}

impl Curve {
    /// SVG path data (`M … C …`).
    pub fn svg_path(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub edge_id: String,
    pub source: Port,
    pub target: Port,
    pub curve: Curve,
}

/// Vertical offset of the `slot`-th of `count` ports on a side of height `height`.
///
/// A lone port sits at the midpoint. Several ports spread evenly from 20% to
/// 80% of the height so none lands on a corner.
pub fn port_offset(height: f64, slot: usize, count: usize) -> f64 {
    if count <= 1 {
        return height / 2.0;
    }
    height * 0.2 + height * 0.6 * slot as f64 / (count - 1) as f64
}

/// Sides an edge leaves its source from and enters its target on.
///
/// Decided from live coordinates, not layers, so a node dragged across the
/// canvas still gets sensible routing.
pub fn sides(source: &NodeGeometry, target: &NodeGeometry) -> (Side, Side) {
    if source.center_x() <= target.center_x() {
        (Side::Right, Side::Left)
    } else {
        (Side::Left, Side::Right)
    }
}

struct Pending<'a> {
    edge: &'a Edge,
    source: &'a NodeGeometry,
    target: &'a NodeGeometry,
    sides: (Side, Side),
    slots: (usize, usize),
}

/// Route every edge whose endpoints both have geometry.
///
/// Edges naming an unknown node are skipped. Ports on one (node, side) are
/// handed out in edge order.
pub fn route_edges(
    edges: &[Edge],
    geometries: &NodeGeometries,
    routing: &RoutingConfig,
) -> Vec<Route> {
    let mut counts: HashMap<(&str, Side), usize> = HashMap::new();
    let mut pending = Vec::with_capacity(edges.len());

    for edge in edges {
        let (Some(source), Some(target)) = (
            geometries.get(edge.source.as_str()),
            geometries.get(edge.target.as_str()),
        ) else {
            debug!(edge = edge.id.as_str(); "Skipping edge with unknown endpoint");
            continue;
        };
        let sides = sides(source, target);
        let source_slot = next_slot(&mut counts, &edge.source, sides.0);
        let target_slot = next_slot(&mut counts, &edge.target, sides.1);
        pending.push(Pending {
            edge,
            source,
            target,
            sides,
            slots: (source_slot, target_slot),
        });
    }

    pending
        .into_iter()
        .map(|p| {
            let source_count = counts[&(p.edge.source.as_str(), p.sides.0)];
            let target_count = counts[&(p.edge.target.as_str(), p.sides.1)];
            let source = port(p.source, p.sides.0, p.slots.0, source_count);
            let target = port(p.target, p.sides.1, p.slots.1, target_count);
            Route {
                edge_id: p.edge.id.clone(),
                curve: curve(&source, &target, routing),
                source,
                target,
            }
        })
        .collect()
}

fn next_slot<'a>(counts: &mut HashMap<(&'a str, Side), usize>, node: &'a str, side: Side) -> usize {
    let count = counts.entry((node, side)).or_insert(0);
    *count += 1;
    *count - 1
}

fn port(geometry: &NodeGeometry, side: Side, slot: usize, count: usize) -> Port {
    let offset = port_offset(geometry.shape.height, slot, count);
    let x = match side {
        Side::Left => geometry.placement.x,
        Side::Right => geometry.right(),
    };
    Port {
        side,
        offset,
        point: Position::new(x, geometry.placement.y + offset),
    }
}

fn curve(source: &Port, target: &Port, routing: &RoutingConfig) -> Curve {
    let gap = (target.point.x - source.point.x).abs();
    let handle = (gap * routing.curvature).max(routing.min_handle);
    Curve {
        start: source.point,
        control1: Position::new(
            source.point.x + source.side.outward() * handle,
            source.point.y,
        ),
        control2: Position::new(
            target.point.x + target.side.outward() * handle,
            target.point.y,
        ),
        end: target.point,
    }
}
