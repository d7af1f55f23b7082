//! Pixel geometry: shapes, placements and the resolver that turns an
//! ordering into coordinates.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use strata_core::{Category, Node, Position};

use crate::{config::Spacing, order::Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    Rectangle,
    Cylinder,
    Diamond,
    Person,
}

/// Shape and bounding box a node is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeSpec {
    pub shape: ShapeKind,
    pub width: f64,
    pub height: f64,
}

impl ShapeSpec {
    pub const fn new(shape: ShapeKind, width: f64, height: f64) -> Self {
        Self {
            shape,
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

const RECTANGLE: ShapeSpec = ShapeSpec::new(ShapeKind::Rectangle, 180.0, 80.0);
const CYLINDER: ShapeSpec = ShapeSpec::new(ShapeKind::Cylinder, 160.0, 100.0);
const DIAMOND: ShapeSpec = ShapeSpec::new(ShapeKind::Diamond, 140.0, 140.0);
const PERSON: ShapeSpec = ShapeSpec::new(ShapeKind::Person, 100.0, 120.0);

/// Category to shape mapping with a fallback for everything unlisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeTable {
    #[serde(default = "default_shapes")]
    entries: HashMap<Category, ShapeSpec>,
    #[serde(default = "default_fallback")]
    fallback: ShapeSpec,
}

fn default_shapes() -> HashMap<Category, ShapeSpec> {
    [
        (Category::User, PERSON),
        (Category::Gateway, DIAMOND),
        (Category::Database, CYLINDER),
        (Category::Cache, CYLINDER),
        (Category::Storage, CYLINDER),
    ]
    .into_iter()
    .collect()
}

fn default_fallback() -> ShapeSpec {
    RECTANGLE
}

impl Default for ShapeTable {
    fn default() -> Self {
        Self {
            entries: default_shapes(),
            fallback: default_fallback(),
        }
    }
}

impl ShapeTable {
    pub fn with_shape(mut self, category: Category, spec: ShapeSpec) -> Self {
        self.entries.insert(category, spec);
        self
    }

    pub fn fallback(&self) -> ShapeSpec {
        self.fallback
    }

    pub fn shape_of(&self, category: &Category) -> ShapeSpec {
        self.entries
            .get(category)
            .copied()
            .unwrap_or(self.fallback)
    }
}

/// Top-left corner of a node plus the layer it was assigned to.
///
/// The layer never changes after assignment, even when the node is dragged
/// somewhere else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub layer: usize,
}

impl Placement {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Everything the router and sinks need to know about one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeGeometry {
    pub placement: Placement,
    pub shape: ShapeSpec,
}

impl NodeGeometry {
    pub fn center_x(&self) -> f64 {
        self.placement.x + self.shape.width / 2.0
    }

    pub fn right(&self) -> f64 {
        self.placement.x + self.shape.width
    }

    pub fn bottom(&self) -> f64 {
        self.placement.y + self.shape.height
    }

    pub fn move_to(&mut self, position: Position) {
        self.placement.x = position.x;
        self.placement.y = position.y;
    }
}

/// Node id to geometry, in layer order then top to bottom.
pub type NodeGeometries = IndexMap<String, NodeGeometry>;

/// Turn an ordering into pixel coordinates.
///
/// `x = margin + layer * layer_spacing`; `y` stacks the nodes of a layer
/// from `margin` downwards, separated by `vertical_gap`.
pub fn resolve(
    ordering: &Ordering,
    nodes: &[Node],
    shapes: &ShapeTable,
    spacing: &Spacing,
) -> NodeGeometries {
    let mut categories: HashMap<&str, &Category> = HashMap::new();
    for node in nodes {
        categories.entry(node.id.as_str()).or_insert(&node.category);
    }

    let mut geometries = NodeGeometries::new();
    for layer in ordering.layers() {
        let x = spacing.margin + layer.index as f64 * spacing.layer_spacing;
        let mut y = spacing.margin;
        for id in &layer.nodes {
            let shape = categories
                .get(id.as_str())
                .map(|category| shapes.shape_of(category))
                .unwrap_or_else(|| shapes.fallback());
            geometries.insert(
                id.clone(),
                NodeGeometry {
                    placement: Placement {
                        x,
                        y,
                        layer: layer.index,
                    },
                    shape,
                },
            );
            y += shape.height + spacing.vertical_gap;
        }
    }
    geometries
}

/// Bounding size of every node box plus `margin`.
///
/// An empty layout measures `margin` by `margin`.
pub fn canvas_size(geometries: &NodeGeometries, margin: f64) -> Size {
    let (width, height) = geometries
        .values()
        .fold((0.0_f64, 0.0_f64), |(width, height), geometry| {
            (width.max(geometry.right()), height.max(geometry.bottom()))
        });
    Size::new(width + margin, height + margin)
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::{layer::LayerTable, order::order_layers};

    fn geometries(nodes: &[Node]) -> NodeGeometries {
        let ordering = order_layers(nodes, &[], &LayerTable::default(), 0);
        resolve(
            &ordering,
            nodes,
            &ShapeTable::default(),
            &Spacing::default(),
        )
    }

    #[test]
    fn default_shapes_by_category() {
        let table = ShapeTable::default();
        assert_eq!(table.shape_of(&Category::User).shape, ShapeKind::Person);
        assert_eq!(table.shape_of(&Category::Gateway).shape, ShapeKind::Diamond);
        assert_eq!(table.shape_of(&Category::Cache).shape, ShapeKind::Cylinder);
        assert_eq!(table.shape_of(&Category::Service), RECTANGLE);
        assert_eq!(table.shape_of(&Category::Custom("x".into())), RECTANGLE);
    }

    #[test]
    fn columns_follow_layer_index() {
        let nodes = vec![
            Node::new("user", Category::User, "User"),
            Node::new("db", Category::Database, "DB"),
        ];
        let geometries = geometries(&nodes);

        assert_approx_eq!(f64, geometries["user"].placement.x, 40.0);
        assert_approx_eq!(f64, geometries["db"].placement.x, 40.0 + 5.0 * 260.0);
        assert_eq!(geometries["db"].placement.layer, 5);
    }

    #[test]
    fn rows_stack_by_height_and_gap() {
        let nodes = vec![
            Node::new("api", Category::Service, "API"),
            Node::new("edge", Category::Custom("proxy".into()), "Proxy"),
            Node::new("jobs", Category::Worker, "Jobs"),
        ];
        let geometries = geometries(&nodes);

        assert_approx_eq!(f64, geometries["api"].placement.y, 40.0);
        assert_approx_eq!(f64, geometries["edge"].placement.y, 40.0 + 80.0 + 40.0);
        assert_approx_eq!(f64, geometries["jobs"].placement.y, 40.0 + 2.0 * 120.0);
    }

    #[test]
    fn canvas_covers_every_node_plus_margin() {
        let nodes = vec![
            Node::new("user", Category::User, "User"),
            Node::new("a", Category::Frontend, "A"),
            Node::new("b", Category::Frontend, "B"),
        ];
        let geometries = geometries(&nodes);
        let canvas = canvas_size(&geometries, 40.0);

        // Frontend column: x = 300, width 180. Two rows: 40 + 80 + 40 + 80.
        assert_approx_eq!(f64, canvas.width, 300.0 + 180.0 + 40.0);
        assert_approx_eq!(f64, canvas.height, 240.0 + 40.0);
    }

    #[test]
    fn empty_canvas_is_just_the_margin() {
        let canvas = canvas_size(&NodeGeometries::new(), 40.0);
        assert_eq!(canvas, Size::new(40.0, 40.0));
    }
}
