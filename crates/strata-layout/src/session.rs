//! Interactive editing of a computed layout.
//!
//! A [`Session`] runs the full pipeline once per node set. Dragging a node
//! only moves that node and re-routes edges; crossing minimization never
//! runs again until the node set itself changes.

use std::collections::HashSet;

use log::{debug, info};

use strata_core::Position;

use crate::{
    compute_layout,
    config::LayoutConfig,
    error::StoreError,
    geometry::{canvas_size, NodeGeometries, Size},
    order::Ordering,
    persist::{merge_layout, LayoutStore, SavedLayout},
    route::{route_edges, Route},
    surface::{self, Surface},
    Graph,
};

/// Node positions with a single writer.
///
/// At most one node is owned by the active drag; only the owner may move.
/// Readers always see a whole snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionStore {
    geometries: NodeGeometries,
    owner: Option<String>,
}

impl PositionStore {
    pub fn new(geometries: NodeGeometries) -> Self {
        Self {
            geometries,
            owner: None,
        }
    }

    pub fn snapshot(&self) -> &NodeGeometries {
        &self.geometries
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Claim `id` for a drag. Fails while another drag is active or when the node is unknown.
    pub fn acquire(&mut self, id: &str) -> bool {
        if self.owner.is_some() || !self.geometries.contains_key(id) {
            return false;
        }
        self.owner = Some(id.to_string());
        true
    }

    /// Move the owned node. Any other id is refused.
    pub fn move_owned(&mut self, id: &str, position: Position) -> bool {
        if self.owner.as_deref() != Some(id) {
            return false;
        }
        match self.geometries.get_mut(id) {
            Some(geometry) => {
                geometry.move_to(position);
                true
            }
            None => false,
        }
    }

    pub fn release(&mut self) -> Option<String> {
        self.owner.take()
    }
}

pub struct Session {
    graph: Graph,
    config: LayoutConfig,
    key: String,
    ordering: Ordering,
    positions: PositionStore,
    routes: Vec<Route>,
    /// Set once the first drag starts; saved layouts are no longer merged after that.
    interacted: bool,
    generation: u64,
}

impl Session {
    pub fn new(graph: Graph, config: LayoutConfig) -> Self {
        Self::compute(graph, config, 0, None)
    }

    fn compute(
        graph: Graph,
        config: LayoutConfig,
        generation: u64,
        carried: Option<&SavedLayout>,
    ) -> Self {
        let layout = compute_layout(&graph, &config, carried);
        info!(generation = generation, nodes = graph.nodes().len(); "Session layout computed");
        Self {
            key: layout.key,
            ordering: layout.ordering,
            positions: PositionStore::new(layout.geometries),
            routes: layout.routes,
            graph,
            config,
            interacted: false,
            generation,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Node-set key of the current layout.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Bumped every time the layout is recomputed from scratch.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ordering(&self) -> &Ordering {
        &self.ordering
    }

    pub fn positions(&self) -> &NodeGeometries {
        self.positions.snapshot()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn canvas(&self) -> Size {
        canvas_size(self.positions.snapshot(), self.config.spacing.margin)
    }

    /// Node currently being dragged.
    pub fn dragging(&self) -> Option<&str> {
        self.positions.owner()
    }

    /// Merge a saved layout into the current positions.
    ///
    /// Only allowed before the first drag. Returns how many nodes moved; a
    /// record for another node set moves none.
    pub fn apply_saved(&mut self, saved: &SavedLayout) -> usize {
        if self.interacted {
            debug!(key = saved.key.as_str(); "Not merging saved layout after interaction began");
            return 0;
        }
        let merged = merge_layout(self.positions.snapshot(), saved);
        if merged.applied > 0 {
            self.positions = PositionStore::new(merged.geometries);
            self.reroute();
        }
        merged.applied
    }

    pub fn begin_drag(&mut self, id: &str) -> bool {
        if !self.positions.acquire(id) {
            debug!(node = id; "Drag refused");
            return false;
        }
        self.interacted = true;
        true
    }

    /// Move the dragged node and re-route. Returns `false` for any node but the dragged one.
    pub fn drag_to(&mut self, id: &str, position: Position) -> bool {
        if !self.positions.move_owned(id, position) {
            return false;
        }
        self.reroute();
        true
    }

    /// Finish the drag and return the record to persist.
    pub fn end_drag(&mut self) -> Option<SavedLayout> {
        let id = self.positions.release()?;
        debug!(node = id.as_str(); "Drag finished");
        Some(SavedLayout::capture(self.positions.snapshot()))
    }

    /// Fetch the saved layout for the current node set and merge it.
    pub async fn load(&mut self, store: &dyn LayoutStore) -> Result<usize, StoreError> {
        let key = self.key.clone();
        match store.get(&key).await? {
            Some(saved) => Ok(self.apply_saved(&saved)),
            None => Ok(0),
        }
    }

    pub async fn save(&self, store: &dyn LayoutStore) -> Result<(), StoreError> {
        let saved = SavedLayout::capture(self.positions.snapshot());
        store.set(&saved.key, &saved).await
    }

    /// Swap in an edited graph.
    ///
    /// Same nodes with the same categories: positions stay, edges are
    /// re-routed. Different node set: the layout is recomputed from scratch
    /// and any drag is dropped. Same node set with recategorized nodes: the
    /// layout is recomputed, then every node whose category held keeps its
    /// current position. Returns whether a recompute happened.
    pub fn replace_graph(&mut self, graph: Graph) -> bool {
        if graph.key() != self.key {
            *self = Self::compute(graph, self.config.clone(), self.generation + 1, None);
            return true;
        }

        let changed = recategorized(&self.graph, &graph);
        if changed.is_empty() {
            self.graph = graph;
            self.reroute();
            return false;
        }

        debug!(nodes = changed.len(); "Categories changed, recomputing layout");
        let mut carried = SavedLayout::capture(self.positions.snapshot());
        carried.positions.retain(|id, _| !changed.contains(id));
        let interacted = self.interacted;
        *self = Self::compute(
            graph,
            self.config.clone(),
            self.generation + 1,
            Some(&carried),
        );
        self.interacted = interacted;
        true
    }

    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface::draw(
            &self.graph,
            self.positions.snapshot(),
            &self.routes,
            self.canvas(),
            surface,
        );
    }

    fn reroute(&mut self) {
        self.routes = route_edges(
            self.graph.edges(),
            self.positions.snapshot(),
            &self.config.routing,
        );
    }
}

/// Ids present in both graphs whose category differs.
fn recategorized(old: &Graph, new: &Graph) -> HashSet<String> {
    new.nodes()
        .iter()
        .filter(|node| {
            old.node(&node.id)
                .is_some_and(|previous| previous.category != node.category)
        })
        .map(|node| node.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use strata_core::{Category, Edge, Node};

    use super::*;
    use crate::{
        geometry::ShapeKind,
        persist::{layout_key, MemoryStore},
    };

    fn pair() -> Graph {
        Graph::new(
            vec![
                Node::new("a", Category::Frontend, "A"),
                Node::new("b", Category::Service, "B"),
            ],
            vec![Edge::new("ab", "a", "b")],
        )
    }

    #[test]
    fn only_one_drag_at_a_time() {
        let mut session = Session::new(pair(), LayoutConfig::default());
        assert!(session.begin_drag("a"));
        assert!(!session.begin_drag("b"));
        assert!(!session.drag_to("b", Position::new(0.0, 0.0)));
        assert_eq!(session.dragging(), Some("a"));
        assert!(session.end_drag().is_some());
        assert!(session.end_drag().is_none());
        assert!(!session.begin_drag("ghost"));
    }

    #[test]
    fn dragging_reroutes_without_reordering() {
        let mut session = Session::new(pair(), LayoutConfig::default());
        let ordering = session.ordering().clone();
        let before = session.routes()[0].clone();

        session.begin_drag("b");
        assert!(session.drag_to("b", Position::new(300.0, 500.0)));

        assert_eq!(session.ordering(), &ordering);
        assert_ne!(session.routes()[0], before);
        assert_eq!(session.positions()["b"].placement.position(), Position::new(300.0, 500.0));
    }

    #[test]
    fn end_drag_captures_positions_only() {
        let mut session = Session::new(pair(), LayoutConfig::default());
        session.begin_drag("a");
        session.drag_to("a", Position::new(12.0, 34.0));
        let saved = session.end_drag().unwrap();

        assert_eq!(saved.key, layout_key(["a", "b"]));
        assert_eq!(saved.positions["a"], Position::new(12.0, 34.0));
        assert_eq!(saved.positions.len(), 2);
    }

    #[test]
    fn saved_layout_is_not_merged_after_a_drag_started() {
        let mut session = Session::new(pair(), LayoutConfig::default());
        let mut saved = SavedLayout::capture(session.positions());
        saved.positions.insert("b".into(), Position::new(999.0, 999.0));

        session.begin_drag("a");
        assert_eq!(session.apply_saved(&saved), 0);
        assert_ne!(session.positions()["b"].placement.position(), Position::new(999.0, 999.0));
    }

    #[test]
    fn edge_edits_keep_positions() {
        let mut session = Session::new(pair(), LayoutConfig::default());
        session.begin_drag("b");
        session.drag_to("b", Position::new(700.0, 10.0));
        session.end_drag();

        let edited = Graph::new(
            pair().nodes().to_vec(),
            vec![Edge::new("ba", "b", "a"), Edge::new("ab", "a", "b")],
        );
        assert!(!session.replace_graph(edited));
        assert_eq!(session.generation(), 0);
        assert_eq!(session.routes().len(), 2);
        assert_eq!(session.positions()["b"].placement.position(), Position::new(700.0, 10.0));
    }

    #[test]
    fn node_set_change_recomputes() {
        let mut session = Session::new(pair(), LayoutConfig::default());
        session.begin_drag("b");
        session.drag_to("b", Position::new(700.0, 10.0));

        let mut nodes = pair().nodes().to_vec();
        nodes.push(Node::new("c", Category::Database, "C"));
        assert!(session.replace_graph(Graph::new(nodes, vec![])));

        assert_eq!(session.generation(), 1);
        assert_eq!(session.dragging(), None);
        assert_eq!(session.positions().len(), 3);
        assert_ne!(session.positions()["b"].placement.position(), Position::new(700.0, 10.0));
    }

    #[test]
    fn category_change_moves_node_to_its_new_layer() {
        let mut session = Session::new(pair(), LayoutConfig::default());
        session.begin_drag("a");
        session.drag_to("a", Position::new(12.0, 34.0));
        session.end_drag();

        let edited = Graph::new(
            vec![
                Node::new("a", Category::Frontend, "A"),
                Node::new("b", Category::Database, "B"),
            ],
            pair().edges().to_vec(),
        );
        assert!(session.replace_graph(edited.clone()));
        assert_eq!(session.generation(), 1);

        let fresh = compute_layout(&edited, &LayoutConfig::default(), None);
        let b = session.positions()["b"];
        assert_eq!(b.placement.layer, 5);
        assert_eq!(b.shape.shape, ShapeKind::Cylinder);
        assert_eq!(b, fresh.geometries()["b"]);
        assert_eq!(session.ordering(), fresh.ordering());

        // Untouched nodes keep the manual position.
        assert_eq!(session.positions()["a"].placement.position(), Position::new(12.0, 34.0));
        assert_eq!(session.positions()["a"].placement.layer, 1);

        let route = &session.routes()[0];
        assert_eq!(route.target.point.x, b.placement.x);

        // A merge is still refused after the earlier drag.
        let saved = SavedLayout::capture(fresh.geometries());
        assert_eq!(session.apply_saved(&saved), 0);
    }

    #[tokio::test]
    async fn save_then_load_in_a_fresh_session() {
        let store = MemoryStore::new();
        let mut first = Session::new(pair(), LayoutConfig::default());
        first.begin_drag("a");
        first.drag_to("a", Position::new(5.0, 6.0));
        first.end_drag();
        first.save(&store).await.unwrap();

        let mut second = Session::new(pair(), LayoutConfig::default());
        assert_eq!(second.load(&store).await.unwrap(), 2);
        assert_eq!(second.positions()["a"].placement.position(), Position::new(5.0, 6.0));
        assert_eq!(second.positions()["a"].placement.layer, 1);
    }
}
