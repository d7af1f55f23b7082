//! Crossing minimization within layers.
//!
//! Nodes are grouped by layer and then reordered with the barycenter
//! heuristic: a forward sweep pulls every layer towards the mean position of
//! its neighbours in the previous layer, a backward sweep does the same
//! against the next layer. The heuristic does not converge monotonically, so
//! the ordering with the fewest crossings over all rounds is kept.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, trace};
use serde::Serialize;

use strata_core::{Edge, Node};

use crate::layer::LayerTable;

/// One occupied layer and its nodes, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderedLayer {
    pub index: usize,
    pub nodes: Vec<String>,
}

/// Result of crossing minimization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    layers: Vec<OrderedLayer>,
    crossings: usize,
    best_round: Option<usize>,
    round_crossings: Vec<usize>,
}

impl Ordering {
    /// Occupied layers in ascending index order.
    pub fn layers(&self) -> &[OrderedLayer] {
        &self.layers
    }

    /// Crossings of the returned ordering.
    pub fn crossings(&self) -> usize {
        self.crossings
    }

    /// Round that produced the returned ordering, `None` when no round ran.
    pub fn best_round(&self) -> Option<usize> {
        self.best_round
    }

    /// Crossing count observed after each round.
    pub fn round_crossings(&self) -> &[usize] {
        &self.round_crossings
    }

    pub fn layer_of(&self, id: &str) -> Option<usize> {
        self.layers
            .iter()
            .find(|layer| layer.nodes.iter().any(|n| n == id))
            .map(|layer| layer.index)
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

type Adjacency<'a> = HashMap<&'a str, Vec<&'a str>>;

/// Group `nodes` into layers and reorder each layer to reduce edge crossings.
///
/// Edges are treated as undirected. Edges naming unknown nodes and self-loops
/// are ignored. Repeated node ids keep their first occurrence.
pub fn order_layers(nodes: &[Node], edges: &[Edge], table: &LayerTable, rounds: usize) -> Ordering {
    let (indices, mut layers) = group(nodes, table);
    let adjacency = adjacency(&layers, edges);
    let links = links(&adjacency);

    let mut round_crossings = Vec::with_capacity(rounds);
    let mut best: Option<(usize, usize, Vec<Vec<&str>>)> = None;

    for round in 0..rounds {
        sweep_forward(&mut layers, &adjacency);
        sweep_backward(&mut layers, &adjacency);

        let crossings = count_crossings(&layers, &links);
        trace!(round = round, crossings = crossings; "Barycenter round finished");
        round_crossings.push(crossings);

        // Strict comparison: the first round reaching the minimum wins.
        let improved = match &best {
            Some((fewest, _, _)) => crossings < *fewest,
            None => true,
        };
        if improved {
            best = Some((crossings, round, layers.clone()));
        }
    }

    let (crossings, best_round, layers) = match best {
        Some((crossings, round, layers)) => (crossings, Some(round), layers),
        None => (count_crossings(&layers, &links), None, layers),
    };

    debug!(
        layers = layers.len(),
        crossings = crossings,
        best_round:? = best_round;
        "Layer ordering chosen"
    );

    Ordering {
        layers: indices
            .into_iter()
            .zip(layers)
            .map(|(index, nodes)| OrderedLayer {
                index,
                nodes: nodes.into_iter().map(str::to_string).collect(),
            })
            .collect(),
        crossings,
        best_round,
        round_crossings,
    }
}

/// Bucket nodes by layer, keeping input order inside a bucket.
fn group<'a>(nodes: &'a [Node], table: &LayerTable) -> (Vec<usize>, Vec<Vec<&'a str>>) {
    let mut seen = HashSet::new();
    let mut buckets: BTreeMap<usize, Vec<&'a str>> = BTreeMap::new();
    for node in nodes {
        if !seen.insert(node.id.as_str()) {
            continue;
        }
        buckets
            .entry(table.layer_of(&node.category))
            .or_default()
            .push(node.id.as_str());
    }
    buckets.into_iter().unzip()
}

fn adjacency<'a>(layers: &[Vec<&'a str>], edges: &'a [Edge]) -> Adjacency<'a> {
    let known: HashSet<&str> = layers.iter().flatten().copied().collect();
    let mut adjacency: Adjacency<'a> = HashMap::new();
    for edge in edges {
        let (source, target) = (edge.source.as_str(), edge.target.as_str());
        if edge.is_self_loop() || !known.contains(source) || !known.contains(target) {
            continue;
        }
        adjacency.entry(source).or_default().push(target);
        adjacency.entry(target).or_default().push(source);
    }
    adjacency
}

/// Every usable edge once, as an (a, b) pair.
fn links<'a>(adjacency: &Adjacency<'a>) -> Vec<(&'a str, &'a str)> {
    let mut links = Vec::new();
    for (&node, neighbours) in adjacency {
        for &neighbour in neighbours {
            if node < neighbour {
                links.push((node, neighbour));
            }
        }
    }
    links
}

fn sweep_forward<'a>(layers: &mut [Vec<&'a str>], adjacency: &Adjacency<'a>) {
    for i in 1..layers.len() {
        let (fixed, rest) = layers.split_at_mut(i);
        reorder(&mut rest[0], &fixed[i - 1], adjacency);
    }
}

fn sweep_backward<'a>(layers: &mut [Vec<&'a str>], adjacency: &Adjacency<'a>) {
    for i in (0..layers.len().saturating_sub(1)).rev() {
        let (head, fixed) = layers.split_at_mut(i + 1);
        reorder(&mut head[i], &fixed[0], adjacency);
    }
}

/// Stable-sort `layer` by the mean position of each node's neighbours in `fixed`.
///
/// A node without neighbours in `fixed` keys on its current position.
fn reorder<'a>(layer: &mut Vec<&'a str>, fixed: &[&'a str], adjacency: &Adjacency<'a>) {
    let fixed_positions = positions(fixed);
    let mut keyed: Vec<(f64, &'a str)> = layer
        .iter()
        .enumerate()
        .map(|(current, &node)| {
            let ranks: Vec<usize> = adjacency
                .get(node)
                .into_iter()
                .flatten()
                .filter_map(|neighbour| fixed_positions.get(neighbour).copied())
                .collect();
            let key = if ranks.is_empty() {
                current as f64
            } else {
                ranks.iter().sum::<usize>() as f64 / ranks.len() as f64
            };
            (key, node)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    *layer = keyed.into_iter().map(|(_, node)| node).collect();
}

fn positions<'a>(layer: &[&'a str]) -> HashMap<&'a str, usize> {
    layer
        .iter()
        .enumerate()
        .map(|(position, &node)| (node, position))
        .collect()
}

/// Total crossings between every pair of adjacent layers.
///
/// Two edges spanning the same pair of layers cross when their endpoint
/// order is strictly inverted between the two layers.
fn count_crossings(layers: &[Vec<&str>], links: &[(&str, &str)]) -> usize {
    layers
        .windows(2)
        .map(|pair| {
            let upper = positions(&pair[0]);
            let lower = positions(&pair[1]);
            let spans: Vec<(usize, usize)> = links
                .iter()
                .filter_map(|&(a, b)| match (upper.get(a), lower.get(b)) {
                    (Some(&u), Some(&l)) => Some((u, l)),
                    _ => match (upper.get(b), lower.get(a)) {
                        (Some(&u), Some(&l)) => Some((u, l)),
                        _ => None,
                    },
                })
                .collect();

            let mut crossings = 0;
            for (i, &(u1, l1)) in spans.iter().enumerate() {
                for &(u2, l2) in &spans[i + 1..] {
                    if (u1 < u2 && l1 > l2) || (u1 > u2 && l1 < l2) {
                        crossings += 1;
                    }
                }
            }
            crossings
        })
        .sum()
}
