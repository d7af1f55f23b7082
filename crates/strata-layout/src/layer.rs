//! Category to layer assignment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use strata_core::Category;

/// Layer of the compute/service tier. Categories missing from a table land here.
pub const SERVICE_LAYER: usize = 3;

/// Static mapping from node category to an ordinal layer (0 = leftmost).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerTable {
    #[serde(default = "default_entries")]
    entries: HashMap<Category, usize>,
    #[serde(default = "default_fallback")]
    fallback: usize,
}

fn default_entries() -> HashMap<Category, usize> {
    use Category::*;

    [
        (User, 0),
        (Frontend, 1),
        (Gateway, 2),
        (Service, SERVICE_LAYER),
        (Function, SERVICE_LAYER),
        (Worker, SERVICE_LAYER),
        (Queue, 4),
        (Topic, 4),
        (Database, 5),
        (Cache, 5),
        (Storage, 5),
        (External, 6),
    ]
    .into_iter()
    .collect()
}

fn default_fallback() -> usize {
    SERVICE_LAYER
}

impl Default for LayerTable {
    fn default() -> Self {
        Self {
            entries: default_entries(),
            fallback: default_fallback(),
        }
    }
}

impl LayerTable {
    /// Override (or add) the layer of one category.
    pub fn with_layer(mut self, category: Category, layer: usize) -> Self {
        self.entries.insert(category, layer);
        self
    }

    pub fn fallback(&self) -> usize {
        self.fallback
    }

    /// Layer index for `category`. Total: unknown categories get the fallback layer.
    pub fn layer_of(&self, category: &Category) -> usize {
        self.entries
            .get(category)
            .copied()
            .unwrap_or(self.fallback)
    }
}
