//! Layout configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```json
//! { "rounds": 8, "spacing": { "layerSpacing": 300 } }
//! ```

use std::{fs, path::Path};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, geometry::ShapeTable, layer::LayerTable};

/// Pixel spacing used by the geometry resolver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Spacing {
    /// Distance from the canvas origin to the first layer and first row.
    pub margin: f64,
    /// Horizontal distance between the left edges of consecutive layers.
    pub layer_spacing: f64,
    /// Vertical gap between stacked nodes of one layer.
    pub vertical_gap: f64,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            margin: 40.0,
            layer_spacing: 260.0,
            vertical_gap: 40.0,
        }
    }
}

/// Curve shaping for routed edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingConfig {
    /// Fraction of the horizontal gap used as control-handle length.
    pub curvature: f64,
    /// Shortest control handle, so close nodes still get a visible curve.
    pub min_handle: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            curvature: 0.5,
            min_handle: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub spacing: Spacing,
    /// Barycenter rounds (one forward plus one backward sweep each).
    pub rounds: usize,
    pub layers: LayerTable,
    pub shapes: ShapeTable,
    pub routing: RoutingConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            spacing: Spacing::default(),
            rounds: 4,
            layers: LayerTable::default(),
            shapes: ShapeTable::default(),
            routing: RoutingConfig::default(),
        }
    }
}

impl LayoutConfig {
    /// Read a config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a config file, or fall back to defaults when it is absent or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path:? = path; "No layout config, using defaults");
            return Self::default();
        }
        Self::from_file(path).unwrap_or_else(|err| {
            warn!(err:% = err; "Ignoring layout config");
            Self::default()
        })
    }
}
