//! Document model and file I/O for Strata architecture graphs.
//!
//! A document is four arrays: nodes, edges, triggers and flows. Only nodes
//! and edges take part in layout; triggers and flows ride along so renderers
//! and validators see the whole document.

use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

// --- Errors ---

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid document pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl Error {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

// --- Open enumerations ---

/// Declares a closed set of known tags plus a `Custom` escape hatch.
///
/// Values serialize as their lowercase tag. Unknown tags deserialize into
/// `Custom` untouched, so documents written by newer tools still load.
/// `Custom` only ever holds a tag no known variant claims; build values
/// through `From` or `custom` rather than the variant directly.
macro_rules! open_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident (default = $default:ident) {
            $( $(#[$vmeta:meta])* $variant:ident => $tag:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A tag outside the known set.
            Custom(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $tag, )+
                    Self::Custom(tag) => tag,
                }
            }

            /// Value for `tag`, resolving known tags case-insensitively.
            ///
            /// `custom("Database")` is the known variant, never `Custom`.
            pub fn custom(tag: impl Into<String>) -> Self {
                Self::from(tag.into())
            }

            pub fn is_custom(&self) -> bool {
                matches!(self, Self::Custom(_))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl From<String> for $name {
            fn from(tag: String) -> Self {
                match tag.to_ascii_lowercase().as_str() {
                    $( $tag => Self::$variant, )+
                    _ => Self::Custom(tag),
                }
            }
        }

        impl From<&str> for $name {
            fn from(tag: &str) -> Self {
                Self::from(tag.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Custom(tag) => tag,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

open_enum! {
    /// What a node is. Drives the layer a node lands in and the shape it is drawn with.
    pub enum Category (default = Service) {
        /// A human actor.
        User => "user",
        Frontend => "frontend",
        Gateway => "gateway",
        Service => "service",
        Function => "function",
        Worker => "worker",
        Queue => "queue",
        Topic => "topic",
        Database => "database",
        Cache => "cache",
        Storage => "storage",
        /// A third-party system outside the team's control.
        External => "external",
    }
}

open_enum! {
    /// How two nodes talk to each other.
    pub enum EdgeKind (default = Http) {
        Http => "http",
        Grpc => "grpc",
        Graphql => "graphql",
        Websocket => "websocket",
        Event => "event",
        Message => "message",
        Sql => "sql",
    }
}

open_enum! {
    /// What starts a flow.
    pub enum TriggerKind (default = Manual) {
        Http => "http",
        Schedule => "schedule",
        Event => "event",
        Manual => "manual",
    }
}

// --- Types ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    #[default]
    OneWay,
    TwoWay,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    #[schemars(with = "String")]
    pub category: Category,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, category: Category, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category,
            label: label.into(),
            description: None,
            technology: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    #[schemars(with = "String")]
    pub kind: EdgeKind,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::default(),
            direction: Direction::default(),
            label: None,
        }
    }

    pub fn with_kind(mut self, kind: EdgeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub id: String,
    #[serde(default)]
    #[schemars(with = "String")]
    pub kind: TriggerKind,
    /// Node the trigger fires into.
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowStep {
    /// Edge this step travels along.
    pub edge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(default)]
    pub steps: Vec<FlowStep>,
}

/// A whole architecture document.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flows: Vec<Flow>,
}

impl Document {
    /// Append every array of `other` to this document.
    pub fn extend(&mut self, other: Document) {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
        self.triggers.extend(other.triggers);
        self.flows.extend(other.flows);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.edges.is_empty()
            && self.triggers.is_empty()
            && self.flows.is_empty()
    }
}

/// JSON Schema for [`Document`], handed to the external validator.
pub fn document_schema() -> schemars::Schema {
    schemars::schema_for!(Document)
}

// --- Storage ---

/// Resolve the global Strata directory (~/.strata/).
pub fn strata_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".strata")
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, raw: &str) -> Result<T, Error> {
    serde_json::from_str(raw).map_err(|e| Error::json(path, e))
}

/// Read a document from a single JSON file.
pub fn read_document(path: &Path) -> Result<Document, Error> {
    let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse(path, &raw)
}

/// Read every `*.json` file of a directory into one document.
///
/// Files named `nodes.json`, `edges.json`, `triggers.json` and `flows.json`
/// hold a bare array of that record type. Any other file holds a full
/// document. Files are merged in path order.
pub fn read_document_dir(dir: &Path) -> Result<Document, Error> {
    let pattern = format!("{}/*.json", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut paths = glob::glob(&pattern)?
        .map(|entry| {
            entry.map_err(|e| {
                let path = e.path().to_path_buf();
                Error::Io {
                    path,
                    source: e.into(),
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();

    let mut document = Document::default();
    for path in paths {
        let raw = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let part = match path.file_stem().and_then(|s| s.to_str()) {
            Some("nodes") => Document {
                nodes: parse(&path, &raw)?,
                ..Document::default()
            },
            Some("edges") => Document {
                edges: parse(&path, &raw)?,
                ..Document::default()
            },
            Some("triggers") => Document {
                triggers: parse(&path, &raw)?,
                ..Document::default()
            },
            Some("flows") => Document {
                flows: parse(&path, &raw)?,
                ..Document::default()
            },
            _ => parse(&path, &raw)?,
        };
        debug!(path:? = path, nodes = part.nodes.len(), edges = part.edges.len(); "Read document part");
        document.extend(part);
    }
    Ok(document)
}

/// Write a document as pretty JSON.
///
/// Uses a temp file + rename so readers never observe a half-written file.
pub fn write_document(path: &Path, document: &Document) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(document).map_err(|e| Error::json(path, e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document.json".to_string());
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, json).map_err(|e| Error::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_categories_parse_case_insensitively() {
        assert_eq!(Category::from("Database"), Category::Database);
        assert_eq!(Category::from("user"), Category::User);
        assert_eq!(Category::default(), Category::Service);
    }

    #[test]
    fn unknown_category_becomes_custom() {
        let category = Category::from("mainframe");
        assert_eq!(category, Category::Custom("mainframe".to_string()));
        assert!(category.is_custom());
        assert_eq!(String::from(category), "mainframe");
    }

    #[test]
    fn custom_constructor_resolves_known_tags() {
        assert_eq!(Category::custom("Database"), Category::Database);
        assert_eq!(EdgeKind::custom("SQL"), EdgeKind::Sql);
        assert_eq!(
            Category::custom("mainframe"),
            Category::Custom("mainframe".to_string())
        );

        let reloaded: Category =
            serde_json::from_value(serde_json::to_value(Category::custom("cache")).unwrap()).unwrap();
        assert_eq!(reloaded, Category::Cache);
    }

    #[test]
    fn node_json_uses_plain_string_tags() {
        let node: Node =
            serde_json::from_str(r#"{"id":"db","category":"database","label":"Orders DB"}"#)
                .unwrap();
        assert_eq!(node.category, Category::Database);

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["category"], "database");
        assert!(json.get("technology").is_none());
    }

    #[test]
    fn edge_defaults_to_one_way_http() {
        let edge: Edge = serde_json::from_str(r#"{"id":"e1","source":"a","target":"b"}"#).unwrap();
        assert_eq!(edge.kind, EdgeKind::Http);
        assert_eq!(edge.direction, Direction::OneWay);

        let edge: Edge = serde_json::from_str(
            r#"{"id":"e2","source":"a","target":"b","kind":"amqp","direction":"twoWay"}"#,
        )
        .unwrap();
        assert_eq!(edge.kind, EdgeKind::Custom("amqp".to_string()));
        assert_eq!(edge.direction, Direction::TwoWay);
    }

    #[test]
    fn reads_split_array_files_and_full_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("nodes.json"),
            r#"[{"id":"web","category":"frontend","label":"Web"},{"id":"api","label":"API"}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("edges.json"),
            r#"[{"id":"web-api","source":"web","target":"api","kind":"http"}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("storage.json"),
            r#"{"nodes":[{"id":"db","category":"database","label":"DB"}],
                "edges":[{"id":"api-db","source":"api","target":"db","kind":"sql"}],
                "flows":[{"id":"checkout","name":"Checkout","steps":[{"edge":"web-api"}]}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let document = read_document_dir(dir.path()).unwrap();
        let ids: Vec<&str> = document.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["web", "api", "db"]);
        assert_eq!(document.edges.len(), 2);
        assert_eq!(document.flows.len(), 1);
        assert_eq!(document.nodes[1].category, Category::Service);
    }

    #[test]
    fn invalid_json_reports_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ nodes: ").unwrap();

        let err = read_document(&path).unwrap_err();
        assert!(matches!(err, Error::Json { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn write_then_read_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.json");
        let document = Document {
            nodes: vec![Node::new("a", Category::User, "Customer")],
            edges: vec![Edge::new("e", "a", "b").with_kind(EdgeKind::Websocket)],
            ..Document::default()
        };

        write_document(&path, &document).unwrap();
        assert_eq!(read_document(&path).unwrap(), document);
        assert!(!dir.path().join("nested").join(".model.json.tmp").exists());
    }

    #[test]
    fn schema_describes_document_arrays() {
        let schema = serde_json::to_value(document_schema()).unwrap();
        assert!(schema["properties"]["nodes"].is_object());
        assert!(schema["properties"]["edges"].is_object());
    }
}
