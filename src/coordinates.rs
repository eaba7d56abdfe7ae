//! Node identifiers and the geographic node registry.
//!
//! The registry is an explicit, immutable value handed to graph construction.
//! There is no process-wide registry.

use crate::GeoCoordinate;
use serde::{Deserialize, Serialize};

/// Node identifier (server name, site code, etc.)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A registered server: identifier plus location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: NodeId,
    pub coordinate: GeoCoordinate,
}

/// Ordered list of registered nodes.
///
/// Insertion order is preserved so that graph construction, and therefore
/// the order in which latency factors are drawn, is reproducible. Duplicate
/// identifiers are allowed here and rejected by graph construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRegistry {
    entries: Vec<NodeEntry>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration
    pub fn with_node(mut self, id: impl Into<NodeId>, coordinate: GeoCoordinate) -> Self {
        self.register(id, coordinate);
        self
    }

    /// Register a node
    pub fn register(&mut self, id: impl Into<NodeId>, coordinate: GeoCoordinate) {
        self.entries.push(NodeEntry {
            id: id.into(),
            coordinate,
        });
    }

    /// Get the coordinate of the first entry with this identifier
    pub fn coordinate(&self, id: &NodeId) -> Option<GeoCoordinate> {
        self.entries
            .iter()
            .find(|e| &e.id == id)
            .map(|e| e.coordinate)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(NodeId, GeoCoordinate)> for NodeRegistry {
    fn from_iter<I: IntoIterator<Item = (NodeId, GeoCoordinate)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(id, coordinate)| NodeEntry { id, coordinate })
                .collect(),
        }
    }
}
