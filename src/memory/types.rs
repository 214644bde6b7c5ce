//! Node and edge types for the hypergraph store.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Sentinel used only to carry an "unknown/missing" id through error paths.
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Declarative,
    Procedural,
    Episodic,
    Intentional,
    Concept,
    Pattern,
    Wisdom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    DerivedFrom,
    Associated,
    Custom,
}

/// A node in the hypergraph. Activation decays monotonically between
/// accesses (enforced by `crate::memory::spreading`, not here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub content: String,
    pub embedding: Vec<f32>,
    pub activation: f32,
    pub importance: f32,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u32,
    pub incoming_edges: HashSet<EdgeId>,
}

impl MemoryNode {
    #[must_use]
    pub fn new(kind: NodeKind, content: String, embedding: Vec<f32>) -> Self {
        let now = Utc::now();
        Self {
            id: NodeId::new(),
            kind,
            content,
            embedding,
            activation: 0.0,
            importance: 0.5,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            incoming_edges: HashSet::new(),
        }
    }
}

/// A hyperedge: an ordered, size ≥ 2 relation between nodes. Size-2 edges
/// are the binary-edge special case; direction, where meaningful, is
/// encoded by member order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hyperedge {
    pub id: EdgeId,
    pub kind: EdgeKind,
    pub members: Vec<NodeId>,
    pub weight: f32,
}

impl Hyperedge {
    #[must_use]
    pub fn new(kind: EdgeKind, members: Vec<NodeId>, weight: f32) -> Self {
        Self {
            id: EdgeId::new(),
            kind,
            members,
            weight,
        }
    }
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    InvalidEmbedding { expected: usize, actual: usize },
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("capacity exhausted: eviction could not reach the soft cap")]
    CapacityExhausted,
    #[error("memory store corrupted: {0}")]
    Corrupted(String),
}
