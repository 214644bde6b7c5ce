//! Hypergraph working/long-term memory (C2)
//!
//! Owns every `MemoryNode` and `Hyperedge` in the system. Nothing outside
//! this module constructs or mutates a node or edge directly; callers go
//! through `addNode`/`addHyperedge`/`activate`/`query`/`evict`.

mod eviction;
mod spreading;
mod types;

pub use types::{EdgeId, EdgeKind, Hyperedge, MemoryError, NodeId, NodeKind, MemoryNode};

use std::collections::{HashMap, HashSet};

use chrono::Utc;

/// Tuning knobs for activation spreading and eviction, set once at startup.
#[derive(Debug, Clone, Copy)]
pub struct MemoryConfig {
    pub embedding_dim: usize,
    pub soft_cap: usize,
    pub hard_cap: usize,
    pub decay_rate: f32,
    pub spread_factor: f32,
    pub eviction_floor: f32,
    pub spread_epsilon: f32,
    pub spread_max_depth: u32,
    pub weight_importance: f32,
    pub weight_activation: f32,
    pub weight_recency: f32,
    pub weight_age: f32,
}

impl MemoryConfig {
    #[must_use]
    pub const fn human() -> Self {
        Self {
            embedding_dim: 256,
            soft_cap: 10_000,
            hard_cap: 12_000,
            decay_rate: 0.05,
            spread_factor: 0.3,
            eviction_floor: 0.2,
            spread_epsilon: 0.01,
            spread_max_depth: 3,
            weight_importance: 0.4,
            weight_activation: 0.3,
            weight_recency: 0.2,
            weight_age: 0.1,
        }
    }

    #[must_use]
    pub const fn fast() -> Self {
        Self {
            embedding_dim: 32,
            soft_cap: 200,
            hard_cap: 256,
            decay_rate: 0.1,
            spread_factor: 0.3,
            eviction_floor: 0.2,
            spread_epsilon: 0.01,
            spread_max_depth: 2,
            weight_importance: 0.4,
            weight_activation: 0.3,
            weight_recency: 0.2,
            weight_age: 0.1,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::human()
    }
}

/// The hypergraph store: an in-process index over nodes and hyperedges.
///
/// Mutation is serialized by construction: every method takes `&mut self`,
/// so callers share one store behind a single owning task (the scheduler
/// in `crate::echobeats`) rather than behind internal locking.
#[derive(Debug)]
pub struct MemoryStore {
    config: MemoryConfig,
    nodes: HashMap<NodeId, MemoryNode>,
    edges: HashMap<EdgeId, Hyperedge>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            nodes: HashMap::new(),
            edges: HashMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Exports every node and hyperedge for snapshotting (C9). Cloning
    /// the whole store is acceptable here: snapshots happen at a
    /// bounded cadence, not per cycle.
    #[must_use]
    pub fn export_for_snapshot(&self) -> (Vec<MemoryNode>, Vec<Hyperedge>) {
        (self.nodes.values().cloned().collect(), self.edges.values().cloned().collect())
    }

    /// Rebuilds a store from a snapshot's node/edge lists (C9 restore).
    #[must_use]
    pub fn restore_from_snapshot(config: MemoryConfig, nodes: Vec<MemoryNode>, edges: Vec<Hyperedge>) -> Self {
        Self {
            config,
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
            edges: edges.into_iter().map(|e| (e.id, e)).collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(&id)
    }

    pub fn add_node(
        &mut self,
        kind: NodeKind,
        content: impl Into<String>,
        embedding: Option<Vec<f32>>,
    ) -> Result<NodeId, MemoryError> {
        if let Some(ref v) = embedding {
            if v.len() != self.config.embedding_dim {
                return Err(MemoryError::InvalidEmbedding {
                    expected: self.config.embedding_dim,
                    actual: v.len(),
                });
            }
        }

        if self.nodes.len() >= self.config.hard_cap {
            self.evict(self.nodes.len() + 1 - self.config.soft_cap)?;
            if self.nodes.len() >= self.config.hard_cap {
                return Err(MemoryError::CapacityExhausted);
            }
        }

        let node = MemoryNode::new(kind, content.into(), embedding.unwrap_or_default());
        let id = node.id;
        self.nodes.insert(id, node);

        if self.nodes.len() > self.config.soft_cap {
            let overflow = self.nodes.len() - self.config.soft_cap;
            self.evict(overflow)?;
        }

        Ok(id)
    }

    pub fn add_hyperedge(
        &mut self,
        kind: EdgeKind,
        members: Vec<NodeId>,
        weight: f32,
    ) -> Result<EdgeId, MemoryError> {
        if members.len() < 2 {
            return Err(MemoryError::UnknownNode(NodeId::nil()));
        }
        for m in &members {
            if !self.nodes.contains_key(m) {
                return Err(MemoryError::UnknownNode(*m));
            }
        }

        let edge = Hyperedge::new(kind, members.clone(), weight.clamp(0.0, 1.0));
        let id = edge.id;
        for m in &members {
            if let Some(node) = self.nodes.get_mut(m) {
                node.incoming_edges.insert(id);
            }
        }
        self.edges.insert(id, edge);
        Ok(id)
    }

    pub fn activate(&mut self, node_id: NodeId, amount: f32) -> Result<(), MemoryError> {
        let amount = amount.clamp(f32::EPSILON, 1.0);
        {
            let node = self
                .nodes
                .get_mut(&node_id)
                .ok_or(MemoryError::UnknownNode(node_id))?;
            node.activation = (node.activation + amount).clamp(0.0, 1.0);
            node.last_accessed_at = Utc::now();
            node.access_count += 1;
        }
        spreading::spread(self, node_id);
        Ok(())
    }

    #[must_use]
    pub fn query(&self, seed: &HashSet<NodeId>, depth: u32, max_results: usize) -> Vec<(NodeId, f32)> {
        let mut scored: HashMap<NodeId, f32> = HashMap::new();
        let mut frontier: HashSet<NodeId> = seed.clone();
        let mut attenuation = 1.0_f32;

        for _ in 0..=depth {
            let mut next = HashSet::new();
            for &nid in &frontier {
                let Some(node) = self.nodes.get(&nid) else {
                    continue;
                };
                for edge_id in &node.incoming_edges {
                    let Some(edge) = self.edges.get(edge_id) else {
                        continue;
                    };
                    for &member in &edge.members {
                        let Some(member_node) = self.nodes.get(&member) else {
                            continue;
                        };
                        let score = member_node.activation
                            * member_node.importance
                            * edge.weight
                            * attenuation;
                        let entry = scored.entry(member).or_insert(0.0);
                        if score > *entry {
                            *entry = score;
                        }
                        next.insert(member);
                    }
                }
            }
            frontier = next;
            attenuation *= 0.5;
        }

        let mut results: Vec<(NodeId, f32)> = scored.into_iter().collect();
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(max_results);
        results
    }

    pub fn evict(&mut self, target: usize) -> Result<usize, MemoryError> {
        if target == 0 {
            return Ok(0);
        }
        eviction::evict(self, target)
    }

    /// Decays every node's activation by `(1 - decay_rate)^elapsed_ticks`.
    /// Called once per clock tick by the scheduler.
    pub fn decay(&mut self, elapsed_ticks: f32) {
        spreading::decay_all(self, elapsed_ticks);
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut HashMap<NodeId, MemoryNode> {
        &mut self.nodes
    }

    pub(crate) fn nodes(&self) -> &HashMap<NodeId, MemoryNode> {
        &self.nodes
    }

    pub(crate) fn edges(&self) -> &HashMap<EdgeId, Hyperedge> {
        &self.edges
    }

    pub(crate) fn remove_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        for edge_id in node.incoming_edges {
            if let Some(edge) = self.edges.remove(&edge_id) {
                for member in edge.members {
                    if member != id {
                        if let Some(n) = self.nodes.get_mut(&member) {
                            n.incoming_edges.remove(&edge_id);
                        }
                    }
                }
            }
        }
    }

    pub(crate) fn config(&self) -> &MemoryConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(MemoryConfig::fast())
    }

    #[test]
    fn add_node_rejects_wrong_embedding_length() {
        let mut s = store();
        let err = s.add_node(NodeKind::Concept, "x", Some(vec![0.0; 3])).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidEmbedding { .. }));
    }

    #[test]
    fn add_hyperedge_requires_known_members() {
        let mut s = store();
        let a = s.add_node(NodeKind::Concept, "a", None).unwrap();
        let missing = NodeId::new();
        let err = s.add_hyperedge(EdgeKind::Associated, vec![a, missing], 0.5).unwrap_err();
        assert!(matches!(err, MemoryError::UnknownNode(_)));
    }

    #[test]
    fn activate_clamps_and_updates_access_metadata() {
        let mut s = store();
        let a = s.add_node(NodeKind::Concept, "a", None).unwrap();
        s.activate(a, 5.0).unwrap();
        let node = s.get(a).unwrap();
        assert!((node.activation - 1.0).abs() < f32::EPSILON);
        assert_eq!(node.access_count, 1);
    }

    #[test]
    fn query_ranks_by_activation_importance_and_edge_weight() {
        let mut s = store();
        let a = s.add_node(NodeKind::Concept, "a", None).unwrap();
        let b = s.add_node(NodeKind::Concept, "b", None).unwrap();
        s.add_hyperedge(EdgeKind::Associated, vec![a, b], 0.9).unwrap();
        s.activate(b, 1.0).unwrap();

        let mut seed = HashSet::new();
        seed.insert(a);
        let results = s.query(&seed, 1, 5);
        assert!(results.iter().any(|(id, _)| *id == b));
    }

    #[test]
    fn evict_never_removes_nodes_above_floor() {
        let mut s = store();
        let a = s.add_node(NodeKind::Concept, "a", None).unwrap();
        s.activate(a, 1.0).unwrap();
        let removed = s.evict(10).unwrap();
        assert_eq!(removed, 0, "high-activation node must survive eviction");
    }

    #[test]
    fn removing_a_node_removes_incident_edges() {
        let mut s = store();
        let a = s.add_node(NodeKind::Concept, "a", None).unwrap();
        let b = s.add_node(NodeKind::Concept, "b", None).unwrap();
        let edge = s.add_hyperedge(EdgeKind::Associated, vec![a, b], 0.5).unwrap();
        s.remove_node(a);
        assert!(!s.edges().contains_key(&edge));
        assert!(!s.get(b).unwrap().incoming_edges.contains(&edge));
    }

    #[test]
    fn export_then_restore_round_trips_nodes_and_edges() {
        let mut s = store();
        let a = s.add_node(NodeKind::Concept, "a", None).unwrap();
        let b = s.add_node(NodeKind::Concept, "b", None).unwrap();
        s.add_hyperedge(EdgeKind::Associated, vec![a, b], 0.5).unwrap();

        let (nodes, edges) = s.export_for_snapshot();
        assert_eq!(nodes.len(), 2);
        assert_eq!(edges.len(), 1);

        let restored = MemoryStore::restore_from_snapshot(MemoryConfig::fast(), nodes, edges);
        assert_eq!(restored.len(), 2);
        assert!(restored.get(a).is_some());
    }
}
