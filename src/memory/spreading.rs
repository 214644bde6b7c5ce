//! Activation spreading over the hypergraph.
//!
//! At each spreading step, every node carrying activation distributes
//! `activation * spread_factor` uniformly across the adjacent members of
//! its incident edges, weighted by edge weight. Spreading halts once the
//! configured max depth is reached or no node receives at least `epsilon`
//! in a round.

use std::collections::{HashMap, HashSet};

use super::{MemoryStore, NodeId};

pub(super) fn spread(store: &mut MemoryStore, origin: NodeId) {
    let epsilon = store.config().spread_epsilon;
    let spread_factor = store.config().spread_factor;
    let max_depth = store.config().spread_max_depth;

    let mut frontier: HashSet<NodeId> = HashSet::new();
    frontier.insert(origin);

    for _ in 0..max_depth {
        let mut deltas: HashMap<NodeId, f32> = HashMap::new();

        for &nid in &frontier {
            let Some(node) = store.nodes().get(&nid) else {
                continue;
            };
            let outgoing = node.activation * spread_factor;
            if outgoing <= 0.0 {
                continue;
            }
            let edge_ids: Vec<_> = node.incoming_edges.iter().copied().collect();
            for edge_id in edge_ids {
                let Some(edge) = store.edges().get(&edge_id) else {
                    continue;
                };
                let targets: Vec<NodeId> = edge.members.iter().copied().filter(|m| *m != nid).collect();
                if targets.is_empty() {
                    continue;
                }
                let share = outgoing * edge.weight / targets.len() as f32;
                for target in targets {
                    *deltas.entry(target).or_insert(0.0) += share;
                }
            }
        }

        let mut next_frontier = HashSet::new();
        let mut any_above_epsilon = false;

        for (node_id, delta) in &deltas {
            if *delta >= epsilon {
                any_above_epsilon = true;
                next_frontier.insert(*node_id);
            }
            if let Some(node) = store.nodes_mut().get_mut(node_id) {
                node.activation = (node.activation + delta).clamp(0.0, 1.0);
            }
        }

        if !any_above_epsilon {
            break;
        }
        frontier = next_frontier;
    }
}

pub(super) fn decay_all(store: &mut MemoryStore, elapsed_ticks: f32) {
    let decay_rate = store.config().decay_rate;
    let factor = (1.0 - decay_rate).powf(elapsed_ticks.max(0.0));
    for node in store.nodes_mut().values_mut() {
        node.activation *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{EdgeKind, MemoryConfig, NodeKind};

    #[test]
    fn spreading_increases_adjacent_node_activation() {
        let mut store = MemoryStore::new(MemoryConfig::fast());
        let a = store.add_node(NodeKind::Concept, "a", None).unwrap();
        let b = store.add_node(NodeKind::Concept, "b", None).unwrap();
        store.add_hyperedge(EdgeKind::Associated, vec![a, b], 1.0).unwrap();

        store.activate(a, 1.0).unwrap();
        assert!(store.get(b).unwrap().activation > 0.0);
    }

    #[test]
    fn decay_reduces_activation_monotonically() {
        let mut store = MemoryStore::new(MemoryConfig::fast());
        let a = store.add_node(NodeKind::Concept, "a", None).unwrap();
        store.activate(a, 1.0).unwrap();
        let before = store.get(a).unwrap().activation;
        decay_all(&mut store, 1.0);
        let after = store.get(a).unwrap().activation;
        assert!(after < before);
    }
}
