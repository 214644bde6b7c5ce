//! Importance-based eviction.
//!
//! Score each node by `w_imp * importance + w_act * activation +
//! w_rec * recency - w_age * age`, evict the lowest-scoring nodes until
//! the target is reached. Ties break on oldest `createdAt`. Nodes whose
//! activation exceeds `eviction_floor` are never evicted.

use chrono::Utc;

use super::{MemoryError, MemoryStore, NodeId};

pub(super) fn evict(store: &mut MemoryStore, target: usize) -> Result<usize, MemoryError> {
    let floor = store.config().eviction_floor;
    let w_imp = store.config().weight_importance;
    let w_act = store.config().weight_activation;
    let w_rec = store.config().weight_recency;
    let w_age = store.config().weight_age;

    let now = Utc::now();

    let mut candidates: Vec<(NodeId, f32, chrono::DateTime<Utc>)> = store
        .nodes()
        .values()
        .filter(|node| node.activation <= floor)
        .map(|node| {
            let age_secs = (now - node.created_at).num_seconds().max(0) as f32;
            let recency_secs = (now - node.last_accessed_at).num_seconds().max(0) as f32;
            let recency = 1.0 / (1.0 + recency_secs / 3600.0);
            let age = age_secs / 86_400.0;
            let score = w_imp * node.importance + w_act * node.activation + w_rec * recency - w_age * age;
            (node.id, score, node.created_at)
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.2.cmp(&b.2))
    });

    let mut removed = 0;
    for (id, _, _) in candidates.into_iter().take(target) {
        store.remove_node(id);
        removed += 1;
    }

    Ok(removed)
}
