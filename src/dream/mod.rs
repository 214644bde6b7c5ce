//! Dream Consolidator (C4): turns the episodic buffer into patterns and
//! then into wisdom artifacts across six strictly sequential phases
//! (NREM1, NREM2, NREM3, pattern extraction, wisdom synthesis, REM).
//!
//! Two dreams never run concurrently; the wake/rest controller (C5)
//! enforces that by only invoking `run_cycle` while in the `Dreaming`
//! state.

mod types;

pub use types::{DreamError, DreamReport, Pattern, PatternId, Wisdom, WisdomId};

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::episodic::EpisodicBuffer;
use crate::memory::{EdgeKind, MemoryStore, NodeId, NodeKind};

const NREM1_DECAY_THRESHOLD: f32 = 0.3;
const NREM1_DECAY_FACTOR: f32 = 0.95;
const NREM2_STRENGTHEN_LOW: f32 = 0.5;
const NREM2_STRENGTHEN_HIGH: f32 = 0.8;
const NREM2_STRENGTHEN_FACTOR: f32 = 1.05;
const NREM3_PROMOTE_THRESHOLD: f32 = 0.7;
const PATTERN_MIN_GROUP_SIZE: usize = 3;
const PATTERN_STRENGTH: f32 = 0.7;
const PATTERN_RECENCY_WINDOW_HOURS: i64 = 24;
const WISDOM_MIN_PATTERNS: usize = 2;

/// Tracks pattern/wisdom artifacts across dream cycles. Counters survive
/// restarts via the identity snapshot (C9), so `patterns_total` and
/// `wisdom_total` are cumulative, not per-cycle.
#[derive(Debug, Default)]
pub struct DreamConsolidator {
    patterns: Vec<Pattern>,
    wisdoms: Vec<Wisdom>,
}

impl DreamConsolidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    #[must_use]
    pub fn wisdoms(&self) -> &[Wisdom] {
        &self.wisdoms
    }

    /// Runs one full dream cycle. Steps 1-6 execute strictly in order;
    /// an empty buffer makes every step a no-op.
    pub fn run_cycle(
        &mut self,
        buffer: &mut EpisodicBuffer,
        memory: &mut MemoryStore,
        now: DateTime<Utc>,
    ) -> Result<DreamReport, DreamError> {
        let mut report = DreamReport::default();

        if buffer.is_empty() {
            return Ok(report);
        }

        // NREM1: passive decay of low-importance episodes.
        for episode in buffer.iter_mut() {
            if episode.importance < NREM1_DECAY_THRESHOLD {
                episode.importance *= NREM1_DECAY_FACTOR;
                report.episodes_decayed += 1;
            }
        }

        // NREM2: strengthen mid-importance episodes.
        for episode in buffer.iter_mut() {
            if (NREM2_STRENGTHEN_LOW..NREM2_STRENGTHEN_HIGH).contains(&episode.importance) {
                episode.importance = (episode.importance * NREM2_STRENGTHEN_FACTOR).min(1.0);
                report.episodes_strengthened += 1;
            }
        }

        // NREM3: promote high-importance episodes into long-term memory.
        let mut episode_nodes: HashMap<crate::episodic::EpisodicId, NodeId> = HashMap::new();
        let candidates: Vec<_> = buffer
            .view()
            .filter(|e| e.importance >= NREM3_PROMOTE_THRESHOLD && !e.consolidated)
            .map(|e| (e.id, e.content.clone(), e.tags.clone(), e.timestamp))
            .collect();

        for (episode_id, content, _tags, _timestamp) in &candidates {
            match memory.add_node(NodeKind::Episodic, content.clone(), None) {
                Ok(node_id) => {
                    episode_nodes.insert(*episode_id, node_id);
                    report.episodes_consolidated += 1;
                }
                Err(_) => {
                    return Ok(finish_aborted(report));
                }
            }
        }
        for episode in buffer.iter_mut() {
            if episode_nodes.contains_key(&episode.id) {
                episode.consolidated = true;
            }
        }

        // Pattern extraction: group unconsolidated episodes from the last
        // PATTERN_RECENCY_WINDOW_HOURS by shared tag. "Unconsolidated" means
        // not promoted in step 3 above, so this pool is disjoint from
        // `candidates`.
        let window_start = now - ChronoDuration::hours(PATTERN_RECENCY_WINDOW_HOURS);
        let unconsolidated: Vec<_> = buffer
            .view()
            .filter(|e| !e.consolidated)
            .map(|e| (e.id, e.content.clone(), e.tags.clone(), e.timestamp))
            .collect();

        let mut by_tag: HashMap<String, Vec<crate::episodic::EpisodicId>> = HashMap::new();
        for (episode_id, _, tags, timestamp) in &unconsolidated {
            if *timestamp < window_start {
                continue;
            }
            for tag in tags {
                by_tag.entry(tag.clone()).or_default().push(*episode_id);
            }
        }

        let mut cycle_pattern_ids = Vec::new();
        for (tag, members) in by_tag {
            if members.len() < PATTERN_MIN_GROUP_SIZE {
                continue;
            }
            let source_episodes: HashSet<_> = members.iter().copied().collect();
            let pattern = Pattern::new(
                format!("recurring pattern: {tag}"),
                members.len() as u32,
                PATTERN_STRENGTH,
                source_episodes,
            );
            let pattern_id = pattern.id;

            // These episodes were never promoted in step 3, so they have no
            // MemoryNode yet; create one per member to hang the hyperedge
            // off, reusing it if the same episode already got one from an
            // earlier tag group this cycle.
            let mut member_node_ids: Vec<NodeId> = Vec::new();
            for (episode_id, content, _, _) in unconsolidated.iter().filter(|(eid, ..)| members.contains(eid)) {
                if let Some(&node_id) = episode_nodes.get(episode_id) {
                    member_node_ids.push(node_id);
                    continue;
                }
                match memory.add_node(NodeKind::Episodic, content.clone(), None) {
                    Ok(node_id) => {
                        episode_nodes.insert(*episode_id, node_id);
                        member_node_ids.push(node_id);
                    }
                    Err(_) => return Ok(finish_aborted(report)),
                }
            }

            if member_node_ids.len() >= 2 {
                let pattern_node = match memory.add_node(NodeKind::Pattern, pattern.description.clone(), None) {
                    Ok(id) => id,
                    Err(_) => return Ok(finish_aborted(report)),
                };
                let mut edge_members = vec![pattern_node];
                edge_members.extend(member_node_ids);
                if memory.add_hyperedge(EdgeKind::DerivedFrom, edge_members, PATTERN_STRENGTH).is_err() {
                    return Ok(finish_aborted(report));
                }
                cycle_pattern_ids.push((pattern_id, pattern_node));
            }

            self.patterns.push(pattern);
            report.patterns_created += 1;
        }

        // Wisdom synthesis: at most one wisdom artifact per cycle.
        if cycle_pattern_ids.len() >= WISDOM_MIN_PATTERNS {
            let source_patterns: HashSet<PatternId> = cycle_pattern_ids.iter().map(|(pid, _)| *pid).collect();
            let wisdom = Wisdom::new(
                "synthesized wisdom linking recent patterns",
                source_patterns,
                0.5,
                0.5,
            );

            let wisdom_node = match memory.add_node(NodeKind::Wisdom, wisdom.insight.clone(), None) {
                Ok(id) => id,
                Err(_) => return Ok(finish_aborted(report)),
            };
            for (_, pattern_node) in &cycle_pattern_ids {
                if memory
                    .add_hyperedge(EdgeKind::Associated, vec![wisdom_node, *pattern_node], 0.5)
                    .is_err()
                {
                    return Ok(finish_aborted(report));
                }
            }

            // REM: activate the wisdom node fully, letting one round of
            // spreading establish cross-pattern associations.
            if memory.activate(wisdom_node, 1.0).is_err() {
                return Ok(finish_aborted(report));
            }

            self.wisdoms.push(wisdom);
            report.wisdom_created += 1;
        }

        Ok(report)
    }
}

fn finish_aborted(mut report: DreamReport) -> DreamReport {
    report.aborted = true;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episodic::EpisodicMemory;
    use crate::memory::{MemoryConfig, MemoryStore};

    #[test]
    fn empty_buffer_is_a_no_op() {
        let mut buffer = EpisodicBuffer::new(10);
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut consolidator = DreamConsolidator::new();
        let report = consolidator.run_cycle(&mut buffer, &mut memory, Utc::now()).unwrap();
        assert_eq!(report.episodes_consolidated, 0);
        assert!(!report.aborted);
    }

    #[test]
    fn nrem1_decays_low_importance_episodes() {
        let mut buffer = EpisodicBuffer::new(10);
        buffer.push(EpisodicMemory::new("low", 0.2, 0.0));
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut consolidator = DreamConsolidator::new();
        consolidator.run_cycle(&mut buffer, &mut memory, Utc::now()).unwrap();
        let remaining: Vec<_> = buffer.view().collect();
        assert!(remaining[0].importance < 0.2);
    }

    #[test]
    fn nrem3_promotes_high_importance_episodes_to_memory() {
        let mut buffer = EpisodicBuffer::new(10);
        buffer.push(EpisodicMemory::new("important", 0.9, 0.0).with_tag("work"));
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut consolidator = DreamConsolidator::new();
        let report = consolidator.run_cycle(&mut buffer, &mut memory, Utc::now()).unwrap();
        assert_eq!(report.episodes_consolidated, 1);
        assert_eq!(memory.len(), 1);
        assert!(buffer.view().next().unwrap().consolidated);
    }

    #[test]
    fn pattern_requires_at_least_three_grouped_episodes() {
        let mut buffer = EpisodicBuffer::new(10);
        for _ in 0..2 {
            buffer.push(EpisodicMemory::new("ep", 0.9, 0.0).with_tag("shared"));
        }
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut consolidator = DreamConsolidator::new();
        let report = consolidator.run_cycle(&mut buffer, &mut memory, Utc::now()).unwrap();
        assert_eq!(report.patterns_created, 0, "two episodes is below the group threshold of 3");
    }

    #[test]
    fn episodes_already_consolidated_in_nrem3_do_not_also_form_a_pattern() {
        let mut buffer = EpisodicBuffer::new(10);
        for _ in 0..3 {
            buffer.push(EpisodicMemory::new("ep", 0.9, 0.0).with_tag("shared"));
        }
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut consolidator = DreamConsolidator::new();
        let report = consolidator.run_cycle(&mut buffer, &mut memory, Utc::now()).unwrap();
        assert_eq!(report.episodes_consolidated, 3, "importance 0.9 clears the NREM3 threshold");
        assert_eq!(
            report.patterns_created, 0,
            "pattern extraction only pools episodes NREM3 left unconsolidated"
        );
        assert_eq!(consolidator.patterns().len(), 0);
    }

    #[test]
    fn pattern_extraction_creates_pattern_from_three_shared_tag_unconsolidated_episodes() {
        let mut buffer = EpisodicBuffer::new(10);
        for _ in 0..3 {
            buffer.push(EpisodicMemory::new("ep", 0.4, 0.0).with_tag("shared"));
        }
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut consolidator = DreamConsolidator::new();
        let report = consolidator.run_cycle(&mut buffer, &mut memory, Utc::now()).unwrap();
        assert_eq!(report.episodes_consolidated, 0, "importance 0.4 stays below the NREM3 threshold");
        assert_eq!(report.patterns_created, 1);
        assert_eq!(consolidator.patterns().len(), 1);
    }

    #[test]
    fn wisdom_requires_at_least_two_patterns() {
        let mut buffer = EpisodicBuffer::new(20);
        for _ in 0..3 {
            buffer.push(EpisodicMemory::new("ep", 0.4, 0.0).with_tag("alpha"));
        }
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut consolidator = DreamConsolidator::new();
        let report = consolidator.run_cycle(&mut buffer, &mut memory, Utc::now()).unwrap();
        assert_eq!(report.patterns_created, 1);
        assert_eq!(report.wisdom_created, 0, "only one pattern this cycle, wisdom needs >= 2");
    }

    #[test]
    fn wisdom_synthesized_from_two_or_more_patterns_in_one_cycle() {
        let mut buffer = EpisodicBuffer::new(20);
        for _ in 0..3 {
            buffer.push(EpisodicMemory::new("ep", 0.4, 0.0).with_tag("alpha"));
        }
        for _ in 0..3 {
            buffer.push(EpisodicMemory::new("ep", 0.4, 0.0).with_tag("beta"));
        }
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut consolidator = DreamConsolidator::new();
        let report = consolidator.run_cycle(&mut buffer, &mut memory, Utc::now()).unwrap();
        assert_eq!(report.patterns_created, 2);
        assert_eq!(report.wisdom_created, 1);
        assert_eq!(consolidator.wisdoms().len(), 1);
    }

    #[test]
    fn episodes_older_than_recency_window_are_excluded_from_pattern_extraction() {
        let mut buffer = EpisodicBuffer::new(10);
        let mut old = EpisodicMemory::new("old", 0.4, 0.0).with_tag("shared");
        old.timestamp = Utc::now() - ChronoDuration::hours(48);
        for _ in 0..3 {
            buffer.push(old.clone());
        }
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut consolidator = DreamConsolidator::new();
        let report = consolidator.run_cycle(&mut buffer, &mut memory, Utc::now()).unwrap();
        assert_eq!(report.patterns_created, 0);
    }
}
