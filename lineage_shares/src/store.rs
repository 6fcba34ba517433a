use std::collections::BTreeSet;

use log::debug;

use crate::config::Observation;

/// Where the observations come from.
///
/// The pipeline only needs this one query shape. Implementations own their
/// resources (connections, files, memory) and are handed to the callers that
/// need them.
pub trait RecordStore {
    /// All the observations of the given waves, optionally restricted to one
    /// prefecture.
    fn query(&self, waves: &[u32], prefecture: Option<&str>) -> Vec<Observation>;

    /// The prefectures that have at least one observation, sorted by name.
    fn prefectures(&self) -> Vec<String>;
}

/// A store that keeps all the observations in memory.
///
/// Observations are immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    observations: Vec<Observation>,
}

impl MemoryStore {
    pub fn new(mut observations: Vec<Observation>) -> MemoryStore {
        // Stable: rows of the same key stay in insertion order.
        observations.sort_by(|a, b| {
            a.prefecture
                .cmp(&b.prefecture)
                .then_with(|| a.week.cmp(&b.week))
                .then_with(|| a.lineage.cmp(&b.lineage))
        });
        MemoryStore { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn query(&self, waves: &[u32], prefecture: Option<&str>) -> Vec<Observation> {
        let res: Vec<Observation> = self
            .observations
            .iter()
            .filter(|o| waves.contains(&o.wave))
            .filter(|o| prefecture.map_or(true, |p| o.prefecture == p))
            .cloned()
            .collect();
        debug!(
            "MemoryStore::query: waves {:?} prefecture {:?}: {} observations",
            waves,
            prefecture,
            res.len()
        );
        res
    }

    fn prefectures(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self.observations.iter().map(|o| &o.prefecture).collect();
        names.into_iter().cloned().collect()
    }
}
