pub use crate::config::*;

use log::warn;

use crate::store::MemoryStore;
use crate::week::normalize;

/// A builder for loading observations.
///
/// Every ingestion path should go through [`Builder::add`]: it is the single
/// place where raw rows are validated.
///
/// ```
/// pub use lineage_shares::builder::Builder;
/// pub use lineage_shares::{MalformedRowPolicy, RecordStore};
/// # use lineage_shares::LineageErrors;
///
/// let mut builder = Builder::new(MalformedRowPolicy::Skip);
///
/// builder.add_simple("Tokyo", "BA.1", "2022/1", 6, 0.6)?;
/// builder.add_simple("Tokyo", "BA.2", "2022-01-07", 6, 0.3)?;
/// builder.add_simple("Tokyo", "BA.2", "sometime in spring", 6, 0.1)?;
///
/// assert_eq!(builder.skipped(), 1);
/// let store = builder.into_store();
/// assert_eq!(store.query(&[6], Some("Tokyo")).len(), 2);
///
/// # Ok::<(), LineageErrors>(())
/// ```
pub struct Builder {
    pub(crate) _policy: MalformedRowPolicy,
    pub(crate) _observations: Vec<Observation>,
    pub(crate) _skipped: usize,
}

impl Builder {
    pub fn new(policy: MalformedRowPolicy) -> Builder {
        Builder {
            _policy: policy,
            _observations: Vec::new(),
            _skipped: 0,
        }
    }

    /// Validates a raw row and adds it.
    ///
    /// Returns false if the row was dropped because of its week (only under
    /// [`MalformedRowPolicy::Skip`]). Negative or non-finite values are
    /// always an error.
    pub fn add(&mut self, raw: &RawObservation) -> Result<bool, LineageErrors> {
        if !raw.value.is_finite() || raw.value < 0.0 {
            return Err(LineageErrors::InvalidValue {
                lineage: raw.lineage.clone(),
                value: raw.value,
            });
        }
        let week = match (normalize(&raw.week), self._policy) {
            (Ok(week), _) => week,
            (Err(e), MalformedRowPolicy::Skip) => {
                warn!(
                    "Builder::add: skipping {} / {}: {}",
                    raw.prefecture, raw.lineage, e
                );
                self._skipped += 1;
                return Ok(false);
            }
            (Err(e), MalformedRowPolicy::Abort) => {
                return Err(e);
            }
        };
        self._observations.push(Observation {
            prefecture: raw.prefecture.clone(),
            lineage: raw.lineage.trim().to_string(),
            week,
            wave: raw.wave,
            value: raw.value,
        });
        Ok(true)
    }

    /// Adds a row given by its parts. The week is parsed from text.
    pub fn add_simple(
        &mut self,
        prefecture: &str,
        lineage: &str,
        week: &str,
        wave: u32,
        value: f64,
    ) -> Result<(), LineageErrors> {
        self.add(&RawObservation {
            prefecture: prefecture.to_string(),
            lineage: lineage.to_string(),
            week: RawWeek::from(week),
            wave,
            value,
        })
        .map(|_| ())
    }

    /// The number of rows dropped so far.
    pub fn skipped(&self) -> usize {
        self._skipped
    }

    pub fn observations(&self) -> &[Observation] {
        &self._observations
    }

    pub fn into_store(self) -> MemoryStore {
        MemoryStore::new(self._observations)
    }
}
