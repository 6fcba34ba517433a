use crate::aggregate::ShareTable;
use crate::config::DominantLineage;
use crate::week::WeekKey;

/// The dominant lineage of every week in `week_order`.
///
/// Weeks without shares are kept with no lineage and a share of 0, so that
/// prefecture summaries line up on the same weeks.
pub fn dominant_lineages(shares: &ShareTable, week_order: &[WeekKey]) -> Vec<DominantLineage> {
    week_order
        .iter()
        .map(|week| {
            let best = shares.get(week).and_then(|lineages| {
                // BTreeMap iteration is by name: the first maximum wins ties.
                lineages
                    .iter()
                    .fold(None, |acc: Option<(&String, f64)>, (l, s)| match acc {
                        Some((_, best)) if best >= *s => acc,
                        _ => Some((l, *s)),
                    })
            });
            match best {
                Some((lineage, share)) => DominantLineage {
                    week: *week,
                    lineage: Some(lineage.clone()),
                    share,
                },
                None => DominantLineage {
                    week: *week,
                    lineage: None,
                    share: 0.0,
                },
            }
        })
        .collect()
}
