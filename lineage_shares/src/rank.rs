use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use log::{debug, info};

use crate::aggregate::ShareTable;
use crate::config::*;
use crate::week::WeekKey;

/// The ranks of a set of lineages, week by week.
///
/// Every week of the share table is present, and inside each week every
/// lineage of `lineages` is present. A lineage without a share that week has
/// a rank of None.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RankTable {
    /// The ranked lineages, most frequent first.
    pub lineages: Vec<String>,
    pub ranks: BTreeMap<WeekKey, BTreeMap<String, Option<u32>>>,
}

impl RankTable {
    /// The rank of a lineage in a week. None if the lineage was absent that
    /// week, or is not part of the ranked set.
    pub fn rank(&self, week: &WeekKey, lineage: &str) -> Option<u32> {
        self.ranks
            .get(week)
            .and_then(|lineages| lineages.get(lineage))
            .cloned()
            .flatten()
    }

    pub fn weeks(&self) -> Vec<WeekKey> {
        self.ranks.keys().cloned().collect()
    }

    /// All the entries, in week order then in lineage order.
    pub fn entries(&self) -> Vec<RankEntry> {
        let mut res: Vec<RankEntry> = Vec::new();
        for week in self.ranks.keys() {
            for lineage in self.lineages.iter() {
                res.push(RankEntry {
                    week: *week,
                    lineage: lineage.clone(),
                    rank: self.rank(week, lineage),
                });
            }
        }
        res
    }

    /// The line of a lineage over the given weeks, as it should be drawn.
    pub fn series(
        &self,
        lineage: &str,
        weeks: &[WeekKey],
        display: &RankDisplay,
    ) -> Vec<Option<u32>> {
        weeks
            .iter()
            .map(|w| display.display(self.rank(w, lineage)))
            .collect()
    }
}

// Decreasing share, then increasing name.
fn by_share_then_name(a: &(&String, f64), b: &(&String, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(b.0))
}

/// For every lineage, the number of weeks in which it has a nonzero share.
///
/// Sorted by decreasing frequency, ties broken by increasing name.
pub fn lineage_frequencies(shares: &ShareTable) -> Vec<(String, usize)> {
    let mut counts: HashMap<&String, usize> = HashMap::new();
    for lineages in shares.values() {
        for (lineage, share) in lineages.iter() {
            if *share > 0.0 {
                *counts.entry(lineage).or_insert(0) += 1;
            }
        }
    }
    let mut res: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(lineage, count)| (lineage.clone(), count))
        .collect();
    res.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    res
}

/// The `k` lineages seen in the largest number of weeks.
pub fn select_top_lineages(shares: &ShareTable, k: usize) -> Vec<String> {
    let freqs = lineage_frequencies(shares);
    debug!("select_top_lineages: k: {} frequencies: {:?}", k, freqs);
    freqs.into_iter().take(k).map(|(lineage, _)| lineage).collect()
}

/// Ranks the lineages week by week.
///
/// With `top_k`, only the `top_k` most frequent lineages are ranked (see
/// [`select_top_lineages`]). Otherwise all the lineages are ranked.
///
/// There is no default here: the charts use `Some(10)`, from
/// [`ViewOptions::DEFAULT_OPTIONS`].
pub fn build_ranks(shares: &ShareTable, top_k: Option<usize>) -> RankTable {
    let lineages = match top_k {
        Some(k) => select_top_lineages(shares, k),
        None => select_top_lineages(shares, usize::MAX),
    };
    info!(
        "build_ranks: ranking {} lineages over {} weeks",
        lineages.len(),
        shares.len()
    );
    rank_lineages(shares, &lineages)
}

/// Ranks a given set of lineages week by week.
///
/// In each week, the lineages of the set that have a share are sorted by
/// decreasing share and receive ranks 1, 2, ... Equal shares are ordered by
/// name. The other lineages of the set get None.
pub fn rank_lineages(shares: &ShareTable, lineages: &[String]) -> RankTable {
    let mut ranks: BTreeMap<WeekKey, BTreeMap<String, Option<u32>>> = BTreeMap::new();
    for (week, week_shares) in shares.iter() {
        let mut present: Vec<(&String, f64)> = lineages
            .iter()
            .filter_map(|l| week_shares.get(l).map(|s| (l, *s)))
            .collect();
        present.sort_by(by_share_then_name);

        let mut week_ranks: BTreeMap<String, Option<u32>> =
            lineages.iter().map(|l| (l.clone(), None)).collect();
        for (idx, (lineage, _)) in present.iter().enumerate() {
            week_ranks.insert((*lineage).clone(), Some(idx as u32 + 1));
        }
        debug!("rank_lineages: week {}: {:?}", week, present);
        ranks.insert(*week, week_ranks);
    }
    RankTable {
        lineages: lineages.to_vec(),
        ranks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::aggregate::tests::{obs, wk};
    use std::collections::BTreeSet;

    fn six_weeks() -> ShareTable {
        let mut observations = Vec::new();
        for w in 1..=6 {
            let week = format!("2022/{}", w);
            if w != 3 {
                observations.push(obs("A", &week, 0.5));
            }
            if w <= 2 {
                observations.push(obs("B", &week, 0.9));
            }
            observations.push(obs("C", &week, 0.1));
        }
        aggregate(&observations).unwrap()
    }

    #[test]
    fn top_lineages_by_frequency() {
        let mut observations = Vec::new();
        for w in 1..=6 {
            let week = format!("2022/{}", w);
            if w != 3 {
                observations.push(obs("A", &week, 0.5));
            }
            if w <= 2 {
                observations.push(obs("B", &week, 0.9));
            }
        }
        let table = aggregate(&observations).unwrap();
        assert_eq!(select_top_lineages(&table, 1), vec!["A".to_string()]);
        assert_eq!(
            select_top_lineages(&table, 5),
            vec!["A".to_string(), "B".to_string()]
        );
    }

    #[test]
    fn frequency_ties_break_on_name() {
        let table = aggregate(&[
            obs("XBB", "2022/1", 0.1),
            obs("BA.5", "2022/1", 0.1),
            obs("BQ.1", "2022/1", 0.8),
        ])
        .unwrap();
        assert_eq!(
            lineage_frequencies(&table),
            vec![
                ("BA.5".to_string(), 1),
                ("BQ.1".to_string(), 1),
                ("XBB".to_string(), 1)
            ]
        );
    }

    #[test]
    fn ranks_follow_shares() {
        let table = six_weeks();
        let ranks = build_ranks(&table, None);
        assert_eq!(ranks.lineages, vec!["C", "A", "B"]);
        assert_eq!(ranks.rank(&wk("2022/1"), "B"), Some(1));
        assert_eq!(ranks.rank(&wk("2022/1"), "A"), Some(2));
        assert_eq!(ranks.rank(&wk("2022/1"), "C"), Some(3));
        // A is missing in week 3: absent, not zero.
        assert_eq!(ranks.rank(&wk("2022/3"), "A"), None);
        assert_eq!(ranks.rank(&wk("2022/3"), "C"), Some(1));
        assert_eq!(ranks.rank(&wk("2022/4"), "B"), None);
        assert_eq!(ranks.rank(&wk("2022/9"), "B"), None);
    }

    #[test]
    fn ranks_are_contiguous_from_one() {
        let table = six_weeks();
        for top_k in [None, Some(1), Some(2), Some(10)] {
            let ranks = build_ranks(&table, top_k);
            for (week, lineages) in ranks.ranks.iter() {
                let got: BTreeSet<u32> = lineages.values().filter_map(|r| *r).collect();
                let n = lineages.values().filter(|r| r.is_some()).count() as u32;
                let expected: BTreeSet<u32> = (1..=n).collect();
                assert_eq!(got, expected, "week {} top_k {:?}", week, top_k);
            }
        }
    }

    #[test]
    fn top_k_restricts_the_ranked_set() {
        let table = six_weeks();
        let ranks = build_ranks(&table, Some(2));
        assert_eq!(ranks.lineages, vec!["C", "A"]);
        // B is not ranked, A takes the first place in week 1.
        assert_eq!(ranks.rank(&wk("2022/1"), "B"), None);
        assert_eq!(ranks.rank(&wk("2022/1"), "A"), Some(1));
        assert_eq!(ranks.entries().len(), 6 * 2);
    }

    #[test]
    fn default_options_rank_ten_lineages() {
        let observations: Vec<Observation> = (0..12)
            .map(|i| obs(&format!("L{:02}", i), "2022/1", 1.0 + i as f64))
            .collect();
        let table = aggregate(&observations).unwrap();
        let ranks = build_ranks(&table, ViewOptions::DEFAULT_OPTIONS.top_k);
        assert_eq!(ranks.lineages.len(), 10);
        assert_eq!(ranks.lineages[0], "L00");
        assert_eq!(build_ranks(&table, None).lineages.len(), 12);
    }

    #[test]
    fn equal_shares_break_on_name() {
        let table = aggregate(&[
            obs("BA.2", "2022/1", 0.25),
            obs("BA.1", "2022/1", 0.25),
            obs("AY.4", "2022/1", 0.5),
        ])
        .unwrap();
        let ranks = build_ranks(&table, None);
        assert_eq!(ranks.rank(&wk("2022/1"), "AY.4"), Some(1));
        assert_eq!(ranks.rank(&wk("2022/1"), "BA.1"), Some(2));
        assert_eq!(ranks.rank(&wk("2022/1"), "BA.2"), Some(3));
    }

    #[test]
    fn series_apply_display_policy() {
        let table = six_weeks();
        let ranks = build_ranks(&table, None);
        let weeks = ranks.weeks();
        assert_eq!(
            ranks.series("A", &weeks, &RankDisplay::GAPS),
            vec![Some(2), Some(2), None, Some(1), Some(1), Some(1)]
        );
        assert_eq!(
            ranks.series("B", &weeks, &RankDisplay::OVERFLOW_21)[2..],
            [Some(21), Some(21), Some(21), Some(21)]
        );
    }
}
