use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::config::*;
use crate::week::WeekKey;

/// The normalized shares of a selection: week -> lineage -> share.
///
/// Weeks with a zero total are absent. Inside a week, only the lineages with a
/// nonzero contribution are present, and their shares sum to 1.
pub type ShareTable = BTreeMap<WeekKey, BTreeMap<String, f64>>;

/// Groups the observations by week, sums the values of each lineage and
/// renormalizes every week so that its shares add up to 1.
///
/// The raw values of a week are not expected to sum to 1: several source files
/// may cover the same week, or only part of it.
pub fn aggregate(observations: &[Observation]) -> Result<ShareTable, LineageErrors> {
    if observations.is_empty() {
        return Err(LineageErrors::EmptyInput);
    }

    let mut sums: BTreeMap<WeekKey, BTreeMap<String, f64>> = BTreeMap::new();
    for obs in observations.iter() {
        let week = sums.entry(obs.week).or_default();
        *week.entry(obs.lineage.clone()).or_insert(0.0) += obs.value;
    }

    let mut res: ShareTable = BTreeMap::new();
    for (week, lineages) in sums {
        let week_total: f64 = lineages.values().sum();
        if week_total <= 0.0 {
            debug!("aggregate: week {} has a zero total, skipping", week);
            continue;
        }
        let shares: BTreeMap<String, f64> = lineages
            .into_iter()
            .filter(|(_, v)| *v > 0.0)
            .map(|(lineage, v)| (lineage, v / week_total))
            .collect();
        debug!(
            "aggregate: week {} total {} lineages {}",
            week,
            week_total,
            shares.len()
        );
        res.insert(week, shares);
    }
    Ok(res)
}

/// Flattens the share table, in week order then lineage order.
pub fn share_entries(shares: &ShareTable) -> Vec<LineageShare> {
    shares
        .iter()
        .flat_map(|(week, lineages)| {
            lineages.iter().map(move |(lineage, share)| LineageShare {
                week: *week,
                lineage: lineage.clone(),
                share: *share,
            })
        })
        .collect()
}

/// All the weeks in which something was observed, in order. This includes the
/// weeks with a zero total, which are absent from the share table.
pub fn observed_weeks(observations: &[Observation]) -> Vec<WeekKey> {
    let weeks: BTreeSet<WeekKey> = observations.iter().map(|o| o.week).collect();
    weeks.into_iter().collect()
}

/// One series per lineage, with the weeks in which it has a share.
/// Series follow the given lineage order.
pub fn ratio_series(shares: &ShareTable, lineage_order: &[String]) -> Vec<LineageSeries> {
    lineage_order
        .iter()
        .map(|lineage| {
            let mut weeks: Vec<WeekKey> = Vec::new();
            let mut values: Vec<f64> = Vec::new();
            for (week, lineages) in shares.iter() {
                if let Some(s) = lineages.get(lineage) {
                    weeks.push(*week);
                    values.push(*s);
                }
            }
            LineageSeries {
                lineage: lineage.clone(),
                weeks,
                shares: values,
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::week::normalize;

    pub(crate) fn obs(lineage: &str, week: &str, value: f64) -> Observation {
        Observation {
            prefecture: "Tokyo".to_string(),
            lineage: lineage.to_string(),
            week: normalize(&RawWeek::from(week)).unwrap(),
            wave: 6,
            value,
        }
    }

    pub(crate) fn wk(s: &str) -> WeekKey {
        s.parse().unwrap()
    }

    #[test]
    fn renormalizes_partial_weeks() {
        let _ = env_logger::try_init();
        let table = aggregate(&[obs("BA.1", "2022/1", 0.6), obs("BA.2", "2022/1", 0.3)]).unwrap();
        let week = table.get(&wk("2022/1")).unwrap();
        assert!((week["BA.1"] - 2.0 / 3.0).abs() < 1e-9);
        assert!((week["BA.2"] - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_rows_add_up() {
        let table = aggregate(&[
            obs("BA.1", "2022/1", 0.2),
            obs("BA.1", "2022-01-07", 0.2),
            obs("BA.2", "2022/01", 0.4),
        ])
        .unwrap();
        assert_eq!(table.len(), 1);
        let week = table.get(&wk("2022/1")).unwrap();
        assert!((week["BA.1"] - 0.5).abs() < 1e-9);
        assert!((week["BA.2"] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn weeks_sum_to_one() {
        let table = aggregate(&[
            obs("BA.1", "2022/1", 12.0),
            obs("BA.2", "2022/1", 7.0),
            obs("BA.5", "2022/1", 0.01),
            obs("BA.2", "2022/2", 0.3),
            obs("BA.5", "2022/2", 0.3),
            obs("BA.5", "2022/3", 1e-6),
        ])
        .unwrap();
        assert_eq!(table.len(), 3);
        for (week, lineages) in table.iter() {
            let total: f64 = lineages.values().sum();
            assert!((total - 1.0).abs() < 1e-9, "week {} sums to {}", week, total);
        }
    }

    #[test]
    fn zero_weeks_and_zero_lineages_are_absent() {
        let table = aggregate(&[
            obs("BA.1", "2022/1", 0.0),
            obs("BA.2", "2022/1", 0.0),
            obs("BA.1", "2022/2", 0.5),
            obs("BA.2", "2022/2", 0.0),
        ])
        .unwrap();
        assert!(table.get(&wk("2022/1")).is_none());
        let week = table.get(&wk("2022/2")).unwrap();
        assert_eq!(week.len(), 1);
        assert_eq!(week["BA.1"], 1.0);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(aggregate(&[]), Err(LineageErrors::EmptyInput));
    }

    #[test]
    fn all_zero_input_is_not_an_error() {
        let table = aggregate(&[obs("BA.1", "2022/1", 0.0)]).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn observed_weeks_keep_zero_weeks() {
        let observations = vec![
            obs("BA.1", "2022/10", 0.0),
            obs("BA.1", "2022/9", 0.5),
            obs("BA.2", "2022/9", 0.5),
        ];
        assert_eq!(observed_weeks(&observations), vec![wk("2022/9"), wk("2022/10")]);
    }

    #[test]
    fn series_skip_missing_weeks() {
        let table = aggregate(&[
            obs("BA.1", "2022/1", 1.0),
            obs("BA.1", "2022/2", 1.0),
            obs("BA.2", "2022/2", 1.0),
        ])
        .unwrap();
        let series = ratio_series(&table, &["BA.2".to_string(), "BA.1".to_string()]);
        assert_eq!(series[0].lineage, "BA.2");
        assert_eq!(series[0].weeks, vec![wk("2022/2")]);
        assert_eq!(series[0].shares, vec![0.5]);
        assert_eq!(series[1].weeks, vec![wk("2022/1"), wk("2022/2")]);
        assert_eq!(series[1].shares, vec![1.0, 0.5]);
        assert_eq!(share_entries(&table).len(), 3);
    }
}
