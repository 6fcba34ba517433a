use log::debug;

use crate::aggregate::ShareTable;
use crate::config::HeatCell;
use crate::week::WeekKey;

/// A dense lineage x week matrix.
///
/// `values[i][j]` is the share of `lineages[i]` in `weeks[j]`. Every row has
/// exactly `weeks.len()` entries.
#[derive(PartialEq, Debug, Clone)]
pub struct HeatMatrix {
    pub lineages: Vec<String>,
    pub weeks: Vec<WeekKey>,
    pub values: Vec<Vec<f64>>,
}

impl HeatMatrix {
    /// All the cells, row by row.
    pub fn cells(&self) -> Vec<HeatCell> {
        let mut res: Vec<HeatCell> = Vec::with_capacity(self.lineages.len() * self.weeks.len());
        for (lineage, row) in self.lineages.iter().zip(self.values.iter()) {
            for (week, value) in self.weeks.iter().zip(row.iter()) {
                res.push(HeatCell {
                    lineage: lineage.clone(),
                    week: *week,
                    value: *value,
                });
            }
        }
        res
    }
}

/// Builds the heatmap for the given orders. Combinations absent from the
/// shares are filled with 0.
pub fn build_matrix(
    shares: &ShareTable,
    week_order: &[WeekKey],
    lineage_order: &[String],
) -> HeatMatrix {
    debug!(
        "build_matrix: {} lineages x {} weeks",
        lineage_order.len(),
        week_order.len()
    );
    let values: Vec<Vec<f64>> = lineage_order
        .iter()
        .map(|lineage| {
            week_order
                .iter()
                .map(|week| {
                    shares
                        .get(week)
                        .and_then(|lineages| lineages.get(lineage))
                        .cloned()
                        .unwrap_or(0.0)
                })
                .collect()
        })
        .collect();
    HeatMatrix {
        lineages: lineage_order.to_vec(),
        weeks: week_order.to_vec(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::aggregate::tests::{obs, wk};

    #[test]
    fn matrix_is_dense_and_rectangular() {
        let table = aggregate(&[
            obs("BA.1", "2022/1", 0.6),
            obs("BA.2", "2022/1", 0.4),
            obs("BA.2", "2022/3", 1.0),
        ])
        .unwrap();
        let weeks = vec![wk("2022/1"), wk("2022/2"), wk("2022/3")];
        let lineages = vec!["BA.2".to_string(), "BA.1".to_string(), "XBB".to_string()];
        let m = build_matrix(&table, &weeks, &lineages);
        assert_eq!(m.values.len(), 3);
        for row in m.values.iter() {
            assert_eq!(row.len(), 3);
        }
        assert!((m.values[0][0] - 0.4).abs() < 1e-9);
        assert_eq!(m.values[0][1], 0.0);
        assert_eq!(m.values[0][2], 1.0);
        assert!((m.values[1][0] - 0.6).abs() < 1e-9);
        assert_eq!(m.values[2], vec![0.0, 0.0, 0.0]);
        assert_eq!(m.cells().len(), 9);
        assert_eq!(m.cells()[3].lineage, "BA.1");
        assert_eq!(m.cells()[3].week, wk("2022/1"));
    }

    #[test]
    fn empty_orders_give_empty_matrix() {
        let table = aggregate(&[obs("BA.1", "2022/1", 1.0)]).unwrap();
        let m = build_matrix(&table, &[wk("2022/1")], &[]);
        assert!(m.values.is_empty());
        let m = build_matrix(&table, &[], &["BA.1".to_string()]);
        assert_eq!(m.values, vec![Vec::<f64>::new()]);
    }
}
