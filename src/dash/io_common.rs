use std::path::Path;

use crate::dash::*;

/// The name of a file without its directory and extension.
pub fn simplify_file_name(path: &str) -> Option<String> {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

/// The prefecture of a historical rank table, from file names such as
/// `Rank_lineage_Tokyo_6wave.csv`.
pub fn rank_file_prefecture(path: &str) -> Option<String> {
    let name = simplify_file_name(path)?;
    let rest = name.strip_prefix("Rank_lineage_")?;
    rest.split('_')
        .next()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Reads a numeric cell.
///
/// Empty cells, `NA` and `NaN` are missing values (Ok(None)). Anything else
/// that is not a number is an error.
pub fn parse_value(s: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    let s = s.trim();
    match s {
        "" | "NA" | "N/A" | "NaN" | "nan" | "-" => Ok(None),
        _ => s.parse::<f64>().map(Some),
    }
}

/// Reads a wave number. `6.0` is accepted for files that went through a
/// spreadsheet.
pub fn parse_wave(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Ok(w) = s.parse::<u32>() {
        return Some(w);
    }
    match s.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Some(f as u32),
        _ => None,
    }
}

/// How the values of a source are expressed.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ValueScale {
    Percent,
    Fraction,
    /// Percent if any value is above 1.
    Auto,
}

/// Turns all the values of a source into fractions.
pub fn rescale(mut rows: Vec<RawObservation>, scale: ValueScale) -> Vec<RawObservation> {
    let is_percent = match scale {
        ValueScale::Percent => true,
        ValueScale::Fraction => false,
        ValueScale::Auto => rows.iter().any(|r| r.value > 1.0),
    };
    debug!(
        "rescale: scale: {:?} percent: {} rows: {}",
        scale,
        is_percent,
        rows.len()
    );
    if is_percent {
        for r in rows.iter_mut() {
            r.value /= 100.0;
        }
    }
    rows
}

/// Where the wave of a row comes from.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum WaveSource {
    /// Every row of the source belongs to this wave.
    Fixed(u32),
    Column(usize),
}

/// The columns of a wide table: one column for the date, optionally one for
/// the wave, and one per lineage.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct WideLayout {
    pub week_idx: usize,
    pub wave: WaveSource,
    pub lineages: Vec<(usize, String)>,
}

impl WideLayout {
    /// Finds the columns from the header of the table.
    ///
    /// Without an explicit `weekColumn`, the week is in the `date` column, or
    /// the first column. Without an explicit `waveColumn`, the wave is in the
    /// `wave` column, or in the `week` column of the older exports. The wave
    /// column is not looked up when the source has a fixed wave.
    pub fn from_header(header: &[String], cfs: &FileSource, path: &str) -> DashResult<WideLayout> {
        let find = |name: &str| header.iter().position(|h| h.trim().eq_ignore_ascii_case(name));

        let week_idx = match &cfs.week_column {
            Some(c) => find(c).context(MissingColumnSnafu { column: c, path })?,
            None => find("date").unwrap_or(0),
        };

        let wave = match (&cfs.wave_column, cfs.wave) {
            (Some(c), _) => {
                WaveSource::Column(find(c).context(MissingColumnSnafu { column: c, path })?)
            }
            (None, Some(w)) => WaveSource::Fixed(w),
            (None, None) => WaveSource::Column(
                find("wave")
                    .or_else(|| find("week"))
                    .context(MissingColumnSnafu {
                        column: "wave",
                        path,
                    })?,
            ),
        };
        let wave_idx = match wave {
            WaveSource::Column(idx) => Some(idx),
            WaveSource::Fixed(_) => None,
        };

        let lineages: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .filter(|(idx, h)| {
                *idx != week_idx && Some(*idx) != wave_idx && !h.trim().is_empty()
            })
            .map(|(idx, h)| (idx, h.trim().to_string()))
            .collect();
        debug!(
            "WideLayout::from_header: {}: week: {} wave: {:?} lineages: {:?}",
            path, week_idx, wave, lineages
        );
        if lineages.is_empty() {
            whatever!("No lineage column found in {}", path)
        }
        Ok(WideLayout {
            week_idx,
            wave,
            lineages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|s| s.to_string()).collect()
    }

    fn source() -> FileSource {
        FileSource {
            provider: "wide_csv".to_string(),
            file_path: "Tokyo.csv".to_string(),
            prefecture: None,
            wave: None,
            week_column: None,
            wave_column: None,
            value_scale: None,
            worksheet_name: None,
        }
    }

    #[test]
    fn missing_values() {
        assert_eq!(parse_value(""), Ok(None));
        assert_eq!(parse_value(" NA "), Ok(None));
        assert_eq!(parse_value("NaN"), Ok(None));
        assert_eq!(parse_value("12.5"), Ok(Some(12.5)));
        assert!(parse_value("twelve").is_err());
    }

    #[test]
    fn waves() {
        assert_eq!(parse_wave("6"), Some(6));
        assert_eq!(parse_wave("7.0"), Some(7));
        assert_eq!(parse_wave("7.5"), None);
        assert_eq!(parse_wave(""), None);
    }

    #[test]
    fn file_names() {
        assert_eq!(
            simplify_file_name("data/6wave/Tokyo.csv"),
            Some("Tokyo".to_string())
        );
        assert_eq!(
            rank_file_prefecture("x/Rank_lineage_Osaka_6wave.csv"),
            Some("Osaka".to_string())
        );
        assert_eq!(rank_file_prefecture("x/Osaka.csv"), None);
    }

    #[test]
    fn auto_scale_detects_percentages() {
        let row = |v: f64| RawObservation {
            prefecture: "Tokyo".to_string(),
            lineage: "BA.1".to_string(),
            week: RawWeek::from("2022/1"),
            wave: 6,
            value: v,
        };
        let res = rescale(vec![row(0.5), row(50.0)], ValueScale::Auto);
        assert!((res[0].value - 0.005).abs() < 1e-9);
        assert!((res[1].value - 0.5).abs() < 1e-9);
        let res = rescale(vec![row(0.5), row(1.0)], ValueScale::Auto);
        assert_eq!(res[1].value, 1.0);
        let res = rescale(vec![row(0.5)], ValueScale::Percent);
        assert!((res[0].value - 0.005).abs() < 1e-9);
    }

    #[test]
    fn layout_with_default_columns() {
        let h = header(&["date", "wave", "BA.1", "BA.2", "", "BA.2"]);
        let layout = WideLayout::from_header(&h, &source(), "Tokyo.csv").unwrap();
        assert_eq!(layout.week_idx, 0);
        assert_eq!(layout.wave, WaveSource::Column(1));
        assert_eq!(
            layout.lineages,
            vec![
                (2, "BA.1".to_string()),
                (3, "BA.2".to_string()),
                (5, "BA.2".to_string())
            ]
        );
    }

    #[test]
    fn layout_with_older_exports() {
        let h = header(&["Date", "week", "BA.1"]);
        let layout = WideLayout::from_header(&h, &source(), "Tokyo.csv").unwrap();
        assert_eq!(layout.wave, WaveSource::Column(1));

        let mut fixed = source();
        fixed.wave = Some(7);
        let h = header(&["date", "BA.5"]);
        let layout = WideLayout::from_header(&h, &fixed, "Tokyo.csv").unwrap();
        assert_eq!(layout.wave, WaveSource::Fixed(7));
        assert_eq!(layout.lineages, vec![(1, "BA.5".to_string())]);
    }

    #[test]
    fn layout_without_wave_column_fails() {
        let h = header(&["date", "BA.1"]);
        assert!(WideLayout::from_header(&h, &source(), "Tokyo.csv").is_err());
    }
}
