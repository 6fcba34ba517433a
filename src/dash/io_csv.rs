// Primitives for reading CSV files.

use std::fs::File;

use crate::dash::{io_common::*, *};

/// A historical rank table: (lineage, week, rank) cells.
pub type RankReference = Vec<(String, WeekKey, Option<u32>)>;

/// Reads a wide table: one row per week, one column per lineage.
///
/// All the rows are attributed to `prefecture`.
pub fn read_wide_csv(
    path: &str,
    cfs: &FileSource,
    prefecture: &str,
) -> BDashResult<Vec<RawObservation>> {
    let (header, records) = get_records(path)?;
    let layout = WideLayout::from_header(&header, cfs, path)?;

    let mut res: Vec<RawObservation> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let week_s = line.get(layout.week_idx).unwrap_or("").trim();
        if week_s.is_empty() {
            debug!("read_wide_csv: {}: skipping line {} without date", path, lineno);
            continue;
        }
        let wave = match layout.wave {
            WaveSource::Fixed(w) => w,
            WaveSource::Column(wave_idx) => {
                let wave_s = line.get(wave_idx).unwrap_or("");
                parse_wave(wave_s).context(CsvCellSnafu {
                    path,
                    lineno,
                    column: header[wave_idx].clone(),
                    content: wave_s,
                })?
            }
        };
        for (col, lineage) in layout.lineages.iter() {
            let cell = line.get(*col).unwrap_or("");
            let value = parse_value(cell).ok().context(CsvCellSnafu {
                path,
                lineno,
                column: lineage,
                content: cell,
            })?;
            if let Some(value) = value {
                res.push(RawObservation {
                    prefecture: prefecture.to_string(),
                    lineage: lineage.clone(),
                    week: RawWeek::from(week_s),
                    wave,
                    value,
                });
            }
        }
    }
    info!(
        "read_wide_csv: {}: {} observations for {}",
        path,
        res.len(),
        prefecture
    );
    Ok(res)
}

/// Reads a long table with the columns `prefecture,lineage,week,wave,value`.
pub fn read_long_csv(path: &str) -> BDashResult<Vec<RawObservation>> {
    let (header, records) = get_records(path)?;
    let col = |name: &str| -> DashResult<usize> {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .context(MissingColumnSnafu { column: name, path })
    };
    let pref_idx = col("prefecture")?;
    let lineage_idx = col("lineage")?;
    let week_idx = col("week")?;
    let wave_idx = col("wave")?;
    let value_idx = col("value")?;

    let mut res: Vec<RawObservation> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let cell = |i: usize| line.get(i).unwrap_or("").trim();

        let prefecture = canonical_prefecture(cell(pref_idx)).context(UnknownPrefectureSnafu {
            name: cell(pref_idx),
        })?;
        let wave = parse_wave(cell(wave_idx)).context(CsvCellSnafu {
            path,
            lineno,
            column: "wave",
            content: cell(wave_idx),
        })?;
        let value = parse_value(cell(value_idx)).ok().context(CsvCellSnafu {
            path,
            lineno,
            column: "value",
            content: cell(value_idx),
        })?;
        match value {
            Some(value) => res.push(RawObservation {
                prefecture: prefecture.to_string(),
                lineage: cell(lineage_idx).to_string(),
                week: RawWeek::from(cell(week_idx)),
                wave,
                value,
            }),
            None => debug!("read_long_csv: {}: line {} has no value", path, lineno),
        }
    }
    info!("read_long_csv: {}: {} observations", path, res.len());
    Ok(res)
}

/// Reads a historical rank table.
///
/// The lineages are in the `lineage` column, or else the first one. Every
/// column with a `YYYY/W` header is a week, the other columns are ignored.
/// Empty cells mean that the lineage was not ranked that week.
pub fn read_rank_table(path: &str) -> BDashResult<RankReference> {
    let (header, records) = get_records(path)?;
    let lineage_idx = header
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("lineage"))
        .unwrap_or(0);
    let mut weeks: Vec<(usize, WeekKey)> = Vec::new();
    for (idx, h) in header.iter().enumerate() {
        if idx == lineage_idx {
            continue;
        }
        match normalize(&RawWeek::from(h.as_str())) {
            Ok(week) if h.contains('/') => weeks.push((idx, week)),
            _ => debug!("read_rank_table: {}: ignoring column {:?}", path, h),
        }
    }
    if weeks.is_empty() {
        return Err(Box::new(DashError::MissingColumn {
            column: "YYYY/W".to_string(),
            path: path.to_string(),
        }));
    }

    let mut res: RankReference = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let lineage = line.get(lineage_idx).unwrap_or("").trim().to_string();
        if lineage.is_empty() {
            continue;
        }
        for (col, week) in weeks.iter() {
            let cell = line.get(*col).unwrap_or("").trim();
            let rank: Option<u32> = if cell.is_empty() {
                None
            } else {
                Some(parse_wave(cell).context(CsvCellSnafu {
                    path,
                    lineno,
                    column: week.to_string(),
                    content: cell,
                })?)
            };
            res.push((lineage.clone(), *week, rank));
        }
    }
    info!("read_rank_table: {}: {} cells", path, res.len());
    Ok(res)
}

fn get_records(path: &str) -> DashResult<(Vec<String>, csv::StringRecordsIntoIter<File>)> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    let header: Vec<String> = match records.next() {
        Some(r) => r
            .context(CsvLineParseSnafu { path, lineno: 1usize })?
            .iter()
            // Spreadsheet exports start with a byte order mark.
            .map(|s| s.trim_start_matches('\u{feff}').to_string())
            .collect(),
        None => whatever!("Empty file {}", path),
    };
    debug!("get_records: {}: header: {:?}", path, header);
    Ok((header, records))
}
