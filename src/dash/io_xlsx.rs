use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use chrono::{Days, NaiveDate};

use crate::dash::{io_common::*, *};

/// Reads a wide table from an Excel workbook. The layout is the same as for
/// [`super::io_csv::read_wide_csv`].
pub fn read_wide_xlsx(
    path: &str,
    cfs: &FileSource,
    prefecture: &str,
) -> BDashResult<Vec<RawObservation>> {
    let wrange = get_range(path, cfs)?;
    let mut rows = wrange.rows();
    let header: Vec<String> = rows
        .next()
        .context(EmptyExcelSnafu { path })?
        .iter()
        .map(cell_text)
        .collect();
    let layout = WideLayout::from_header(&header, cfs, path)?;

    let mut res: Vec<RawObservation> = Vec::new();
    for (idx, row) in rows.enumerate() {
        let lineno = idx + 2;
        let week = match row.get(layout.week_idx) {
            None | Some(DataType::Empty) => {
                debug!("read_wide_xlsx: {}: skipping row {} without date", path, lineno);
                continue;
            }
            Some(cell) => read_week(cell).context(ExcelWrongCellTypeSnafu {
                path,
                lineno,
                content: format!("{:?}", cell),
            })?,
        };
        let wave = match layout.wave {
            WaveSource::Fixed(w) => w,
            WaveSource::Column(wave_idx) => row
                .get(wave_idx)
                .and_then(read_wave)
                .context(ExcelWrongCellTypeSnafu {
                    path,
                    lineno,
                    content: format!("{:?}", row.get(wave_idx)),
                })?,
        };
        for (col, lineage) in layout.lineages.iter() {
            let value = match row.get(*col) {
                None => None,
                Some(cell) => read_value(cell).context(ExcelWrongCellTypeSnafu {
                    path,
                    lineno,
                    content: format!("{:?}", cell),
                })?,
            };
            if let Some(value) = value {
                res.push(RawObservation {
                    prefecture: prefecture.to_string(),
                    lineage: lineage.clone(),
                    week: week.clone(),
                    wave,
                    value,
                });
            }
        }
    }
    info!(
        "read_wide_xlsx: {}: {} observations for {}",
        path,
        res.len(),
        prefecture
    );
    Ok(res)
}

fn get_range(path: &str, cfs: &FileSource) -> BDashResult<Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, cfs.worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match &cfs.worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name, path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?,
    }
    .context(OpeningExcelSnafu { path })?;
    Ok(wrange)
}

fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Empty => String::new(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) => f.to_string(),
        other => format!("{:?}", other),
    }
}

/// Date cells are stored as a number of days since 1899-12-30.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

fn read_week(cell: &DataType) -> Option<RawWeek> {
    match cell {
        DataType::String(s) => Some(RawWeek::from(s.trim())),
        DataType::Float(f) | DataType::DateTime(f) => excel_serial_date(*f).map(RawWeek::Date),
        DataType::Int(i) => excel_serial_date(*i as f64).map(RawWeek::Date),
        _ => None,
    }
}

fn read_wave(cell: &DataType) -> Option<u32> {
    match cell {
        DataType::Int(i) => u32::try_from(*i).ok(),
        DataType::Float(f) => parse_wave(&f.to_string()),
        DataType::String(s) => parse_wave(s),
        _ => None,
    }
}

// None if the cell cannot be a value, Some(None) if the value is missing.
fn read_value(cell: &DataType) -> Option<Option<f64>> {
    match cell {
        DataType::Float(f) => Some(Some(*f)),
        DataType::Int(i) => Some(Some(*i as f64)),
        // #N/A and friends
        DataType::Empty | DataType::Error(_) => Some(None),
        DataType::String(s) => parse_value(s).ok(),
        _ => None,
    }
}
