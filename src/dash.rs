use log::{debug, info, warn};

use lineage_shares::builder::Builder;
use lineage_shares::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::dash::config_reader::*;
use crate::dash::io_csv::RankReference;
use crate::dash::prefecture::{canonical_prefecture, japanese_name};

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_xlsx;
mod prefecture;

#[derive(Debug, Snafu)]
pub enum DashError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} is empty"))]
    EmptyExcel { path: String },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("Could not read the cell {content} at row {lineno} of {path}"))]
    ExcelWrongCellType {
        path: String,
        lineno: usize,
        content: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing the output to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Could not read {content:?} in column {column}, line {lineno} of {path}"))]
    CsvCell {
        path: String,
        lineno: usize,
        column: String,
        content: String,
    },
    #[snafu(display("Missing column {column} in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Unknown provider {provider:?}: expected one of wide_csv, long_csv, wide_xlsx"))]
    UnknownProvider { provider: String },
    #[snafu(display("Unknown prefecture {name:?}"))]
    UnknownPrefecture { name: String },
    #[snafu(display("No data for wave {wave} in {prefecture}"))]
    NoData { wave: String, prefecture: String },
    #[snafu(display("Error while processing {step}"))]
    Pipeline { source: LineageErrors, step: String },
    #[snafu(display("{count} differences with the rank table {path}"))]
    RankMismatch { count: usize, path: String },
    #[snafu(display("Difference detected between the output and the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DashResult<T> = Result<T, DashError>;
pub type BDashResult<T> = Result<T, Box<DashError>>;

/// The outcome of a run: the views of every selection and the document
/// written from them.
pub struct Dashboard {
    pub selections: Vec<(String, SelectionViews)>,
    pub document: JSValue,
}

fn source_prefecture(cfs: &FileSource, path: &str) -> DashResult<String> {
    let name = match &cfs.prefecture {
        Some(p) => p.clone(),
        None => {
            io_common::simplify_file_name(path).context(UnknownPrefectureSnafu { name: path })?
        }
    };
    canonical_prefecture(&name)
        .map(|p| p.to_string())
        .context(UnknownPrefectureSnafu { name })
}

fn read_source(root: &Path, cfs: &FileSource) -> BDashResult<Vec<RawObservation>> {
    let p: PathBuf = root.join(&cfs.file_path);
    let path = p.display().to_string();
    info!("read_source: reading {} ({})", path, cfs.provider);
    let rows = match cfs.provider.as_str() {
        "wide_csv" => io_csv::read_wide_csv(&path, cfs, &source_prefecture(cfs, &path)?)?,
        "long_csv" => io_csv::read_long_csv(&path)?,
        "wide_xlsx" => io_xlsx::read_wide_xlsx(&path, cfs, &source_prefecture(cfs, &path)?)?,
        x => {
            return Err(Box::new(DashError::UnknownProvider {
                provider: x.to_string(),
            }))
        }
    };
    Ok(io_common::rescale(rows, cfs.value_scale()?))
}

/// Reads all the sources and validates every row.
pub fn load_store(config: &DashConfig, root: &Path) -> BDashResult<MemoryStore> {
    let mut builder = Builder::new(config.policy()?);
    for cfs in config.sources.iter() {
        let rows = read_source(root, cfs)?;
        for row in rows.iter() {
            builder.add(row).context(PipelineSnafu {
                step: cfs.file_path.as_str(),
            })?;
        }
    }
    if builder.skipped() > 0 {
        warn!(
            "load_store: skipped {} rows with a malformed week",
            builder.skipped()
        );
    }
    let store = builder.into_store();
    info!(
        "load_store: {} observations in {} prefectures",
        store.len(),
        store.prefectures().len()
    );
    Ok(store)
}

/// Runs the pipeline for every selected prefecture.
///
/// When the prefectures are not listed in the configuration, the prefectures
/// without data for the wave are left out. A listed prefecture without data is
/// an error.
pub fn run_selections(
    config: &DashConfig,
    store: &dyn RecordStore,
) -> DashResult<Vec<(String, SelectionViews)>> {
    let wave = config.selection.wave()?;
    let options = config.view_options();
    let (prefectures, explicit) = match &config.selection.prefectures {
        Some(ps) => {
            let mut names: Vec<String> = Vec::new();
            for p in ps.iter() {
                let name = canonical_prefecture(p).context(UnknownPrefectureSnafu { name: p })?;
                names.push(name.to_string());
            }
            (names, true)
        }
        None => (store.prefectures(), false),
    };

    let mut res: Vec<(String, SelectionViews)> = Vec::new();
    for prefecture in prefectures {
        match run_selection(store, wave, Some(prefecture.as_str()), &options) {
            Ok(views) => res.push((prefecture, views)),
            Err(LineageErrors::EmptyInput) if !explicit => {
                warn!(
                    "run_selections: no data for wave {} in {}, skipping",
                    wave, prefecture
                );
            }
            Err(LineageErrors::EmptyInput) => {
                return NoDataSnafu {
                    wave: wave.to_string(),
                    prefecture,
                }
                .fail();
            }
            Err(e) => {
                return Err(e).context(PipelineSnafu {
                    step: format!("{} wave {}", prefecture, wave),
                });
            }
        }
    }
    if res.is_empty() {
        return NoDataSnafu {
            wave: wave.to_string(),
            prefecture: "any prefecture",
        }
        .fail();
    }
    Ok(res)
}

fn weeks_to_json(weeks: &[WeekKey]) -> Vec<String> {
    weeks.iter().map(|w| w.to_string()).collect()
}

fn selection_to_json(
    prefecture: &str,
    wave: WaveSelector,
    views: &SelectionViews,
    display: &RankDisplay,
) -> JSValue {
    let ratio: Vec<JSValue> = views
        .ratio
        .iter()
        .map(|s| {
            json!({
                "lineage": s.lineage,
                "weeks": weeks_to_json(&s.weeks),
                "shares": s.shares,
            })
        })
        .collect();

    // Ranks are drawn on the same weeks as the heatmap.
    let rank_series: Vec<JSValue> = views
        .ranks
        .lineages
        .iter()
        .map(|l| {
            json!({
                "lineage": l,
                "ranks": views.ranks.series(l, &views.weeks, display),
            })
        })
        .collect();

    let dominant: Vec<JSValue> = views
        .dominant
        .iter()
        .map(|d| {
            json!({
                "week": d.week.to_string(),
                "lineage": d.lineage,
                "share": d.share,
            })
        })
        .collect();

    json!({
        "prefecture": prefecture,
        "prefectureJa": japanese_name(prefecture),
        "wave": wave.to_string(),
        "weeks": weeks_to_json(&views.weeks),
        "lineages": views.lineages,
        "ratio": ratio,
        "heatmap": {
            "lineages": views.heatmap.lineages,
            "weeks": weeks_to_json(&views.heatmap.weeks),
            "values": views.heatmap.values,
        },
        "ranks": {
            "lineages": views.ranks.lineages,
            "series": rank_series,
        },
        "dominant": dominant,
    })
}

/// The dominant lineage of every prefecture, on the weeks of all the
/// selections.
fn summary_to_json(selections: &[(String, SelectionViews)]) -> JSValue {
    let weeks: BTreeSet<WeekKey> = selections
        .iter()
        .flat_map(|(_, views)| views.weeks.iter().cloned())
        .collect();
    let weeks: Vec<WeekKey> = weeks.into_iter().collect();
    let prefectures: Vec<JSValue> = selections
        .iter()
        .map(|(prefecture, views)| {
            let dominant = dominant_lineages(&views.shares, &weeks);
            let lineages: Vec<Option<String>> =
                dominant.iter().map(|d| d.lineage.clone()).collect();
            let shares: Vec<f64> = dominant.iter().map(|d| d.share).collect();
            json!({
                "prefecture": prefecture,
                "dominant": lineages,
                "shares": shares,
            })
        })
        .collect();
    json!({
        "weeks": weeks_to_json(&weeks),
        "prefectures": prefectures,
    })
}

fn build_document(
    config: &DashConfig,
    selections: &[(String, SelectionViews)],
) -> DashResult<JSValue> {
    let wave = config.selection.wave()?;
    let display = config.rank_display();
    let selections_js: Vec<JSValue> = selections
        .iter()
        .map(|(prefecture, views)| selection_to_json(prefecture, wave, views, &display))
        .collect();
    Ok(json!({
        "config": config.output_config(),
        "selections": selections_js,
        "summary": summary_to_json(selections),
    }))
}

/// Reads the sources of the configuration and builds all the views.
///
/// Relative paths in the configuration are resolved from `root`.
pub fn build_dashboard(config: &DashConfig, root: &Path) -> DashResult<Dashboard> {
    config.validate()?;
    let store = load_store(config, root).map_err(|e| *e)?;
    let selections = run_selections(config, &store)?;
    let document = build_document(config, &selections)?;
    Ok(Dashboard {
        selections,
        document,
    })
}

/// The cells of a historical rank table that differ from the computed ranks.
///
/// Only the weeks and lineages known to both tables are compared. Returns
/// (lineage, week, expected, computed).
pub fn rank_mismatches(
    reference: &RankReference,
    computed: &RankTable,
) -> Vec<(String, WeekKey, Option<u32>, Option<u32>)> {
    reference
        .iter()
        .filter(|(lineage, week, _)| {
            computed.ranks.contains_key(week) && computed.lineages.contains(lineage)
        })
        .filter_map(|(lineage, week, expected)| {
            let got = computed.rank(week, lineage);
            if got != *expected {
                Some((lineage.clone(), *week, *expected, got))
            } else {
                None
            }
        })
        .collect()
}

/// Compares a historical rank table with the ranks of all the lineages of a
/// selection.
///
/// The selection is the prefecture named in the file name of the table
/// (`Rank_lineage_Tokyo_6wave.csv`), or else the first one.
pub fn check_rank_reference(
    path: &str,
    selections: &[(String, SelectionViews)],
) -> DashResult<()> {
    let reference = io_csv::read_rank_table(path).map_err(|e| *e)?;
    let prefecture: Option<&str> =
        io_common::rank_file_prefecture(path).and_then(|p| canonical_prefecture(&p));
    let selected = match prefecture {
        Some(p) => selections.iter().find(|(name, _)| name == p),
        None => selections.first(),
    };
    let (name, views) = match selected {
        Some(s) => s,
        None => whatever!("No selection matches the rank table {}", path),
    };
    let computed = build_ranks(&views.shares, None);
    let mismatches = rank_mismatches(&reference, &computed);
    for (lineage, week, expected, got) in mismatches.iter() {
        warn!(
            "check_rank_reference: {} {} {}: expected rank {:?}, computed {:?}",
            name, lineage, week, expected, got
        );
    }
    if !mismatches.is_empty() {
        return RankMismatchSnafu {
            count: mismatches.len(),
            path,
        }
        .fail();
    }
    info!(
        "check_rank_reference: {} cells of {} match the ranks of {}",
        reference.len(),
        path,
        name
    );
    Ok(())
}

/// Fails if the document differs from the reference document, after printing
/// the differences.
pub fn check_reference(path: &str, document: &JSValue) -> DashResult<()> {
    let reference = read_reference(path)?;
    let pretty_ref =
        serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu { path })?;
    let pretty = serde_json::to_string_pretty(document).context(ParsingJsonSnafu { path })?;
    if pretty_ref != pretty {
        warn!("Found differences with the reference {}", path);
        print_diff(pretty_ref.as_str(), pretty.as_str(), "\n");
        return ReferenceMismatchSnafu { path }.fail();
    }
    info!("check_reference: the output matches {}", path);
    Ok(())
}

fn write_output(document: &JSValue, out: Option<&str>) -> DashResult<()> {
    let pretty =
        serde_json::to_string_pretty(document).context(ParsingJsonSnafu { path: "output" })?;
    match out {
        None | Some("stdout") => println!("{}", pretty),
        Some(path) => {
            fs::write(path, pretty).context(WritingOutputSnafu { path })?;
            info!("write_output: written to {}", path);
        }
    }
    Ok(())
}

fn apply_args(config: &mut DashConfig, args: &Args) {
    if let Some(p) = &args.prefecture {
        config.selection.prefectures = Some(vec![p.clone()]);
    }
    if let Some(w) = &args.wave {
        config.selection.wave = JSValue::String(w.clone());
    }
    if let Some(k) = args.top_k {
        let mut views = config.views();
        views.top_k = Some(k);
        config.views = Some(views);
    }
    if args.skip_malformed {
        config.ingestion = Some(IngestionSettings {
            on_malformed_week: Some("skip".to_string()),
        });
    }
}

pub fn run_dashboard(args: &Args) -> DashResult<()> {
    let (mut config, root) = match (&args.config, &args.input) {
        (Some(_), Some(_)) => whatever!("--input and --config cannot be used together"),
        (Some(path), None) => {
            let config = read_config(path)?;
            let root = Path::new(path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            (config, root)
        }
        (None, Some(input)) => (
            config_for_input(input, args.input_type.as_deref()),
            PathBuf::new(),
        ),
        (None, None) => whatever!("One of --config or --input is required"),
    };
    apply_args(&mut config, args);
    debug!("run_dashboard: config: {:?}", config);

    let dashboard = build_dashboard(&config, &root)?;

    // Paths from the command line are relative to the working directory.
    let rank_reference: Option<PathBuf> = match &args.rank_reference {
        Some(p) => Some(PathBuf::from(p)),
        None => config.rank_reference.as_ref().map(|p| root.join(p)),
    };
    if let Some(p) = rank_reference {
        check_rank_reference(&p.display().to_string(), &dashboard.selections)?;
    }

    let out: Option<String> = match &args.out {
        Some(o) => Some(o.clone()),
        None => config
            .output_settings
            .output_path
            .as_ref()
            .map(|p| root.join(p).display().to_string()),
    };
    write_output(&dashboard.document, out.as_deref())?;

    if let Some(r) = &args.reference {
        check_reference(r, &dashboard.document)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_data(name: &str) -> String {
        format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    pub(crate) fn wide_source(file_path: &str) -> FileSource {
        FileSource {
            provider: "wide_csv".to_string(),
            file_path: file_path.to_string(),
            prefecture: None,
            wave: None,
            week_column: None,
            wave_column: None,
            value_scale: None,
            worksheet_name: None,
        }
    }

    fn tokyo_config(wave: &str) -> DashConfig {
        let mut config = config_for_input(&test_data("Tokyo.csv"), None);
        config.selection.wave = JSValue::from(wave);
        config
    }

    fn wk(s: &str) -> WeekKey {
        s.parse().unwrap()
    }

    #[test]
    fn single_wide_file() {
        let _ = env_logger::try_init();
        let dashboard = build_dashboard(&tokyo_config("6"), Path::new("")).unwrap();
        assert_eq!(dashboard.selections.len(), 1);
        let (name, views) = &dashboard.selections[0];
        assert_eq!(name, "Tokyo");
        let w1 = &views.shares[&wk("2022/1")];
        assert!((w1["BA.1"] - 2.0 / 3.0).abs() < 1e-9);
        assert!((w1["BA.2"] - 1.0 / 3.0).abs() < 1e-9);
        // The duplicate BA.2 columns add up.
        let w2 = &views.shares[&wk("2022/2")];
        assert!((w2["BA.2"] - 0.5).abs() < 1e-9);

        let js = &dashboard.document["selections"][0];
        assert_eq!(js["prefectureJa"], json!("東京都"));
        assert_eq!(js["wave"], json!("6"));
        assert_eq!(js["weeks"], json!(["2022/01", "2022/02", "2022/03"]));
        assert_eq!(js["lineages"], json!(["BA.1", "BA.2", "BA.5"]));
        let ba5 = &js["heatmap"]["values"][2];
        assert_eq!(ba5[0], json!(0.0));
        assert!((ba5[1].as_f64().unwrap() - 0.1).abs() < 1e-9);
        assert_eq!(ba5[2], json!(0.0));
        assert_eq!(js["ranks"]["series"][2]["lineage"], json!("BA.5"));
        assert_eq!(js["ranks"]["series"][2]["ranks"], json!([21, 3, 21]));
        assert_eq!(js["dominant"][2]["lineage"], JSValue::Null);
        assert_eq!(dashboard.document["config"]["topK"], json!(10));
    }

    #[test]
    fn combined_waves() {
        let dashboard = build_dashboard(&tokyo_config("6-8"), Path::new("")).unwrap();
        let js = &dashboard.document["selections"][0];
        assert_eq!(
            js["weeks"],
            json!(["2022/01", "2022/02", "2022/03", "2022/27"])
        );
        assert_eq!(js["dominant"][3]["lineage"], json!("BA.5"));
    }

    #[test]
    fn wave_without_data() {
        let res = build_dashboard(&tokyo_config("8"), Path::new(""));
        assert!(matches!(res, Err(DashError::NoData { .. })));
    }

    #[test]
    fn all_sources_of_a_configuration() {
        let path = test_data("config.json");
        let config = read_config(&path).unwrap();
        let root = Path::new(&path).parent().unwrap();
        let dashboard = build_dashboard(&config, root).unwrap();

        // Gunma only has data for the 8th wave.
        let names: Vec<&str> = dashboard
            .selections
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(names, vec!["Osaka", "Tokyo"]);

        let osaka = &dashboard.selections[0].1;
        let w1 = &osaka.shares[&wk("2022/1")];
        assert!((w1["BA.2"] - 0.5).abs() < 1e-9);
        assert!((w1["BA.1"] - 0.25).abs() < 1e-9);
        assert!((w1["BA.5"] - 0.25).abs() < 1e-9);

        let summary = &dashboard.document["summary"];
        assert_eq!(summary["weeks"], json!(["2022/01", "2022/02", "2022/03"]));
        assert_eq!(
            summary["prefectures"][0]["dominant"],
            json!(["BA.2", "BA.2", null])
        );
        assert_eq!(
            summary["prefectures"][1]["dominant"],
            json!(["BA.1", "BA.2", null])
        );

        let rank_table = test_data("Rank_lineage_Tokyo_6wave.csv");
        check_rank_reference(&rank_table, &dashboard.selections).unwrap();
    }

    #[test]
    fn listed_prefecture_without_data() {
        let path = test_data("config.json");
        let mut config = read_config(&path).unwrap();
        config.selection.prefectures = Some(vec!["Gumma".to_string()]);
        let root = Path::new(&path).parent().unwrap();
        let res = build_dashboard(&config, root);
        assert!(matches!(res, Err(DashError::NoData { .. })));
    }

    #[test]
    fn rank_differences() {
        let dashboard = build_dashboard(&tokyo_config("6"), Path::new("")).unwrap();
        let computed = build_ranks(&dashboard.selections[0].1.shares, None);
        let reference: RankReference = vec![
            ("BA.1".to_string(), wk("2022/1"), Some(1)),
            ("BA.1".to_string(), wk("2022/2"), Some(1)),
            ("BA.5".to_string(), wk("2022/1"), Some(3)),
            // Unknown lineage and week: not compared.
            ("XBB".to_string(), wk("2022/1"), Some(1)),
            ("BA.1".to_string(), wk("2022/30"), Some(1)),
        ];
        let res = rank_mismatches(&reference, &computed);
        assert_eq!(
            res,
            vec![
                ("BA.1".to_string(), wk("2022/2"), Some(1), Some(2)),
                ("BA.5".to_string(), wk("2022/1"), Some(3), None),
            ]
        );
    }

    #[test]
    fn malformed_weeks() {
        let mut config = config_for_input(&test_data("broken_week.csv"), None);
        config.sources[0].prefecture = Some("Tokyo".to_string());
        config.selection.wave = JSValue::from(6);
        let res = build_dashboard(&config, Path::new(""));
        assert!(matches!(res, Err(DashError::Pipeline { .. })));

        config.ingestion = Some(IngestionSettings {
            on_malformed_week: Some("skip".to_string()),
        });
        let dashboard = build_dashboard(&config, Path::new("")).unwrap();
        assert_eq!(dashboard.selections[0].1.weeks.len(), 2);
    }

    #[test]
    fn reference_documents() {
        let dashboard = build_dashboard(&tokyo_config("6"), Path::new("")).unwrap();
        let path = std::env::temp_dir().join("lineagedash_reference_documents.json");
        let path = path.display().to_string();
        write_output(&dashboard.document, Some(&path)).unwrap();
        check_reference(&path, &dashboard.document).unwrap();

        let mut other = dashboard.document.clone();
        other["config"]["title"] = json!("Osaka");
        assert!(matches!(
            check_reference(&path, &other),
            Err(DashError::ReferenceMismatch { .. })
        ));
    }

    #[test]
    fn command_line_run() {
        let out = std::env::temp_dir().join("lineagedash_command_line_run.json");
        let args = Args {
            input: Some(test_data("Tokyo.csv")),
            wave: Some("6".to_string()),
            top_k: Some(2),
            out: Some(out.display().to_string()),
            rank_reference: Some(test_data("Rank_lineage_Tokyo_6wave.csv")),
            ..Default::default()
        };
        run_dashboard(&args).unwrap();
        let written = read_reference(&out.display().to_string()).unwrap();
        assert_eq!(
            written["selections"][0]["ranks"]["lineages"],
            json!(["BA.1", "BA.2"])
        );
        assert_eq!(written["config"]["topK"], json!(2));
    }

    #[test]
    fn command_line_needs_an_input() {
        assert!(run_dashboard(&Args::default()).is_err());
        let args = Args {
            config: Some(test_data("config.json")),
            input: Some(test_data("Tokyo.csv")),
            ..Default::default()
        };
        assert!(run_dashboard(&args).is_err());
    }
}
