use crate::dash::io_common::ValueScale;
use crate::dash::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

pub const PROVIDERS: [&str; 3] = ["wide_csv", "long_csv", "wide_xlsx"];

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    pub title: String,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

/// The part of the configuration that is copied into the output document.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub title: String,
    pub wave: String,
    #[serde(rename = "topK")]
    pub top_k: Option<usize>,
    #[serde(rename = "heatmapTopK")]
    pub heatmap_top_k: Option<usize>,
    #[serde(rename = "overflowRank")]
    pub overflow_rank: Option<u32>,
    #[serde(rename = "maxDisplayedRank")]
    pub max_displayed_rank: Option<u32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub prefecture: Option<String>,
    pub wave: Option<u32>,
    #[serde(rename = "weekColumn")]
    pub week_column: Option<String>,
    #[serde(rename = "waveColumn")]
    pub wave_column: Option<String>,
    #[serde(rename = "valueScale")]
    pub value_scale: Option<String>,
    #[serde(rename = "worksheetName")]
    pub worksheet_name: Option<String>,
}

impl FileSource {
    pub fn value_scale(&self) -> DashResult<ValueScale> {
        match self.value_scale.as_deref() {
            None | Some("auto") => Ok(ValueScale::Auto),
            Some("percent") => Ok(ValueScale::Percent),
            Some("fraction") => Ok(ValueScale::Fraction),
            Some(x) => whatever!(
                "unknown valueScale {:?} for {}: expected percent, fraction or auto",
                x,
                self.file_path
            ),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// A number or a string: 6, "7", "6-8", "combined".
    pub wave: JSValue,
    pub prefectures: Option<Vec<String>>,
}

impl SelectionSettings {
    pub fn wave(&self) -> DashResult<WaveSelector> {
        let s = match &self.wave {
            JSValue::Number(n) => n.to_string(),
            JSValue::String(s) => s.clone(),
            x => whatever!("could not understand the wave {}", x),
        };
        s.parse::<WaveSelector>().context(PipelineSnafu {
            step: "the selection",
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ViewSettings {
    /// 0 ranks all the lineages.
    #[serde(rename = "topK")]
    pub top_k: Option<usize>,
    #[serde(rename = "heatmapTopK")]
    pub heatmap_top_k: Option<usize>,
    /// 0 leaves gaps for the absent ranks.
    #[serde(rename = "overflowRank")]
    pub overflow_rank: Option<u32>,
    /// 0 shows all the ranks.
    #[serde(rename = "maxDisplayedRank")]
    pub max_displayed_rank: Option<u32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestionSettings {
    #[serde(rename = "onMalformedWeek")]
    pub on_malformed_week: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DashConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub sources: Vec<FileSource>,
    pub selection: SelectionSettings,
    pub views: Option<ViewSettings>,
    pub ingestion: Option<IngestionSettings>,
    #[serde(rename = "rankReference")]
    pub rank_reference: Option<String>,
}

impl DashConfig {
    pub fn views(&self) -> ViewSettings {
        self.views.clone().unwrap_or_default()
    }

    pub fn policy(&self) -> DashResult<MalformedRowPolicy> {
        let ingestion = self.ingestion.clone().unwrap_or_default();
        match ingestion.on_malformed_week.as_deref() {
            None | Some("abort") => Ok(MalformedRowPolicy::Abort),
            Some("skip") => Ok(MalformedRowPolicy::Skip),
            Some(x) => whatever!("unknown onMalformedWeek {:?}: expected skip or abort", x),
        }
    }

    pub fn view_options(&self) -> ViewOptions {
        let views = self.views();
        let top_k = match views.top_k {
            None => ViewOptions::DEFAULT_OPTIONS.top_k,
            Some(0) => None,
            Some(k) => Some(k),
        };
        ViewOptions {
            top_k,
            heatmap_top_k: views.heatmap_top_k.filter(|k| *k > 0),
        }
    }

    /// How the ranks are written in the output. By default, ranks beyond 20
    /// and absent ranks are drawn at 21.
    pub fn rank_display(&self) -> RankDisplay {
        let views = self.views();
        let default = RankDisplay::OVERFLOW_21;
        RankDisplay {
            max_rank: match views.max_displayed_rank {
                None => default.max_rank,
                Some(0) => None,
                Some(m) => Some(m),
            },
            overflow_rank: match views.overflow_rank {
                None => default.overflow_rank,
                Some(0) => None,
                Some(o) => Some(o),
            },
        }
    }

    pub fn output_config(&self) -> OutputConfig {
        let views = self.views();
        let display = self.rank_display();
        OutputConfig {
            title: self.output_settings.title.clone(),
            wave: match self.selection.wave() {
                Ok(w) => w.to_string(),
                Err(_) => self.selection.wave.to_string(),
            },
            top_k: self.view_options().top_k,
            heatmap_top_k: views.heatmap_top_k,
            overflow_rank: display.overflow_rank,
            max_displayed_rank: display.max_rank,
        }
    }

    /// Checks everything that can be checked before reading any data.
    pub fn validate(&self) -> DashResult<()> {
        if self.sources.is_empty() {
            whatever!("no source in the configuration")
        }
        for cfs in self.sources.iter() {
            if !PROVIDERS.contains(&cfs.provider.as_str()) {
                return UnknownProviderSnafu {
                    provider: cfs.provider.as_str(),
                }
                .fail();
            }
            cfs.value_scale()?;
            if let Some(p) = &cfs.prefecture {
                canonical_prefecture(p).context(UnknownPrefectureSnafu { name: p })?;
            }
        }
        self.selection.wave()?;
        for p in self.selection.prefectures.iter().flatten() {
            canonical_prefecture(p).context(UnknownPrefectureSnafu { name: p })?;
        }
        self.policy()?;
        Ok(())
    }
}

pub fn read_config(path: &str) -> DashResult<DashConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: DashConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Reads a reference output document.
pub fn read_reference(path: &str) -> DashResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

/// A configuration for a single input file given on the command line.
pub fn config_for_input(input: &str, input_type: Option<&str>) -> DashConfig {
    let provider = match input_type {
        Some(t) => t.to_string(),
        None if input.to_lowercase().ends_with(".xlsx") => "wide_xlsx".to_string(),
        None => "wide_csv".to_string(),
    };
    DashConfig {
        output_settings: OutputSettings {
            title: io_common::simplify_file_name(input).unwrap_or_else(|| input.to_string()),
            output_path: None,
        },
        sources: vec![FileSource {
            provider,
            file_path: input.to_string(),
            prefecture: None,
            wave: None,
            week_column: None,
            wave_column: None,
            value_scale: None,
            worksheet_name: None,
        }],
        selection: SelectionSettings {
            wave: JSValue::String(WaveSelector::Combined.to_string()),
            prefectures: None,
        },
        views: None,
        ingestion: None,
        rank_reference: None,
    }
}
