// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::week::WeekKey;

/// All the encodings under which a week may arrive from the upstream sources.
///
/// Every variant is turned into a [`WeekKey`] by [`crate::week::normalize`].
#[derive(PartialEq, Eq, Debug, Clone, Hash)]
pub enum RawWeek {
    /// Free text: a `YYYY/W` string, an ISO date (`2022-01-07`,
    /// `2022-01-07T00:00:00Z`), or a string of digits holding a timestamp.
    Text(String),
    /// A calendar date, already parsed.
    Date(NaiveDate),
    /// Milliseconds since the Unix epoch (UTC).
    Timestamp(i64),
}

impl From<&str> for RawWeek {
    fn from(s: &str) -> RawWeek {
        RawWeek::Text(s.to_string())
    }
}

impl From<NaiveDate> for RawWeek {
    fn from(d: NaiveDate) -> RawWeek {
        RawWeek::Date(d)
    }
}

impl From<i64> for RawWeek {
    fn from(ms: i64) -> RawWeek {
        RawWeek::Timestamp(ms)
    }
}

impl Display for RawWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawWeek::Text(s) => write!(f, "{}", s),
            RawWeek::Date(d) => write!(f, "{}", d),
            RawWeek::Timestamp(ms) => write!(f, "{}", ms),
        }
    }
}

/// A row as produced by the readers, before any validation.
#[derive(PartialEq, Debug, Clone)]
pub struct RawObservation {
    pub prefecture: String,
    pub lineage: String,
    pub week: RawWeek,
    pub wave: u32,
    pub value: f64,
}

/// One validated observation.
///
/// `value` is the share of sequenced samples for this lineage, in the
/// prefecture and week. It is never negative. Several observations may exist
/// for the same (prefecture, lineage, week): they add up.
#[derive(PartialEq, Debug, Clone)]
pub struct Observation {
    pub prefecture: String,
    pub lineage: String,
    pub week: WeekKey,
    pub wave: u32,
    pub value: f64,
}

// ******** Output data structures *********

/// The share of a lineage for a given week. Shares of one week sum to 1.
#[derive(PartialEq, Debug, Clone)]
pub struct LineageShare {
    pub week: WeekKey,
    pub lineage: String,
    pub share: f64,
}

/// The rank of a lineage in a week.
///
/// `rank` is `None` when the lineage was not observed that week. It is never 0.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RankEntry {
    pub week: WeekKey,
    pub lineage: String,
    pub rank: Option<u32>,
}

/// One cell of the heatmap. Absent combinations are present with a value of 0.
#[derive(PartialEq, Debug, Clone)]
pub struct HeatCell {
    pub lineage: String,
    pub week: WeekKey,
    pub value: f64,
}

/// The lineage with the highest share in a week.
#[derive(PartialEq, Debug, Clone)]
pub struct DominantLineage {
    pub week: WeekKey,
    /// None if nothing was observed this week.
    pub lineage: Option<String>,
    pub share: f64,
}

/// The values of a single lineage over time, for stacked-area charts.
/// Only the weeks in which the lineage has a share are listed.
#[derive(PartialEq, Debug, Clone)]
pub struct LineageSeries {
    pub lineage: String,
    pub weeks: Vec<WeekKey>,
    pub shares: Vec<f64>,
}

/// Errors that prevent the pipeline from completing successfully.
#[derive(PartialEq, Debug, Clone)]
pub enum LineageErrors {
    /// The raw week could not be understood. Carries the original input.
    MalformedDate { input: String },
    /// The selection did not contain any observation.
    EmptyInput,
    /// The wave selector is not one of 6, 7, 8 or the combined waves.
    InvalidWave { input: String },
    /// Negative or non-finite value for an observation.
    InvalidValue { lineage: String, value: f64 },
}

impl Error for LineageErrors {}

impl Display for LineageErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineageErrors::MalformedDate { input } => {
                write!(f, "could not understand the week or date {:?}", input)
            }
            LineageErrors::EmptyInput => write!(f, "no observation for this selection"),
            LineageErrors::InvalidWave { input } => write!(
                f,
                "invalid wave {:?}: expected 6, 7, 8 or 6-8 for the combined waves",
                input
            ),
            LineageErrors::InvalidValue { lineage, value } => {
                write!(f, "invalid value {} for lineage {}", value, lineage)
            }
        }
    }
}

// ********* Configuration **********

/// Which epidemic wave(s) a query covers.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum WaveSelector {
    Single(u32),
    /// Waves 6, 7 and 8 taken together.
    Combined,
}

impl WaveSelector {
    pub const SUPPORTED_WAVES: [u32; 3] = [6, 7, 8];

    pub fn waves(&self) -> Vec<u32> {
        match self {
            WaveSelector::Single(w) => vec![*w],
            WaveSelector::Combined => WaveSelector::SUPPORTED_WAVES.to_vec(),
        }
    }

    pub fn contains(&self, wave: u32) -> bool {
        self.waves().contains(&wave)
    }
}

impl FromStr for WaveSelector {
    type Err = LineageErrors;

    fn from_str(s: &str) -> Result<WaveSelector, LineageErrors> {
        match s.trim() {
            "6-8" | "combined" | "all" => Ok(WaveSelector::Combined),
            x => match x.parse::<u32>() {
                Ok(w) if WaveSelector::SUPPORTED_WAVES.contains(&w) => Ok(WaveSelector::Single(w)),
                _ => Err(LineageErrors::InvalidWave {
                    input: s.to_string(),
                }),
            },
        }
    }
}

impl Display for WaveSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaveSelector::Single(w) => write!(f, "{}", w),
            WaveSelector::Combined => write!(f, "6-8"),
        }
    }
}

/// What to do with a row whose week cannot be normalized.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum MalformedRowPolicy {
    /// Stop the whole batch with the error.
    Abort,
    /// Drop the row, log it and keep going.
    Skip,
}

/// How the rank of a lineage is shown in a chart.
///
/// This is a presentation choice: the core ranks stay `Option<u32>`.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct RankDisplay {
    /// Ranks strictly above this value are shown as absent.
    pub max_rank: Option<u32>,
    /// If set, absent ranks are shown with this value instead of a gap.
    pub overflow_rank: Option<u32>,
}

impl RankDisplay {
    /// Absent ranks are gaps in the line.
    pub const GAPS: RankDisplay = RankDisplay {
        max_rank: None,
        overflow_rank: None,
    };

    /// Ranks beyond 20 and absent ranks are all drawn at 21.
    pub const OVERFLOW_21: RankDisplay = RankDisplay {
        max_rank: Some(20),
        overflow_rank: Some(21),
    };

    pub fn display(&self, rank: Option<u32>) -> Option<u32> {
        match (rank, self.max_rank) {
            (Some(r), Some(m)) if r > m => self.overflow_rank,
            (Some(r), _) => Some(r),
            (None, _) => self.overflow_rank,
        }
    }
}

/// Options for building all the views of a selection.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ViewOptions {
    /// Restrict the rank chart to the K most frequent lineages. None ranks all of them.
    pub top_k: Option<usize>,
    /// Restrict the heatmap rows to the K most frequent lineages. None keeps all of them.
    pub heatmap_top_k: Option<usize>,
}

impl ViewOptions {
    pub const DEFAULT_OPTIONS: ViewOptions = ViewOptions {
        top_k: Some(10),
        heatmap_top_k: None,
    };
}
