mod aggregate;
pub mod builder;
mod config;
pub mod manual;
mod matrix;
mod rank;
mod store;
mod summary;
mod week;

use log::info;

pub use crate::aggregate::{aggregate, observed_weeks, ratio_series, share_entries, ShareTable};
pub use crate::config::*;
pub use crate::matrix::{build_matrix, HeatMatrix};
pub use crate::rank::{
    build_ranks, lineage_frequencies, rank_lineages, select_top_lineages, RankTable,
};
pub use crate::store::{MemoryStore, RecordStore};
pub use crate::summary::dominant_lineages;
pub use crate::week::{normalize, WeekKey};

/// All the views of one (prefecture, wave) selection.
#[derive(PartialEq, Debug, Clone)]
pub struct SelectionViews {
    /// Every week observed in the selection, in order.
    pub weeks: Vec<WeekKey>,
    /// Every lineage with a share, most frequent first.
    pub lineages: Vec<String>,
    pub shares: ShareTable,
    pub ratio: Vec<LineageSeries>,
    pub heatmap: HeatMatrix,
    pub ranks: RankTable,
    pub dominant: Vec<DominantLineage>,
}

/// Runs the full pipeline on the observations of a selection.
///
/// Arguments:
/// * `observations` the observations of one prefecture and wave selection
/// * `options` the restrictions applied to the rank chart and the heatmap
///
/// Fails with [`LineageErrors::EmptyInput`] if there is no observation.
pub fn build_views(
    observations: &[Observation],
    options: &ViewOptions,
) -> Result<SelectionViews, LineageErrors> {
    info!(
        "build_views: processing {} observations, options: {:?}",
        observations.len(),
        options
    );
    let shares = aggregate(observations)?;
    let weeks = observed_weeks(observations);
    let lineages = select_top_lineages(&shares, usize::MAX);

    let heatmap_lineages: Vec<String> = match options.heatmap_top_k {
        Some(k) => lineages.iter().take(k).cloned().collect(),
        None => lineages.clone(),
    };
    let heatmap = build_matrix(&shares, &weeks, &heatmap_lineages);
    let ranks = build_ranks(&shares, options.top_k);
    let ratio = ratio_series(&shares, &lineages);
    let dominant = dominant_lineages(&shares, &weeks);

    info!(
        "build_views: {} weeks ({} with shares), {} lineages, {} ranked",
        weeks.len(),
        shares.len(),
        lineages.len(),
        ranks.lineages.len()
    );
    Ok(SelectionViews {
        weeks,
        lineages,
        shares,
        ratio,
        heatmap,
        ranks,
        dominant,
    })
}

/// Queries the store for one selection and builds its views.
pub fn run_selection(
    store: &dyn RecordStore,
    wave: WaveSelector,
    prefecture: Option<&str>,
    options: &ViewOptions,
) -> Result<SelectionViews, LineageErrors> {
    let observations = store.query(&wave.waves(), prefecture);
    info!(
        "run_selection: wave {} prefecture {:?}: {} observations",
        wave,
        prefecture,
        observations.len()
    );
    build_views(&observations, options)
}
