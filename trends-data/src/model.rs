/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

use crate::names;
use std::collections::BTreeMap;
use trends_common::error::{TrendsError, TrendsResult};
use trends_common::statistics::{SamplingDesign, Statistic, SummaryStatistic};
use trends_common::structures::Grid;
use trends_common::utils::{years_from_intervals, TrendsLogger};

/// A data array and its statistics array, the unit every Trends view is
/// made of. The data grid has one column per sample block; the
/// statistics grid one column per statistic.
#[derive(Clone, Debug)]
pub struct TablePair {
    pub data: Grid<i64>,
    pub stats: Grid<f64>,
}

impl TablePair {
    pub fn new(rows: usize, sample_blocks: usize) -> TablePair {
        TablePair {
            data: Grid::new(rows, sample_blocks, 0),
            stats: Grid::new(rows, Statistic::COUNT, 0.0),
        }
    }
}

/// The four derived views grouped by a single land-cover class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum GlgnKind {
    Gain,
    Loss,
    Gross,
    Net,
}

impl GlgnKind {
    pub const ALL: [GlgnKind; 4] = [GlgnKind::Gain, GlgnKind::Loss, GlgnKind::Gross, GlgnKind::Net];

    pub fn name(self) -> &'static str {
        match self {
            GlgnKind::Gain => "gain",
            GlgnKind::Loss => "loss",
            GlgnKind::Gross => "gross",
            GlgnKind::Net => "net",
        }
    }

    pub fn from_name(name: &str) -> Option<GlgnKind> {
        GlgnKind::ALL.iter().copied().find(|k| k.name() == name)
    }
}

/// Holder for one table per gain/loss/gross/net kind.
#[derive(Clone, Debug)]
pub struct Glgn<T> {
    pub gain: T,
    pub loss: T,
    pub gross: T,
    pub net: T,
}

impl<T> Glgn<T> {
    pub fn from_fn(mut f: impl FnMut() -> T) -> Glgn<T> {
        Glgn {
            gain: f(),
            loss: f(),
            gross: f(),
            net: f(),
        }
    }

    pub fn get(&self, kind: GlgnKind) -> &T {
        match kind {
            GlgnKind::Gain => &self.gain,
            GlgnKind::Loss => &self.loss,
            GlgnKind::Gross => &self.gross,
            GlgnKind::Net => &self.net,
        }
    }

    pub fn get_mut(&mut self, kind: GlgnKind) -> &mut T {
        match kind {
            GlgnKind::Gain => &mut self.gain,
            GlgnKind::Loss => &mut self.loss,
            GlgnKind::Gross => &mut self.gross,
            GlgnKind::Net => &mut self.net,
        }
    }
}

/// Which data feeds an all-change row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AllChangeSource {
    Conversion,
    AddGross,
    Multichange,
}

impl AllChangeSource {
    pub const ALL: [AllChangeSource; 3] = [
        AllChangeSource::Conversion,
        AllChangeSource::AddGross,
        AllChangeSource::Multichange,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AllChangeSource::Conversion => "conversion",
            AllChangeSource::AddGross => "addgross",
            AllChangeSource::Multichange => "multichange",
        }
    }

    pub fn from_name(name: &str) -> Option<AllChangeSource> {
        AllChangeSource::ALL.iter().copied().find(|s| s.name() == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunType {
    FullStratified,
    PartialStratified,
}

impl RunType {
    pub fn name(self) -> &'static str {
        match self {
            RunType::FullStratified => "Full stratified",
            RunType::PartialStratified => "Partial stratified",
        }
    }

    pub fn from_name(name: &str) -> Option<RunType> {
        match name {
            "Full stratified" => Some(RunType::FullStratified),
            "Partial stratified" => Some(RunType::PartialStratified),
            _ => None,
        }
    }
}

/// Container for one ecoregion's statistics run.
///
/// Each view maps a change interval (or composition year) to its table
/// pair. The data arrays have one row per taxonomy entry and one column
/// per sample block; the column of a block comes from the sorted
/// block-number map. The sample block count n may be less than the
/// ecoregion's full design when only part of the ecoregion is selected,
/// and likewise for the total block count N.
pub struct EcoregionStats {
    pub eco_num: usize,
    pub resolution: String,
    pub run_type: RunType,
    pub strat_blocks: Vec<usize>,
    pub split_blocks: Vec<usize>,
    /// Sample block number -> data array column.
    pub column: BTreeMap<usize, usize>,
    pub design: SamplingDesign,
    /// Change interval -> conversion arrays (121 rows).
    pub eco_data: BTreeMap<String, TablePair>,
    /// Change interval -> gain/loss/gross/net arrays (11 rows each).
    pub eco_glgn: BTreeMap<String, Glgn<TablePair>>,
    /// Composition year -> land-cover arrays (11 rows).
    pub eco_comp: BTreeMap<String, TablePair>,
    /// Multichange interval -> footprint arrays (30 rows).
    pub eco_multi: BTreeMap<String, TablePair>,
    /// Rows used by each multichange interval, no-change row included.
    pub multi_changes: BTreeMap<String, usize>,
    /// Interval -> per-source all-change arrays (1 row).
    pub all_change: BTreeMap<String, BTreeMap<AllChangeSource, TablePair>>,
    /// Aggregate interval -> summed gross conversion arrays (121 rows).
    pub aggregate: BTreeMap<String, TablePair>,
    pub agg_glgn: BTreeMap<String, Glgn<TablePair>>,
    /// Intervals for which aggregate views are produced.
    pub aggregate_keys: Vec<String>,
}

impl EcoregionStats {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        eco_num: usize,
        total_blocks: usize,
        sample_blocks: usize,
        resolution: &str,
        run_type: RunType,
        strat_blocks: Vec<usize>,
        split_blocks: Vec<usize>,
        change_intervals: &[String],
        multi_intervals: &[String],
        aggregate_intervals: &[String],
        logger: &TrendsLogger,
    ) -> TrendsResult<EcoregionStats> {
        let mut all_blocks: Vec<usize> = strat_blocks
            .iter()
            .chain(split_blocks.iter())
            .copied()
            .collect();
        all_blocks.sort_unstable();
        all_blocks.dedup();

        if all_blocks.is_empty() {
            return Err(TrendsError::Domain(format!(
                "no sample blocks found for ecoregion {}",
                eco_num
            )));
        }
        if all_blocks.len() != sample_blocks {
            return Err(TrendsError::Domain(format!(
                "the number of sample blocks ({}) in {} does not match the actual count of blocks ({})",
                sample_blocks,
                eco_num,
                all_blocks.len()
            )));
        }

        let column: BTreeMap<usize, usize> = all_blocks
            .iter()
            .enumerate()
            .map(|(index, &block)| (block, index))
            .collect();

        let design = SamplingDesign::new(total_blocks, sample_blocks)?;
        logger.write(&format!(
            "Student T values for ecoregion {}: {:.3}  {:.3}  {:.3}  {:.3}",
            eco_num, design.student_t[0], design.student_t[1], design.student_t[2], design.student_t[3]
        ));

        let mut eco_data = BTreeMap::new();
        for interval in change_intervals {
            eco_data.insert(
                interval.clone(),
                TablePair::new(names::NUM_CONVERSIONS, sample_blocks),
            );
        }

        let mut eco_comp = BTreeMap::new();
        for year in years_from_intervals(change_intervals) {
            eco_comp.insert(year, TablePair::new(names::NUM_LC_TYPES, sample_blocks));
        }

        let mut eco_multi = BTreeMap::new();
        let mut multi_changes = BTreeMap::new();
        for interval in multi_intervals {
            eco_multi.insert(
                interval.clone(),
                TablePair::new(names::NUM_MULTI, sample_blocks),
            );
            multi_changes.insert(
                interval.clone(),
                names::multi_changes(interval, change_intervals)?,
            );
        }

        Ok(EcoregionStats {
            eco_num,
            resolution: resolution.to_string(),
            run_type,
            strat_blocks,
            split_blocks,
            column,
            design,
            eco_data,
            eco_glgn: BTreeMap::new(),
            eco_comp,
            eco_multi,
            multi_changes,
            all_change: BTreeMap::new(),
            aggregate: BTreeMap::new(),
            agg_glgn: BTreeMap::new(),
            aggregate_keys: aggregate_intervals.to_vec(),
        })
    }

    /// Sorted block numbers, matching the data array column order.
    pub fn sorted_blocks(&self) -> Vec<usize> {
        self.column.keys().copied().collect()
    }

    /// The earliest loaded change interval. Its conversion grid supplies
    /// the ecoregion pixel total used by the percent columns.
    pub fn first_interval(&self) -> Option<String> {
        self.eco_data.keys().next().cloned()
    }

    /// Creates the arrays for the views derived from the conversion
    /// data. Called once the set of loaded intervals is known.
    pub fn set_up_arrays(&mut self) {
        let n = self.design.sample_blocks;

        for interval in self.eco_data.keys() {
            self.eco_glgn.insert(
                interval.clone(),
                Glgn::from_fn(|| TablePair::new(names::NUM_LC_TYPES, n)),
            );
            self.all_change
                .entry(interval.clone())
                .or_default()
                .insert(AllChangeSource::Conversion, TablePair::new(1, n));
        }

        for key in &self.aggregate_keys {
            self.all_change
                .entry(key.clone())
                .or_default()
                .insert(AllChangeSource::AddGross, TablePair::new(1, n));
            self.aggregate
                .insert(key.clone(), TablePair::new(names::NUM_CONVERSIONS, n));
            self.agg_glgn.insert(
                key.clone(),
                Glgn::from_fn(|| TablePair::new(names::NUM_LC_TYPES, n)),
            );
        }

        for interval in self.eco_multi.keys() {
            self.all_change
                .entry(interval.clone())
                .or_default()
                .insert(AllChangeSource::Multichange, TablePair::new(1, n));
        }
    }

    /// Drops the structures for intervals that produced no data, and
    /// narrows the composition years and aggregate keys accordingly.
    pub fn drop_empty_intervals(&mut self, empty: &[String], empty_multi: &[String]) {
        for interval in empty {
            self.eco_data.remove(interval);
        }
        for interval in empty_multi {
            self.eco_multi.remove(interval);
            self.multi_changes.remove(interval);
        }

        let remaining: Vec<String> = self.eco_data.keys().cloned().collect();
        let current_years = years_from_intervals(&remaining);
        self.eco_comp.retain(|year, _| current_years.contains(year));

        let comp_years: Vec<String> = self.eco_comp.keys().cloned().collect();
        self.aggregate_keys.retain(|interval| {
            let start = interval[..4].to_string();
            let end = interval[6..].to_string();
            comp_years.contains(&start) && comp_years.contains(&end)
        });
    }
}

/// Container for a multi-ecoregion summary. Summaries carry only
/// statistics grids; the first two columns of each are summed from the
/// member ecoregions and the rest derived with the pooled design.
pub struct StudyArea {
    pub analysis_name: String,
    pub analysis_num: usize,
    pub resolution: String,
    pub intervals: Vec<String>,
    pub multi_intervals: Vec<String>,
    pub years: Vec<String>,
    pub aggregate_intervals: Vec<String>,
    pub sum_est_pixels: f64,
    pub summary_samples: usize,
    pub total_blocks: usize,
    pub student_t: [f64; 4],
    pub study: BTreeMap<usize, EcoregionStats>,
    pub summary: BTreeMap<String, Grid<f64>>,
    pub sum_glgn: BTreeMap<String, Glgn<Grid<f64>>>,
    pub sum_comp: BTreeMap<String, Grid<f64>>,
    pub sum_multi: BTreeMap<String, Grid<f64>>,
    pub sum_all_change: BTreeMap<String, BTreeMap<AllChangeSource, Grid<f64>>>,
    pub sum_aggregate: BTreeMap<String, Grid<f64>>,
    pub sum_agg_glgn: BTreeMap<String, Glgn<Grid<f64>>>,
}

fn summary_grid(rows: usize) -> Grid<f64> {
    Grid::new(rows, SummaryStatistic::COUNT, 0.0)
}

impl StudyArea {
    pub fn new(analysis_name: &str, analysis_num: usize) -> StudyArea {
        StudyArea {
            analysis_name: analysis_name.to_string(),
            analysis_num,
            resolution: String::new(),
            intervals: vec![],
            multi_intervals: vec![],
            years: vec![],
            aggregate_intervals: vec![],
            sum_est_pixels: 0.0,
            summary_samples: 0,
            total_blocks: 0,
            student_t: [0.0; 4],
            study: BTreeMap::new(),
            summary: BTreeMap::new(),
            sum_glgn: BTreeMap::new(),
            sum_comp: BTreeMap::new(),
            sum_multi: BTreeMap::new(),
            sum_all_change: BTreeMap::new(),
            sum_aggregate: BTreeMap::new(),
            sum_agg_glgn: BTreeMap::new(),
        }
    }

    /// Creates and initializes the summary statistics grids once the
    /// common intervals and years are known.
    pub fn set_up_summary_arrays(&mut self) {
        for interval in &self.intervals {
            self.summary
                .insert(interval.clone(), summary_grid(names::NUM_CONVERSIONS));
            self.sum_glgn.insert(
                interval.clone(),
                Glgn::from_fn(|| summary_grid(names::NUM_LC_TYPES)),
            );
            self.sum_all_change
                .entry(interval.clone())
                .or_default()
                .insert(AllChangeSource::Conversion, summary_grid(1));
        }

        for year in &self.years {
            self.sum_comp.insert(year.clone(), summary_grid(names::NUM_LC_TYPES));
        }

        for key in &self.aggregate_intervals {
            self.sum_all_change
                .entry(key.clone())
                .or_default()
                .insert(AllChangeSource::AddGross, summary_grid(1));
            self.sum_aggregate
                .insert(key.clone(), summary_grid(names::NUM_CONVERSIONS));
            self.sum_agg_glgn.insert(
                key.clone(),
                Glgn::from_fn(|| summary_grid(names::NUM_LC_TYPES)),
            );
        }

        for interval in &self.multi_intervals {
            self.sum_multi
                .insert(interval.clone(), summary_grid(names::NUM_MULTI));
            self.sum_all_change
                .entry(interval.clone())
                .or_default()
                .insert(AllChangeSource::Multichange, summary_grid(1));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use trends_common::utils::TrendsLogger;

    fn intervals() -> Vec<String> {
        vec![
            "1973to1980".to_string(),
            "1980to1986".to_string(),
            "1986to1992".to_string(),
            "1992to2000".to_string(),
        ]
    }

    #[test]
    fn test_ecoregion_setup() {
        let logger = TrendsLogger::quiet();
        let eco = EcoregionStats::new(
            7,
            458,
            12,
            "60m",
            RunType::FullStratified,
            vec![16, 18, 32, 35, 57, 61, 67, 82, 99, 126, 128, 133],
            vec![],
            &intervals(),
            &["1973to2000".to_string()],
            &["1973to2000".to_string()],
            &logger,
        )
        .unwrap();
        assert_eq!(eco.eco_data.len(), 4);
        assert_eq!(eco.eco_comp.len(), 5);
        assert_eq!(eco.eco_multi.len(), 1);
        assert_eq!(eco.multi_changes["1973to2000"], 5);
        assert_eq!(eco.column[&16], 0);
        assert_eq!(eco.column[&133], 11);
        assert_eq!(eco.design.degrees_of_freedom(), 11);
    }

    #[test]
    fn test_block_count_mismatch() {
        let logger = TrendsLogger::quiet();
        let result = EcoregionStats::new(
            7,
            458,
            3,
            "60m",
            RunType::FullStratified,
            vec![16, 18],
            vec![],
            &intervals(),
            &[],
            &[],
            &logger,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_set_up_arrays() {
        let logger = TrendsLogger::quiet();
        let mut eco = EcoregionStats::new(
            7,
            100,
            4,
            "60m",
            RunType::FullStratified,
            vec![1, 2, 3, 4],
            vec![],
            &intervals(),
            &["1973to2000".to_string()],
            &["1973to2000".to_string()],
            &logger,
        )
        .unwrap();
        eco.set_up_arrays();
        assert_eq!(eco.eco_glgn.len(), 4);
        assert_eq!(eco.aggregate.len(), 1);
        assert!(eco.all_change["1973to1980"].contains_key(&AllChangeSource::Conversion));
        assert!(eco.all_change["1973to2000"].contains_key(&AllChangeSource::AddGross));
        assert!(eco.all_change["1973to2000"].contains_key(&AllChangeSource::Multichange));
        let glgn = &eco.eco_glgn["1973to1980"];
        assert_eq!(glgn.gain.data.rows, names::NUM_LC_TYPES);
        assert_eq!(glgn.gain.data.columns, 4);
    }

    #[test]
    fn test_drop_empty_intervals() {
        let logger = TrendsLogger::quiet();
        let mut eco = EcoregionStats::new(
            7,
            100,
            4,
            "60m",
            RunType::FullStratified,
            vec![1, 2, 3, 4],
            vec![],
            &intervals(),
            &[],
            &["1973to2000".to_string()],
            &logger,
        )
        .unwrap();
        eco.drop_empty_intervals(&["1992to2000".to_string()], &[]);
        assert_eq!(eco.eco_data.len(), 3);
        // 2000 disappears from the composition years, so the 1973to2000
        // aggregate is no longer possible.
        assert!(!eco.eco_comp.contains_key("2000"));
        assert!(eco.aggregate_keys.is_empty());
    }
}
