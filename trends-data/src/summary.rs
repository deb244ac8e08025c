/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

//! Multi-ecoregion summary statistics: sums the estimated-change and
//! estimated-variance columns of every member ecoregion into the
//! summary grids, recomputes the derived statistic columns with the
//! pooled design, and stores the summary tables.

use crate::model::{AllChangeSource, GlgnKind, StudyArea};
use crate::names;
use crate::store::{Family, TableKey, TableStore, SUMMARY_ANALYSIS_PARAMS_TABLE};
use trends_common::error::{TrendsError, TrendsResult};
use trends_common::statistics::{
    student_t_values, summary_stats, Statistic, SummaryStatistic, NO_STUDENT_T,
};
use trends_common::structures::Grid;
use trends_common::utils::{years_from_intervals, TrendsLogger};

/// Adds the EstChange and EstVar columns of one member statistics grid
/// into the TotalChng and TotalVar columns of a summary grid.
fn add_into_summary(summary: &mut Grid<f64>, member: &Grid<f64>) {
    for row in 0..summary.rows {
        summary.increment(
            row,
            SummaryStatistic::TotalChng.index(),
            member.get_value(row, Statistic::EstChange.index()),
        );
        summary.increment(
            row,
            SummaryStatistic::TotalVar.index(),
            member.get_value(row, Statistic::EstVar.index()),
        );
    }
}

/// Computes and stores the summary statistics for every ecoregion in
/// the study area.
pub fn gen_summary_stats(
    sa: &mut StudyArea,
    store: &TableStore,
    logger: &TrendsLogger,
) -> TrendsResult<()> {
    logger.write("starting summary statistics");

    if sa.study.is_empty() {
        return Err(TrendsError::Domain(
            "no ecoregions loaded for summary statistics".to_string(),
        ));
    }

    for eco in sa.study.values() {
        sa.summary_samples += eco.design.sample_blocks;
        sa.total_blocks += eco.design.total_blocks;
    }
    logger.write(&format!(
        "Total sample blocks in summary statistics: {}",
        sa.summary_samples
    ));

    // Pooled Student-t values over the combined sample.
    sa.student_t = if sa.summary_samples > 1 {
        student_t_values(sa.summary_samples - 1)
    } else {
        [NO_STUDENT_T; 4]
    };
    logger.write(&format!(
        "Student T values for study area: {:.3}  {:.3}  {:.3}  {:.3}",
        sa.student_t[0], sa.student_t[1], sa.student_t[2], sa.student_t[3]
    ));

    for eco in sa.study.values() {
        sa.sum_est_pixels += eco.design.total_est_pixels;
    }
    logger.write(&format!(
        "Total estimated pixels in summary statistics: {}",
        sa.sum_est_pixels
    ));

    // The summary covers the intervals common to every member, and the
    // multichange and aggregate intervals likewise.
    sa.intervals = common_keys(sa, |eco| eco.eco_data.keys().cloned().collect());
    for interval in &sa.intervals {
        logger.write(&format!("summary interval: {}", interval));
    }
    sa.years = years_from_intervals(&sa.intervals);
    sa.multi_intervals = common_keys(sa, |eco| eco.eco_multi.keys().cloned().collect());
    sa.aggregate_intervals = common_keys(sa, |eco| eco.aggregate_keys.clone());

    sa.set_up_summary_arrays();

    // The summary resolution is the coarsest member resolution.
    sa.resolution = names::MIN_RESOLUTION.to_string();
    for eco in sa.study.values() {
        if eco.resolution != names::MIN_RESOLUTION {
            sa.resolution = names::MAX_RESOLUTION.to_string();
        }
    }

    add_all_summary_stats(sa);
    calc_all_summary_stats(sa)?;
    store_all_summary_stats(sa, store)?;

    store.update_parameters(
        SUMMARY_ANALYSIS_PARAMS_TABLE,
        sa.analysis_num,
        0,
        sa.summary_samples,
        sa.total_blocks,
        sa.sum_est_pixels,
        sa.student_t,
        &sa.resolution,
        "Summary",
    )?;
    Ok(())
}

fn common_keys(
    sa: &StudyArea,
    keys_of: impl Fn(&crate::model::EcoregionStats) -> Vec<String>,
) -> Vec<String> {
    let mut iter = sa.study.values();
    let mut common: Vec<String> = match iter.next() {
        Some(first) => keys_of(first),
        None => return vec![],
    };
    for eco in iter {
        let keys = keys_of(eco);
        common.retain(|k| keys.contains(k));
    }
    common.sort();
    common
}

/// Sums every member ecoregion's estimated change and variance into the
/// summary grids.
fn add_all_summary_stats(sa: &mut StudyArea) {
    let intervals = sa.intervals.clone();
    let years = sa.years.clone();
    let agg_keys = sa.aggregate_intervals.clone();
    let multi_intervals = sa.multi_intervals.clone();

    for eco in sa.study.values() {
        for interval in &intervals {
            if let Some(grid) = sa.summary.get_mut(interval) {
                add_into_summary(grid, &eco.eco_data[interval].stats);
            }
            if let Some(glgn) = sa.sum_glgn.get_mut(interval) {
                for kind in GlgnKind::ALL {
                    add_into_summary(glgn.get_mut(kind), &eco.eco_glgn[interval].get(kind).stats);
                }
            }
            if let Some(grid) = sa
                .sum_all_change
                .get_mut(interval)
                .and_then(|m| m.get_mut(&AllChangeSource::Conversion))
            {
                add_into_summary(grid, &eco.all_change[interval][&AllChangeSource::Conversion].stats);
            }
        }

        for year in &years {
            if let Some(grid) = sa.sum_comp.get_mut(year) {
                if let Some(pair) = eco.eco_comp.get(year) {
                    add_into_summary(grid, &pair.stats);
                }
            }
        }

        for key in &agg_keys {
            if let Some(grid) = sa
                .sum_all_change
                .get_mut(key)
                .and_then(|m| m.get_mut(&AllChangeSource::AddGross))
            {
                add_into_summary(grid, &eco.all_change[key][&AllChangeSource::AddGross].stats);
            }
            if let Some(grid) = sa.sum_aggregate.get_mut(key) {
                add_into_summary(grid, &eco.aggregate[key].stats);
            }
            if let Some(glgn) = sa.sum_agg_glgn.get_mut(key) {
                for kind in GlgnKind::ALL {
                    add_into_summary(glgn.get_mut(kind), &eco.agg_glgn[key].get(kind).stats);
                }
            }
        }

        for key in &multi_intervals {
            if let Some(grid) = sa.sum_multi.get_mut(key) {
                add_into_summary(grid, &eco.eco_multi[key].stats);
            }
            if let Some(grid) = sa
                .sum_all_change
                .get_mut(key)
                .and_then(|m| m.get_mut(&AllChangeSource::Multichange))
            {
                add_into_summary(grid, &eco.all_change[key][&AllChangeSource::Multichange].stats);
            }
        }
    }
}

/// Runs the summary estimator over every summed grid. The aggregate
/// views use their own pooled pixel total.
fn calc_all_summary_stats(sa: &mut StudyArea) -> TrendsResult<()> {
    let student_t = sa.student_t;
    let pixels = sa.sum_est_pixels;

    for interval in &sa.intervals {
        if let Some(grid) = sa.summary.get_mut(interval) {
            summary_stats(grid, student_t, pixels)?;
        }
        if let Some(glgn) = sa.sum_glgn.get_mut(interval) {
            for kind in GlgnKind::ALL {
                summary_stats(glgn.get_mut(kind), student_t, pixels)?;
            }
        }
        if let Some(grid) = sa
            .sum_all_change
            .get_mut(interval)
            .and_then(|m| m.get_mut(&AllChangeSource::Conversion))
        {
            summary_stats(grid, student_t, pixels)?;
        }
    }

    for year in &sa.years {
        if let Some(grid) = sa.sum_comp.get_mut(year) {
            summary_stats(grid, student_t, pixels)?;
        }
    }

    // Aggregated gross change uses the aggregate pixel count.
    if let Some(first_key) = sa.aggregate_intervals.first().cloned() {
        let agg = &sa.sum_aggregate[&first_key];
        let agg_pixel_count: f64 = (0..agg.rows)
            .map(|row| agg.get_value(row, SummaryStatistic::TotalChng.index()))
            .sum();

        let agg_keys = sa.aggregate_intervals.clone();
        for key in &agg_keys {
            if let Some(grid) = sa
                .sum_all_change
                .get_mut(key)
                .and_then(|m| m.get_mut(&AllChangeSource::AddGross))
            {
                summary_stats(grid, student_t, agg_pixel_count)?;
            }
            if let Some(grid) = sa.sum_aggregate.get_mut(key) {
                summary_stats(grid, student_t, agg_pixel_count)?;
            }
            if let Some(glgn) = sa.sum_agg_glgn.get_mut(key) {
                for kind in GlgnKind::ALL {
                    summary_stats(glgn.get_mut(kind), student_t, agg_pixel_count)?;
                }
            }
        }
    }

    for key in &sa.multi_intervals {
        if let Some(grid) = sa.sum_multi.get_mut(key) {
            summary_stats(grid, student_t, pixels)?;
        }
        if let Some(grid) = sa
            .sum_all_change
            .get_mut(key)
            .and_then(|m| m.get_mut(&AllChangeSource::Multichange))
        {
            summary_stats(grid, student_t, pixels)?;
        }
    }
    Ok(())
}

fn store_all_summary_stats(sa: &StudyArea, store: &TableStore) -> TrendsResult<()> {
    for (interval, grid) in &sa.summary {
        let key = TableKey::summary(sa.analysis_num, interval, &sa.resolution);
        store.write_stats(Family::Change, &key, grid)?;
    }
    for (interval, glgn) in &sa.sum_glgn {
        for kind in GlgnKind::ALL {
            let key =
                TableKey::summary(sa.analysis_num, interval, &sa.resolution).with_glgn(kind);
            store.write_stats(Family::Glgn, &key, glgn.get(kind))?;
        }
    }
    for (year, grid) in &sa.sum_comp {
        let key = TableKey::summary(sa.analysis_num, year, &sa.resolution);
        store.write_stats(Family::Comp, &key, grid)?;
    }
    for (interval, grid) in &sa.sum_multi {
        let key = TableKey::summary(sa.analysis_num, interval, &sa.resolution);
        store.write_stats(Family::Multichange, &key, grid)?;
    }
    for (interval, sources) in &sa.sum_all_change {
        for (source, grid) in sources {
            let key = TableKey::summary(sa.analysis_num, interval, &sa.resolution)
                .with_source(*source);
            store.write_stats(Family::AllChange, &key, grid)?;
        }
    }
    for (interval, grid) in &sa.sum_aggregate {
        let key = TableKey::summary(sa.analysis_num, interval, &sa.resolution)
            .with_source(AllChangeSource::AddGross);
        store.write_stats(Family::Aggregate, &key, grid)?;
    }
    for (interval, glgn) in &sa.sum_agg_glgn {
        for kind in GlgnKind::ALL {
            let key = TableKey::summary(sa.analysis_num, interval, &sa.resolution)
                .with_source(AllChangeSource::AddGross)
                .with_glgn(kind);
            store.write_stats(Family::AggGlgn, &key, glgn.get(kind))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{EcoregionStats, RunType};
    use crate::names::transition_id;
    use std::fs;
    use trends_common::utils::TrendsLogger;

    fn built_eco(eco_num: usize, count_a: i64, count_b: i64, logger: &TrendsLogger) -> EcoregionStats {
        let intervals = vec!["1973to1980".to_string(), "1980to1986".to_string()];
        let mut eco = EcoregionStats::new(
            eco_num,
            100,
            2,
            "60m",
            RunType::FullStratified,
            vec![eco_num * 10 + 1, eco_num * 10 + 2],
            vec![],
            &intervals,
            &[],
            &["1973to1986".to_string()],
            logger,
        )
        .unwrap();
        let id = transition_id(1, 6) - 1;
        eco.eco_data.get_mut("1973to1980").unwrap().data.set_value(id, 0, count_a);
        eco.eco_data.get_mut("1980to1986").unwrap().data.set_value(id, 1, count_b);
        eco.perform_statistics(logger).unwrap();
        eco
    }

    #[test]
    fn test_summary_rollup() {
        let dir = std::env::temp_dir().join("trends_summary_test");
        let _ = fs::remove_dir_all(&dir);
        let store = TableStore::open(&dir).unwrap();
        let logger = TrendsLogger::quiet();

        let eco1 = built_eco(1, 8, 2, &logger);
        let eco2 = built_eco(2, 4, 6, &logger);
        let id = transition_id(1, 6) - 1;
        let expected_total = eco1.eco_data["1973to1980"]
            .stats
            .get_value(id, Statistic::EstChange.index())
            + eco2.eco_data["1973to1980"]
                .stats
                .get_value(id, Statistic::EstChange.index());

        let mut sa = StudyArea::new("WEST", 3);
        sa.study.insert(1, eco1);
        sa.study.insert(2, eco2);
        gen_summary_stats(&mut sa, &store, &logger).unwrap();

        assert_eq!(sa.summary_samples, 4);
        assert_eq!(sa.intervals.len(), 2);
        let grid = &sa.summary["1973to1980"];
        let total = grid.get_value(id, SummaryStatistic::TotalChng.index());
        assert!((total - expected_total).abs() < 1e-9);
        // Derived columns were recomputed from the pooled design.
        let pct = grid.get_value(id, SummaryStatistic::ChgPercent.index());
        assert!((pct - total / sa.sum_est_pixels * 100.0).abs() < 1e-9);

        // The summary tables landed in the store.
        assert!(store.table_exists("SummaryChangeStats"));
        assert!(store.table_exists("SummaryGlgnStats"));
        assert!(store.table_exists(SUMMARY_ANALYSIS_PARAMS_TABLE));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_summary_requires_members() {
        let dir = std::env::temp_dir().join("trends_summary_empty_test");
        let _ = fs::remove_dir_all(&dir);
        let store = TableStore::open(&dir).unwrap();
        let logger = TrendsLogger::quiet();
        let mut sa = StudyArea::new("EMPTY", 9);
        assert!(gen_summary_stats(&mut sa, &store, &logger).is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
