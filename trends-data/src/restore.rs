/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

//! Rebuilds ecoregion and summary containers from their stored tables,
//! for summary rollups and report generation runs that start from a
//! completed analysis rather than from the change images.

use crate::model::{AllChangeSource, EcoregionStats, GlgnKind, RunType, StudyArea};
use crate::names;
use crate::store::{
    Family, TableStore, ECOREGIONS_TABLE, SUMMARY_ANALYSIS_PARAMS_TABLE,
    SUMMARY_ECOREGIONS_TABLE,
};
use std::collections::BTreeMap;
use trends_common::error::{TrendsError, TrendsResult};
use trends_common::statistics::{Statistic, SummaryStatistic};
use trends_common::structures::Grid;
use trends_common::utils::TrendsLogger;

type Row = BTreeMap<String, String>;

fn parse_field<T: std::str::FromStr>(row: &Row, field: &str) -> TrendsResult<T> {
    row.get(field)
        .and_then(|v| v.parse::<T>().ok())
        .ok_or_else(|| TrendsError::Table(format!("bad or missing field {}", field)))
}

fn eco_filters(analysis_num: usize, eco_num: usize) -> Vec<(String, String)> {
    vec![
        ("AnalysisNum".to_string(), analysis_num.to_string()),
        ("EcoLevel3ID".to_string(), eco_num.to_string()),
    ]
}

/// Reads the stored analysis parameters of an ecoregion, looking in the
/// full-stratified table first and the summary table second.
fn read_eco_parameters(
    store: &TableStore,
    analysis_num: usize,
    eco_num: usize,
) -> TrendsResult<Option<Row>> {
    for table in [ECOREGIONS_TABLE, SUMMARY_ECOREGIONS_TABLE] {
        let rows = store.select_rows(table, &eco_filters(analysis_num, eco_num))?;
        if let Some(row) = rows.into_iter().next() {
            return Ok(Some(row));
        }
    }
    Ok(None)
}

fn fill_data_grid(
    rows: &[Row],
    grid: &mut Grid<i64>,
    labels: &[String],
    column: &BTreeMap<usize, usize>,
) -> TrendsResult<()> {
    for row in rows {
        let block: usize = parse_field(row, "BlkLabel")?;
        let col = match column.get(&block) {
            Some(c) => *c,
            None => continue,
        };
        for (ptr, label) in labels.iter().enumerate() {
            grid.set_value(ptr, col, parse_field(row, label)?);
        }
    }
    Ok(())
}

fn fill_stats_grid(rows: &[Row], grid: &mut Grid<f64>, labels: &[String], summary: bool) -> TrendsResult<()> {
    for row in rows {
        let name = row
            .get("Statistic")
            .ok_or_else(|| TrendsError::Table("statistics row without Statistic".to_string()))?;
        let index = if summary {
            SummaryStatistic::from_name(name).map(|s| s.index())
        } else {
            Statistic::from_name(name).map(|s| s.index())
        };
        let index = match index {
            Some(i) => i,
            None => continue,
        };
        for (ptr, label) in labels.iter().enumerate() {
            grid.set_value(ptr, index, parse_field(row, label)?);
        }
    }
    Ok(())
}

/// Distinct values of one field over a set of rows, sorted.
fn distinct(rows: &[Row], field: &str) -> Vec<String> {
    let mut values: Vec<String> = rows.iter().filter_map(|r| r.get(field).cloned()).collect();
    values.sort();
    values.dedup();
    values
}

/// Rebuilds an ecoregion's containers from the store. Returns `None`
/// when the store holds no change data for the ecoregion.
pub fn load_ecoregion(
    store: &TableStore,
    analysis_num: usize,
    eco_num: usize,
    logger: &TrendsLogger,
) -> TrendsResult<Option<EcoregionStats>> {
    let prefix = if analysis_num == names::TRENDS_ANALYSIS_NUM {
        "Trends"
    } else {
        "Custom"
    };

    let data_rows = store.select_rows(
        &format!("{}ChangeData", prefix),
        &eco_filters(analysis_num, eco_num),
    )?;
    if data_rows.is_empty() {
        return Ok(None);
    }

    let params = read_eco_parameters(store, analysis_num, eco_num)?.ok_or_else(|| {
        TrendsError::Domain(format!(
            "no stored analysis parameters for ecoregion {}",
            eco_num
        ))
    })?;
    let total_blocks: usize = parse_field(&params, "TotalBlocks")?;
    let sample_blocks: usize = parse_field(&params, "SampleBlocks")?;
    let total_pixels: f64 = parse_field(&params, "TotalPixels")?;
    let resolution: String = parse_field(&params, "Resolution")?;
    let run_type = params
        .get("RunType")
        .and_then(|v| RunType::from_name(v))
        .unwrap_or(RunType::FullStratified);

    let intervals = distinct(&data_rows, "ChangePeriod");
    let mut blocks: Vec<usize> = data_rows
        .iter()
        .filter_map(|r| r.get("BlkLabel").and_then(|v| v.parse().ok()))
        .collect();
    blocks.sort_unstable();
    blocks.dedup();

    let multi_rows = store.select_rows(
        &format!("{}MultichangeData", prefix),
        &eco_filters(analysis_num, eco_num),
    )?;
    let multi_intervals = distinct(&multi_rows, "ChangePeriod");

    let aggregate_rows = store.select_rows(
        &format!("{}AggregateData", prefix),
        &eco_filters(analysis_num, eco_num),
    )?;
    let aggregate_intervals = distinct(&aggregate_rows, "ChangePeriod");

    let mut eco = EcoregionStats::new(
        eco_num,
        total_blocks,
        sample_blocks,
        &resolution,
        run_type,
        blocks,
        vec![],
        &intervals,
        &multi_intervals,
        &aggregate_intervals,
        logger,
    )?;
    eco.design.total_est_pixels = total_pixels;
    eco.set_up_arrays();

    let ct_labels = Family::Change.value_labels();
    let lc_labels = Family::Glgn.value_labels();
    let mc_labels = Family::Multichange.value_labels();
    let total_labels = Family::AllChange.value_labels();

    for interval in &intervals {
        let filters = {
            let mut f = eco_filters(analysis_num, eco_num);
            f.push(("ChangePeriod".to_string(), interval.clone()));
            f
        };
        let rows = store.select_rows(&format!("{}ChangeData", prefix), &filters)?;
        let pair = eco.eco_data.get_mut(interval).expect("interval missing");
        fill_data_grid(&rows, &mut pair.data, &ct_labels, &eco.column)?;
        let rows = store.select_rows(&format!("{}ChangeStats", prefix), &filters)?;
        fill_stats_grid(&rows, &mut pair.stats, &ct_labels, false)?;

        for kind in GlgnKind::ALL {
            let mut glgn_filters = filters.clone();
            glgn_filters.push(("Glgn".to_string(), kind.name().to_string()));
            let data = store.select_rows(&format!("{}GlgnData", prefix), &glgn_filters)?;
            let stats = store.select_rows(&format!("{}GlgnStats", prefix), &glgn_filters)?;
            let pair = eco
                .eco_glgn
                .get_mut(interval)
                .expect("glgn missing")
                .get_mut(kind);
            fill_data_grid(&data, &mut pair.data, &lc_labels, &eco.column)?;
            fill_stats_grid(&stats, &mut pair.stats, &lc_labels, false)?;
        }
    }

    let years: Vec<String> = eco.eco_comp.keys().cloned().collect();
    for year in &years {
        let mut filters = eco_filters(analysis_num, eco_num);
        filters.push(("CompYear".to_string(), year.clone()));
        let data = store.select_rows(&format!("{}CompData", prefix), &filters)?;
        let stats = store.select_rows(&format!("{}CompStats", prefix), &filters)?;
        let pair = eco.eco_comp.get_mut(year).expect("year missing");
        fill_data_grid(&data, &mut pair.data, &lc_labels, &eco.column)?;
        fill_stats_grid(&stats, &mut pair.stats, &lc_labels, false)?;
    }

    for interval in &multi_intervals {
        let mut filters = eco_filters(analysis_num, eco_num);
        filters.push(("ChangePeriod".to_string(), interval.clone()));
        let data = store.select_rows(&format!("{}MultichangeData", prefix), &filters)?;
        let stats = store.select_rows(&format!("{}MultichangeStats", prefix), &filters)?;
        let pair = eco.eco_multi.get_mut(interval).expect("interval missing");
        fill_data_grid(&data, &mut pair.data, &mc_labels, &eco.column)?;
        fill_stats_grid(&stats, &mut pair.stats, &mc_labels, false)?;
    }

    let all_change_keys: Vec<(String, AllChangeSource)> = eco
        .all_change
        .iter()
        .flat_map(|(interval, sources)| {
            sources
                .keys()
                .map(|source| (interval.clone(), *source))
                .collect::<Vec<_>>()
        })
        .collect();
    for (interval, source) in all_change_keys {
        let mut filters = eco_filters(analysis_num, eco_num);
        filters.push(("ChangePeriod".to_string(), interval.clone()));
        filters.push(("Source".to_string(), source.name().to_string()));
        let data = store.select_rows(&format!("{}AllChangeData", prefix), &filters)?;
        let stats = store.select_rows(&format!("{}AllChangeStats", prefix), &filters)?;
        if let Some(pair) = eco
            .all_change
            .get_mut(&interval)
            .and_then(|m| m.get_mut(&source))
        {
            fill_data_grid(&data, &mut pair.data, &total_labels, &eco.column)?;
            fill_stats_grid(&stats, &mut pair.stats, &total_labels, false)?;
        }
    }

    for interval in &aggregate_intervals {
        let mut filters = eco_filters(analysis_num, eco_num);
        filters.push(("ChangePeriod".to_string(), interval.clone()));
        filters.push(("Source".to_string(), AllChangeSource::AddGross.name().to_string()));
        let data = store.select_rows(&format!("{}AggregateData", prefix), &filters)?;
        let stats = store.select_rows(&format!("{}AggregateStats", prefix), &filters)?;
        if let Some(pair) = eco.aggregate.get_mut(interval) {
            fill_data_grid(&data, &mut pair.data, &ct_labels, &eco.column)?;
            fill_stats_grid(&stats, &mut pair.stats, &ct_labels, false)?;
        }
        for kind in GlgnKind::ALL {
            let mut glgn_filters = filters.clone();
            glgn_filters.push(("Glgn".to_string(), kind.name().to_string()));
            let data = store.select_rows(&format!("{}AggGlgnData", prefix), &glgn_filters)?;
            let stats = store.select_rows(&format!("{}AggGlgnStats", prefix), &glgn_filters)?;
            if let Some(glgn) = eco.agg_glgn.get_mut(interval) {
                let pair = glgn.get_mut(kind);
                fill_data_grid(&data, &mut pair.data, &lc_labels, &eco.column)?;
                fill_stats_grid(&stats, &mut pair.stats, &lc_labels, false)?;
            }
        }
    }

    Ok(Some(eco))
}

/// Rebuilds a summary's statistics grids from the store. Returns `None`
/// when the store holds no summary for the analysis.
pub fn load_summary(
    store: &TableStore,
    analysis_name: &str,
    analysis_num: usize,
) -> TrendsResult<Option<StudyArea>> {
    let filters = vec![("AnalysisNum".to_string(), analysis_num.to_string())];
    let change_rows = store.select_rows("SummaryChangeStats", &filters)?;
    if change_rows.is_empty() {
        return Ok(None);
    }

    let mut sa = StudyArea::new(analysis_name, analysis_num);
    sa.intervals = distinct(&change_rows, "ChangePeriod");
    sa.years = trends_common::utils::years_from_intervals(&sa.intervals);
    sa.multi_intervals = distinct(
        &store.select_rows("SummaryMultichangeStats", &filters)?,
        "ChangePeriod",
    );
    sa.aggregate_intervals = distinct(
        &store.select_rows("SummaryAggregateStats", &filters)?,
        "ChangePeriod",
    );
    if let Some(row) = change_rows.first() {
        sa.resolution = row.get("Resolution").cloned().unwrap_or_default();
    }

    if let Some(params) = store
        .select_rows(SUMMARY_ANALYSIS_PARAMS_TABLE, &eco_filters(analysis_num, 0))?
        .into_iter()
        .next()
    {
        sa.summary_samples = parse_field(&params, "SampleBlocks")?;
        sa.total_blocks = parse_field(&params, "TotalBlocks")?;
        sa.sum_est_pixels = parse_field(&params, "TotalPixels")?;
        sa.student_t = [
            parse_field(&params, "StudentT_85")?,
            parse_field(&params, "StudentT_90")?,
            parse_field(&params, "StudentT_95")?,
            parse_field(&params, "StudentT_99")?,
        ];
    }

    sa.set_up_summary_arrays();

    let ct_labels = Family::Change.value_labels();
    let lc_labels = Family::Glgn.value_labels();
    let mc_labels = Family::Multichange.value_labels();
    let total_labels = Family::AllChange.value_labels();

    let intervals = sa.intervals.clone();
    for interval in &intervals {
        let mut f = filters.clone();
        f.push(("ChangePeriod".to_string(), interval.clone()));
        let rows = store.select_rows("SummaryChangeStats", &f)?;
        if let Some(grid) = sa.summary.get_mut(interval) {
            fill_stats_grid(&rows, grid, &ct_labels, true)?;
        }
        for kind in GlgnKind::ALL {
            let mut gf = f.clone();
            gf.push(("Glgn".to_string(), kind.name().to_string()));
            let rows = store.select_rows("SummaryGlgnStats", &gf)?;
            if let Some(glgn) = sa.sum_glgn.get_mut(interval) {
                fill_stats_grid(&rows, glgn.get_mut(kind), &lc_labels, true)?;
            }
        }
    }

    let years = sa.years.clone();
    for year in &years {
        let mut f = filters.clone();
        f.push(("CompYear".to_string(), year.clone()));
        let rows = store.select_rows("SummaryCompStats", &f)?;
        if let Some(grid) = sa.sum_comp.get_mut(year) {
            fill_stats_grid(&rows, grid, &lc_labels, true)?;
        }
    }

    let multi_intervals = sa.multi_intervals.clone();
    for interval in &multi_intervals {
        let mut f = filters.clone();
        f.push(("ChangePeriod".to_string(), interval.clone()));
        let rows = store.select_rows("SummaryMultichangeStats", &f)?;
        if let Some(grid) = sa.sum_multi.get_mut(interval) {
            fill_stats_grid(&rows, grid, &mc_labels, true)?;
        }
    }

    let all_change_keys: Vec<(String, AllChangeSource)> = sa
        .sum_all_change
        .iter()
        .flat_map(|(interval, sources)| {
            sources
                .keys()
                .map(|source| (interval.clone(), *source))
                .collect::<Vec<_>>()
        })
        .collect();
    for (interval, source) in all_change_keys {
        let mut f = filters.clone();
        f.push(("ChangePeriod".to_string(), interval.clone()));
        f.push(("Source".to_string(), source.name().to_string()));
        let rows = store.select_rows("SummaryAllChangeStats", &f)?;
        if let Some(grid) = sa
            .sum_all_change
            .get_mut(&interval)
            .and_then(|m| m.get_mut(&source))
        {
            fill_stats_grid(&rows, grid, &total_labels, true)?;
        }
    }

    let aggregate_intervals = sa.aggregate_intervals.clone();
    for interval in &aggregate_intervals {
        let mut f = filters.clone();
        f.push(("ChangePeriod".to_string(), interval.clone()));
        f.push(("Source".to_string(), AllChangeSource::AddGross.name().to_string()));
        let rows = store.select_rows("SummaryAggregateStats", &f)?;
        if let Some(grid) = sa.sum_aggregate.get_mut(interval) {
            fill_stats_grid(&rows, grid, &ct_labels, true)?;
        }
        for kind in GlgnKind::ALL {
            let mut gf = f.clone();
            gf.push(("Glgn".to_string(), kind.name().to_string()));
            let rows = store.select_rows("SummaryAggGlgnStats", &gf)?;
            if let Some(glgn) = sa.sum_agg_glgn.get_mut(interval) {
                fill_stats_grid(&rows, glgn.get_mut(kind), &lc_labels, true)?;
            }
        }
    }

    Ok(Some(sa))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::RunType;
    use crate::names::transition_id;
    use std::fs;
    use trends_common::utils::TrendsLogger;

    #[test]
    fn test_ecoregion_round_trip() {
        let dir = std::env::temp_dir().join("trends_restore_test");
        let _ = fs::remove_dir_all(&dir);
        let store = TableStore::open(&dir).unwrap();
        let logger = TrendsLogger::quiet();

        let intervals = vec!["1973to1980".to_string(), "1980to1986".to_string()];
        let mut eco = EcoregionStats::new(
            7,
            100,
            2,
            "60m",
            RunType::FullStratified,
            vec![4, 9],
            vec![],
            &intervals,
            &[],
            &["1973to1986".to_string()],
            &logger,
        )
        .unwrap();
        let id = transition_id(1, 6) - 1;
        eco.eco_data.get_mut("1973to1980").unwrap().data.set_value(id, 0, 8);
        eco.eco_data.get_mut("1973to1980").unwrap().data.set_value(id, 1, 2);
        eco.eco_data.get_mut("1980to1986").unwrap().data.set_value(id, 0, 3);
        eco.perform_statistics(&logger).unwrap();
        store.store_ecoregion(&eco, 1, &logger).unwrap();

        let restored = load_ecoregion(&store, 1, 7, &logger).unwrap().unwrap();
        assert_eq!(restored.design.sample_blocks, 2);
        assert_eq!(restored.sorted_blocks(), vec![4, 9]);
        assert_eq!(
            restored.eco_data["1973to1980"].data.get_value(id, 0),
            eco.eco_data["1973to1980"].data.get_value(id, 0)
        );
        assert_eq!(restored.eco_data.len(), 2);
        // Statistics came back as well.
        let want = eco.eco_data["1973to1980"]
            .stats
            .get_value(id, Statistic::EstChange.index());
        let got = restored.eco_data["1973to1980"]
            .stats
            .get_value(id, Statistic::EstChange.index());
        assert!((want - got).abs() < 1e-9);
        // Derived views restored too.
        assert_eq!(
            restored.eco_glgn["1973to1980"].gain.data.get_value(5, 0),
            eco.eco_glgn["1973to1980"].gain.data.get_value(5, 0)
        );
        assert_eq!(
            restored.aggregate["1973to1986"].data.get_value(id, 0),
            eco.aggregate["1973to1986"].data.get_value(id, 0)
        );

        // An ecoregion with no stored rows yields None.
        assert!(load_ecoregion(&store, 1, 55, &logger).unwrap().is_none());
        let _ = fs::remove_dir_all(&dir);
    }
}
