/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

//! Calculations that derive the secondary views (gain/loss/gross/net,
//! composition, multichange, all-change, aggregate) from the conversion
//! data, and the driver that runs them in order for one ecoregion.

use crate::model::{AllChangeSource, EcoregionStats, Glgn, GlgnKind, TablePair};
use crate::names::{self, TransitionRole};
use trends_common::error::TrendsResult;
use trends_common::statistics::{data_stats, total_estimated_pixels, SamplingDesign};
use trends_common::utils::TrendsLogger;

/// Fills a gain/loss/gross/net set from a conversion data grid.
///
/// Gain for each land-cover class is the sum of pixels over all
/// conversions with that class as destination; loss the sum with the
/// class as source; gross = gain + loss; net = gain - loss. No-change
/// conversions contribute to none of them.
pub fn calc_gains_losses(conversion: &TablePair, glgn: &mut Glgn<TablePair>) {
    for lc in 1..=names::NUM_LC_TYPES {
        for id in names::transitions_for_class(lc, TransitionRole::To, false) {
            for col in 0..conversion.data.columns {
                glgn.gain
                    .data
                    .increment(lc - 1, col, conversion.data.get_value(id - 1, col));
            }
        }
        for id in names::transitions_for_class(lc, TransitionRole::From, false) {
            for col in 0..conversion.data.columns {
                glgn.loss
                    .data
                    .increment(lc - 1, col, conversion.data.get_value(id - 1, col));
            }
        }
        for col in 0..conversion.data.columns {
            let gain = glgn.gain.data.get_value(lc - 1, col);
            let loss = glgn.loss.data.get_value(lc - 1, col);
            glgn.gross.data.set_value(lc - 1, col, gain + loss);
            glgn.net.data.set_value(lc - 1, col, gain - loss);
        }
    }
}

/// Runs the sampling statistics over all four tables of a
/// gain/loss/gross/net set.
pub fn calc_glgn_stats(design: &SamplingDesign, glgn: &mut Glgn<TablePair>) {
    for kind in GlgnKind::ALL {
        let pair = glgn.get_mut(kind);
        data_stats(design, &pair.data, &mut pair.stats);
    }
}

impl EcoregionStats {
    /// Adds an interval's conversion counts into the composition arrays
    /// of its years.
    ///
    /// Composition for a year is the per-class sum of pixels over all
    /// conversions leaving that class in the interval starting that
    /// year, diagonal included. The most recent year has no following
    /// interval, so it instead sums the conversions arriving in each
    /// class over the final interval. Intervals spanning more than one
    /// step are skipped; their pixels are already counted.
    pub fn calc_composition(&mut self, interval: &str, logger: &TrendsLogger) -> TrendsResult<()> {
        logger.write("Starting composition calculations");

        let years: Vec<String> = self.eco_comp.keys().cloned().collect();
        let start = &interval[..4];
        let end = &interval[6..];
        let start_index = years.iter().position(|y| y == start);
        let end_index = years.iter().position(|y| y == end);
        let (start_index, end_index) = match (start_index, end_index) {
            (Some(s), Some(e)) => (s, e),
            _ => return Ok(()),
        };
        if end_index != start_index + 1 {
            // skip multiple change years - already counted
            return Ok(());
        }

        let conversion = &self.eco_data[interval];
        let comp = self
            .eco_comp
            .get_mut(start)
            .expect("composition year missing");
        accumulate_composition(conversion, comp, TransitionRole::From);

        if end == years.last().map(String::as_str).unwrap_or("") {
            let comp = self.eco_comp.get_mut(end).expect("composition year missing");
            accumulate_composition(&self.eco_data[interval], comp, TransitionRole::To);
        }
        Ok(())
    }

    /// Statistics over one composition year.
    pub fn calc_comp_stats(&mut self, year: &str, logger: &TrendsLogger) {
        logger.write("Starting composition statistics");
        if let Some(pair) = self.eco_comp.get_mut(year) {
            data_stats(&self.design, &pair.data, &mut pair.stats);
        }
    }

    /// Statistics over every multichange interval.
    pub fn calc_multichange_stats(&mut self, logger: &TrendsLogger) {
        logger.write(&format!(
            "start multichange statistics on ecoregion {}",
            self.eco_num
        ));
        for pair in self.eco_multi.values_mut() {
            data_stats(&self.design, &pair.data, &mut pair.stats);
        }
    }

    /// Builds the aggregate (cumulative gross) conversion arrays by
    /// summing the base intervals spanning each configured aggregate
    /// interval, then runs statistics with the aggregate's own pixel
    /// total. The pixel total is restored afterwards.
    pub fn calc_add_gross(&mut self, logger: &TrendsLogger) {
        logger.write("Starting aggregate gross calculations");

        let keys = self.aggregate_keys.clone();
        let mut kept_keys = vec![];
        for interval in keys {
            let sum_years = self.find_aggregate_intervals(&interval);
            if sum_years.is_empty() {
                continue;
            }
            kept_keys.push(interval.clone());

            for base in &sum_years {
                let base_grid = &self.eco_data[base].data;
                if let Some(pair) = self.aggregate.get_mut(&interval) {
                    pair.data.add_grid(base_grid);
                }
            }

            if let Some(pair) = self.aggregate.get_mut(&interval) {
                self.design.total_est_pixels = total_estimated_pixels(&pair.data, &self.design);
                data_stats(&self.design, &pair.data, &mut pair.stats);
            }
        }
        self.aggregate_keys = kept_keys;

        self.reset_total_est_pixels();
    }

    /// The consecutive base intervals spanning an aggregate interval,
    /// built from the composition years.
    pub fn find_aggregate_intervals(&self, interval: &str) -> Vec<String> {
        let years: Vec<String> = self.eco_comp.keys().cloned().collect();
        let start = &interval[..4];
        let end = &interval[6..];
        let (start_index, end_index) = match (
            years.iter().position(|y| y == start),
            years.iter().position(|y| y == end),
        ) {
            (Some(s), Some(e)) => (s, e),
            _ => return vec![],
        };
        (start_index..end_index)
            .map(|i| format!("{}to{}", years[i], years[i + 1]))
            .filter(|candidate| self.eco_data.contains_key(candidate))
            .collect()
    }

    /// Computes the all-change rows: the per-block pixel total over the
    /// change-only conversions, for every interval, for the aggregate
    /// gross arrays, and for the multichange footprints.
    pub fn calc_all_change(&mut self, logger: &TrendsLogger) {
        logger.write("Starting all change calculations");

        let change_ids = names::change_transitions();

        let intervals: Vec<String> = self.eco_data.keys().cloned().collect();
        for interval in &intervals {
            let totals = change_column_totals(&self.eco_data[interval].data, &change_ids);
            if let Some(pair) = self
                .all_change
                .get_mut(interval)
                .and_then(|m| m.get_mut(&AllChangeSource::Conversion))
            {
                for (col, total) in totals.iter().enumerate() {
                    pair.data.set_value(0, col, *total);
                }
                data_stats(&self.design, &pair.data, &mut pair.stats);
            }
        }

        // Aggregate change runs against the aggregate pixel total.
        let add_keys = self.aggregate_keys.clone();
        if !add_keys.is_empty() {
            self.design.total_est_pixels =
                total_estimated_pixels(&self.aggregate[&add_keys[0]].data, &self.design);
            for key in &add_keys {
                let totals = change_column_totals(&self.aggregate[key].data, &change_ids);
                if let Some(pair) = self
                    .all_change
                    .get_mut(key)
                    .and_then(|m| m.get_mut(&AllChangeSource::AddGross))
                {
                    for (col, total) in totals.iter().enumerate() {
                        pair.data.set_value(0, col, *total);
                    }
                    data_stats(&self.design, &pair.data, &mut pair.stats);
                }
            }
            self.reset_total_est_pixels();
        }

        let multi_intervals: Vec<String> = self.eco_multi.keys().cloned().collect();
        for interval in &multi_intervals {
            let changes = self.multi_changes.get(interval).copied().unwrap_or(names::NUM_MULTI);
            let multi = &self.eco_multi[interval].data;
            let mut totals = vec![0i64; multi.columns];
            // Row zero is the no-change count and stays out of the sum.
            for row in 1..changes.min(multi.rows) {
                for (col, total) in totals.iter_mut().enumerate() {
                    *total += multi.get_value(row, col);
                }
            }
            if let Some(pair) = self
                .all_change
                .get_mut(interval)
                .and_then(|m| m.get_mut(&AllChangeSource::Multichange))
            {
                for (col, total) in totals.iter().enumerate() {
                    pair.data.set_value(0, col, *total);
                }
                data_stats(&self.design, &pair.data, &mut pair.stats);
            }
        }
    }

    /// Restores the pixel total to the first interval's conversion
    /// grid, undoing a temporary aggregate recalculation.
    pub fn reset_total_est_pixels(&mut self) {
        if let Some(first) = self.first_interval() {
            self.design.total_est_pixels =
                total_estimated_pixels(&self.eco_data[&first].data, &self.design);
        }
    }

    /// Runs the complete statistics pass for this ecoregion: conversion
    /// statistics per interval, the derived views, and the aggregate
    /// and all-change calculations, in the order the pixel-total
    /// juggling requires.
    pub fn perform_statistics(&mut self, logger: &TrendsLogger) -> TrendsResult<()> {
        self.reset_total_est_pixels();
        logger.write(&format!(
            "Total est pixel count for eco {} is {}",
            self.eco_num, self.design.total_est_pixels
        ));
        self.set_up_arrays();

        let intervals: Vec<String> = self.eco_data.keys().cloned().collect();
        for interval in &intervals {
            logger.write(&format!(
                "start statistics on ecoregion {} interval {}",
                self.eco_num, interval
            ));
            {
                let pair = self.eco_data.get_mut(interval).expect("interval missing");
                data_stats(&self.design, &pair.data, &mut pair.stats);
            }

            logger.write("Starting gain/loss/gross/net calculations");
            let conversion = &self.eco_data[interval];
            let glgn = self.eco_glgn.get_mut(interval).expect("glgn missing");
            calc_gains_losses(conversion, glgn);
            logger.write("Starting gain/loss/gross/net statistics");
            calc_glgn_stats(&self.design, glgn);

            self.calc_composition(interval, logger)?;
        }

        let years: Vec<String> = self.eco_comp.keys().cloned().collect();
        for year in &years {
            self.calc_comp_stats(year, logger);
        }

        self.calc_multichange_stats(logger);

        if !self.aggregate_keys.is_empty() {
            self.calc_add_gross(logger);
            // The aggregate GLGN views use the aggregate pixel total.
            if let Some(first_key) = self.aggregate_keys.first().cloned() {
                self.design.total_est_pixels =
                    total_estimated_pixels(&self.aggregate[&first_key].data, &self.design);
            }
            let keys = self.aggregate_keys.clone();
            for key in &keys {
                let aggregate = &self.aggregate[key];
                let glgn = self.agg_glgn.get_mut(key).expect("aggregate glgn missing");
                calc_gains_losses(aggregate, glgn);
                calc_glgn_stats(&self.design, glgn);
            }
            self.reset_total_est_pixels();
        }

        self.calc_all_change(logger);
        Ok(())
    }
}

fn accumulate_composition(conversion: &TablePair, comp: &mut TablePair, role: TransitionRole) {
    for lc in 1..=names::NUM_LC_TYPES {
        for id in names::transitions_for_class(lc, role, true) {
            for col in 0..conversion.data.columns {
                comp.data
                    .increment(lc - 1, col, conversion.data.get_value(id - 1, col));
            }
        }
    }
}

fn change_column_totals(data: &trends_common::structures::Grid<i64>, change_ids: &[usize]) -> Vec<i64> {
    let mut totals = vec![0i64; data.columns];
    for &id in change_ids {
        for (col, total) in totals.iter_mut().enumerate() {
            *total += data.get_value(id - 1, col);
        }
    }
    totals
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::RunType;
    use crate::names::transition_id;
    use trends_common::statistics::{Statistic, total_estimated_pixels};
    use trends_common::utils::TrendsLogger;

    fn two_interval_eco() -> EcoregionStats {
        let logger = TrendsLogger::quiet();
        let intervals = vec!["1973to1980".to_string(), "1980to1986".to_string()];
        let mut eco = EcoregionStats::new(
            3,
            20,
            2,
            "60m",
            RunType::FullStratified,
            vec![5, 9],
            vec![],
            &intervals,
            &["1973to1986".to_string()],
            &["1973to1986".to_string()],
            &logger,
        )
        .unwrap();
        eco.set_up_arrays();
        eco
    }

    #[test]
    fn test_gains_losses_derivation() {
        let mut conversion = TablePair::new(names::NUM_CONVERSIONS, 2);
        // 10 pixels Water -> Forest and 4 pixels Forest -> Developed in
        // block column 0.
        conversion.data.set_value(transition_id(1, 6) - 1, 0, 10);
        conversion.data.set_value(transition_id(6, 2) - 1, 0, 4);
        // No-change Forest -> Forest is ignored by every view.
        conversion.data.set_value(transition_id(6, 6) - 1, 0, 99);

        let mut glgn = Glgn::from_fn(|| TablePair::new(names::NUM_LC_TYPES, 2));
        calc_gains_losses(&conversion, &mut glgn);

        // Forest: gains 10, loses 4.
        assert_eq!(glgn.gain.data.get_value(5, 0), 10);
        assert_eq!(glgn.loss.data.get_value(5, 0), 4);
        assert_eq!(glgn.gross.data.get_value(5, 0), 14);
        assert_eq!(glgn.net.data.get_value(5, 0), 6);
        // Water only loses; Developed only gains.
        assert_eq!(glgn.loss.data.get_value(0, 0), 10);
        assert_eq!(glgn.net.data.get_value(0, 0), -10);
        assert_eq!(glgn.gain.data.get_value(1, 0), 4);
    }

    #[test]
    fn test_composition_accumulation() {
        let logger = TrendsLogger::quiet();
        let mut eco = two_interval_eco();
        // First interval: 6 pixels Water -> Forest, 2 pixels staying
        // Water, in block column 0.
        {
            let pair = eco.eco_data.get_mut("1973to1980").unwrap();
            pair.data.set_value(transition_id(1, 6) - 1, 0, 6);
            pair.data.set_value(transition_id(1, 1) - 1, 0, 2);
        }
        // Second (final) interval: all 8 pixels stay Forest.
        {
            let pair = eco.eco_data.get_mut("1980to1986").unwrap();
            pair.data.set_value(transition_id(6, 6) - 1, 0, 8);
        }
        eco.calc_composition("1973to1980", &logger).unwrap();
        eco.calc_composition("1980to1986", &logger).unwrap();

        // 1973 composition: 8 pixels of Water (from-sums of the first
        // interval, diagonal included).
        assert_eq!(eco.eco_comp["1973"].data.get_value(0, 0), 8);
        // 1980 composition comes from the second interval's from-sums.
        assert_eq!(eco.eco_comp["1980"].data.get_value(5, 0), 8);
        // 1986 is the final year: to-sums of the final interval.
        assert_eq!(eco.eco_comp["1986"].data.get_value(5, 0), 8);
    }

    #[test]
    fn test_composition_skips_spanning_interval() {
        let logger = TrendsLogger::quiet();
        let intervals = vec![
            "1973to1980".to_string(),
            "1980to1986".to_string(),
            "1973to1986".to_string(),
        ];
        let mut eco = EcoregionStats::new(
            3,
            20,
            2,
            "60m",
            RunType::FullStratified,
            vec![5, 9],
            vec![],
            &intervals,
            &[],
            &[],
            &logger,
        )
        .unwrap();
        eco.set_up_arrays();
        {
            let pair = eco.eco_data.get_mut("1973to1986").unwrap();
            pair.data.set_value(transition_id(1, 6) - 1, 0, 50);
        }
        eco.calc_composition("1973to1986", &logger).unwrap();
        // The spanning interval contributes nothing.
        assert_eq!(eco.eco_comp["1973"].data.get_value(0, 0), 0);
    }

    #[test]
    fn test_aggregate_sums_base_intervals() {
        let logger = TrendsLogger::quiet();
        let mut eco = two_interval_eco();
        let id = transition_id(1, 6) - 1;
        eco.eco_data.get_mut("1973to1980").unwrap().data.set_value(id, 0, 3);
        eco.eco_data.get_mut("1980to1986").unwrap().data.set_value(id, 0, 4);
        eco.reset_total_est_pixels();

        eco.calc_add_gross(&logger);
        assert_eq!(eco.aggregate_keys, vec!["1973to1986".to_string()]);
        assert_eq!(eco.aggregate["1973to1986"].data.get_value(id, 0), 7);
        // Pixel total was restored to the first interval afterwards.
        let expected = total_estimated_pixels(&eco.eco_data["1973to1980"].data, &eco.design);
        assert!((eco.design.total_est_pixels - expected).abs() < 1e-9);
    }

    #[test]
    fn test_all_change_excludes_no_change() {
        let logger = TrendsLogger::quiet();
        let mut eco = two_interval_eco();
        {
            let pair = eco.eco_data.get_mut("1973to1980").unwrap();
            pair.data.set_value(transition_id(1, 6) - 1, 0, 6); // change
            pair.data.set_value(transition_id(6, 6) - 1, 0, 100); // no change
            pair.data.set_value(transition_id(2, 3) - 1, 1, 4); // change
        }
        eco.reset_total_est_pixels();
        eco.calc_all_change(&logger);
        let pair = &eco.all_change["1973to1980"][&AllChangeSource::Conversion];
        assert_eq!(pair.data.get_value(0, 0), 6);
        assert_eq!(pair.data.get_value(0, 1), 4);
    }

    #[test]
    fn test_multichange_all_change_skips_row_zero() {
        let logger = TrendsLogger::quiet();
        let mut eco = two_interval_eco();
        {
            let pair = eco.eco_multi.get_mut("1973to1986").unwrap();
            pair.data.set_value(0, 0, 500); // no-change footprint
            pair.data.set_value(1, 0, 30);
            pair.data.set_value(2, 0, 12);
        }
        eco.reset_total_est_pixels();
        eco.calc_all_change(&logger);
        let pair = &eco.all_change["1973to1986"][&AllChangeSource::Multichange];
        assert_eq!(pair.data.get_value(0, 0), 42);
    }

    #[test]
    fn test_glgn_conservation_on_random_data() {
        // Every off-diagonal conversion pixel appears exactly once as a
        // gain and once as a loss, so per block the class-summed gains
        // equal the class-summed losses and the nets cancel.
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(7);
        let mut conversion = TablePair::new(names::NUM_CONVERSIONS, 3);
        for row in 0..conversion.data.rows {
            for col in 0..conversion.data.columns {
                conversion.data.set_value(row, col, rng.gen_range(0..100));
            }
        }
        let mut glgn = Glgn::from_fn(|| TablePair::new(names::NUM_LC_TYPES, 3));
        calc_gains_losses(&conversion, &mut glgn);

        let change_total: Vec<i64> =
            change_column_totals(&conversion.data, &names::change_transitions());
        for col in 0..3 {
            let gain_sum: i64 = (0..names::NUM_LC_TYPES)
                .map(|lc| glgn.gain.data.get_value(lc, col))
                .sum();
            let loss_sum: i64 = (0..names::NUM_LC_TYPES)
                .map(|lc| glgn.loss.data.get_value(lc, col))
                .sum();
            let net_sum: i64 = (0..names::NUM_LC_TYPES)
                .map(|lc| glgn.net.data.get_value(lc, col))
                .sum();
            assert_eq!(gain_sum, change_total[col]);
            assert_eq!(loss_sum, change_total[col]);
            assert_eq!(net_sum, 0);
        }
    }

    #[test]
    fn test_perform_statistics_fills_views() {
        let logger = TrendsLogger::quiet();
        let mut eco = two_interval_eco();
        let id = transition_id(1, 6) - 1;
        eco.eco_data.get_mut("1973to1980").unwrap().data.set_value(id, 0, 8);
        eco.eco_data.get_mut("1973to1980").unwrap().data.set_value(id, 1, 4);
        eco.eco_data.get_mut("1980to1986").unwrap().data.set_value(id, 0, 2);
        eco.eco_multi.get_mut("1973to1986").unwrap().data.set_value(1, 0, 5);

        eco.perform_statistics(&logger).unwrap();

        // Conversion statistics: mean of 8 and 4 is 6, EstChange 120.
        let stats = &eco.eco_data["1973to1980"].stats;
        assert!((stats.get_value(id, Statistic::Mean.index()) - 6.0).abs() < 1e-12);
        assert!((stats.get_value(id, Statistic::EstChange.index()) - 120.0).abs() < 1e-12);

        // The derived views picked up statistics as well.
        let glgn = &eco.eco_glgn["1973to1980"];
        assert!(glgn.gain.stats.get_value(5, Statistic::Mean.index()) > 0.0);
        assert!(eco.aggregate["1973to1986"].stats.get_value(id, Statistic::Mean.index()) > 0.0);
        let all_change = &eco.all_change["1973to1980"][&AllChangeSource::Conversion];
        assert!((all_change.stats.get_value(0, Statistic::Mean.index()) - 6.0).abs() < 1e-12);
    }
}
