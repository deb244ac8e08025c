/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

use crate::error::{TrendsError, TrendsResult};
use crate::structures::Grid;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Written in place of a Student-t value when the design has no degrees
/// of freedom (a single sample block).
pub const NO_STUDENT_T: f64 = -9999.99;

/// Column order of a per-ecoregion statistics grid. Every statistics
/// array in the toolset has these sixteen columns, in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum Statistic {
    Mean,
    EstChange,
    ChgPercent,
    SSquared,
    EstVar,
    StdError,
    PerStdErr,
    RelError,
    Lo85Conf,
    Hi85Conf,
    Lo90Conf,
    Hi90Conf,
    Lo95Conf,
    Hi95Conf,
    Lo99Conf,
    Hi99Conf,
}

impl Statistic {
    pub const ALL: [Statistic; 16] = [
        Statistic::Mean,
        Statistic::EstChange,
        Statistic::ChgPercent,
        Statistic::SSquared,
        Statistic::EstVar,
        Statistic::StdError,
        Statistic::PerStdErr,
        Statistic::RelError,
        Statistic::Lo85Conf,
        Statistic::Hi85Conf,
        Statistic::Lo90Conf,
        Statistic::Hi90Conf,
        Statistic::Lo95Conf,
        Statistic::Hi95Conf,
        Statistic::Lo99Conf,
        Statistic::Hi99Conf,
    ];

    pub const COUNT: usize = 16;

    pub fn index(self) -> usize {
        self as usize
    }

    /// Column label used in the statistics tables.
    pub fn name(self) -> &'static str {
        match self {
            Statistic::Mean => "Mean",
            Statistic::EstChange => "EstChange",
            Statistic::ChgPercent => "ChgPercent",
            Statistic::SSquared => "S_Squared",
            Statistic::EstVar => "EstVar",
            Statistic::StdError => "StdError",
            Statistic::PerStdErr => "PerStdErr",
            Statistic::RelError => "RelError",
            Statistic::Lo85Conf => "Lo85Conf",
            Statistic::Hi85Conf => "Hi85Conf",
            Statistic::Lo90Conf => "Lo90Conf",
            Statistic::Hi90Conf => "Hi90Conf",
            Statistic::Lo95Conf => "Lo95Conf",
            Statistic::Hi95Conf => "Hi95Conf",
            Statistic::Lo99Conf => "Lo99Conf",
            Statistic::Hi99Conf => "Hi99Conf",
        }
    }

    /// Label with the unit of the column appended, for report headers.
    pub fn print_name(self) -> &'static str {
        match self {
            Statistic::Mean => "Mean(pix)",
            Statistic::EstChange => "EstChange(pix)",
            Statistic::ChgPercent => "ChgPercent(%)",
            Statistic::SSquared => "S_Squared(pix)",
            Statistic::EstVar => "EstVar(pix)",
            Statistic::StdError => "StdError(pix)",
            Statistic::PerStdErr => "PerStdErr(%)",
            Statistic::RelError => "RelError(%)",
            Statistic::Lo85Conf => "Lo85Conf(%)",
            Statistic::Hi85Conf => "Hi85Conf(%)",
            Statistic::Lo90Conf => "Lo90Conf(%)",
            Statistic::Hi90Conf => "Hi90Conf(%)",
            Statistic::Lo95Conf => "Lo95Conf(%)",
            Statistic::Hi95Conf => "Hi95Conf(%)",
            Statistic::Lo99Conf => "Lo99Conf(%)",
            Statistic::Hi99Conf => "Hi99Conf(%)",
        }
    }

    pub fn from_name(name: &str) -> Option<Statistic> {
        Statistic::ALL.iter().copied().find(|s| s.name() == name)
    }
}

/// Column order of a summary (multi-ecoregion) statistics grid. The
/// first two columns are summed from the member ecoregions before the
/// remaining columns are derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum SummaryStatistic {
    TotalChng,
    TotalVar,
    ChgPercent,
    StdError,
    PerStdErr,
    RelError,
    Lo85Conf,
    Hi85Conf,
    Lo90Conf,
    Hi90Conf,
    Lo95Conf,
    Hi95Conf,
    Lo99Conf,
    Hi99Conf,
}

impl SummaryStatistic {
    pub const ALL: [SummaryStatistic; 14] = [
        SummaryStatistic::TotalChng,
        SummaryStatistic::TotalVar,
        SummaryStatistic::ChgPercent,
        SummaryStatistic::StdError,
        SummaryStatistic::PerStdErr,
        SummaryStatistic::RelError,
        SummaryStatistic::Lo85Conf,
        SummaryStatistic::Hi85Conf,
        SummaryStatistic::Lo90Conf,
        SummaryStatistic::Hi90Conf,
        SummaryStatistic::Lo95Conf,
        SummaryStatistic::Hi95Conf,
        SummaryStatistic::Lo99Conf,
        SummaryStatistic::Hi99Conf,
    ];

    pub const COUNT: usize = 14;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            SummaryStatistic::TotalChng => "TotalChng",
            SummaryStatistic::TotalVar => "TotalVar",
            SummaryStatistic::ChgPercent => "ChgPercent",
            SummaryStatistic::StdError => "StdError",
            SummaryStatistic::PerStdErr => "PerStdErr",
            SummaryStatistic::RelError => "RelError",
            SummaryStatistic::Lo85Conf => "Lo85Conf",
            SummaryStatistic::Hi85Conf => "Hi85Conf",
            SummaryStatistic::Lo90Conf => "Lo90Conf",
            SummaryStatistic::Hi90Conf => "Hi90Conf",
            SummaryStatistic::Lo95Conf => "Lo95Conf",
            SummaryStatistic::Hi95Conf => "Hi95Conf",
            SummaryStatistic::Lo99Conf => "Lo99Conf",
            SummaryStatistic::Hi99Conf => "Hi99Conf",
        }
    }

    pub fn print_name(self) -> &'static str {
        match self {
            SummaryStatistic::TotalChng => "TotalChng(pix)",
            SummaryStatistic::TotalVar => "TotalVar(pix)",
            SummaryStatistic::ChgPercent => "ChgPercent(%)",
            SummaryStatistic::StdError => "StdError(pix)",
            SummaryStatistic::PerStdErr => "PerStdErr(%)",
            SummaryStatistic::RelError => "RelError(%)",
            SummaryStatistic::Lo85Conf => "Lo85Conf(%)",
            SummaryStatistic::Hi85Conf => "Hi85Conf(%)",
            SummaryStatistic::Lo90Conf => "Lo90Conf(%)",
            SummaryStatistic::Hi90Conf => "Hi90Conf(%)",
            SummaryStatistic::Lo95Conf => "Lo95Conf(%)",
            SummaryStatistic::Hi95Conf => "Hi95Conf(%)",
            SummaryStatistic::Lo99Conf => "Lo99Conf(%)",
            SummaryStatistic::Hi99Conf => "Hi99Conf(%)",
        }
    }

    pub fn from_name(name: &str) -> Option<SummaryStatistic> {
        SummaryStatistic::ALL
            .iter()
            .copied()
            .find(|s| s.name() == name)
    }
}

/// Stratified sampling design for one ecoregion: N total blocks in the
/// population, n sampled blocks, the two-tailed Student-t multipliers
/// for the standard confidence levels, and the estimated pixel total
/// used as the percent-of-ecoregion denominator.
#[derive(Clone, Debug)]
pub struct SamplingDesign {
    pub total_blocks: usize,
    pub sample_blocks: usize,
    pub student_t: [f64; 4],
    pub total_est_pixels: f64,
}

impl SamplingDesign {
    pub fn new(total_blocks: usize, sample_blocks: usize) -> TrendsResult<SamplingDesign> {
        // N and n are divisors in the estimators, so reject anything
        // that would divide by zero, and a sample larger than the
        // population it is drawn from.
        if total_blocks == 0 || sample_blocks == 0 {
            return Err(TrendsError::Domain(format!(
                "invalid sampling design: N = {} n = {}",
                total_blocks, sample_blocks
            )));
        }
        if sample_blocks > total_blocks {
            return Err(TrendsError::Domain(format!(
                "sample block count n = {} exceeds total block count N = {}",
                sample_blocks, total_blocks
            )));
        }
        Ok(SamplingDesign {
            total_blocks,
            sample_blocks,
            student_t: student_t_values(sample_blocks - 1),
            total_est_pixels: 0.0,
        })
    }

    pub fn degrees_of_freedom(&self) -> usize {
        self.sample_blocks - 1
    }

    /// N / n, the factor expanding a sample total to a population
    /// estimate.
    pub fn expansion_factor(&self) -> f64 {
        self.total_blocks as f64 / self.sample_blocks as f64
    }
}

/// Two-tailed Student-t multipliers for the 85, 90, 95, and 99 percent
/// confidence intervals at the given degrees of freedom. The quantiles
/// are one-tailed (0.925, 0.95, 0.975, 0.995), matching a two-tailed
/// 15/10/5/1 percent test. With zero degrees of freedom the values
/// cannot be computed and the `NO_STUDENT_T` marker is returned.
pub fn student_t_values(degrees_of_freedom: usize) -> [f64; 4] {
    if degrees_of_freedom == 0 {
        return [NO_STUDENT_T; 4];
    }
    let t = StudentsT::new(0.0, 1.0, degrees_of_freedom as f64).unwrap();
    [
        t.inverse_cdf(0.925),
        t.inverse_cdf(0.95),
        t.inverse_cdf(0.975),
        t.inverse_cdf(0.995),
    ]
}

/// Estimated total pixel count for a data grid: the grid total expanded
/// by N / n. Used as the denominator for the percent-of-ecoregion
/// columns, and recomputed when an aggregate view temporarily replaces
/// the conversion data.
pub fn total_estimated_pixels(data: &Grid<i64>, design: &SamplingDesign) -> f64 {
    data.total() as f64 * design.expansion_factor()
}

/// Fills a statistics grid from a data grid, row by row.
///
/// For each row of block counts: the sample mean and sample variance
/// (n - 1 divisor), the estimated change `mean * N`, the change as a
/// percent of the ecoregion pixel total, the estimated variance with
/// the finite-population correction
/// `N^2 * (1 - n/N) * s^2 / n`,
/// the standard error and its percent form, the relative error, and the
/// 85/90/95/99 percent confidence intervals around the percent change.
/// With a single sample block the mean is the block value and the
/// variance is zero. Division-by-zero screens leave the affected
/// columns at their initialized 0.0.
pub fn data_stats(design: &SamplingDesign, data: &Grid<i64>, stats: &mut Grid<f64>) {
    let n = design.sample_blocks as f64;
    let total_blks = design.total_blocks as f64;
    let sum_chg_column = design.total_est_pixels;

    for row in 0..data.rows {
        let (mean, s_squared) = if design.sample_blocks > 1 {
            let counts = data.row_slice(row);
            let mean = counts.iter().map(|&v| v as f64).sum::<f64>() / n;
            let s_squared = counts
                .iter()
                .map(|&v| {
                    let dev = v as f64 - mean;
                    dev * dev
                })
                .sum::<f64>()
                / (n - 1.0);
            (mean, s_squared)
        } else {
            // Single-block custom boundary case: the mean is just the
            // block value and the variance is zero.
            (data.get_value(row, 0) as f64, 0.0)
        };

        let est_change = mean * total_blks;
        let est_var = total_blks * total_blks * (1.0 - n / total_blks) * s_squared / n;
        let std_error = est_var.sqrt();

        let chg_percent = if sum_chg_column > 0.0 {
            est_change / sum_chg_column * 100.0
        } else {
            0.0
        };
        let per_std_err = if sum_chg_column > 0.0 {
            std_error / sum_chg_column * 100.0
        } else {
            0.0
        };
        let rel_error = if chg_percent != 0.0 {
            per_std_err / chg_percent * 100.0
        } else {
            0.0
        };

        stats.set_value(row, Statistic::Mean.index(), mean);
        stats.set_value(row, Statistic::SSquared.index(), s_squared);
        stats.set_value(row, Statistic::EstChange.index(), est_change);
        stats.set_value(row, Statistic::ChgPercent.index(), chg_percent);
        stats.set_value(row, Statistic::EstVar.index(), est_var);
        stats.set_value(row, Statistic::StdError.index(), std_error);
        stats.set_value(row, Statistic::PerStdErr.index(), per_std_err);
        stats.set_value(row, Statistic::RelError.index(), rel_error);

        let lo_hi = [
            (Statistic::Lo85Conf, Statistic::Hi85Conf),
            (Statistic::Lo90Conf, Statistic::Hi90Conf),
            (Statistic::Lo95Conf, Statistic::Hi95Conf),
            (Statistic::Lo99Conf, Statistic::Hi99Conf),
        ];
        for (level, (lo, hi)) in lo_hi.iter().enumerate() {
            let half_width = per_std_err * design.student_t[level];
            stats.set_value(row, lo.index(), chg_percent - half_width);
            stats.set_value(row, hi.index(), chg_percent + half_width);
        }
    }
}

/// Fills the derived columns of a summary statistics grid whose
/// `TotalChng` and `TotalVar` columns have already been summed from the
/// member ecoregions. `student_t` holds the pooled multipliers and
/// `change_sum` the pooled pixel total.
pub fn summary_stats(
    stats: &mut Grid<f64>,
    student_t: [f64; 4],
    change_sum: f64,
) -> TrendsResult<()> {
    if change_sum <= 0.0 {
        return Err(TrendsError::Domain(format!(
            "unable to process summary statistics, total pixel count found: {}",
            change_sum
        )));
    }

    for row in 0..stats.rows {
        let total_chng = stats.get_value(row, SummaryStatistic::TotalChng.index());
        let total_var = stats.get_value(row, SummaryStatistic::TotalVar.index());

        let chg_percent = total_chng / change_sum * 100.0;
        let std_error = total_var.sqrt();
        let per_std_err = std_error / change_sum * 100.0;
        let rel_error = if chg_percent != 0.0 {
            per_std_err / chg_percent * 100.0
        } else {
            0.0
        };

        stats.set_value(row, SummaryStatistic::ChgPercent.index(), chg_percent);
        stats.set_value(row, SummaryStatistic::StdError.index(), std_error);
        stats.set_value(row, SummaryStatistic::PerStdErr.index(), per_std_err);
        stats.set_value(row, SummaryStatistic::RelError.index(), rel_error);

        let lo_hi = [
            (SummaryStatistic::Lo85Conf, SummaryStatistic::Hi85Conf),
            (SummaryStatistic::Lo90Conf, SummaryStatistic::Hi90Conf),
            (SummaryStatistic::Lo95Conf, SummaryStatistic::Hi95Conf),
            (SummaryStatistic::Lo99Conf, SummaryStatistic::Hi99Conf),
        ];
        for (level, (lo, hi)) in lo_hi.iter().enumerate() {
            let half_width = per_std_err * student_t[level];
            stats.set_value(row, lo.index(), chg_percent - half_width);
            stats.set_value(row, hi.index(), chg_percent + half_width);
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::structures::Grid;

    fn design_with_pixels(total: usize, sample: usize, pixels: f64) -> SamplingDesign {
        let mut design = SamplingDesign::new(total, sample).unwrap();
        design.total_est_pixels = pixels;
        design
    }

    #[test]
    fn test_design_validation() {
        assert!(SamplingDesign::new(0, 0).is_err());
        assert!(SamplingDesign::new(10, 0).is_err());
        assert!(SamplingDesign::new(5, 6).is_err());
        let design = SamplingDesign::new(458, 12).unwrap();
        assert_eq!(design.degrees_of_freedom(), 11);
    }

    #[test]
    fn test_student_t_values() {
        // Reference two-tailed t values at 10 degrees of freedom.
        let t = student_t_values(10);
        assert!((t[0] - 1.559).abs() < 1e-3); // 85%
        assert!((t[1] - 1.812).abs() < 1e-3); // 90%
        assert!((t[2] - 2.228).abs() < 1e-3); // 95%
        assert!((t[3] - 3.169).abs() < 1e-3); // 99%
        assert_eq!(student_t_values(0), [NO_STUDENT_T; 4]);
    }

    #[test]
    fn test_data_stats_formulas() {
        // One row, four sample blocks from a population of ten.
        let mut data: Grid<i64> = Grid::new(1, 4, 0);
        for (col, v) in [2i64, 4, 6, 8].iter().enumerate() {
            data.set_value(0, col, *v);
        }
        let mut design = SamplingDesign::new(10, 4).unwrap();
        design.total_est_pixels = total_estimated_pixels(&data, &design);
        assert!((design.total_est_pixels - 50.0).abs() < 1e-12);

        let mut stats: Grid<f64> = Grid::new(1, Statistic::COUNT, 0.0);
        data_stats(&design, &data, &mut stats);

        let mean = stats.get_value(0, Statistic::Mean.index());
        let s2 = stats.get_value(0, Statistic::SSquared.index());
        assert!((mean - 5.0).abs() < 1e-12);
        // Sample variance of 2,4,6,8 with the n-1 divisor.
        assert!((s2 - 20.0 / 3.0).abs() < 1e-12);

        let est_change = stats.get_value(0, Statistic::EstChange.index());
        assert!((est_change - 50.0).abs() < 1e-12);
        assert!((stats.get_value(0, Statistic::ChgPercent.index()) - 100.0).abs() < 1e-12);

        // EstVar = N^2 (1 - n/N) s^2 / n = 100 * 0.6 * (20/3) / 4 = 100.
        let est_var = stats.get_value(0, Statistic::EstVar.index());
        assert!((est_var - 100.0).abs() < 1e-9);
        assert!((stats.get_value(0, Statistic::StdError.index()) - 10.0).abs() < 1e-9);
        assert!((stats.get_value(0, Statistic::PerStdErr.index()) - 20.0).abs() < 1e-9);
        assert!((stats.get_value(0, Statistic::RelError.index()) - 20.0).abs() < 1e-9);

        // Confidence interval uses the 95% multiplier at df = 3.
        let t95 = design.student_t[2];
        let lo95 = stats.get_value(0, Statistic::Lo95Conf.index());
        assert!((lo95 - (100.0 - 20.0 * t95)).abs() < 1e-9);
    }

    #[test]
    fn test_data_stats_single_block() {
        let mut data: Grid<i64> = Grid::new(2, 1, 0);
        data.set_value(0, 0, 40);
        data.set_value(1, 0, 60);
        let mut design = SamplingDesign::new(1, 1).unwrap();
        design.total_est_pixels = total_estimated_pixels(&data, &design);

        let mut stats: Grid<f64> = Grid::new(2, Statistic::COUNT, 0.0);
        data_stats(&design, &data, &mut stats);
        assert_eq!(stats.get_value(0, Statistic::Mean.index()), 40.0);
        assert_eq!(stats.get_value(0, Statistic::SSquared.index()), 0.0);
        assert_eq!(stats.get_value(0, Statistic::EstVar.index()), 0.0);
        assert_eq!(stats.get_value(1, Statistic::ChgPercent.index()), 60.0);
    }

    #[test]
    fn test_data_stats_zero_pixel_total() {
        let data: Grid<i64> = Grid::new(1, 3, 0);
        let design = design_with_pixels(10, 3, 0.0);
        let mut stats: Grid<f64> = Grid::new(1, Statistic::COUNT, 0.0);
        data_stats(&design, &data, &mut stats);
        // All percent columns remain at their initialized zero.
        assert_eq!(stats.get_value(0, Statistic::ChgPercent.index()), 0.0);
        assert_eq!(stats.get_value(0, Statistic::PerStdErr.index()), 0.0);
        assert_eq!(stats.get_value(0, Statistic::RelError.index()), 0.0);
    }

    #[test]
    fn test_summary_stats() {
        let mut stats: Grid<f64> = Grid::new(1, SummaryStatistic::COUNT, 0.0);
        stats.set_value(0, SummaryStatistic::TotalChng.index(), 250.0);
        stats.set_value(0, SummaryStatistic::TotalVar.index(), 400.0);
        let t = student_t_values(20);
        summary_stats(&mut stats, t, 1000.0).unwrap();

        assert!((stats.get_value(0, SummaryStatistic::ChgPercent.index()) - 25.0).abs() < 1e-12);
        assert!((stats.get_value(0, SummaryStatistic::StdError.index()) - 20.0).abs() < 1e-12);
        assert!((stats.get_value(0, SummaryStatistic::PerStdErr.index()) - 2.0).abs() < 1e-12);
        assert!((stats.get_value(0, SummaryStatistic::RelError.index()) - 8.0).abs() < 1e-12);
        let hi90 = stats.get_value(0, SummaryStatistic::Hi90Conf.index());
        assert!((hi90 - (25.0 + 2.0 * t[1])).abs() < 1e-12);
    }

    #[test]
    fn test_est_change_sums_to_pixel_total() {
        // For any data grid, the EstChange column sums to the pixel
        // total computed from the same grid: sum(mean_i * N) =
        // N/n * sum(data).
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(42);
        let mut data: Grid<i64> = Grid::new(20, 6, 0);
        for row in 0..data.rows {
            for col in 0..data.columns {
                data.set_value(row, col, rng.gen_range(0..500));
            }
        }
        let mut design = SamplingDesign::new(50, 6).unwrap();
        design.total_est_pixels = total_estimated_pixels(&data, &design);

        let mut stats: Grid<f64> = Grid::new(20, Statistic::COUNT, 0.0);
        data_stats(&design, &data, &mut stats);

        let est_change_sum: f64 = (0..stats.rows)
            .map(|row| stats.get_value(row, Statistic::EstChange.index()))
            .sum();
        assert!((est_change_sum - design.total_est_pixels).abs() < 1e-6);
        // And the percent column therefore sums to 100.
        let pct_sum: f64 = (0..stats.rows)
            .map(|row| stats.get_value(row, Statistic::ChgPercent.index()))
            .sum();
        assert!((pct_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_stats_zero_total_is_error() {
        let mut stats: Grid<f64> = Grid::new(1, SummaryStatistic::COUNT, 0.0);
        let err = summary_stats(&mut stats, student_t_values(5), 0.0).unwrap_err();
        assert!(err.is_domain());
    }
}
