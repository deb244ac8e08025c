/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

// private sub-module defined in other files
mod estimators;
mod trend;

// exports identifiers from private sub-modules in the current module namespace
pub use self::estimators::{
    data_stats, student_t_values, summary_stats, total_estimated_pixels, SamplingDesign,
    Statistic, SummaryStatistic, NO_STUDENT_T,
};
pub use self::trend::{student_wilcoxon, wilcoxon_signed_rank, TrendTest, NO_P_VALUE};
