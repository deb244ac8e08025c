/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

// private sub-module defined in other files
mod ecoregion_analysis;
mod summary_analysis;

// exports identifiers from private sub-modules in the current module namespace
pub use self::ecoregion_analysis::EcoregionAnalysis;
pub use self::summary_analysis::SummaryAnalysis;
