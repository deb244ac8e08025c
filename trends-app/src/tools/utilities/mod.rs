/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

// private sub-module defined in other files
mod delete_analysis_name;
mod list_analysis_names;

// exports identifiers from private sub-modules in the current module namespace
pub use self::delete_analysis_name::DeleteAnalysisName;
pub use self::list_analysis_names::ListAnalysisNames;
