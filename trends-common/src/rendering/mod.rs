/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

// private sub-module defined in other files
mod html;

// exports identifiers from private sub-modules in the current module namespace
pub use self::html::{get_css, report_head, report_tail, ReportTable};
