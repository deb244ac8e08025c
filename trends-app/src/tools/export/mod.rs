/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

// private sub-module defined in other files
mod export_table_to_csv;
mod fixed_width_tables;
mod workbook_report;

// exports identifiers from private sub-modules in the current module namespace
pub use self::export_table_to_csv::ExportTableToCsv;
pub use self::fixed_width_tables::FixedWidthTables;
pub use self::workbook_report::WorkbookReport;
