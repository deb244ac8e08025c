/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

// private sub-module defined in other files
mod grid;

// exports identifiers from private sub-modules in the current module namespace
pub use self::grid::Grid;
