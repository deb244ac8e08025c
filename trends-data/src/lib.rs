/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

/*!
Domain data layer for the Trends toolset: the land-cover taxonomy,
workspace configuration, block attribute-table ingest, the per-ecoregion
and study-area containers with their derived views, and the CSV table
store that holds analysis results.
*/

pub mod config;
pub mod ingest;
pub mod model;
pub mod names;
pub mod registry;
pub mod restore;
pub mod store;
pub mod summary;
pub mod views;
