/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

//! Loads per-block pixel-conversion counts from change-image attribute
//! tables into the ecoregion data arrays. An attribute table is the CSV
//! `Value,Count` listing of one classified change image; an index table
//! in each image directory maps (ecoregion, interval, resolution,
//! block) to the attribute-table file.

use crate::config::TrendsWorkspace;
use crate::model::{EcoregionStats, RunType};
use crate::names;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use trends_common::error::{TrendsError, TrendsResult};
use trends_common::utils::{parse_number_list, TrendsLogger};

/// Name of the image index table inside each image directory.
pub const CHANGE_IMAGE_INDEX: &str = "change_images.csv";
pub const MULTICHANGE_IMAGE_INDEX: &str = "multichange_images.csv";

/// Name of the ecoregion definition table at the workspace root.
pub const ECOREGIONS_FILE: &str = "ecoregions.csv";

/// One row of the workspace `ecoregions.csv` table: the sampling design
/// of an ecoregion and its sample block numbers.
#[derive(Clone, Debug, Deserialize)]
pub struct EcoregionDef {
    #[serde(rename = "Ecoregion")]
    pub ecoregion: usize,
    #[serde(rename = "TotalBlocks")]
    pub total_blocks: usize,
    #[serde(rename = "SampleBlocks")]
    pub sample_blocks: usize,
    #[serde(rename = "Resolution")]
    pub resolution: String,
    /// Block numbers as a number list, e.g. `16,18,32-35`.
    #[serde(rename = "Blocks")]
    pub blocks: String,
}

impl EcoregionDef {
    pub fn block_numbers(&self) -> TrendsResult<Vec<usize>> {
        parse_number_list(&self.blocks)
    }
}

/// Reads the ecoregion definitions of a workspace.
pub fn read_ecoregion_defs(workspace: &TrendsWorkspace) -> TrendsResult<Vec<EcoregionDef>> {
    let path = workspace.root().join(ECOREGIONS_FILE);
    if !path.exists() {
        return Err(TrendsError::Domain(format!(
            "no {} table found in workspace",
            ECOREGIONS_FILE
        )));
    }
    let mut reader = csv::Reader::from_path(&path)
        .map_err(|e| TrendsError::Table(format!("{}: {}", path.display(), e)))?;
    let mut defs = vec![];
    for record in reader.deserialize() {
        let def: EcoregionDef =
            record.map_err(|e| TrendsError::Table(format!("{}: {}", path.display(), e)))?;
        defs.push(def);
    }
    Ok(defs)
}

/// Returns the definition of one ecoregion.
pub fn find_ecoregion_def(
    workspace: &TrendsWorkspace,
    eco_num: usize,
) -> TrendsResult<EcoregionDef> {
    read_ecoregion_defs(workspace)?
        .into_iter()
        .find(|def| def.ecoregion == eco_num)
        .ok_or_else(|| {
            TrendsError::Domain(format!(
                "ecoregion {} not found in {}",
                eco_num, ECOREGIONS_FILE
            ))
        })
}

#[derive(Debug, Deserialize)]
struct ImageIndexRecord {
    #[serde(rename = "Ecoregion")]
    ecoregion: usize,
    #[serde(rename = "ChangePeriod")]
    change_period: String,
    #[serde(rename = "Resolution")]
    resolution: String,
    #[serde(rename = "BlkLabel")]
    blk_label: usize,
    #[serde(rename = "ImageLocation")]
    image_location: String,
}

#[derive(Debug, Deserialize)]
struct AttributeRow {
    #[serde(rename = "Value")]
    value: i64,
    #[serde(rename = "Count")]
    count: i64,
}

/// The attribute-table files for one (ecoregion, interval, resolution),
/// keyed by block number. Only blocks in the ecoregion's sample list
/// are returned.
fn select_image_files(
    index_path: &Path,
    eco: &EcoregionStats,
    interval: &str,
) -> TrendsResult<BTreeMap<usize, String>> {
    let mut files = BTreeMap::new();
    if !index_path.exists() {
        return Ok(files);
    }
    let mut reader = csv::Reader::from_path(index_path)
        .map_err(|e| TrendsError::Table(format!("{}: {}", index_path.display(), e)))?;
    for record in reader.deserialize() {
        let record: ImageIndexRecord =
            record.map_err(|e| TrendsError::Table(format!("{}: {}", index_path.display(), e)))?;
        if record.ecoregion == eco.eco_num
            && record.change_period == interval
            && record.resolution == eco.resolution
            && eco.strat_blocks.contains(&record.blk_label)
        {
            files.insert(record.blk_label, record.image_location);
        }
    }
    Ok(files)
}

fn read_attribute_table(path: &Path) -> TrendsResult<Vec<AttributeRow>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| TrendsError::Table(format!("{}: {}", path.display(), e)))?;
    let mut rows = vec![];
    for record in reader.deserialize() {
        let row: AttributeRow =
            record.map_err(|e| TrendsError::Table(format!("{}: {}", path.display(), e)))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Loads the conversion counts for one ecoregion and change interval.
/// Returns whether any data was found.
pub fn load_change_image_data(
    workspace: &TrendsWorkspace,
    eco: &mut EcoregionStats,
    interval: &str,
    logger: &TrendsLogger,
) -> TrendsResult<bool> {
    logger.write(&format!(
        "Loading data for ecoregion {} and interval {}",
        eco.eco_num, interval
    ));

    let index_path = workspace.change_images_dir().join(CHANGE_IMAGE_INDEX);
    let change_files = select_image_files(&index_path, eco, interval)?;

    if change_files.len() > eco.design.sample_blocks {
        logger.write(&format!(
            "Found {} change files but expected only {}",
            change_files.len(),
            eco.design.sample_blocks
        ));
        return Err(TrendsError::Domain(
            "more block images found than expected - unable to process ecoregion".to_string(),
        ));
    }

    logger.write(&format!(
        "N= {} n= {}",
        eco.design.total_blocks, eco.design.sample_blocks
    ));
    if change_files.len() < eco.design.sample_blocks
        && !change_files.is_empty()
        && eco.run_type == RunType::FullStratified
    {
        logger.warn(&format!(
            "found only {} images in the change image table",
            change_files.len()
        ));
    }

    for (block, location) in &change_files {
        let column = eco.column[block];
        let path = workspace.root().join(location);
        for row in read_attribute_table(&path)? {
            if row.count > 0 && row.value > 0 && row.value <= names::NUM_CONVERSIONS as i64 {
                if let Some(pair) = eco.eco_data.get_mut(interval) {
                    pair.data.set_value(row.value as usize - 1, column, row.count);
                }
            }
        }
    }

    Ok(!change_files.is_empty() || !eco.split_blocks.is_empty())
}

/// Loads the multichange footprint counts for one ecoregion and
/// multichange interval. Returns whether any data was found.
pub fn load_multichange_data(
    workspace: &TrendsWorkspace,
    eco: &mut EcoregionStats,
    multi_interval: &str,
    logger: &TrendsLogger,
) -> TrendsResult<bool> {
    logger.write(&format!(
        "Loading multichange data for ecoregion {} and interval {}",
        eco.eco_num, multi_interval
    ));

    let index_path = workspace
        .multichange_images_dir()
        .join(MULTICHANGE_IMAGE_INDEX);
    let change_files = select_image_files(&index_path, eco, multi_interval)?;

    let changes = eco
        .multi_changes
        .get(multi_interval)
        .copied()
        .unwrap_or(names::NUM_MULTI) as i64;

    for (block, location) in &change_files {
        let column = eco.column[block];
        let path = workspace.root().join(location);
        for row in read_attribute_table(&path)? {
            if row.count > 0 && row.value >= 0 && row.value <= changes {
                if let Some(pair) = eco.eco_multi.get_mut(multi_interval) {
                    pair.data.set_value(row.value as usize, column, row.count);
                }
            }
        }
    }

    Ok(!change_files.is_empty() || !eco.split_blocks.is_empty())
}

/// Loads every interval of an ecoregion, dropping intervals with no
/// data. Returns false when the ecoregion has no change data at all.
pub fn load_ecoregion_data(
    workspace: &TrendsWorkspace,
    eco: &mut EcoregionStats,
    logger: &TrendsLogger,
) -> TrendsResult<bool> {
    let intervals: Vec<String> = eco.eco_data.keys().cloned().collect();
    let mut no_intervals = vec![];
    for interval in &intervals {
        if !load_change_image_data(workspace, eco, interval, logger)? {
            logger.write(&format!(
                "No data or analysis for ecoregion {} and interval {}",
                eco.eco_num, interval
            ));
            no_intervals.push(interval.clone());
        }
    }

    if no_intervals.len() == intervals.len() {
        eco.drop_empty_intervals(&no_intervals, &[]);
        return Ok(false);
    }

    let multi_intervals: Vec<String> = eco.eco_multi.keys().cloned().collect();
    let mut no_multi = vec![];
    for interval in &multi_intervals {
        if !load_multichange_data(workspace, eco, interval, logger)? {
            logger.write(&format!(
                "No multichange data or analysis for ecoregion {}",
                eco.eco_num
            ));
            no_multi.push(interval.clone());
        }
    }

    eco.drop_empty_intervals(&no_intervals, &no_multi);
    Ok(true)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::RunType;
    use crate::names::transition_id;
    use std::fs;
    use std::path::PathBuf;
    use trends_common::utils::TrendsLogger;

    fn scratch_workspace(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("change_images/1973to1980")).unwrap();
        fs::create_dir_all(dir.join("multichange_images")).unwrap();
        dir
    }

    fn write_index(dir: &PathBuf, rows: &[(usize, &str, &str, usize, &str)]) {
        let mut contents =
            String::from("Ecoregion,ChangePeriod,Resolution,BlkLabel,ImageLocation\n");
        for (eco, interval, res, block, path) in rows {
            contents.push_str(&format!("{},{},{},{},{}\n", eco, interval, res, block, path));
        }
        fs::write(dir.join("change_images").join(CHANGE_IMAGE_INDEX), contents).unwrap();
    }

    fn test_eco(logger: &TrendsLogger) -> EcoregionStats {
        EcoregionStats::new(
            7,
            100,
            2,
            "60m",
            RunType::FullStratified,
            vec![4, 9],
            vec![],
            &["1973to1980".to_string()],
            &[],
            &[],
            logger,
        )
        .unwrap()
    }

    #[test]
    fn test_load_change_image_data() {
        let dir = scratch_workspace("trends_ingest_test");
        write_index(
            &dir,
            &[
                (7, "1973to1980", "60m", 4, "change_images/1973to1980/eco7_blk4.csv"),
                (7, "1973to1980", "60m", 9, "change_images/1973to1980/eco7_blk9.csv"),
                // A different ecoregion's image is not picked up.
                (8, "1973to1980", "60m", 4, "change_images/1973to1980/eco8_blk4.csv"),
            ],
        );
        let id = transition_id(1, 6);
        fs::write(
            dir.join("change_images/1973to1980/eco7_blk4.csv"),
            format!("Value,Count\n{},25\n1,10\n0,99\n200,5\n-3,7\n", id),
        )
        .unwrap();
        fs::write(
            dir.join("change_images/1973to1980/eco7_blk9.csv"),
            format!("Value,Count\n{},4\n", id),
        )
        .unwrap();

        let workspace = TrendsWorkspace::open(dir.to_str().unwrap()).unwrap();
        let logger = TrendsLogger::quiet();
        let mut eco = test_eco(&logger);
        let found = load_change_image_data(&workspace, &mut eco, "1973to1980", &logger).unwrap();
        assert!(found);

        let data = &eco.eco_data["1973to1980"].data;
        assert_eq!(data.get_value(id - 1, 0), 25);
        assert_eq!(data.get_value(id - 1, 1), 4);
        assert_eq!(data.get_value(0, 0), 10);
        // Out-of-range values (0, 200, -3) were screened out.
        assert_eq!(data.total(), 39);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_excess_blocks_is_error() {
        let dir = scratch_workspace("trends_ingest_excess_test");
        write_index(
            &dir,
            &[
                (7, "1973to1980", "60m", 4, "a.csv"),
                (7, "1973to1980", "60m", 9, "b.csv"),
                (7, "1973to1980", "60m", 12, "c.csv"),
            ],
        );
        let workspace = TrendsWorkspace::open(dir.to_str().unwrap()).unwrap();
        let logger = TrendsLogger::quiet();
        let mut eco = EcoregionStats::new(
            7,
            100,
            3,
            "60m",
            RunType::FullStratified,
            vec![4, 9, 12],
            vec![],
            &["1973to1980".to_string()],
            &[],
            &[],
            &logger,
        )
        .unwrap();
        // Shrink the declared sample count below the files on disk.
        eco.design.sample_blocks = 2;
        let result = load_change_image_data(&workspace, &mut eco, "1973to1980", &logger);
        assert!(result.is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_no_data_ecoregion() {
        let dir = scratch_workspace("trends_ingest_nodata_test");
        write_index(&dir, &[]);
        let workspace = TrendsWorkspace::open(dir.to_str().unwrap()).unwrap();
        let logger = TrendsLogger::quiet();
        let mut eco = test_eco(&logger);
        let found = load_ecoregion_data(&workspace, &mut eco, &logger).unwrap();
        assert!(!found);
        assert!(eco.eco_data.is_empty());
        let _ = fs::remove_dir_all(&dir);
    }
}
