/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

//! The analysis table store: one CSV file per logical table under the
//! workspace database directory, mirroring the paired data/statistics
//! tables of the original study database. Data rows carry one sample
//! block each; statistics rows one statistic each; in both cases the
//! taxonomy runs across the value columns.

use crate::model::{AllChangeSource, EcoregionStats, GlgnKind};
use crate::names;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use trends_common::error::{TrendsError, TrendsResult};
use trends_common::statistics::{Statistic, SummaryStatistic};
use trends_common::structures::Grid;
use trends_common::utils::TrendsLogger;

pub const ECOREGIONS_TABLE: &str = "Ecoregions";
pub const SUMMARY_ECOREGIONS_TABLE: &str = "SummaryEcoregions";
pub const SUMMARY_ANALYSIS_PARAMS_TABLE: &str = "SummaryAnalysisParams";
pub const ANALYSIS_NAMES_TABLE: &str = "AnalysisNames";

/// The table families, each a parallel pair of data and statistics
/// tables (summaries carry statistics only).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    Change,
    Glgn,
    Comp,
    Multichange,
    AllChange,
    Aggregate,
    AggGlgn,
}

impl Family {
    pub const ALL: [Family; 7] = [
        Family::Change,
        Family::Glgn,
        Family::Comp,
        Family::Multichange,
        Family::AllChange,
        Family::Aggregate,
        Family::AggGlgn,
    ];

    pub fn base_name(self) -> &'static str {
        match self {
            Family::Change => "Change",
            Family::Glgn => "Glgn",
            Family::Comp => "Comp",
            Family::Multichange => "Multichange",
            Family::AllChange => "AllChange",
            Family::Aggregate => "Aggregate",
            Family::AggGlgn => "AggGlgn",
        }
    }

    fn interval_field(self) -> &'static str {
        match self {
            Family::Comp => "CompYear",
            _ => "ChangePeriod",
        }
    }

    fn has_source_field(self) -> bool {
        matches!(self, Family::AllChange | Family::Aggregate | Family::AggGlgn)
    }

    fn has_glgn_field(self) -> bool {
        matches!(self, Family::Glgn | Family::AggGlgn)
    }

    /// Labels of the value columns, one per taxonomy row.
    pub fn value_labels(self) -> Vec<String> {
        match self {
            Family::Change | Family::Aggregate => {
                (1..=names::NUM_CONVERSIONS).map(|i| format!("CT{}", i)).collect()
            }
            Family::Glgn | Family::Comp | Family::AggGlgn => {
                (1..=names::NUM_LC_TYPES).map(|i| format!("LC{}", i)).collect()
            }
            Family::Multichange => (0..names::NUM_MULTI).map(|i| format!("MC{}", i)).collect(),
            Family::AllChange => vec!["TOTAL".to_string()],
        }
    }
}

/// Key fields shared by the rows of one table write. A summary write
/// has no ecoregion field and uses the summary statistic names.
#[derive(Clone, Debug)]
pub struct TableKey<'a> {
    pub analysis_num: usize,
    pub eco_num: Option<usize>,
    pub interval: &'a str,
    pub resolution: &'a str,
    pub source: Option<AllChangeSource>,
    pub glgn: Option<GlgnKind>,
}

impl<'a> TableKey<'a> {
    pub fn ecoregion(
        analysis_num: usize,
        eco_num: usize,
        interval: &'a str,
        resolution: &'a str,
    ) -> TableKey<'a> {
        TableKey {
            analysis_num,
            eco_num: Some(eco_num),
            interval,
            resolution,
            source: None,
            glgn: None,
        }
    }

    pub fn summary(analysis_num: usize, interval: &'a str, resolution: &'a str) -> TableKey<'a> {
        TableKey {
            analysis_num,
            eco_num: None,
            interval,
            resolution,
            source: None,
            glgn: None,
        }
    }

    pub fn with_source(mut self, source: AllChangeSource) -> TableKey<'a> {
        self.source = Some(source);
        self
    }

    pub fn with_glgn(mut self, glgn: GlgnKind) -> TableKey<'a> {
        self.glgn = Some(glgn);
        self
    }

    fn prefix(&self) -> &'static str {
        if self.eco_num.is_none() {
            "Summary"
        } else if self.analysis_num == names::TRENDS_ANALYSIS_NUM {
            "Trends"
        } else {
            "Custom"
        }
    }

    /// Pairs of (field name, value) for every fixed field of this key,
    /// in header order.
    fn fixed_fields(&self, family: Family) -> Vec<(String, String)> {
        let mut fields = vec![("AnalysisNum".to_string(), self.analysis_num.to_string())];
        if let Some(eco) = self.eco_num {
            fields.push(("EcoLevel3ID".to_string(), eco.to_string()));
        }
        fields.push((family.interval_field().to_string(), self.interval.to_string()));
        fields.push(("Resolution".to_string(), self.resolution.to_string()));
        if family.has_source_field() {
            let source = self.source.map(|s| s.name()).unwrap_or("gross");
            fields.push(("Source".to_string(), source.to_string()));
        }
        if family.has_glgn_field() {
            let glgn = self.glgn.map(|g| g.name()).unwrap_or("gain");
            fields.push(("Glgn".to_string(), glgn.to_string()));
        }
        fields
    }
}

/// CSV table store rooted at the workspace database directory.
pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    pub fn open(root: impl AsRef<Path>) -> TrendsResult<TableStore> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(TableStore { root })
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{}.csv", table))
    }

    pub fn table_exists(&self, table: &str) -> bool {
        self.table_path(table).exists()
    }

    /// Reads a whole table: the header row and the record rows.
    pub fn read_table(&self, table: &str) -> TrendsResult<(Vec<String>, Vec<Vec<String>>)> {
        let path = self.table_path(table);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(|e| TrendsError::Table(format!("{}: {}", path.display(), e)))?;
        let header: Vec<String> = reader
            .headers()
            .map_err(|e| TrendsError::Table(format!("{}: {}", path.display(), e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();
        let mut rows = vec![];
        for record in reader.records() {
            let record =
                record.map_err(|e| TrendsError::Table(format!("{}: {}", path.display(), e)))?;
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }
        Ok((header, rows))
    }

    fn write_table(
        &self,
        table: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> TrendsResult<()> {
        let path = self.table_path(table);
        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| TrendsError::Table(format!("{}: {}", path.display(), e)))?;
        writer
            .write_record(header)
            .map_err(|e| TrendsError::Table(format!("{}: {}", path.display(), e)))?;
        for row in rows {
            writer
                .write_record(row)
                .map_err(|e| TrendsError::Table(format!("{}: {}", path.display(), e)))?;
        }
        writer
            .flush()
            .map_err(|e| TrendsError::Table(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Replaces the rows matching the key fields, keeping everything
    /// else: rewriting an analysis overwrites its previous results.
    pub fn replace_rows(
        &self,
        table: &str,
        header: &[String],
        key: &[(String, String)],
        new_rows: Vec<Vec<String>>,
    ) -> TrendsResult<()> {
        let mut rows = if self.table_exists(table) {
            let (existing_header, existing_rows) = self.read_table(table)?;
            if existing_header != header {
                return Err(TrendsError::Table(format!(
                    "table {} has unexpected columns",
                    table
                )));
            }
            let key_indices: Vec<(usize, &String)> = key
                .iter()
                .map(|(name, value)| {
                    header
                        .iter()
                        .position(|h| h == name)
                        .map(|i| (i, value))
                        .ok_or_else(|| {
                            TrendsError::Table(format!("table {} has no column {}", table, name))
                        })
                })
                .collect::<TrendsResult<Vec<_>>>()?;
            existing_rows
                .into_iter()
                .filter(|row| {
                    !key_indices
                        .iter()
                        .all(|(i, value)| row.get(*i).map(String::as_str) == Some(value.as_str()))
                })
                .collect()
        } else {
            vec![]
        };
        rows.extend(new_rows);
        self.write_table(table, header, &rows)
    }

    /// Removes the rows matching the key fields. Returns the number of
    /// rows removed; a missing table removes nothing.
    pub fn delete_rows(&self, table: &str, key: &[(String, String)]) -> TrendsResult<usize> {
        if !self.table_exists(table) {
            return Ok(0);
        }
        let (header, rows) = self.read_table(table)?;
        let key_indices: Vec<(usize, &String)> = key
            .iter()
            .filter_map(|(name, value)| {
                header.iter().position(|h| h == name).map(|i| (i, value))
            })
            .collect();
        if key_indices.len() != key.len() {
            return Ok(0);
        }
        let before = rows.len();
        let kept: Vec<Vec<String>> = rows
            .into_iter()
            .filter(|row| {
                !key_indices
                    .iter()
                    .all(|(i, value)| row.get(*i).map(String::as_str) == Some(value.as_str()))
            })
            .collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.write_table(table, &header, &kept)?;
        }
        Ok(removed)
    }

    /// Rows of a table matching the filters, as field-name maps. A
    /// missing table selects nothing.
    pub fn select_rows(
        &self,
        table: &str,
        filters: &[(String, String)],
    ) -> TrendsResult<Vec<BTreeMap<String, String>>> {
        if !self.table_exists(table) {
            return Ok(vec![]);
        }
        let (header, rows) = self.read_table(table)?;
        let mut selected = vec![];
        for row in rows {
            let map: BTreeMap<String, String> = header
                .iter()
                .cloned()
                .zip(row.into_iter())
                .collect();
            if filters
                .iter()
                .all(|(name, value)| map.get(name).map(String::as_str) == Some(value.as_str()))
            {
                selected.push(map);
            }
        }
        Ok(selected)
    }

    fn header(&self, family: Family, key: &TableKey, label_field: &str) -> Vec<String> {
        let mut header: Vec<String> = key
            .fixed_fields(family)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        header.push(label_field.to_string());
        header.extend(family.value_labels());
        header
    }

    /// Writes the data grid of one view: one row per sample block, the
    /// taxonomy across the value columns.
    pub fn write_data(
        &self,
        family: Family,
        key: &TableKey,
        data: &Grid<i64>,
        blocks: &[usize],
    ) -> TrendsResult<()> {
        let table = format!("{}{}Data", key.prefix(), family.base_name());
        let header = self.header(family, key, "BlkLabel");
        let fixed = key.fixed_fields(family);
        let mut rows = vec![];
        for (col, block) in blocks.iter().enumerate() {
            let mut row: Vec<String> = fixed.iter().map(|(_, v)| v.clone()).collect();
            row.push(block.to_string());
            for ptr in 0..data.rows {
                row.push(data.get_value(ptr, col).to_string());
            }
            rows.push(row);
        }
        let replace_key = fixed;
        self.replace_rows(&table, &header, &replace_key, rows)
    }

    /// Writes the statistics grid of one view: one row per statistic.
    /// Summary keys use the summary statistic names.
    pub fn write_stats(&self, family: Family, key: &TableKey, stats: &Grid<f64>) -> TrendsResult<()> {
        let table = format!("{}{}Stats", key.prefix(), family.base_name());
        let header = self.header(family, key, "Statistic");
        let fixed = key.fixed_fields(family);
        let stat_names: Vec<&'static str> = if key.eco_num.is_none() {
            SummaryStatistic::ALL.iter().map(|s| s.name()).collect()
        } else {
            Statistic::ALL.iter().map(|s| s.name()).collect()
        };
        if stats.columns != stat_names.len() {
            return Err(TrendsError::Table(format!(
                "statistics grid for table {} has {} columns, expected {}",
                table,
                stats.columns,
                stat_names.len()
            )));
        }
        let mut rows = vec![];
        for (index, name) in stat_names.iter().enumerate() {
            let mut row: Vec<String> = fixed.iter().map(|(_, v)| v.clone()).collect();
            row.push(name.to_string());
            for ptr in 0..stats.rows {
                row.push(stats.get_value(ptr, index).to_string());
            }
            rows.push(row);
        }
        let replace_key = fixed;
        self.replace_rows(&table, &header, &replace_key, rows)
    }

    /// Records the analysis parameters of one ecoregion (or of a
    /// summary when `eco_num` is zero) in a parameter table.
    #[allow(clippy::too_many_arguments)]
    pub fn update_parameters(
        &self,
        table: &str,
        analysis_num: usize,
        eco_num: usize,
        sample_blocks: usize,
        total_blocks: usize,
        total_pixels: f64,
        student_t: [f64; 4],
        resolution: &str,
        run_type: &str,
    ) -> TrendsResult<()> {
        let header: Vec<String> = [
            "AnalysisNum",
            "EcoLevel3ID",
            "SampleBlocks",
            "TotalBlocks",
            "TotalPixels",
            "StudentT_85",
            "StudentT_90",
            "StudentT_95",
            "StudentT_99",
            "Resolution",
            "RunType",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let key = vec![
            ("AnalysisNum".to_string(), analysis_num.to_string()),
            ("EcoLevel3ID".to_string(), eco_num.to_string()),
        ];
        let row = vec![
            analysis_num.to_string(),
            eco_num.to_string(),
            sample_blocks.to_string(),
            total_blocks.to_string(),
            total_pixels.to_string(),
            student_t[0].to_string(),
            student_t[1].to_string(),
            student_t[2].to_string(),
            student_t[3].to_string(),
            resolution.to_string(),
            run_type.to_string(),
        ];
        self.replace_rows(table, &header, &key, vec![row])
    }

    /// Writes every computed view of an ecoregion to its data and
    /// statistics tables, then records the analysis parameters.
    pub fn store_ecoregion(
        &self,
        eco: &EcoregionStats,
        analysis_num: usize,
        logger: &TrendsLogger,
    ) -> TrendsResult<()> {
        let blocks = eco.sorted_blocks();
        let resolution = eco.resolution.clone();

        for (interval, pair) in &eco.eco_data {
            let key = TableKey::ecoregion(analysis_num, eco.eco_num, interval, &resolution);
            self.write_data(Family::Change, &key, &pair.data, &blocks)?;
            self.write_stats(Family::Change, &key, &pair.stats)?;
        }

        for (interval, glgn) in &eco.eco_glgn {
            for kind in GlgnKind::ALL {
                let key = TableKey::ecoregion(analysis_num, eco.eco_num, interval, &resolution)
                    .with_glgn(kind);
                let pair = glgn.get(kind);
                self.write_data(Family::Glgn, &key, &pair.data, &blocks)?;
                self.write_stats(Family::Glgn, &key, &pair.stats)?;
            }
        }

        for (year, pair) in &eco.eco_comp {
            let key = TableKey::ecoregion(analysis_num, eco.eco_num, year, &resolution);
            self.write_data(Family::Comp, &key, &pair.data, &blocks)?;
            self.write_stats(Family::Comp, &key, &pair.stats)?;
        }

        for (interval, pair) in &eco.eco_multi {
            let key = TableKey::ecoregion(analysis_num, eco.eco_num, interval, &resolution);
            self.write_data(Family::Multichange, &key, &pair.data, &blocks)?;
            self.write_stats(Family::Multichange, &key, &pair.stats)?;
        }

        for (interval, sources) in &eco.all_change {
            for (source, pair) in sources {
                let key = TableKey::ecoregion(analysis_num, eco.eco_num, interval, &resolution)
                    .with_source(*source);
                self.write_data(Family::AllChange, &key, &pair.data, &blocks)?;
                self.write_stats(Family::AllChange, &key, &pair.stats)?;
            }
        }

        for (interval, pair) in &eco.aggregate {
            let key = TableKey::ecoregion(analysis_num, eco.eco_num, interval, &resolution)
                .with_source(AllChangeSource::AddGross);
            self.write_data(Family::Aggregate, &key, &pair.data, &blocks)?;
            self.write_stats(Family::Aggregate, &key, &pair.stats)?;
        }

        for (interval, glgn) in &eco.agg_glgn {
            for kind in GlgnKind::ALL {
                let key = TableKey::ecoregion(analysis_num, eco.eco_num, interval, &resolution)
                    .with_source(AllChangeSource::AddGross)
                    .with_glgn(kind);
                let pair = glgn.get(kind);
                self.write_data(Family::AggGlgn, &key, &pair.data, &blocks)?;
                self.write_stats(Family::AggGlgn, &key, &pair.stats)?;
            }
        }

        let params_table = match eco.run_type {
            crate::model::RunType::FullStratified => ECOREGIONS_TABLE,
            crate::model::RunType::PartialStratified => SUMMARY_ECOREGIONS_TABLE,
        };
        self.update_parameters(
            params_table,
            analysis_num,
            eco.eco_num,
            eco.design.sample_blocks,
            eco.design.total_blocks,
            eco.design.total_est_pixels,
            eco.design.student_t,
            &resolution,
            eco.run_type.name(),
        )?;
        logger.write(&format!(
            "Stored statistics tables for ecoregion {}",
            eco.eco_num
        ));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{EcoregionStats, RunType};
    use crate::names::transition_id;
    use std::fs;
    use std::path::PathBuf;
    use trends_common::utils::TrendsLogger;

    fn scratch_store(name: &str) -> (PathBuf, TableStore) {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        let store = TableStore::open(&dir).unwrap();
        (dir, store)
    }

    #[test]
    fn test_replace_rows_overwrites_matching_keys() {
        let (dir, store) = scratch_store("trends_store_replace_test");
        let header: Vec<String> = vec!["A".into(), "B".into(), "V".into()];
        let key = vec![("A".to_string(), "1".to_string())];
        store
            .replace_rows(
                "T",
                &header,
                &key,
                vec![vec!["1".into(), "x".into(), "10".into()]],
            )
            .unwrap();
        store
            .replace_rows(
                "T",
                &header,
                &[("A".to_string(), "2".to_string())],
                vec![vec!["2".into(), "y".into(), "20".into()]],
            )
            .unwrap();
        // Rewriting key A=1 replaces the first row only.
        store
            .replace_rows(
                "T",
                &header,
                &key,
                vec![vec!["1".into(), "x".into(), "99".into()]],
            )
            .unwrap();
        let rows = store.select_rows("T", &[]).unwrap();
        assert_eq!(rows.len(), 2);
        let a1 = store
            .select_rows("T", &[("A".to_string(), "1".to_string())])
            .unwrap();
        assert_eq!(a1[0]["V"], "99");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_store_and_select_ecoregion_tables() {
        let (dir, store) = scratch_store("trends_store_eco_test");
        let logger = TrendsLogger::quiet();
        let intervals = vec!["1973to1980".to_string(), "1980to1986".to_string()];
        let mut eco = EcoregionStats::new(
            7,
            100,
            2,
            "60m",
            RunType::FullStratified,
            vec![4, 9],
            vec![],
            &intervals,
            &[],
            &["1973to1986".to_string()],
            &logger,
        )
        .unwrap();
        let id = transition_id(1, 6) - 1;
        eco.eco_data.get_mut("1973to1980").unwrap().data.set_value(id, 0, 8);
        eco.eco_data.get_mut("1980to1986").unwrap().data.set_value(id, 1, 3);
        eco.perform_statistics(&logger).unwrap();
        store.store_ecoregion(&eco, 1, &logger).unwrap();

        // Data round-trip: block 4 of the first interval holds 8 pixels
        // in the CT column of the conversion.
        let rows = store
            .select_rows(
                "TrendsChangeData",
                &[
                    ("EcoLevel3ID".to_string(), "7".to_string()),
                    ("ChangePeriod".to_string(), "1973to1980".to_string()),
                    ("BlkLabel".to_string(), "4".to_string()),
                ],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][&format!("CT{}", id + 1)], "8");

        // Statistics rows: 16 per interval.
        let stats = store
            .select_rows(
                "TrendsChangeStats",
                &[("ChangePeriod".to_string(), "1973to1980".to_string())],
            )
            .unwrap();
        assert_eq!(stats.len(), 16);

        // Derived views landed in their own tables.
        assert!(store.table_exists("TrendsGlgnData"));
        assert!(store.table_exists("TrendsCompStats"));
        assert!(store.table_exists("TrendsAllChangeStats"));
        assert!(store.table_exists("TrendsAggregateData"));
        assert!(store.table_exists(ECOREGIONS_TABLE));

        // Glgn rows are keyed by kind.
        let gains = store
            .select_rows(
                "TrendsGlgnData",
                &[
                    ("Glgn".to_string(), "gain".to_string()),
                    ("ChangePeriod".to_string(), "1973to1980".to_string()),
                    ("BlkLabel".to_string(), "4".to_string()),
                ],
            )
            .unwrap();
        assert_eq!(gains.len(), 1);
        assert_eq!(gains[0]["LC6"], "8");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_custom_prefix_for_non_trends_analysis() {
        let (dir, store) = scratch_store("trends_store_custom_test");
        let key = TableKey::ecoregion(4, 7, "1973to1980", "60m");
        let data = Grid::new(names::NUM_CONVERSIONS, 1, 0);
        store.write_data(Family::Change, &key, &data, &[16]).unwrap();
        assert!(store.table_exists("CustomChangeData"));
        assert!(!store.table_exists("TrendsChangeData"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_summary_stats_write_uses_summary_names() {
        let (dir, store) = scratch_store("trends_store_summary_test");
        let key = TableKey::summary(3, "1973to1980", "60m");
        let stats = Grid::new(names::NUM_CONVERSIONS, SummaryStatistic::COUNT, 0.0);
        store.write_stats(Family::Change, &key, &stats).unwrap();
        let rows = store.select_rows("SummaryChangeStats", &[]).unwrap();
        assert_eq!(rows.len(), SummaryStatistic::COUNT);
        assert!(rows.iter().any(|r| r["Statistic"] == "TotalChng"));
        assert!(!rows.iter().any(|r| r["Statistic"] == "Mean"));
        let _ = fs::remove_dir_all(&dir);
    }
}
