/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use trends_common::error::{TrendsError, TrendsResult};
use trends_common::utils::is_interval_name;

/// Name of the workspace configuration file.
pub const CONFIG_FILE: &str = "trends.json";

/// Workspace configuration, read from `trends.json` in the working
/// directory. All directories are relative to the workspace root. A
/// missing configuration file yields the default layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendsWorkspace {
    #[serde(skip)]
    root: PathBuf,
    /// Directory of change-image attribute tables, one sub-directory
    /// per change interval.
    pub change_images: String,
    /// Directory of multichange attribute tables.
    pub multichange_images: String,
    /// Directory holding the analysis result tables.
    pub database: String,
    /// Pixel resolution of the change images, `30m` or `60m`.
    pub resolution: String,
    /// Intervals for which aggregate (cumulative gross) views are
    /// produced.
    pub aggregate_intervals: Vec<String>,
}

impl Default for TrendsWorkspace {
    fn default() -> TrendsWorkspace {
        TrendsWorkspace {
            root: PathBuf::new(),
            change_images: "change_images".to_string(),
            multichange_images: "multichange_images".to_string(),
            database: "database".to_string(),
            resolution: "60m".to_string(),
            aggregate_intervals: vec!["1973to2000".to_string()],
        }
    }
}

impl TrendsWorkspace {
    /// Opens the workspace rooted at `working_dir`, reading
    /// `trends.json` when present.
    pub fn open(working_dir: &str) -> TrendsResult<TrendsWorkspace> {
        let root = PathBuf::from(working_dir);
        let config_path = root.join(CONFIG_FILE);
        let mut workspace = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)?;
            serde_json::from_str::<TrendsWorkspace>(&contents)
                .map_err(|e| TrendsError::Parse(format!("{}: {}", CONFIG_FILE, e)))?
        } else {
            TrendsWorkspace::default()
        };
        workspace.root = root;
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn change_images_dir(&self) -> PathBuf {
        self.root.join(&self.change_images)
    }

    pub fn multichange_images_dir(&self) -> PathBuf {
        self.root.join(&self.multichange_images)
    }

    pub fn database_dir(&self) -> PathBuf {
        self.root.join(&self.database)
    }

    /// The change intervals available in this workspace: the
    /// sub-directory names of the change-image directory, each checked
    /// against the `YYYYtoYYYY` convention so that a stray directory is
    /// caught before it interferes with the analysis.
    pub fn change_intervals(&self) -> TrendsResult<Vec<String>> {
        interval_dirs(&self.change_images_dir(), "change image")
    }

    pub fn multichange_intervals(&self) -> TrendsResult<Vec<String>> {
        interval_dirs(&self.multichange_images_dir(), "multichange image")
    }
}

fn interval_dirs(dir: &Path, what: &str) -> TrendsResult<Vec<String>> {
    let mut intervals = vec![];
    if !dir.exists() {
        return Ok(intervals);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_interval_name(&name) {
            return Err(TrendsError::Domain(format!(
                "unexpected interval folder found in {} folder: {}",
                what, name
            )));
        }
        intervals.push(name);
    }
    intervals.sort();
    Ok(intervals)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_layout() {
        let ws = TrendsWorkspace::default();
        assert_eq!(ws.change_images, "change_images");
        assert_eq!(ws.resolution, "60m");
        assert_eq!(ws.aggregate_intervals, vec!["1973to2000".to_string()]);
    }

    #[test]
    fn test_open_with_config() {
        let dir = std::env::temp_dir().join("trends_config_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(CONFIG_FILE),
            r#"{ "resolution": "30m", "database": "tables" }"#,
        )
        .unwrap();
        let ws = TrendsWorkspace::open(dir.to_str().unwrap()).unwrap();
        assert_eq!(ws.resolution, "30m");
        assert!(ws.database_dir().ends_with("tables"));
        // Unspecified fields keep their defaults.
        assert_eq!(ws.change_images, "change_images");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_interval_dir_validation() {
        let dir = std::env::temp_dir().join("trends_interval_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("change_images/1973to1980")).unwrap();
        fs::create_dir_all(dir.join("change_images/not_an_interval")).unwrap();
        let ws = TrendsWorkspace::open(dir.to_str().unwrap()).unwrap();
        assert!(ws.change_intervals().is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
