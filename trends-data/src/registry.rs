/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

//! The analysis-name registry: maps each analysis name to the number
//! used as the key of its table rows. The standard `TRENDS` analysis is
//! pinned to number 1 and cannot be removed.

use crate::names;
use crate::store::{
    Family, TableStore, ANALYSIS_NAMES_TABLE, SUMMARY_ANALYSIS_PARAMS_TABLE,
    SUMMARY_ECOREGIONS_TABLE,
};
use trends_common::error::{TrendsError, TrendsResult};

fn header() -> Vec<String> {
    vec!["AnalysisNum".to_string(), "AnalysisName".to_string()]
}

/// Analysis names are stored upper case, as typed names from different
/// sources must compare equal.
fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

/// All registered analyses, sorted by number.
pub fn list_analyses(store: &TableStore) -> TrendsResult<Vec<(usize, String)>> {
    seed(store)?;
    let rows = store.select_rows(ANALYSIS_NAMES_TABLE, &[])?;
    let mut analyses = vec![];
    for row in rows {
        let num = row
            .get("AnalysisNum")
            .and_then(|v| v.parse::<usize>().ok())
            .ok_or_else(|| TrendsError::Table("bad AnalysisNum in registry".to_string()))?;
        let name = row
            .get("AnalysisName")
            .cloned()
            .unwrap_or_default();
        analyses.push((num, name));
    }
    analyses.sort();
    Ok(analyses)
}

pub fn find_analysis(store: &TableStore, name: &str) -> TrendsResult<Option<usize>> {
    let name = normalize(name);
    Ok(list_analyses(store)?
        .into_iter()
        .find(|(_, n)| *n == name)
        .map(|(num, _)| num))
}

/// Returns the number of the named analysis, registering it with the
/// next free number if it is new.
pub fn get_or_create_analysis(store: &TableStore, name: &str) -> TrendsResult<usize> {
    let name = normalize(name);
    if name.is_empty() {
        return Err(TrendsError::Domain("analysis name is empty".to_string()));
    }
    let analyses = list_analyses(store)?;
    if let Some((num, _)) = analyses.iter().find(|(_, n)| *n == name) {
        return Ok(*num);
    }
    let next = analyses.iter().map(|(num, _)| *num).max().unwrap_or(0) + 1;
    store.replace_rows(
        ANALYSIS_NAMES_TABLE,
        &header(),
        &[("AnalysisNum".to_string(), next.to_string())],
        vec![vec![next.to_string(), name]],
    )?;
    Ok(next)
}

/// Removes an analysis from the registry along with every table row it
/// produced. The standard analysis is protected.
pub fn delete_analysis(store: &TableStore, name: &str) -> TrendsResult<usize> {
    let name = normalize(name);
    if name == names::TRENDS_ANALYSIS_NAME {
        return Err(TrendsError::Domain(
            "the standard TRENDS analysis cannot be deleted".to_string(),
        ));
    }
    let num = find_analysis(store, &name)?.ok_or_else(|| {
        TrendsError::Domain(format!("analysis name {} not found", name))
    })?;

    let key = vec![("AnalysisNum".to_string(), num.to_string())];
    let mut removed = 0;
    for family in Family::ALL {
        removed += store.delete_rows(&format!("Custom{}Data", family.base_name()), &key)?;
        removed += store.delete_rows(&format!("Custom{}Stats", family.base_name()), &key)?;
        removed += store.delete_rows(&format!("Summary{}Stats", family.base_name()), &key)?;
    }
    removed += store.delete_rows(SUMMARY_ECOREGIONS_TABLE, &key)?;
    removed += store.delete_rows(SUMMARY_ANALYSIS_PARAMS_TABLE, &key)?;
    store.delete_rows(ANALYSIS_NAMES_TABLE, &key)?;
    Ok(removed)
}

/// Makes sure the registry exists and carries the standard analysis.
fn seed(store: &TableStore) -> TrendsResult<()> {
    if !store.table_exists(ANALYSIS_NAMES_TABLE) {
        store.replace_rows(
            ANALYSIS_NAMES_TABLE,
            &header(),
            &[],
            vec![vec![
                names::TRENDS_ANALYSIS_NUM.to_string(),
                names::TRENDS_ANALYSIS_NAME.to_string(),
            ]],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn scratch_store(name: &str) -> (std::path::PathBuf, TableStore) {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        let store = TableStore::open(&dir).unwrap();
        (dir, store)
    }

    #[test]
    fn test_registry_seeds_trends() {
        let (dir, store) = scratch_store("trends_registry_seed_test");
        let analyses = list_analyses(&store).unwrap();
        assert_eq!(analyses, vec![(1, "TRENDS".to_string())]);
        assert_eq!(get_or_create_analysis(&store, "trends").unwrap(), 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_new_names_get_next_number() {
        let (dir, store) = scratch_store("trends_registry_next_test");
        assert_eq!(get_or_create_analysis(&store, "West Coast").unwrap(), 2);
        assert_eq!(get_or_create_analysis(&store, "WEST COAST").unwrap(), 2);
        assert_eq!(get_or_create_analysis(&store, "Deserts").unwrap(), 3);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_delete_analysis_cascades() {
        let (dir, store) = scratch_store("trends_registry_delete_test");
        let num = get_or_create_analysis(&store, "Deserts").unwrap();
        // A couple of rows belonging to the analysis.
        store
            .replace_rows(
                "CustomChangeData",
                &["AnalysisNum".to_string(), "V".to_string()],
                &[],
                vec![vec![num.to_string(), "1".to_string()]],
            )
            .unwrap();
        assert!(delete_analysis(&store, "deserts").unwrap() > 0);
        assert!(find_analysis(&store, "Deserts").unwrap().is_none());
        assert!(store.select_rows("CustomChangeData", &[]).unwrap().is_empty());
        // TRENDS is protected.
        assert!(delete_analysis(&store, "TRENDS").is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
