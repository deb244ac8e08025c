/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

use crate::tools::*;
use std::env;
use std::io::{Error, ErrorKind};
use std::path;
use std::time::Instant;
use trends_common::error::TrendsError;
use trends_common::utils::{get_formatted_elapsed_time, parse_number_list, TrendsLogger};
use trends_data::config::TrendsWorkspace;
use trends_data::ingest::{find_ecoregion_def, load_ecoregion_data};
use trends_data::model::{EcoregionStats, RunType};
use trends_data::names;
use trends_data::registry;
use trends_data::store::TableStore;

/// This tool runs the stratified-sampling change statistics for one or
/// more ecoregions (`--ecoregions`): the per-block conversion counts are
/// loaded from the change-image attribute tables of the workspace, the
/// finite-population estimators and the derived gain/loss/gross/net,
/// composition, multichange, all-change, and aggregate views are
/// computed, and every data/statistics table pair is written to the
/// workspace database. The standard full-stratified run uses the
/// `TRENDS` analysis name; a partial run over a subset of blocks
/// (`--blocks`, with `--total_blocks` for the partial population size)
/// must use a custom analysis name (`--analysis_name`) and is stored in
/// the custom tables.
///
/// # See Also
/// `SummaryAnalysis`, `WorkbookReport`
pub struct EcoregionAnalysis {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl EcoregionAnalysis {
    pub fn new() -> EcoregionAnalysis {
        // public constructor
        let name = "EcoregionAnalysis".to_string();
        let toolbox = "Trends Analysis".to_string();
        let description =
            "Computes stratified-sampling change statistics and derived views for ecoregions."
                .to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Ecoregions".to_owned(),
            flags: vec!["--ecoregions".to_owned()],
            description: "Ecoregion numbers to analyze, e.g. 1,5,9-12.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Analysis Name".to_owned(),
            flags: vec!["--analysis_name".to_owned()],
            description: "Analysis name; defaults to the standard TRENDS analysis.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: Some("TRENDS".to_string()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Sample Blocks".to_owned(),
            flags: vec!["--blocks".to_owned()],
            description:
                "Subset of sample blocks for a partial run; requires a custom analysis name."
                    .to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Total Blocks".to_owned(),
            flags: vec!["--total_blocks".to_owned()],
            description: "Total block count N for a partial run.".to_owned(),
            parameter_type: ParameterType::Integer,
            default_value: None,
            optional: true,
        });

        let sep: String = path::MAIN_SEPARATOR.to_string();
        let p = format!("{}", env::current_dir().unwrap().display());
        let e = format!("{}", env::current_exe().unwrap().display());
        let mut short_exe = e
            .replace(&p, "")
            .replace(".exe", "")
            .replace('.', "")
            .replace(&sep, "");
        if e.contains(".exe") {
            short_exe += ".exe";
        }
        let usage = format!(
            ">>.*{0} -r={1} -v --wd=\"*path*to*workspace*\" --ecoregions=7,12",
            short_exe, name
        )
        .replace('*', &sep);

        EcoregionAnalysis {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

impl TrendsTool for EcoregionAnalysis {
    fn get_tool_name(&self) -> String {
        self.name.clone()
    }

    fn get_tool_description(&self) -> String {
        self.description.clone()
    }

    fn get_tool_parameters(&self) -> String {
        parameters_to_json(&self.parameters)
    }

    fn get_example_usage(&self) -> String {
        self.example_usage.clone()
    }

    fn get_toolbox(&self) -> String {
        self.toolbox.clone()
    }

    fn run<'a>(
        &self,
        args: Vec<String>,
        working_directory: &'a str,
        verbose: bool,
    ) -> Result<(), Error> {
        let mut ecoregions = String::new();
        let mut analysis_name = names::TRENDS_ANALYSIS_NAME.to_string();
        let mut blocks_arg = String::new();
        let mut total_blocks_arg = String::new();

        if args.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Tool run with no parameters.",
            ));
        }
        for i in 0..args.len() {
            let mut arg = args[i].replace('\"', "");
            arg = arg.replace('\'', "");
            let cmd = arg.split('='); // in case an equals sign was used
            let vec = cmd.collect::<Vec<&str>>();
            let mut keyval = false;
            if vec.len() > 1 {
                keyval = true;
            }
            if vec[0].to_lowercase() == "--ecoregions" {
                ecoregions = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if vec[0].to_lowercase() == "--analysis_name" {
                analysis_name = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if vec[0].to_lowercase() == "--blocks" {
                blocks_arg = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if vec[0].to_lowercase() == "--total_blocks" {
                total_blocks_arg = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            }
        }

        print_welcome(&self.get_tool_name(), verbose);

        let start = Instant::now();

        if ecoregions.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The --ecoregions parameter must be specified.",
            ));
        }

        let workspace = TrendsWorkspace::open(working_directory)?;
        let logger = TrendsLogger::new(working_directory, verbose);
        let store = TableStore::open(workspace.database_dir())?;

        let eco_list = parse_number_list(&ecoregions)?;
        if eco_list.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "No ecoregion numbers could be parsed from the --ecoregions parameter.",
            ));
        }

        let block_override = if blocks_arg.is_empty() {
            None
        } else {
            Some(parse_number_list(&blocks_arg)?)
        };
        let run_type = if block_override.is_some() {
            RunType::PartialStratified
        } else {
            RunType::FullStratified
        };

        let analysis_num = registry::get_or_create_analysis(&store, &analysis_name)?;
        if run_type == RunType::PartialStratified {
            if analysis_num == names::TRENDS_ANALYSIS_NUM {
                return Err(TrendsError::Domain(
                    "a partial run requires a custom analysis name".to_string(),
                )
                .into());
            }
            if eco_list.len() > 1 {
                return Err(TrendsError::Domain(
                    "a partial run analyzes a single ecoregion".to_string(),
                )
                .into());
            }
        }

        let change_intervals = workspace.change_intervals()?;
        if change_intervals.is_empty() {
            return Err(TrendsError::Domain(
                "no change interval folders found in the workspace".to_string(),
            )
            .into());
        }
        let multi_intervals = workspace.multichange_intervals()?;

        let num_ecos = eco_list.len();
        let mut old_progress: i32 = -1;
        for (count, eco_num) in eco_list.iter().enumerate() {
            let def = find_ecoregion_def(&workspace, *eco_num)?;

            let blocks = match &block_override {
                Some(list) => {
                    let full = def.block_numbers()?;
                    for block in list {
                        if !full.contains(block) {
                            return Err(TrendsError::Domain(format!(
                                "block {} is not a sample block of ecoregion {}",
                                block, eco_num
                            ))
                            .into());
                        }
                    }
                    list.clone()
                }
                None => def.block_numbers()?,
            };
            let sample_blocks = blocks.len();
            let total_blocks = if total_blocks_arg.is_empty() {
                def.total_blocks
            } else {
                total_blocks_arg.parse::<usize>().map_err(|_| {
                    Error::new(
                        ErrorKind::InvalidInput,
                        "The --total_blocks parameter must be an integer.",
                    )
                })?
            };

            let mut eco = EcoregionStats::new(
                *eco_num,
                total_blocks,
                sample_blocks,
                &def.resolution,
                run_type,
                blocks,
                vec![],
                &change_intervals,
                &multi_intervals,
                &workspace.aggregate_intervals,
                &logger,
            )?;

            if !load_ecoregion_data(&workspace, &mut eco, &logger)? {
                logger.write(&format!(
                    "No change data found for ecoregion {}, skipping",
                    eco_num
                ));
                continue;
            }

            eco.perform_statistics(&logger)?;
            store.store_ecoregion(&eco, analysis_num, &logger)?;

            if verbose {
                let progress = (100.0_f64 * (count + 1) as f64 / num_ecos as f64) as i32;
                if progress != old_progress {
                    println!("Progress: {}%", progress);
                    old_progress = progress;
                }
            }
        }

        let elapsed_time = get_formatted_elapsed_time(start);
        if verbose {
            println!("\n{}", &format!("Elapsed Time: {}", elapsed_time));
        }

        Ok(())
    }
}
