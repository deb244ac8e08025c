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
use trends_data::model::StudyArea;
use trends_data::names;
use trends_data::registry;
use trends_data::restore::load_ecoregion;
use trends_data::store::TableStore;
use trends_data::summary::gen_summary_stats;

/// This tool rolls the stored statistics of several ecoregions
/// (`--ecoregions`) up into a multi-ecoregion summary under a custom
/// analysis name (`--analysis_name`). For every view the estimated
/// change and estimated variance columns of the member ecoregions are
/// summed, the summary statistic columns are recomputed with Student-t
/// values pooled over the combined sample-block count, and the summary
/// statistics tables are stored. The member ecoregions must have been
/// analyzed first with `EcoregionAnalysis`.
///
/// # See Also
/// `EcoregionAnalysis`, `WorkbookReport`
pub struct SummaryAnalysis {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl SummaryAnalysis {
    pub fn new() -> SummaryAnalysis {
        // public constructor
        let name = "SummaryAnalysis".to_string();
        let toolbox = "Trends Analysis".to_string();
        let description =
            "Rolls per-ecoregion statistics up into a multi-ecoregion summary.".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Analysis Name".to_owned(),
            flags: vec!["--analysis_name".to_owned()],
            description: "Name for the summary analysis.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Ecoregions".to_owned(),
            flags: vec!["--ecoregions".to_owned()],
            description: "Ecoregion numbers to include, e.g. 1,5,9-12.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: false,
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
            ">>.*{0} -r={1} -v --wd=\"*path*to*workspace*\" --analysis_name=WESTCOAST --ecoregions=1,5-7",
            short_exe, name
        )
        .replace('*', &sep);

        SummaryAnalysis {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

impl TrendsTool for SummaryAnalysis {
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
        let mut analysis_name = String::new();
        let mut ecoregions = String::new();

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
            if vec[0].to_lowercase() == "--analysis_name" {
                analysis_name = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if vec[0].to_lowercase() == "--ecoregions" {
                ecoregions = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            }
        }

        print_welcome(&self.get_tool_name(), verbose);

        let start = Instant::now();

        if analysis_name.is_empty() || ecoregions.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Both --analysis_name and --ecoregions must be specified.",
            ));
        }

        let workspace = TrendsWorkspace::open(working_directory)?;
        let logger = TrendsLogger::new(working_directory, verbose);
        let store = TableStore::open(workspace.database_dir())?;

        let analysis_num = registry::get_or_create_analysis(&store, &analysis_name)?;
        if analysis_num == names::TRENDS_ANALYSIS_NUM {
            return Err(TrendsError::Domain(
                "a summary requires a custom analysis name".to_string(),
            )
            .into());
        }

        let eco_list = parse_number_list(&ecoregions)?;
        if eco_list.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "No ecoregion numbers could be parsed from the --ecoregions parameter.",
            ));
        }

        let mut sa = StudyArea::new(&analysis_name.to_uppercase(), analysis_num);
        for eco_num in &eco_list {
            match load_ecoregion(&store, names::TRENDS_ANALYSIS_NUM, *eco_num, &logger)? {
                Some(eco) => {
                    sa.study.insert(*eco_num, eco);
                }
                None => {
                    return Err(TrendsError::Domain(format!(
                        "no stored statistics found for ecoregion {}, run EcoregionAnalysis first",
                        eco_num
                    ))
                    .into());
                }
            }
            if verbose {
                println!("Loaded ecoregion {}", eco_num);
            }
        }

        gen_summary_stats(&mut sa, &store, &logger)?;

        if verbose {
            println!(
                "Summary statistics stored for {} ecoregions under analysis {}",
                sa.study.len(),
                sa.analysis_name
            );
        }

        let elapsed_time = get_formatted_elapsed_time(start);
        if verbose {
            println!("\n{}", &format!("Elapsed Time: {}", elapsed_time));
        }

        Ok(())
    }
}
