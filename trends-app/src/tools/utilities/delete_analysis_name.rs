/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

use crate::tools::*;
use std::env;
use std::io::{Error, ErrorKind};
use std::path;
use trends_data::config::TrendsWorkspace;
use trends_data::registry;
use trends_data::store::TableStore;

/// This tool removes a custom analysis from the workspace database:
/// the registry entry and every custom and summary table row produced
/// under the analysis name (`--analysis_name`). The standard `TRENDS`
/// analysis cannot be removed.
///
/// # See Also
/// `ListAnalysisNames`
pub struct DeleteAnalysisName {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl DeleteAnalysisName {
    pub fn new() -> DeleteAnalysisName {
        // public constructor
        let name = "DeleteAnalysisName".to_string();
        let toolbox = "Utilities".to_string();
        let description =
            "Removes a custom analysis and all of its table rows.".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Analysis Name".to_owned(),
            flags: vec!["--analysis_name".to_owned()],
            description: "Name of the analysis to remove.".to_owned(),
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
            ">>.*{0} -r={1} -v --wd=\"*path*to*workspace*\" --analysis_name=WESTCOAST",
            short_exe, name
        )
        .replace('*', &sep);

        DeleteAnalysisName {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

impl TrendsTool for DeleteAnalysisName {
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
            }
        }

        print_welcome(&self.get_tool_name(), verbose);

        if analysis_name.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The --analysis_name parameter must be specified.",
            ));
        }

        let workspace = TrendsWorkspace::open(working_directory)?;
        let store = TableStore::open(workspace.database_dir())?;
        let removed = registry::delete_analysis(&store, &analysis_name)?;

        if verbose {
            println!(
                "Removed analysis {} and {} table rows.",
                analysis_name.to_uppercase(),
                removed
            );
        }
        Ok(())
    }
}
