/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

use crate::tools::*;
use std::io::{Error, ErrorKind};
use std::path;
use std::time::Instant;
use std::env;
use trends_common::error::TrendsError;
use trends_common::utils::get_formatted_elapsed_time;
use trends_data::config::TrendsWorkspace;
use trends_data::store::TableStore;

/// This tool extracts rows from one of the workspace database tables
/// (`--table`, e.g. `TrendsChangeStats`) into a stand-alone CSV file
/// (`--output`). The extract can be narrowed to a single analysis
/// (`--analysis_num`) and/or ecoregion (`--ecoregion`).
///
/// # See Also
/// `FixedWidthTables`, `WorkbookReport`
pub struct ExportTableToCsv {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl ExportTableToCsv {
    pub fn new() -> ExportTableToCsv {
        // public constructor
        let name = "ExportTableToCsv".to_string();
        let toolbox = "Data Export".to_string();
        let description = "Extracts rows of a database table to a CSV file.".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Table Name".to_owned(),
            flags: vec!["--table".to_owned()],
            description: "Name of the database table, e.g. TrendsChangeStats.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Output File".to_owned(),
            flags: vec!["-o".to_owned(), "--output".to_owned()],
            description: "Output CSV file.".to_owned(),
            parameter_type: ParameterType::NewFile(ParameterFileType::Csv),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Analysis Number".to_owned(),
            flags: vec!["--analysis_num".to_owned()],
            description: "Restrict the extract to one analysis number.".to_owned(),
            parameter_type: ParameterType::Integer,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Ecoregion".to_owned(),
            flags: vec!["--ecoregion".to_owned()],
            description: "Restrict the extract to one ecoregion.".to_owned(),
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
            ">>.*{0} -r={1} -v --wd=\"*path*to*workspace*\" --table=TrendsChangeStats --ecoregion=7 -o=eco7_stats.csv",
            short_exe, name
        )
        .replace('*', &sep);

        ExportTableToCsv {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

impl TrendsTool for ExportTableToCsv {
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
        let mut table = String::new();
        let mut output_file = String::new();
        let mut analysis_num = String::new();
        let mut ecoregion = String::new();

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
            if vec[0].to_lowercase() == "--table" {
                table = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if vec[0].to_lowercase() == "-o" || vec[0].to_lowercase() == "--output" {
                output_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if vec[0].to_lowercase() == "--analysis_num" {
                analysis_num = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if vec[0].to_lowercase() == "--ecoregion" {
                ecoregion = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            }
        }

        print_welcome(&self.get_tool_name(), verbose);

        let start = Instant::now();

        if table.is_empty() || output_file.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Both --table and --output must be specified.",
            ));
        }

        let sep: String = path::MAIN_SEPARATOR.to_string();
        if !output_file.contains(&sep) && !output_file.contains('/') {
            output_file = format!("{}{}", working_directory, output_file);
        }
        if !output_file.ends_with(".csv") {
            output_file.push_str(".csv");
        }

        let workspace = TrendsWorkspace::open(working_directory)?;
        let store = TableStore::open(workspace.database_dir())?;
        if !store.table_exists(&table) {
            return Err(TrendsError::Domain(format!("table {} not found", table)).into());
        }

        let mut filters = vec![];
        if !analysis_num.is_empty() {
            filters.push(("AnalysisNum".to_string(), analysis_num));
        }
        if !ecoregion.is_empty() {
            filters.push(("EcoLevel3ID".to_string(), ecoregion));
        }

        let (header, _) = store.read_table(&table)?;
        let rows = store.select_rows(&table, &filters)?;

        let mut writer = csv::Writer::from_path(&output_file)
            .map_err(|e| Error::new(ErrorKind::Other, e.to_string()))?;
        writer
            .write_record(&header)
            .map_err(|e| Error::new(ErrorKind::Other, e.to_string()))?;
        let mut num_written = 0;
        for row in &rows {
            let record: Vec<String> = header
                .iter()
                .map(|field| row.get(field).cloned().unwrap_or_default())
                .collect();
            writer
                .write_record(&record)
                .map_err(|e| Error::new(ErrorKind::Other, e.to_string()))?;
            num_written += 1;
        }
        writer
            .flush()
            .map_err(|e| Error::new(ErrorKind::Other, e.to_string()))?;

        if verbose {
            println!("Wrote {} rows to {}", num_written, output_file);
        }

        let elapsed_time = get_formatted_elapsed_time(start);
        if verbose {
            println!("\n{}", &format!("Elapsed Time: {}", elapsed_time));
        }

        Ok(())
    }
}
