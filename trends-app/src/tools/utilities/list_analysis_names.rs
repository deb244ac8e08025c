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

/// This tool lists the analysis names registered in the workspace
/// database along with their analysis numbers. An optional keyword
/// (`--keyword`) narrows the listing to matching names.
///
/// # See Also
/// `DeleteAnalysisName`
pub struct ListAnalysisNames {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl ListAnalysisNames {
    pub fn new() -> ListAnalysisNames {
        // public constructor
        let name = "ListAnalysisNames".to_string();
        let toolbox = "Utilities".to_string();
        let description = "Lists the registered analysis names.".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Keyword".to_owned(),
            flags: vec!["--keyword".to_owned()],
            description: "Only list names containing this keyword.".to_owned(),
            parameter_type: ParameterType::String,
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
            ">>.*{0} -r={1} -v --wd=\"*path*to*workspace*\"",
            short_exe, name
        )
        .replace('*', &sep);

        ListAnalysisNames {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

impl TrendsTool for ListAnalysisNames {
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
        let mut keyword = String::new();
        for i in 0..args.len() {
            let mut arg = args[i].replace('\"', "");
            arg = arg.replace('\'', "");
            let cmd = arg.split('='); // in case an equals sign was used
            let vec = cmd.collect::<Vec<&str>>();
            let mut keyval = false;
            if vec.len() > 1 {
                keyval = true;
            }
            if vec[0].to_lowercase() == "--keyword" {
                keyword = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            }
        }

        print_welcome(&self.get_tool_name(), verbose);

        let workspace = TrendsWorkspace::open(working_directory)?;
        let store = TableStore::open(workspace.database_dir())?;
        let analyses = registry::list_analyses(&store)?;

        let keyword = keyword.to_uppercase();
        let mut num_listed = 0;
        println!("Num  Analysis Name");
        println!("---  -------------");
        for (num, name) in &analyses {
            if keyword.is_empty() || name.contains(&keyword) {
                println!("{:>3}  {}", num, name);
                num_listed += 1;
            }
        }
        if num_listed == 0 {
            return Err(Error::new(
                ErrorKind::NotFound,
                "No analysis names matched.",
            ));
        }
        Ok(())
    }
}
