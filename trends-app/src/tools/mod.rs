/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

pub mod analysis;
pub mod export;
pub mod utilities;

use serde_json;
use std::io::{Error, ErrorKind};

/// Manages the registered tools: lookup, listing, help output, and
/// execution against a working directory.
#[derive(Default)]
pub struct ToolManager {
    pub working_dir: String,
    pub verbose: bool,
    tool_names: Vec<String>,
}

impl ToolManager {
    pub fn new<'a>(working_directory: &'a str, verbose_mode: &'a bool) -> Result<ToolManager, Error> {
        let mut tool_names = vec![];
        // analysis
        tool_names.push("EcoregionAnalysis".to_string());
        tool_names.push("SummaryAnalysis".to_string());

        // export
        tool_names.push("ExportTableToCsv".to_string());
        tool_names.push("FixedWidthTables".to_string());
        tool_names.push("WorkbookReport".to_string());

        // utilities
        tool_names.push("DeleteAnalysisName".to_string());
        tool_names.push("ListAnalysisNames".to_string());

        let tm = ToolManager {
            working_dir: working_directory.to_string(),
            verbose: *verbose_mode,
            tool_names,
        };
        Ok(tm)
    }

    fn get_tool(&self, tool_name: &str) -> Option<Box<dyn TrendsTool + 'static>> {
        match tool_name.to_lowercase().replace('_', "").as_ref() {
            // analysis
            "ecoregionanalysis" => Some(Box::new(analysis::EcoregionAnalysis::new())),
            "summaryanalysis" => Some(Box::new(analysis::SummaryAnalysis::new())),

            // export
            "exporttabletocsv" => Some(Box::new(export::ExportTableToCsv::new())),
            "fixedwidthtables" => Some(Box::new(export::FixedWidthTables::new())),
            "workbookreport" => Some(Box::new(export::WorkbookReport::new())),

            // utilities
            "deleteanalysisname" => Some(Box::new(utilities::DeleteAnalysisName::new())),
            "listanalysisnames" => Some(Box::new(utilities::ListAnalysisNames::new())),

            _ => None,
        }
    }

    pub fn run_tool(&self, tool_name: String, args: Vec<String>) -> Result<(), Error> {
        match self.get_tool(tool_name.as_ref()) {
            Some(tool) => tool.run(args, &self.working_dir, self.verbose),
            None => Err(Error::new(
                ErrorKind::NotFound,
                format!("Unrecognized tool name {}.", tool_name),
            )),
        }
    }

    pub fn tool_help(&self, tool_name: String) -> Result<(), Error> {
        match self.get_tool(tool_name.as_ref()) {
            Some(tool) => {
                println!("{}", get_help(tool));
                Ok(())
            }
            None => Err(Error::new(
                ErrorKind::NotFound,
                format!("Unrecognized tool name {}.", tool_name),
            )),
        }
    }

    pub fn tool_parameters(&self, tool_name: String) -> Result<(), Error> {
        match self.get_tool(tool_name.as_ref()) {
            Some(tool) => {
                println!("{}", tool.get_tool_parameters());
                Ok(())
            }
            None => Err(Error::new(
                ErrorKind::NotFound,
                format!("Unrecognized tool name {}.", tool_name),
            )),
        }
    }

    pub fn toolbox(&self, tool_name: String) -> Result<(), Error> {
        if tool_name.is_empty() {
            // list all tools and their toolboxes
            for name in &self.tool_names {
                if let Some(tool) = self.get_tool(name) {
                    println!("{}: {}", name, tool.get_toolbox());
                }
            }
            return Ok(());
        }
        match self.get_tool(tool_name.as_ref()) {
            Some(tool) => {
                println!("{}", tool.get_toolbox());
                Ok(())
            }
            None => Err(Error::new(
                ErrorKind::NotFound,
                format!("Unrecognized tool name {}.", tool_name),
            )),
        }
    }

    pub fn list_tools(&self) {
        let mut tool_details: Vec<(String, String)> = Vec::new();
        for name in &self.tool_names {
            if let Some(tool) = self.get_tool(name) {
                tool_details.push(get_name_and_description(tool));
            }
        }
        let mut ret = format!("All {} Available Tools:\n", tool_details.len());
        for detail in &tool_details {
            ret.push_str(&format!("{}: {}\n\n", detail.0, detail.1));
        }
        println!("{}", ret);
    }

    pub fn list_tools_with_keywords(&self, keywords: Vec<String>) {
        let mut tool_details: Vec<(String, String)> = Vec::new();
        for name in &self.tool_names {
            if let Some(tool) = self.get_tool(name) {
                let (tool_name, description) = get_name_and_description(tool);
                for keyword in &keywords {
                    if tool_name.to_lowercase().contains(&keyword.to_lowercase())
                        || description.to_lowercase().contains(&keyword.to_lowercase())
                    {
                        tool_details.push((tool_name, description));
                        break;
                    }
                }
            }
        }
        let mut ret = format!("All {} Tools containing keywords:\n", tool_details.len());
        for detail in &tool_details {
            ret.push_str(&format!("{}: {}\n\n", detail.0, detail.1));
        }
        println!("{}", ret);
    }
}

pub trait TrendsTool {
    fn get_tool_name(&self) -> String;
    fn get_tool_description(&self) -> String;
    fn get_tool_parameters(&self) -> String;
    fn get_example_usage(&self) -> String;
    fn get_toolbox(&self) -> String;
    fn run<'a>(
        &self,
        args: Vec<String>,
        working_directory: &'a str,
        verbose: bool,
    ) -> Result<(), Error>;
}

fn get_help<'a>(wt: Box<dyn TrendsTool + 'a>) -> String {
    let tool_name = wt.get_tool_name();
    let description = wt.get_tool_description();
    let parameters = wt.get_tool_parameters();
    let toolbox = wt.get_toolbox();
    let o: serde_json::Value = match serde_json::from_str(&parameters) {
        Ok(v) => v,
        Err(_) => serde_json::json!({ "parameters": [] }),
    };
    let a = o["parameters"].as_array().cloned().unwrap_or_default();
    let mut p = String::new();
    p.push_str("Flag               Description\n");
    p.push_str("-----------------  -----------\n");
    for d in &a {
        let mut s = String::new();
        if let Some(flags) = d["flags"].as_array() {
            for f in flags {
                s.push_str(&format!("{}, ", f.as_str().unwrap_or("")));
            }
        }
        p.push_str(&format!(
            "{:width$} {}\n",
            s.trim().trim_matches(','),
            d["description"].as_str().unwrap_or(""),
            width = 18
        ));
    }
    let example = wt.get_example_usage();
    if example.len() <= 1 {
        format!(
            "{}

Description:\n{}
Toolbox: {}
Parameters:\n
{}
",
            tool_name, description, toolbox, p
        )
    } else {
        format!(
            "{}
Description:\n{}
Toolbox: {}
Parameters:\n
{}

Example usage:
{}
",
            tool_name, description, toolbox, p, example
        )
    }
}

fn get_name_and_description<'a>(wt: Box<dyn TrendsTool + 'a>) -> (String, String) {
    (wt.get_tool_name(), wt.get_tool_description())
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ToolParameter {
    pub name: String,
    pub flags: Vec<String>,
    pub description: String,
    pub parameter_type: ParameterType,
    pub default_value: Option<String>,
    pub optional: bool,
}

impl ToolParameter {
    pub fn to_string(&self) -> String {
        match serde_json::to_string(&self) {
            Ok(json_str) => json_str,
            Err(err) => format!("{:?}", err),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub enum ParameterType {
    Boolean,
    String,
    StringList,
    Integer,
    Float,
    ExistingFile(ParameterFileType),
    NewFile(ParameterFileType),
    Directory,
    OptionList(Vec<String>),
}

#[derive(Serialize, Deserialize, Debug)]
pub enum ParameterFileType {
    Any,
    Csv,
    Html,
    Text,
}

/// Builds the `{"parameters": [...]}` JSON string a tool reports.
pub fn parameters_to_json(parameters: &[ToolParameter]) -> String {
    let mut s = String::from("{\"parameters\": [");
    for i in 0..parameters.len() {
        if i < parameters.len() - 1 {
            s.push_str(&parameters[i].to_string());
            s.push(',');
        } else {
            s.push_str(&parameters[i].to_string());
        }
    }
    s.push_str("]}");
    s
}

/// Prints the tool welcome banner in verbose mode.
pub fn print_welcome(tool_name: &str, verbose: bool) {
    if verbose {
        let welcome_len = format!("* Welcome to {} *", tool_name).len().max(28);
        // 28 = length of the 'Powered by' by statement.
        println!("{}", "*".repeat(welcome_len));
        println!(
            "* Welcome to {} {}*",
            tool_name,
            " ".repeat(welcome_len - 15 - tool_name.len())
        );
        println!("* Powered by TrendsTools {}*", " ".repeat(welcome_len - 26));
        println!("{}", "*".repeat(welcome_len));
    }
}
