/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

/*!
TrendsTools computes sample-based land-cover change statistics for
stratified sampling designs: per-ecoregion conversion estimates, the
derived gain/loss/gross/net, composition, multichange, and all-change
views, multi-ecoregion summaries, and report/extract generation.

TrendsTools is a command-line program and is run by calling it, with
appropriate commands and arguments, from a terminal application or a
script. The following commands are recognized:

| Command           | Description                                                                        |
| ----------------- | ---------------------------------------------------------------------------------- |
| --cd, --wd        | Changes the working directory; used in conjunction with --run flag.                |
| -h, --help        | Prints help information.                                                           |
| --listtools       | Lists all available tools, with tool descriptions. Keywords may also be used.      |
| -r, --run         | Runs a tool; used in conjunction with --wd flag; -r="EcoregionAnalysis".           |
| --toolbox         | Prints the toolbox associated with a tool; --toolbox=SummaryAnalysis.              |
| --toolhelp        | Prints the help associated with a tool; --toolhelp="WorkbookReport".               |
| --toolparameters  | Prints the parameters (in json form) for a specific tool.                          |
| -v                | Verbose mode. Without this flag, tool outputs will not be printed.                 |
| --version         | Prints the version information.                                                    |

*/

pub mod tools;

use crate::tools::ToolManager;
use std::env;
use std::io::Error;
use std::path;

#[macro_use]
extern crate serde_derive;

fn main() {
    match run() {
        Ok(()) => {}
        Err(err) => panic!("{}", err),
    }
}

fn run() -> Result<(), Error> {
    let sep: &str = &path::MAIN_SEPARATOR.to_string();
    let mut working_dir = String::new();
    let mut tool_name = String::new();
    let mut run_tool = false;
    let mut tool_help = false;
    let mut tool_parameters = false;
    let mut toolbox = false;
    let mut list_tools = false;
    let mut keywords: Vec<String> = vec![];
    let mut verbose = false;
    let mut tool_args_vec: Vec<String> = vec![];
    let mut finding_working_dir = false;

    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        version();
        println!("\nUsage: Run with the -h or --help flag for more information.");
        return Ok(());
    }
    for arg in &args[1..] {
        let flag_val = arg.to_lowercase().replace("--", "-");
        if flag_val == "-h" || flag_val == "-help" {
            help();
            return Ok(());
        } else if flag_val.starts_with("-cd") || flag_val.starts_with("-wd") {
            finding_working_dir = true;
            if flag_val.contains('=') {
                working_dir = arg
                    .split('=')
                    .nth(1)
                    .unwrap_or("")
                    .replace('\"', "")
                    .replace('\'', "");
                finding_working_dir = false;
            }
        } else if flag_val.starts_with("-run") || flag_val.starts_with("-r=") || flag_val == "-r" {
            run_tool = true;
            if arg.contains('=') {
                tool_name = arg
                    .split('=')
                    .nth(1)
                    .unwrap_or("")
                    .replace('\"', "")
                    .replace('\'', "")
                    .to_string();
            }
        } else if flag_val.starts_with("-toolhelp") {
            tool_help = true;
            if arg.contains('=') {
                tool_name = arg.split('=').nth(1).unwrap_or("").to_string();
            }
        } else if flag_val.starts_with("-toolparameters") {
            tool_parameters = true;
            if arg.contains('=') {
                tool_name = arg.split('=').nth(1).unwrap_or("").to_string();
            }
        } else if flag_val.starts_with("-toolbox") {
            toolbox = true;
            if arg.contains('=') {
                tool_name = arg.split('=').nth(1).unwrap_or("").to_string();
            }
        } else if flag_val.starts_with("-listtools") {
            list_tools = true;
        } else if flag_val == "-v" {
            verbose = true;
        } else if flag_val.starts_with("-version") {
            version();
            return Ok(());
        } else if finding_working_dir {
            working_dir = arg.replace('\"', "").replace('\'', "");
            finding_working_dir = false;
        } else {
            if list_tools {
                keywords.push(arg.clone());
            }
            tool_args_vec.push(arg.clone());
        }
    }

    if working_dir.is_empty() {
        working_dir = format!("{}", env::current_dir()?.display());
    }
    if !working_dir.ends_with(sep) {
        working_dir.push_str(sep);
    }

    let tm = ToolManager::new(&working_dir, &verbose)?;
    if run_tool {
        return tm.run_tool(tool_name, tool_args_vec);
    } else if tool_help {
        return tm.tool_help(tool_name);
    } else if tool_parameters {
        return tm.tool_parameters(tool_name);
    } else if toolbox {
        return tm.toolbox(tool_name);
    } else if list_tools {
        if keywords.is_empty() {
            tm.list_tools();
        } else {
            tm.list_tools_with_keywords(keywords);
        }
        return Ok(());
    }

    version();
    println!("\nUsage: Run with the -h or --help flag for more information.");
    Ok(())
}

fn help() {
    let e = env::args().next().unwrap_or_else(|| "trends_tools".to_string());
    let sep = path::MAIN_SEPARATOR.to_string();
    let s = format!(
        "trends_tools Help

The following commands are recognized:
--cd, --wd         Changes the working directory; used in conjunction with --run flag.
-h, --help         Prints help information.
--listtools        Lists all available tools. Keywords may also be used, --listtools summary.
-r, --run          Runs a tool; used in conjunction with --wd flag; -r=\"EcoregionAnalysis\".
--toolbox          Prints the toolbox associated with a tool; --toolbox=SummaryAnalysis.
--toolhelp         Prints the help associated with a tool; --toolhelp=\"WorkbookReport\".
--toolparameters   Prints the parameters (in json form) for a specific tool.
-v                 Verbose mode. Without this flag, tool outputs will not be printed.
--version          Prints the version information.

Example Usage:
>> .{}{} -r=EcoregionAnalysis -v --wd=\"{}path{}to{}workspace{}\" --ecoregions=7
",
        sep,
        e,
        sep,
        sep,
        sep,
        sep
    );
    println!("{}", s);
}

fn version() {
    const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");
    println!("trends_tools v{}", VERSION.unwrap_or("unknown"));
}
