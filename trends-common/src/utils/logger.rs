/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

use chrono::Local;
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Name of the run log written into the workspace directory.
pub const TRENDS_LOG_FILE: &str = "TrendsStatisticsLogFile.txt";

/// Run log shared by every stage of an analysis. Messages are appended
/// to the workspace log file with a timestamp and echoed to standard
/// output in verbose mode. A logger without a file (`TrendsLogger::
/// quiet`) swallows everything, which is what the tests use.
pub struct TrendsLogger {
    file: RefCell<Option<File>>,
    verbose: bool,
}

impl TrendsLogger {
    pub fn new(folder: &str, verbose: bool) -> TrendsLogger {
        let path = Path::new(folder).join(TRENDS_LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok();
        TrendsLogger {
            file: RefCell::new(file),
            verbose,
        }
    }

    pub fn quiet() -> TrendsLogger {
        TrendsLogger {
            file: RefCell::new(None),
            verbose: false,
        }
    }

    pub fn write(&self, msg: &str) {
        let stamped = format!("{}  {}", Local::now().format("%Y-%m-%d %H:%M:%S"), msg);
        if let Some(file) = self.file.borrow_mut().as_mut() {
            let _ = writeln!(file, "{}", stamped);
        }
        if self.verbose {
            println!("{}", msg);
        }
    }

    /// Warnings are echoed even when not in verbose mode.
    pub fn warn(&self, msg: &str) {
        let stamped = format!(
            "{}  WARNING: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            msg
        );
        if let Some(file) = self.file.borrow_mut().as_mut() {
            let _ = writeln!(file, "{}", stamped);
        }
        println!("WARNING: {}", msg);
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}
