/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

use crate::tools::*;
use std::env;
use std::fs::File;
use std::io::{BufWriter, Error, ErrorKind, Write};
use std::path;
use std::time::Instant;
use trends_common::error::TrendsError;
use trends_common::rendering::{report_head, report_tail, ReportTable};
use trends_common::statistics::{student_wilcoxon, Statistic, SummaryStatistic, NO_P_VALUE};
use trends_common::structures::Grid;
use trends_common::utils::{get_formatted_elapsed_time, TrendsLogger};
use trends_data::config::TrendsWorkspace;
use trends_data::model::{EcoregionStats, GlgnKind, StudyArea};
use trends_data::names;
use trends_data::registry;
use trends_data::restore::{load_ecoregion, load_summary};
use trends_data::store::TableStore;

/// This tool renders a stored analysis into an HTML workbook report
/// (`--output`). With `--ecoregion` the report covers one ecoregion:
/// the analysis parameters, the conversion statistics per interval, the
/// gain/loss/gross/net and composition views, the multichange
/// footprint, the all-change and aggregate views, and a yearly land
/// cover summary with per-class linear-trend significance tests
/// (regression slope mean, Student's t, Wilcoxon signed rank). Without
/// `--ecoregion` the report covers the multi-ecoregion summary stored
/// under the analysis name (`--analysis_name`).
///
/// # See Also
/// `EcoregionAnalysis`, `SummaryAnalysis`
pub struct WorkbookReport {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl WorkbookReport {
    pub fn new() -> WorkbookReport {
        // public constructor
        let name = "WorkbookReport".to_string();
        let toolbox = "Data Export".to_string();
        let description =
            "Renders a stored ecoregion or summary analysis into an HTML workbook.".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Ecoregion".to_owned(),
            flags: vec!["--ecoregion".to_owned()],
            description: "Ecoregion number; omit to report a summary analysis.".to_owned(),
            parameter_type: ParameterType::Integer,
            default_value: None,
            optional: true,
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
            name: "Output File".to_owned(),
            flags: vec!["-o".to_owned(), "--output".to_owned()],
            description: "Output HTML file.".to_owned(),
            parameter_type: ParameterType::NewFile(ParameterFileType::Html),
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
            ">>.*{0} -r={1} -v --wd=\"*path*to*workspace*\" --ecoregion=7 -o=eco7_workbook.html",
            short_exe, name
        )
        .replace('*', &sep);

        WorkbookReport {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

impl TrendsTool for WorkbookReport {
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
        let mut ecoregion = String::new();
        let mut analysis_name = names::TRENDS_ANALYSIS_NAME.to_string();
        let mut output_file = String::new();

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
            if vec[0].to_lowercase() == "--ecoregion" {
                ecoregion = if keyval {
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
            } else if vec[0].to_lowercase() == "-o" || vec[0].to_lowercase() == "--output" {
                output_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            }
        }

        print_welcome(&self.get_tool_name(), verbose);

        let start = Instant::now();

        if output_file.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The --output parameter must be specified.",
            ));
        }
        let sep: String = path::MAIN_SEPARATOR.to_string();
        if !output_file.contains(&sep) && !output_file.contains('/') {
            output_file = format!("{}{}", working_directory, output_file);
        }
        if !output_file.ends_with(".html") {
            output_file.push_str(".html");
        }

        let workspace = TrendsWorkspace::open(working_directory)?;
        let logger = TrendsLogger::new(working_directory, verbose);
        let store = TableStore::open(workspace.database_dir())?;

        let analysis_num = registry::find_analysis(&store, &analysis_name)?
            .ok_or_else(|| TrendsError::Domain(format!("analysis name {} not found", analysis_name)))?;

        let f = File::create(output_file.as_str())?;
        let mut writer = BufWriter::new(f);

        if !ecoregion.is_empty() {
            let eco_num = ecoregion.parse::<usize>().map_err(|_| {
                Error::new(
                    ErrorKind::InvalidInput,
                    "The --ecoregion parameter must be an integer.",
                )
            })?;
            let eco = load_ecoregion(&store, analysis_num, eco_num, &logger)?.ok_or_else(|| {
                TrendsError::Domain(format!(
                    "no stored statistics found for ecoregion {}",
                    eco_num
                ))
            })?;
            write_ecoregion_workbook(&mut writer, &eco, &analysis_name)?;
        } else {
            let sa = load_summary(&store, &analysis_name, analysis_num)?.ok_or_else(|| {
                TrendsError::Domain(format!(
                    "no stored summary found for analysis {}",
                    analysis_name
                ))
            })?;
            write_summary_workbook(&mut writer, &sa)?;
        }
        writer.flush()?;

        if verbose {
            println!("Complete! Please see {} for output.", output_file);
        }
        let elapsed_time = get_formatted_elapsed_time(start);
        if verbose {
            println!("\n{}", &format!("Elapsed Time: {}", elapsed_time));
        }

        Ok(())
    }
}

fn conversion_label(id: usize) -> String {
    let (from, to) = names::transition_classes(id);
    format!(
        "{} to {}",
        names::LC_TYPES[from - 1],
        names::LC_TYPES[to - 1]
    )
}

/// Table of one per-ecoregion statistics grid, one row per taxonomy
/// entry.
fn stats_table(caption: &str, labels: &[String], stats: &Grid<f64>) -> ReportTable {
    let mut table = ReportTable::new(caption);
    table.headers = std::iter::once("".to_string())
        .chain(Statistic::ALL.iter().map(|s| s.print_name().to_string()))
        .collect();
    for (row, label) in labels.iter().enumerate() {
        let mut cells = vec![label.clone()];
        for statistic in Statistic::ALL {
            cells.push(format!("{:.2}", stats.get_value(row, statistic.index())));
        }
        table.rows.push(cells);
    }
    table
}

/// Table of one summary statistics grid.
fn summary_stats_table(caption: &str, labels: &[String], stats: &Grid<f64>) -> ReportTable {
    let mut table = ReportTable::new(caption);
    table.headers = std::iter::once("".to_string())
        .chain(
            SummaryStatistic::ALL
                .iter()
                .map(|s| s.print_name().to_string()),
        )
        .collect();
    for (row, label) in labels.iter().enumerate() {
        let mut cells = vec![label.clone()];
        for statistic in SummaryStatistic::ALL {
            cells.push(format!("{:.2}", stats.get_value(row, statistic.index())));
        }
        table.rows.push(cells);
    }
    table
}

fn conversion_labels() -> Vec<String> {
    (1..=names::NUM_CONVERSIONS).map(conversion_label).collect()
}

fn class_labels() -> Vec<String> {
    names::LC_TYPES.iter().map(|s| s.to_string()).collect()
}

fn multi_labels() -> Vec<String> {
    (0..names::NUM_MULTI)
        .map(|m| format!("{} changes", m))
        .collect()
}

fn format_p_value(p: f64) -> String {
    if p == NO_P_VALUE {
        "n/a".to_string()
    } else if p < 0.001 {
        "<0.001".to_string()
    } else {
        format!("{:.8}", p)
    }
}

fn write_ecoregion_workbook(
    writer: &mut BufWriter<File>,
    eco: &EcoregionStats,
    analysis_name: &str,
) -> Result<(), Error> {
    writer.write_all(
        report_head(&format!("Land Cover Trends Ecoregion {} Workbook", eco.eco_num)).as_bytes(),
    )?;

    writer.write_all(
        format!(
            "<p><strong>Analysis</strong>: {}<br>\
             <strong>Run type</strong>: {}<br>\
             <strong>Resolution</strong>: {}<br>\
             <strong>Total blocks (N)</strong>: {}<br>\
             <strong>Sample blocks (n)</strong>: {}<br>\
             <strong>Degrees of freedom</strong>: {}<br>\
             <strong>Student's t (85/90/95/99%)</strong>: {:.3}  {:.3}  {:.3}  {:.3}<br>\
             <strong>Estimated ecoregion pixels</strong>: {:.1}</p>",
            analysis_name,
            eco.run_type.name(),
            eco.resolution,
            eco.design.total_blocks,
            eco.design.sample_blocks,
            eco.design.degrees_of_freedom(),
            eco.design.student_t[0],
            eco.design.student_t[1],
            eco.design.student_t[2],
            eco.design.student_t[3],
            eco.design.total_est_pixels,
        )
        .as_bytes(),
    )?;

    let conv_labels = conversion_labels();
    let lc_labels = class_labels();
    let mc_labels = multi_labels();

    for (interval, pair) in &eco.eco_data {
        let table = stats_table(
            &format!("Conversion Statistics {}", interval),
            &conv_labels,
            &pair.stats,
        );
        writer.write_all(table.get_html().as_bytes())?;
    }

    for (interval, glgn) in &eco.eco_glgn {
        for kind in GlgnKind::ALL {
            let table = stats_table(
                &format!("Land Cover {} {}", capitalize(kind.name()), interval),
                &lc_labels,
                &glgn.get(kind).stats,
            );
            writer.write_all(table.get_html().as_bytes())?;
        }
    }

    for (year, pair) in &eco.eco_comp {
        let table = stats_table(
            &format!("Composition {}", year),
            &lc_labels,
            &pair.stats,
        );
        writer.write_all(table.get_html().as_bytes())?;
    }

    for (interval, pair) in &eco.eco_multi {
        let table = stats_table(
            &format!("Multichange Footprint {}", interval),
            &mc_labels,
            &pair.stats,
        );
        writer.write_all(table.get_html().as_bytes())?;
    }

    let mut all_change = ReportTable::new("All Change");
    all_change.headers = std::iter::once("".to_string())
        .chain(Statistic::ALL.iter().map(|s| s.print_name().to_string()))
        .collect();
    for (interval, sources) in &eco.all_change {
        for (source, pair) in sources {
            let mut cells = vec![format!("{} ({})", interval, source.name())];
            for statistic in Statistic::ALL {
                cells.push(format!("{:.2}", pair.stats.get_value(0, statistic.index())));
            }
            all_change.rows.push(cells);
        }
    }
    writer.write_all(all_change.get_html().as_bytes())?;

    for (interval, pair) in &eco.aggregate {
        let table = stats_table(
            &format!("Aggregate Gross Change {}", interval),
            &conv_labels,
            &pair.stats,
        );
        writer.write_all(table.get_html().as_bytes())?;
    }
    for (interval, glgn) in &eco.agg_glgn {
        for kind in GlgnKind::ALL {
            let table = stats_table(
                &format!(
                    "Aggregate Land Cover {} {}",
                    capitalize(kind.name()),
                    interval
                ),
                &lc_labels,
                &glgn.get(kind).stats,
            );
            writer.write_all(table.get_html().as_bytes())?;
        }
    }

    write_yearly_summary(writer, eco)?;

    writer.write_all(report_tail().as_bytes())?;
    Ok(())
}

/// The yearly land-cover summary: the percent-of-ecoregion composition
/// by year per class, the first-to-last difference, and the per-class
/// linear-trend significance tests over the block-level composition
/// counts.
fn write_yearly_summary(writer: &mut BufWriter<File>, eco: &EcoregionStats) -> Result<(), Error> {
    let years: Vec<String> = eco.eco_comp.keys().cloned().collect();
    if years.len() < 2 {
        return Ok(());
    }
    let year_numbers: Vec<i32> = years.iter().filter_map(|y| y.parse().ok()).collect();

    let mut table = ReportTable::new("Yearly Summary (% of Ecoregion)");
    table.headers = std::iter::once("Year".to_string())
        .chain(names::LC_SHORT.iter().map(|s| s.to_string()))
        .collect();

    for year in &years {
        let stats = &eco.eco_comp[year].stats;
        let mut cells = vec![year.clone()];
        for lc in 0..names::NUM_LC_TYPES {
            cells.push(format!(
                "{:.2}",
                stats.get_value(lc, Statistic::ChgPercent.index())
            ));
        }
        table.rows.push(cells);
    }

    // First-to-last net difference per class.
    let first = &eco.eco_comp[&years[0]].stats;
    let last = &eco.eco_comp[&years[years.len() - 1]].stats;
    let mut cells = vec![format!("{}-{}", years[0], years[years.len() - 1])];
    for lc in 0..names::NUM_LC_TYPES {
        cells.push(format!(
            "{:.2}",
            last.get_value(lc, Statistic::ChgPercent.index())
                - first.get_value(lc, Statistic::ChgPercent.index())
        ));
    }
    table.rows.push(cells);

    // Per-class trend tests over the block-level composition counts.
    let mut trend_sign = vec!["Linear Trend".to_string()];
    let mut p_student = vec!["P, t-test".to_string()];
    let mut p_wilcoxon = vec!["P, Wilcoxon".to_string()];
    let mut n_pairs = vec!["N (Wilcoxon pairs)".to_string()];
    for lc in 0..names::NUM_LC_TYPES {
        let mut lc_data: Grid<i64> = Grid::new(years.len(), eco.design.sample_blocks, 0);
        for (row, year) in years.iter().enumerate() {
            let comp = &eco.eco_comp[year].data;
            for col in 0..comp.columns {
                lc_data.set_value(row, col, comp.get_value(lc, col));
            }
        }
        let result = student_wilcoxon(&lc_data, &year_numbers);
        trend_sign.push(if result.slope_mean >= 0.0 { "+" } else { "-" }.to_string());
        p_student.push(format_p_value(result.p_student));
        p_wilcoxon.push(format_p_value(result.p_wilcoxon));
        n_pairs.push(result.nonzero_slopes.to_string());
    }
    table.rows.push(trend_sign);
    table.rows.push(p_student);
    table.rows.push(p_wilcoxon);
    table.rows.push(n_pairs);

    writer.write_all(table.get_html().as_bytes())?;
    Ok(())
}

fn write_summary_workbook(writer: &mut BufWriter<File>, sa: &StudyArea) -> Result<(), Error> {
    writer.write_all(
        report_head(&format!(
            "Land Cover Trends Summary Workbook: {}",
            sa.analysis_name
        ))
        .as_bytes(),
    )?;

    writer.write_all(
        format!(
            "<p><strong>Analysis</strong>: {}<br>\
             <strong>Resolution</strong>: {}<br>\
             <strong>Total blocks (N)</strong>: {}<br>\
             <strong>Combined sample blocks (n)</strong>: {}<br>\
             <strong>Student's t (85/90/95/99%)</strong>: {:.3}  {:.3}  {:.3}  {:.3}<br>\
             <strong>Estimated pixels</strong>: {:.1}</p>",
            sa.analysis_name,
            sa.resolution,
            sa.total_blocks,
            sa.summary_samples,
            sa.student_t[0],
            sa.student_t[1],
            sa.student_t[2],
            sa.student_t[3],
            sa.sum_est_pixels,
        )
        .as_bytes(),
    )?;

    let conv_labels = conversion_labels();
    let lc_labels = class_labels();
    let mc_labels = multi_labels();

    for (interval, grid) in &sa.summary {
        let table = summary_stats_table(
            &format!("Summary Conversion Statistics {}", interval),
            &conv_labels,
            grid,
        );
        writer.write_all(table.get_html().as_bytes())?;
    }

    for (interval, glgn) in &sa.sum_glgn {
        for kind in GlgnKind::ALL {
            let table = summary_stats_table(
                &format!("Summary Land Cover {} {}", capitalize(kind.name()), interval),
                &lc_labels,
                glgn.get(kind),
            );
            writer.write_all(table.get_html().as_bytes())?;
        }
    }

    for (year, grid) in &sa.sum_comp {
        let table =
            summary_stats_table(&format!("Summary Composition {}", year), &lc_labels, grid);
        writer.write_all(table.get_html().as_bytes())?;
    }

    for (interval, grid) in &sa.sum_multi {
        let table = summary_stats_table(
            &format!("Summary Multichange Footprint {}", interval),
            &mc_labels,
            grid,
        );
        writer.write_all(table.get_html().as_bytes())?;
    }

    let mut all_change = ReportTable::new("Summary All Change");
    all_change.headers = std::iter::once("".to_string())
        .chain(
            SummaryStatistic::ALL
                .iter()
                .map(|s| s.print_name().to_string()),
        )
        .collect();
    for (interval, sources) in &sa.sum_all_change {
        for (source, grid) in sources {
            let mut cells = vec![format!("{} ({})", interval, source.name())];
            for statistic in SummaryStatistic::ALL {
                cells.push(format!("{:.2}", grid.get_value(0, statistic.index())));
            }
            all_change.rows.push(cells);
        }
    }
    writer.write_all(all_change.get_html().as_bytes())?;

    for (interval, grid) in &sa.sum_aggregate {
        let table = summary_stats_table(
            &format!("Summary Aggregate Gross Change {}", interval),
            &conv_labels,
            grid,
        );
        writer.write_all(table.get_html().as_bytes())?;
    }
    for (interval, glgn) in &sa.sum_agg_glgn {
        for kind in GlgnKind::ALL {
            let table = summary_stats_table(
                &format!(
                    "Summary Aggregate Land Cover {} {}",
                    capitalize(kind.name()),
                    interval
                ),
                &lc_labels,
                glgn.get(kind),
            );
            writer.write_all(table.get_html().as_bytes())?;
        }
    }

    writer.write_all(report_tail().as_bytes())?;
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod test {
    use super::{conversion_label, format_p_value};
    use trends_common::statistics::NO_P_VALUE;

    #[test]
    fn test_conversion_label() {
        assert_eq!(conversion_label(1), "Water to Water");
        assert_eq!(conversion_label(6), "Water to Forest");
        assert_eq!(conversion_label(121), "Snow/Ice to Snow/Ice");
    }

    #[test]
    fn test_format_p_value() {
        assert_eq!(format_p_value(NO_P_VALUE), "n/a");
        assert_eq!(format_p_value(0.0001), "<0.001");
        assert_eq!(format_p_value(0.25), "0.25000000");
    }
}
