/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

use crate::tools::*;
use chrono::Local;
use std::collections::BTreeMap;
use std::env;
use std::fs::File;
use std::io::{BufWriter, Error, ErrorKind, Write};
use std::path;
use std::path::Path;
use std::time::Instant;
use trends_common::error::{TrendsError, TrendsResult};
use trends_common::utils::get_formatted_elapsed_time;
use trends_data::config::TrendsWorkspace;
use trends_data::names;
use trends_data::store::{TableStore, ECOREGIONS_TABLE};

/// This tool builds the cross-ecoregion extract tables as fixed-width
/// text files: one row per ecoregion, the analysis parameter columns
/// (ECNM, ECTB, ECSB, ECTP, ECDF, ECST85..ECST99) followed by one value
/// column per taxonomy entry and standard interval. Eight table
/// families can be requested (`--tables`): ConversionChange,
/// ConversionError, Composition, Gains, Losses, Gross, Net, and
/// Multichange. Each family is written in four unit variants: PIXEL,
/// SQKM (pixel-area scaled), PERCENTOFECO (divided by the ecoregion
/// pixel total), and PERCENTOFCLASS (divided by the column total over
/// all ecoregions). Output file names carry the resolution, variant,
/// and date.
///
/// # See Also
/// `ExportTableToCsv`, `WorkbookReport`
pub struct FixedWidthTables {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl FixedWidthTables {
    pub fn new() -> FixedWidthTables {
        // public constructor
        let name = "FixedWidthTables".to_string();
        let toolbox = "Data Export".to_string();
        let description =
            "Builds fixed-width cross-ecoregion extract tables from stored statistics.".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Tables".to_owned(),
            flags: vec!["--tables".to_owned()],
            description:
                "Comma-separated table families; defaults to all eight families.".to_owned(),
            parameter_type: ParameterType::StringList,
            default_value: Some("all".to_string()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Output Directory".to_owned(),
            flags: vec!["-o".to_owned(), "--output".to_owned()],
            description: "Directory the extract tables are written into.".to_owned(),
            parameter_type: ParameterType::Directory,
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Resolution".to_owned(),
            flags: vec!["--resolution".to_owned()],
            description: "Resolution of the source statistics; defaults to the workspace setting."
                .to_owned(),
            parameter_type: ParameterType::OptionList(vec!["30m".to_string(), "60m".to_string()]),
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
            ">>.*{0} -r={1} -v --wd=\"*path*to*workspace*\" --tables=Gains,Losses -o=extracts",
            short_exe, name
        )
        .replace('*', &sep);

        FixedWidthTables {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

const TABLE_FAMILIES: [&str; 8] = [
    "ConversionChange",
    "ConversionError",
    "Composition",
    "Gains",
    "Losses",
    "Gross",
    "Net",
    "Multichange",
];

const UNIT_VARIANTS: [&str; 4] = ["PIXEL", "SQKM", "PERCENTOFECO", "PERCENTOFCLASS"];

/// Analysis parameters of one ecoregion, read from the Ecoregions
/// table: the leading columns of every extract row.
struct EcoParams {
    eco_num: usize,
    total_blocks: usize,
    sample_blocks: usize,
    total_pixels: f64,
    student_t: [f64; 4],
}

impl TrendsTool for FixedWidthTables {
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
        let mut tables_arg = "all".to_string();
        let mut output_dir = String::new();
        let mut resolution_arg = String::new();

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
            if vec[0].to_lowercase() == "--tables" {
                tables_arg = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if vec[0].to_lowercase() == "-o" || vec[0].to_lowercase() == "--output" {
                output_dir = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if vec[0].to_lowercase() == "--resolution" {
                resolution_arg = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            }
        }

        print_welcome(&self.get_tool_name(), verbose);

        let start = Instant::now();

        if output_dir.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The --output directory must be specified.",
            ));
        }
        let sep: String = path::MAIN_SEPARATOR.to_string();
        if !output_dir.contains(&sep) && !output_dir.contains('/') {
            output_dir = format!("{}{}", working_directory, output_dir);
        }
        std::fs::create_dir_all(&output_dir)?;

        let workspace = TrendsWorkspace::open(working_directory)?;
        let store = TableStore::open(workspace.database_dir())?;
        let resolution = if resolution_arg.is_empty() {
            workspace.resolution.clone()
        } else {
            resolution_arg
        };

        let families: Vec<String> = if tables_arg.to_lowercase() == "all" {
            TABLE_FAMILIES.iter().map(|s| s.to_string()).collect()
        } else {
            tables_arg.split(',').map(|s| s.trim().to_string()).collect()
        };
        for family in &families {
            if !TABLE_FAMILIES.contains(&family.as_str()) {
                return Err(TrendsError::Domain(format!(
                    "unknown extract table family: {}",
                    family
                ))
                .into());
            }
        }

        let ecos = read_eco_params(&store)?;
        if ecos.is_empty() {
            return Err(TrendsError::Domain(
                "no analyzed ecoregions found in the Ecoregions table".to_string(),
            )
            .into());
        }

        for family in &families {
            if verbose {
                println!("Building {} tables...", family);
            }
            let (codes, matrix) = build_family(&store, family, &resolution, &ecos)?;
            write_variants(
                &output_dir,
                family,
                &resolution,
                &ecos,
                &codes,
                &matrix,
            )?;
        }

        if verbose {
            println!("Complete! Please see {} for output.", output_dir);
        }
        let elapsed_time = get_formatted_elapsed_time(start);
        if verbose {
            println!("\n{}", &format!("Elapsed Time: {}", elapsed_time));
        }

        Ok(())
    }
}

fn read_eco_params(store: &TableStore) -> TrendsResult<Vec<EcoParams>> {
    let rows = store.select_rows(
        ECOREGIONS_TABLE,
        &[(
            "AnalysisNum".to_string(),
            names::TRENDS_ANALYSIS_NUM.to_string(),
        )],
    )?;
    let mut ecos = vec![];
    for row in rows {
        let field = |name: &str| -> TrendsResult<f64> {
            row.get(name)
                .and_then(|v| v.parse::<f64>().ok())
                .ok_or_else(|| TrendsError::Table(format!("bad or missing field {}", name)))
        };
        ecos.push(EcoParams {
            eco_num: field("EcoLevel3ID")? as usize,
            total_blocks: field("TotalBlocks")? as usize,
            sample_blocks: field("SampleBlocks")? as usize,
            total_pixels: field("TotalPixels")?,
            student_t: [
                field("StudentT_85")?,
                field("StudentT_90")?,
                field("StudentT_95")?,
                field("StudentT_99")?,
            ],
        });
    }
    ecos.sort_by_key(|e| e.eco_num);
    Ok(ecos)
}

/// Reads one statistic row of a stats table into per-label values.
fn stat_values(
    store: &TableStore,
    table: &str,
    filters: &[(String, String)],
    labels: &[String],
) -> TrendsResult<Vec<f64>> {
    let rows = store.select_rows(table, filters)?;
    let mut values = vec![0.0; labels.len()];
    if let Some(row) = rows.first() {
        for (i, label) in labels.iter().enumerate() {
            values[i] = row.get(label).and_then(|v| v.parse().ok()).unwrap_or(0.0);
        }
    }
    Ok(values)
}

fn base_filters(eco: usize, resolution: &str, statistic: &str) -> Vec<(String, String)> {
    vec![
        (
            "AnalysisNum".to_string(),
            names::TRENDS_ANALYSIS_NUM.to_string(),
        ),
        ("EcoLevel3ID".to_string(), eco.to_string()),
        ("Resolution".to_string(), resolution.to_string()),
        ("Statistic".to_string(), statistic.to_string()),
    ]
}

/// Builds the value matrix of one table family: the column codes and
/// one row of values per ecoregion.
fn build_family(
    store: &TableStore,
    family: &str,
    resolution: &str,
    ecos: &[EcoParams],
) -> TrendsResult<(Vec<String>, Vec<Vec<f64>>)> {
    let ct_labels: Vec<String> = (1..=names::NUM_CONVERSIONS).map(|i| format!("CT{}", i)).collect();
    let lc_labels: Vec<String> = (1..=names::NUM_LC_TYPES).map(|i| format!("LC{}", i)).collect();
    let mc_labels: Vec<String> = (0..names::NUM_MULTI).map(|i| format!("MC{}", i)).collect();

    let mut codes = vec![];
    let mut matrix = vec![vec![]; ecos.len()];

    match family {
        "ConversionChange" | "ConversionError" => {
            let statistic = if family == "ConversionChange" {
                "EstChange"
            } else {
                "StdError"
            };
            let prefix = if family == "ConversionChange" { "EC" } else { "SE" };
            for (k, interval) in names::TRENDS_INTERVALS.iter().enumerate() {
                for id in 1..=names::NUM_CONVERSIONS {
                    codes.push(format!("{}{}_{}", prefix, id, k + 1));
                }
                for (row, eco) in ecos.iter().enumerate() {
                    let mut filters = base_filters(eco.eco_num, resolution, statistic);
                    filters.push(("ChangePeriod".to_string(), interval.to_string()));
                    let values = stat_values(store, "TrendsChangeStats", &filters, &ct_labels)?;
                    matrix[row].extend(values);
                }
            }
        }
        "Gains" | "Losses" | "Gross" | "Net" => {
            let (kind, prefix) = match family {
                "Gains" => ("gain", "GAIN"),
                "Losses" => ("loss", "LOSS"),
                "Gross" => ("gross", "GROS"),
                _ => ("net", "NET"),
            };
            for (k, interval) in names::TRENDS_INTERVALS.iter().enumerate() {
                for lc in 1..=names::NUM_LC_TYPES {
                    codes.push(format!("{}{}_{}", prefix, lc, k + 1));
                    codes.push(format!("{}SE{}_{}", prefix, lc, k + 1));
                }
                for (row, eco) in ecos.iter().enumerate() {
                    let mut est_filters = base_filters(eco.eco_num, resolution, "EstChange");
                    est_filters.push(("ChangePeriod".to_string(), interval.to_string()));
                    est_filters.push(("Glgn".to_string(), kind.to_string()));
                    let est = stat_values(store, "TrendsGlgnStats", &est_filters, &lc_labels)?;

                    let mut se_filters = base_filters(eco.eco_num, resolution, "StdError");
                    se_filters.push(("ChangePeriod".to_string(), interval.to_string()));
                    se_filters.push(("Glgn".to_string(), kind.to_string()));
                    let se = stat_values(store, "TrendsGlgnStats", &se_filters, &lc_labels)?;

                    for lc in 0..names::NUM_LC_TYPES {
                        matrix[row].push(est[lc]);
                        matrix[row].push(se[lc]);
                    }
                }
            }
        }
        "Composition" => {
            for (k, year) in names::TRENDS_YEARS.iter().enumerate() {
                for lc in 1..=names::NUM_LC_TYPES {
                    codes.push(format!("COMP{}_{}", lc, k + 1));
                    codes.push(format!("CMSE{}_{}", lc, k + 1));
                }
                for (row, eco) in ecos.iter().enumerate() {
                    let mut est_filters = base_filters(eco.eco_num, resolution, "EstChange");
                    est_filters.push(("CompYear".to_string(), year.to_string()));
                    let est = stat_values(store, "TrendsCompStats", &est_filters, &lc_labels)?;

                    let mut se_filters = base_filters(eco.eco_num, resolution, "StdError");
                    se_filters.push(("CompYear".to_string(), year.to_string()));
                    let se = stat_values(store, "TrendsCompStats", &se_filters, &lc_labels)?;

                    for lc in 0..names::NUM_LC_TYPES {
                        matrix[row].push(est[lc]);
                        matrix[row].push(se[lc]);
                    }
                }
            }
        }
        "Multichange" => {
            let interval = names::TRENDS_MULTI_INTERVALS[0];
            for m in 0..names::NUM_MULTI {
                codes.push(format!("MC{}", m));
                codes.push(format!("MCSE{}", m));
            }
            for (row, eco) in ecos.iter().enumerate() {
                let mut est_filters = base_filters(eco.eco_num, resolution, "EstChange");
                est_filters.push(("ChangePeriod".to_string(), interval.to_string()));
                let est = stat_values(store, "TrendsMultichangeStats", &est_filters, &mc_labels)?;

                let mut se_filters = base_filters(eco.eco_num, resolution, "StdError");
                se_filters.push(("ChangePeriod".to_string(), interval.to_string()));
                let se = stat_values(store, "TrendsMultichangeStats", &se_filters, &mc_labels)?;

                for m in 0..names::NUM_MULTI {
                    matrix[row].push(est[m]);
                    matrix[row].push(se[m]);
                }
            }
        }
        other => {
            return Err(TrendsError::Domain(format!(
                "unknown extract table family: {}",
                other
            )))
        }
    }

    Ok((codes, matrix))
}

fn family_file_tag(family: &str) -> &'static str {
    match family {
        "ConversionChange" => "CONVERSION_CHANGE",
        "ConversionError" => "CONVERSION_ERROR",
        "Composition" => "COMPOSITION",
        "Gains" => "GAINS",
        "Losses" => "LOSSES",
        "Gross" => "GROSS",
        "Net" => "NET",
        _ => "MULTICHANGE",
    }
}

/// Writes the four unit variants of one family.
fn write_variants(
    output_dir: &str,
    family: &str,
    resolution: &str,
    ecos: &[EcoParams],
    codes: &[String],
    matrix: &[Vec<f64>],
) -> TrendsResult<()> {
    let justdate = Local::now().format("%m%d%Y").to_string();
    let sqkm = names::sqkm_factor(resolution);

    for variant in UNIT_VARIANTS {
        let mut values = matrix.to_vec();
        match variant {
            "PIXEL" => {}
            "SQKM" => {
                for row in values.iter_mut() {
                    for v in row.iter_mut() {
                        *v *= sqkm;
                    }
                }
            }
            "PERCENTOFECO" => {
                for (row, eco) in values.iter_mut().zip(ecos.iter()) {
                    if eco.total_pixels > 0.0 {
                        for v in row.iter_mut() {
                            *v /= eco.total_pixels;
                        }
                    }
                }
            }
            _ => {
                // PERCENTOFCLASS: each column is scaled by its total
                // over all ecoregions.
                for col in 0..codes.len() {
                    let total: f64 = values.iter().map(|row| row[col]).sum();
                    if total != 0.0 {
                        for row in values.iter_mut() {
                            row[col] /= total;
                        }
                    }
                }
            }
        }

        let file_name = format!(
            "TRENDS_{}_{}_{}_{}.txt",
            family_file_tag(family),
            resolution,
            variant,
            justdate
        );
        let path = Path::new(output_dir).join(file_name);
        write_fixed_width(&path, ecos, codes, &values)?;
    }
    Ok(())
}

const ECO_COLUMNS: [&str; 9] = [
    "ECNM", "ECTB", "ECSB", "ECTP", "ECDF", "ECST85", "ECST90", "ECST95", "ECST99",
];

fn write_fixed_width(
    path: &Path,
    ecos: &[EcoParams],
    codes: &[String],
    values: &[Vec<f64>],
) -> TrendsResult<()> {
    let f = File::create(path)?;
    let mut writer = BufWriter::new(f);

    let mut widths: BTreeMap<usize, usize> = BTreeMap::new();
    let all_columns: Vec<&str> = ECO_COLUMNS
        .iter()
        .copied()
        .chain(codes.iter().map(|c| c.as_str()))
        .collect();
    for (i, column) in all_columns.iter().enumerate() {
        widths.insert(i, column.len().max(14) + 2);
    }

    let mut header = String::new();
    for (i, column) in all_columns.iter().enumerate() {
        header.push_str(&format!("{:>width$}", column, width = widths[&i]));
    }
    writeln!(writer, "{}", header)?;

    for (eco, row) in ecos.iter().zip(values.iter()) {
        let mut line = String::new();
        let leading = [
            format!("{}", eco.eco_num),
            format!("{}", eco.total_blocks),
            format!("{}", eco.sample_blocks),
            format!("{:.1}", eco.total_pixels),
            format!("{}", eco.sample_blocks.saturating_sub(1)),
            format!("{:.4}", eco.student_t[0]),
            format!("{:.4}", eco.student_t[1]),
            format!("{:.4}", eco.student_t[2]),
            format!("{:.4}", eco.student_t[3]),
        ];
        for (i, value) in leading.iter().enumerate() {
            line.push_str(&format!("{:>width$}", value, width = widths[&i]));
        }
        for (j, value) in row.iter().enumerate() {
            let i = ECO_COLUMNS.len() + j;
            line.push_str(&format!("{:>width$.6}", value, width = widths[&i]));
        }
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}
