use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    aggregate::{AggFunction, GroupRole},
    filter::{self, FilterSpec, YearRange},
    validate::Completeness,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Explore loosely structured game sales tables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show normalized headers, role bindings, and rows dropped during validation
    Roles(RolesArgs),
    /// Report row count, total sales, and mean sales for the filtered rows
    Summary(SummaryArgs),
    /// List the best-selling games
    Top(TopArgs),
    /// Aggregate sales by year, platform, or publisher
    Group(GroupArgs),
    /// Print the filtered rows as a table
    Rows(RowsArgs),
    /// Write the filtered rows to a CSV file
    Export(ExportArgs),
    /// Render KPIs and every chart dataset in one report
    Dashboard(DashboardArgs),
    /// Run a YAML file of named queries
    Batch(BatchArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Input CSV file (defaults to the config `source`, then best_selling_video_games.csv)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Columns that must be complete for a row to be kept (defaults to all-columns)
    #[arg(long, value_enum)]
    pub completeness: Option<Completeness>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Platforms to keep; repeat or comma-separate. An empty value keeps nothing
    #[arg(long = "platform", action = clap::ArgAction::Append)]
    pub platforms: Vec<String>,
    /// Publishers to keep; repeat or comma-separate. An empty value keeps nothing
    #[arg(long = "publisher", action = clap::ArgAction::Append)]
    pub publishers: Vec<String>,
    /// Inclusive year range LOW:HIGH; either bound may be omitted
    #[arg(long = "years", value_parser = parse_years)]
    pub years: Option<YearRange>,
}

impl FilterArgs {
    pub fn to_spec(&self) -> FilterSpec {
        FilterSpec {
            platforms: filter::parse_allow_set(&self.platforms),
            publishers: filter::parse_allow_set(&self.publishers),
            years: self.years,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct RolesArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct TopArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Number of games to list (defaults to the config `top`, then 10)
    #[arg(short = 'n', long)]
    pub top: Option<usize>,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct GroupArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Role whose distinct values form the groups
    #[arg(long = "by", value_enum)]
    pub by: GroupRole,
    /// Aggregation applied to each group's sales
    #[arg(long = "agg", value_enum, default_value = "sum")]
    pub function: AggFunction,
    /// Rank groups by value and keep the first N (natural key order when omitted)
    #[arg(short = 'n', long)]
    pub top: Option<usize>,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct RowsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Maximum rows to display (0 = all)
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter for the exported file (defaults to ',')
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Length of the top games and top publishers lists
    #[arg(short = 'n', long)]
    pub top: Option<usize>,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// YAML file listing the queries to run
    #[arg(short = 'q', long = "queries")]
    pub queries: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

fn parse_years(value: &str) -> Result<YearRange, String> {
    filter::parse_year_range(value).map_err(|err| err.to_string())
}
