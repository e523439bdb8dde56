pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod export;
pub mod filter;
pub mod io_utils;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod roles;
pub mod table;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};
use serde::Serialize;

use crate::{
    cache::DatasetCache,
    cli::{Cli, Commands, FilterArgs, OutputFormat},
    config::{Settings, resolve_settings},
    error::PipelineError,
    pipeline::{PreparedDataset, prepare_path},
    roles::{Role, RoleBinding},
    validate::{DroppedRow, ValidatedRow},
};

static LOGGER: OnceLock<()> = OnceLock::new();

const DROPPED_PREVIEW: usize = 10;

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_lens", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Roles(args) => handle_roles(&args),
        Commands::Summary(args) => handle_summary(&args),
        Commands::Top(args) => handle_top(&args),
        Commands::Group(args) => handle_group(&args),
        Commands::Rows(args) => handle_rows(&args),
        Commands::Export(args) => handle_export(&args),
        Commands::Dashboard(args) => handle_dashboard(&args),
        Commands::Batch(args) => handle_batch(&args),
    }
}

fn load(settings: &Settings) -> Result<PreparedDataset> {
    info!(
        "Loading '{}' with delimiter '{}'",
        settings.source.display(),
        io_utils::printable_delimiter(settings.options.delimiter)
    );
    let dataset = prepare_path(&settings.source, &settings.options)?;
    if !dataset.dropped.is_empty() {
        warn!(
            "Dropped {} of {} row(s) with missing or unparseable values",
            dataset.dropped_count(),
            dataset.source_rows
        );
    }
    Ok(dataset)
}

fn filtered<'a>(dataset: &'a PreparedDataset, filters: &FilterArgs) -> Result<Vec<&'a ValidatedRow>> {
    let spec = filters.to_spec();
    debug!("Filter spec: {spec:?}");
    let rows = dataset.filter(&spec)?;
    info!("{} of {} row(s) match the filters", rows.len(), dataset.rows.len());
    Ok(rows)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Serializing report")?;
    println!("{rendered}");
    Ok(())
}

#[derive(Debug, Serialize)]
struct RolesReport<'a> {
    raw_headers: &'a [String],
    columns: &'a [String],
    binding: &'a RoleBinding,
    source_rows: usize,
    kept_rows: usize,
    dropped: &'a [DroppedRow],
}

fn handle_roles(args: &cli::RolesArgs) -> Result<()> {
    let settings = resolve_settings(&args.source, None)?;
    let dataset = load(&settings)?;
    let binding = &dataset.binding;

    if args.format == OutputFormat::Json {
        return print_json(&RolesReport {
            raw_headers: &dataset.raw_headers,
            columns: &dataset.columns,
            binding,
            source_rows: dataset.source_rows,
            kept_rows: dataset.rows.len(),
            dropped: &dataset.dropped,
        });
    }

    let rows = dataset
        .raw_headers
        .iter()
        .zip(&dataset.columns)
        .enumerate()
        .map(|(idx, (raw, canonical))| {
            let roles = Role::ALL
                .iter()
                .filter(|role| binding.get(**role).is_some_and(|c| c.index == idx))
                .map(|role| role.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            vec![(idx + 1).to_string(), raw.clone(), canonical.clone(), roles]
        })
        .collect::<Vec<_>>();
    let headers = ["#", "raw", "canonical", "roles"].map(String::from);
    table::print_table(&headers, &rows);

    let unbound = Role::ALL
        .iter()
        .filter(|role| !binding.is_bound(**role))
        .map(|role| role.as_str())
        .collect::<Vec<_>>();
    if !unbound.is_empty() {
        println!("\nUnbound roles: {}", unbound.join(", "));
    }
    for ambiguity in binding.ambiguities() {
        println!("Ambiguous: {ambiguity}");
    }
    println!(
        "\nKept {} of {} row(s); dropped {}",
        dataset.rows.len(),
        dataset.source_rows,
        dataset.dropped_count()
    );
    for dropped in dataset.dropped.iter().take(DROPPED_PREVIEW) {
        println!("  line {}: {}", dropped.line, dropped.reason);
    }
    if dataset.dropped_count() > DROPPED_PREVIEW {
        println!("  ... {} more", dataset.dropped_count() - DROPPED_PREVIEW);
    }
    Ok(())
}

fn handle_summary(args: &cli::SummaryArgs) -> Result<()> {
    let settings = resolve_settings(&args.source, None)?;
    let dataset = load(&settings)?;
    let rows = filtered(&dataset, &args.filters)?;
    let summary = match aggregate::summarize(&rows) {
        Ok(summary) => summary,
        Err(err @ PipelineError::EmptyInput { .. }) => {
            warn!("{err}");
            println!("No data matches the current filters.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    match args.format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Table => {
            print!("{}", dashboard::render_summary(&summary));
            Ok(())
        }
    }
}

fn handle_top(args: &cli::TopArgs) -> Result<()> {
    let settings = resolve_settings(&args.source, args.top)?;
    let dataset = load(&settings)?;
    let rows = filtered(&dataset, &args.filters)?;
    let games = dashboard::ranked_games(&aggregate::top_n(&rows, settings.top));
    match args.format {
        OutputFormat::Json => print_json(&games),
        OutputFormat::Table => {
            print!("{}", dashboard::render_games(&games));
            Ok(())
        }
    }
}

fn handle_group(args: &cli::GroupArgs) -> Result<()> {
    let settings = resolve_settings(&args.source, None)?;
    let dataset = load(&settings)?;
    let rows = filtered(&dataset, &args.filters)?;
    let mut result = aggregate::group_by(&rows, &dataset.binding, args.by, args.function)?;
    if let Some(n) = args.top {
        result = result.ranked(n);
    }
    info!(
        "Computed {} {} group(s) by {}",
        result.len(),
        args.function,
        args.by
    );
    match args.format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Table => {
            print!("{}", dashboard::render_aggregation(&result));
            Ok(())
        }
    }
}

fn handle_rows(args: &cli::RowsArgs) -> Result<()> {
    let settings = resolve_settings(&args.source, None)?;
    let dataset = load(&settings)?;
    let rows = filtered(&dataset, &args.filters)?;
    let limit = if args.limit == 0 { rows.len() } else { args.limit };
    let rendered = rows
        .iter()
        .take(limit)
        .map(|row| {
            row.cells
                .iter()
                .map(|cell| cell.as_ref().map(|v| v.as_display()).unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    table::print_table(&dataset.columns, &rendered);
    info!("Displayed {} of {} row(s)", rendered.len(), rows.len());
    Ok(())
}

fn handle_export(args: &cli::ExportArgs) -> Result<()> {
    let settings = resolve_settings(&args.source, None)?;
    let dataset = load(&settings)?;
    let rows = filtered(&dataset, &args.filters)?;
    let delimiter = args
        .output_delimiter
        .unwrap_or(io_utils::DEFAULT_CSV_DELIMITER);
    let written = export::export_to_path(args.output.as_deref(), delimiter, &dataset.columns, &rows)?;
    info!(
        "Exported {} row(s) to {}",
        written,
        args.output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into())
    );
    Ok(())
}

fn handle_dashboard(args: &cli::DashboardArgs) -> Result<()> {
    let settings = resolve_settings(&args.source, args.top)?;
    let dataset = load(&settings)?;
    let report = dashboard::build(&dataset, &args.filters.to_spec(), settings.top)?;
    match args.format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            print!("{}", dashboard::render_text(&report));
            Ok(())
        }
    }
}

fn handle_batch(args: &cli::BatchArgs) -> Result<()> {
    let settings = resolve_settings(&args.source, None)?;
    let file = query::QueryFile::load(&args.queries)?;
    let mut cache = DatasetCache::new(settings.options);
    let reports = query::run_queries(&mut cache, &file, &settings.source, settings.top)?;
    info!(
        "Prepared {} dataset(s) for {} quer(ies)",
        cache.preparations(),
        reports.len()
    );
    match args.format {
        OutputFormat::Json => print_json(&reports),
        OutputFormat::Table => {
            print!("{}", query::render_reports(&reports));
            Ok(())
        }
    }
}
