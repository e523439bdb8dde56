//! Batch execution of named queries against cached datasets.
//!
//! ```yaml
//! queries:
//!   - name: nintendo-top
//!     filter:
//!       publishers: [Nintendo]
//!     request: { kind: top, n: 5 }
//!   - name: yearly
//!     source: archive/2019.csv
//!     request: { kind: group, by: year, function: mean }
//! ```
//!
//! Each distinct source is prepared once through the [`DatasetCache`].
//! Conditions a single query can hit (no matching rows, a role the dataset
//! does not have) become outcomes of that query rather than aborting the
//! batch.

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::{self, AggFunction, AggregationResult, GroupRole, Summary},
    cache::DatasetCache,
    config::load_yaml,
    dashboard::{self, RankedGame},
    error::PipelineError,
    filter::FilterSpec,
    io_utils,
    pipeline::PreparedDataset,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryFile {
    pub queries: Vec<Query>,
}

impl QueryFile {
    pub fn load(path: &Path) -> Result<Self> {
        let mut file: Self =
            load_yaml(path).with_context(|| format!("Loading queries from {path:?}"))?;
        if let Some(dir) = path.parent() {
            for query in &mut file.queries {
                if let Some(source) = &query.source
                    && source.is_relative()
                    && !io_utils::is_dash(source)
                {
                    query.source = Some(dir.join(source));
                }
            }
        }
        Ok(file)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Query {
    pub name: String,
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default)]
    pub filter: FilterSpec,
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Request {
    Summary,
    Top {
        #[serde(default)]
        n: Option<usize>,
    },
    TopGame,
    Group {
        by: GroupRole,
        #[serde(default)]
        function: AggFunction,
        #[serde(default)]
        top: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    Summary { summary: Summary },
    Games { games: Vec<RankedGame> },
    Groups { result: AggregationResult },
    NoData { reason: String },
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryReport {
    pub name: String,
    pub source: PathBuf,
    pub matched_rows: usize,
    pub outcome: QueryOutcome,
}

/// Runs one query. Never fails: per-query conditions are folded into the
/// returned outcome.
pub fn run_query(
    dataset: &PreparedDataset,
    filter: &FilterSpec,
    request: &Request,
    default_top: usize,
) -> (usize, QueryOutcome) {
    let rows = match dataset.filter(filter) {
        Ok(rows) => rows,
        Err(err) => return (0, outcome_for_error(err)),
    };
    let matched = rows.len();
    let result = match request {
        Request::Summary => {
            aggregate::summarize(&rows).map(|summary| QueryOutcome::Summary { summary })
        }
        Request::Top { n } => Ok(QueryOutcome::Games {
            games: dashboard::ranked_games(&aggregate::top_n(&rows, n.unwrap_or(default_top))),
        }),
        Request::TopGame => aggregate::top_game(&rows).map(|best| QueryOutcome::Games {
            games: dashboard::ranked_games(&[best]),
        }),
        Request::Group { by, function, top } => {
            aggregate::group_by(&rows, &dataset.binding, *by, *function).map(|result| {
                let result = match top {
                    Some(n) => result.ranked(*n),
                    None => result,
                };
                QueryOutcome::Groups { result }
            })
        }
    };
    (matched, result.unwrap_or_else(outcome_for_error))
}

fn outcome_for_error(err: PipelineError) -> QueryOutcome {
    match err {
        PipelineError::EmptyInput { .. } => QueryOutcome::NoData {
            reason: err.to_string(),
        },
        other => QueryOutcome::Rejected {
            reason: other.to_string(),
        },
    }
}

pub fn run_queries(
    cache: &mut DatasetCache,
    file: &QueryFile,
    default_source: &Path,
    default_top: usize,
) -> Result<Vec<QueryReport>> {
    let mut reports = Vec::with_capacity(file.queries.len());
    for query in &file.queries {
        let source = query
            .source
            .clone()
            .unwrap_or_else(|| default_source.to_path_buf());
        debug!("Query '{}' against {:?}: {:?}", query.name, source, query.request);
        let dataset = cache
            .get_or_prepare(&source)
            .with_context(|| format!("Query '{}'", query.name))?;
        let (matched_rows, outcome) =
            run_query(&dataset, &query.filter, &query.request, default_top);
        reports.push(QueryReport {
            name: query.name.clone(),
            source,
            matched_rows,
            outcome,
        });
    }
    info!(
        "Ran {} quer(ies) over {} dataset(s)",
        reports.len(),
        cache.len()
    );
    Ok(reports)
}

pub fn render_reports(reports: &[QueryReport]) -> String {
    let mut out = String::new();
    for (idx, report) in reports.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "== {} ({} matching row(s))",
            report.name, report.matched_rows
        );
        match &report.outcome {
            QueryOutcome::Summary { summary } => out.push_str(&dashboard::render_summary(summary)),
            QueryOutcome::Games { games } => out.push_str(&dashboard::render_games(games)),
            QueryOutcome::Groups { result } => {
                out.push_str(&dashboard::render_aggregation(result))
            }
            QueryOutcome::NoData { reason } | QueryOutcome::Rejected { reason } => {
                let _ = writeln!(out, "{reason}");
            }
        }
    }
    out
}
