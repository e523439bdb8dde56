//! The composite sales report: KPI cards plus the data behind each chart.
//!
//! Sections tied to an unbound role are left out, and an empty filter
//! result produces a report with no KPIs instead of an error.

use std::fmt::Write as _;

use serde::Serialize;

use crate::{
    aggregate::{
        self, AggFunction, AggregationResult, GroupKey, GroupRole, Summary, summarize, top_game,
    },
    data::format_number,
    error::{PipelineError, PipelineResult},
    filter::FilterSpec,
    pipeline::PreparedDataset,
    table::render_table,
    validate::ValidatedRow,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_games: usize,
    pub total_sales: f64,
    pub average_sales: f64,
    pub top_game: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedGame {
    pub rank: usize,
    pub title: String,
    pub sales: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareEntry {
    pub key: GroupKey,
    pub sales: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub matched_rows: usize,
    pub kpis: Option<Kpis>,
    pub top_games: Vec<RankedGame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_by_year: Option<AggregationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_share: Option<Vec<ShareEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_publishers: Option<AggregationResult>,
}

pub fn build(
    dataset: &PreparedDataset,
    spec: &FilterSpec,
    top: usize,
) -> PipelineResult<DashboardReport> {
    let rows = dataset.filter(spec)?;
    let binding = &dataset.binding;

    let kpis = match summarize(&rows) {
        Ok(summary) => Some(Kpis {
            total_games: summary.count,
            total_sales: round1(summary.total_sales),
            average_sales: round1(summary.mean_sales),
            top_game: top_game(&rows)?.title.clone(),
        }),
        Err(err) if err.is_empty_input() => None,
        Err(err) => return Err(err),
    };

    let optional_group = |group: GroupRole| -> PipelineResult<Option<AggregationResult>> {
        match aggregate::group_by(&rows, binding, group, AggFunction::Sum) {
            Ok(result) => Ok(Some(result)),
            Err(PipelineError::UnboundRole(_)) => Ok(None),
            Err(err) => Err(err),
        }
    };

    Ok(DashboardReport {
        matched_rows: rows.len(),
        kpis,
        top_games: ranked_games(&aggregate::top_n(&rows, top)),
        sales_by_year: optional_group(GroupRole::Year)?,
        platform_share: optional_group(GroupRole::Platform)?.map(|result| shares(&result)),
        top_publishers: optional_group(GroupRole::Publisher)?.map(|result| result.ranked(top)),
    })
}

pub fn ranked_games(rows: &[&ValidatedRow]) -> Vec<RankedGame> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| RankedGame {
            rank: idx + 1,
            title: row.title.clone(),
            sales: row.sales,
            year: row.year,
            platform: row.platform.clone(),
            publisher: row.publisher.clone(),
        })
        .collect()
}

/// Each group's share of the summed value, in percent.
pub fn shares(result: &AggregationResult) -> Vec<ShareEntry> {
    let total = result.total();
    result
        .entries
        .iter()
        .map(|entry| ShareEntry {
            key: entry.key.clone(),
            sales: entry.value,
            percent: if total > 0.0 {
                entry.value / total * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn render_summary(summary: &Summary) -> String {
    render_table(
        &headers(&["rows", "total_sales", "mean_sales"]),
        &[vec![
            summary.count.to_string(),
            format_number(summary.total_sales),
            format_number(summary.mean_sales),
        ]],
    )
}

pub fn render_games(games: &[RankedGame]) -> String {
    let rows = games
        .iter()
        .map(|game| {
            vec![
                game.rank.to_string(),
                game.title.clone(),
                format_number(game.sales),
                game.year.map(format_number).unwrap_or_default(),
                game.platform.clone().unwrap_or_default(),
                game.publisher.clone().unwrap_or_default(),
            ]
        })
        .collect::<Vec<_>>();
    render_table(
        &headers(&["#", "title", "sales", "year", "platform", "publisher"]),
        &rows,
    )
}

pub fn render_aggregation(result: &AggregationResult) -> String {
    let rows = result
        .entries
        .iter()
        .map(|entry| {
            vec![
                entry.key.to_string(),
                format_number(entry.value),
                entry.rows.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    render_table(
        &[
            result.role.to_string(),
            format!("{}_sales", result.function),
            "rows".to_string(),
        ],
        &rows,
    )
}

fn render_shares(entries: &[ShareEntry]) -> String {
    let rows = entries
        .iter()
        .map(|entry| {
            vec![
                entry.key.to_string(),
                format_number(entry.sales),
                format!("{:.1}%", entry.percent),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers(&["platform", "sales", "share"]), &rows)
}

pub fn render_text(report: &DashboardReport) -> String {
    let mut out = String::new();
    let Some(kpis) = &report.kpis else {
        let _ = writeln!(out, "No data matches the current filters.");
        return out;
    };

    let _ = writeln!(out, "== Key figures");
    out.push_str(&render_table(
        &headers(&["total_games", "total_sales", "average_sales", "top_game"]),
        &[vec![
            kpis.total_games.to_string(),
            format_number(kpis.total_sales),
            format_number(kpis.average_sales),
            kpis.top_game.clone(),
        ]],
    ));
    let _ = writeln!(out, "\n== Top {} games by sales", report.top_games.len());
    out.push_str(&render_games(&report.top_games));
    if let Some(yearly) = &report.sales_by_year {
        let _ = writeln!(out, "\n== Sales trend over time");
        out.push_str(&render_aggregation(yearly));
    }
    if let Some(shares) = &report.platform_share {
        let _ = writeln!(out, "\n== Platform market share");
        out.push_str(&render_shares(shares));
    }
    if let Some(publishers) = &report.top_publishers {
        let _ = writeln!(out, "\n== Top publishers");
        out.push_str(&render_aggregation(publishers));
    }
    out
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}
