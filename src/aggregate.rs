//! Summary statistics, ranking, and grouped aggregation over filtered rows.
//!
//! Every function here is pure over a slice of row references. Operations
//! whose answer is undefined on an empty slice (mean, the single top row)
//! return [`PipelineError::EmptyInput`]; ranking and grouping simply return
//! empty results.

use std::{cmp::Ordering, collections::BTreeMap, fmt};

use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    data::format_number,
    error::{PipelineError, PipelineResult},
    roles::{Role, RoleBinding},
    validate::ValidatedRow,
};

pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub total_sales: f64,
    pub mean_sales: f64,
}

pub fn total_sales(rows: &[&ValidatedRow]) -> f64 {
    rows.iter().map(|row| row.sales).sum()
}

/// Population mean of sales.
pub fn mean_sales(rows: &[&ValidatedRow]) -> PipelineResult<f64> {
    if rows.is_empty() {
        return Err(PipelineError::EmptyInput {
            operation: "mean sales",
        });
    }
    Ok(total_sales(rows) / rows.len() as f64)
}

pub fn summarize(rows: &[&ValidatedRow]) -> PipelineResult<Summary> {
    let mean_sales = mean_sales(rows)?;
    Ok(Summary {
        count: rows.len(),
        total_sales: total_sales(rows),
        mean_sales,
    })
}

/// The `n` best-selling rows, highest first. Equal sales keep source order.
pub fn top_n<'a>(rows: &[&'a ValidatedRow], n: usize) -> Vec<&'a ValidatedRow> {
    rows.iter()
        .copied()
        .sorted_by(|a, b| {
            b.sales
                .total_cmp(&a.sales)
                .then_with(|| a.position.cmp(&b.position))
        })
        .take(n)
        .collect()
}

/// The single best-selling row; the earliest one wins a tie.
pub fn top_game<'a>(rows: &[&'a ValidatedRow]) -> PipelineResult<&'a ValidatedRow> {
    rows.iter()
        .copied()
        .reduce(|best, row| {
            if row.sales > best.sales
                || (row.sales == best.sales && row.position < best.position)
            {
                row
            } else {
                best
            }
        })
        .ok_or(PipelineError::EmptyInput {
            operation: "top game",
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    Year,
    Platform,
    Publisher,
}

impl GroupRole {
    pub fn role(self) -> Role {
        match self {
            GroupRole::Year => Role::Year,
            GroupRole::Platform => Role::Platform,
            GroupRole::Publisher => Role::Publisher,
        }
    }

    fn key(self, row: &ValidatedRow) -> Option<GroupKey> {
        match self {
            GroupRole::Year => row.year.map(GroupKey::Number),
            GroupRole::Platform => row.platform.clone().map(GroupKey::Text),
            GroupRole::Publisher => row.publisher.clone().map(GroupKey::Text),
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role().as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AggFunction {
    #[default]
    Sum,
    Mean,
}

impl fmt::Display for AggFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggFunction::Sum => f.write_str("sum"),
            AggFunction::Mean => f.write_str("mean"),
        }
    }
}

/// Distinct value of a grouping column. Years order numerically, text
/// lexicographically.
#[derive(Debug, Clone)]
pub enum GroupKey {
    Number(f64),
    Text(String),
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Number(a), GroupKey::Number(b)) => a.total_cmp(b),
            (GroupKey::Text(a), GroupKey::Text(b)) => a.cmp(b),
            (GroupKey::Number(_), GroupKey::Text(_)) => Ordering::Less,
            (GroupKey::Text(_), GroupKey::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Number(n) => f.write_str(&format_number(*n)),
            GroupKey::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            GroupKey::Number(n) => serializer.serialize_f64(*n),
            GroupKey::Text(s) => serializer.serialize_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEntry {
    pub key: GroupKey,
    pub value: f64,
    pub rows: usize,
    pub sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub role: GroupRole,
    pub function: AggFunction,
    pub entries: Vec<GroupEntry>,
}

impl AggregationResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the aggregate values across groups.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|entry| entry.value).sum()
    }

    /// Reorders by value descending (ties by key) and keeps the first `n`.
    pub fn ranked(mut self, n: usize) -> Self {
        self.entries.sort_by(|a, b| {
            b.value
                .total_cmp(&a.value)
                .then_with(|| a.key.cmp(&b.key))
        });
        self.entries.truncate(n);
        self
    }
}

/// Aggregates sales per distinct value of `group`. Entries come back in
/// natural key order; call [`AggregationResult::ranked`] for top-N views.
pub fn group_by(
    rows: &[&ValidatedRow],
    binding: &RoleBinding,
    group: GroupRole,
    function: AggFunction,
) -> PipelineResult<AggregationResult> {
    binding.require(group.role())?;

    let mut groups: BTreeMap<GroupKey, (f64, usize)> = BTreeMap::new();
    for row in rows {
        let Some(key) = group.key(row) else {
            continue;
        };
        let slot = groups.entry(key).or_insert((0.0, 0));
        slot.0 += row.sales;
        slot.1 += 1;
    }

    let entries = groups
        .into_iter()
        .map(|(key, (sum, count))| GroupEntry {
            key,
            value: match function {
                AggFunction::Sum => sum,
                AggFunction::Mean => sum / count as f64,
            },
            rows: count,
            sum,
        })
        .collect();

    Ok(AggregationResult {
        role: group,
        function,
        entries,
    })
}
