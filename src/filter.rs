use std::collections::BTreeSet;

use anyhow::{Result, anyhow, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    error::{PipelineError, PipelineResult},
    roles::{Role, RoleBinding},
    validate::ValidatedRow,
};

/// Inclusive numeric interval for the year role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearRange {
    pub low: f64,
    pub high: f64,
}

impl YearRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// One optional predicate per filterable role. `None` means unrestricted;
/// `Some` of an empty set means nothing is selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSpec {
    pub platforms: Option<BTreeSet<String>>,
    pub publishers: Option<BTreeSet<String>>,
    pub years: Option<YearRange>,
}

impl FilterSpec {
    pub fn is_unrestricted(&self) -> bool {
        self.platforms.is_none() && self.publishers.is_none() && self.years.is_none()
    }

    /// Roles this spec places a predicate on.
    pub fn roles(&self) -> Vec<Role> {
        let mut roles = Vec::new();
        if self.years.is_some() {
            roles.push(Role::Year);
        }
        if self.platforms.is_some() {
            roles.push(Role::Platform);
        }
        if self.publishers.is_some() {
            roles.push(Role::Publisher);
        }
        roles
    }

    pub fn matches(&self, row: &ValidatedRow) -> bool {
        if let Some(range) = &self.years
            && !row.year.is_some_and(|year| range.contains(year))
        {
            return false;
        }
        if let Some(allowed) = &self.platforms
            && !row.platform.as_ref().is_some_and(|p| allowed.contains(p))
        {
            return false;
        }
        if let Some(allowed) = &self.publishers
            && !row.publisher.as_ref().is_some_and(|p| allowed.contains(p))
        {
            return false;
        }
        true
    }
}

/// Returns the rows satisfying every predicate in `spec`, in source order.
///
/// A predicate on a role with no bound column is rejected rather than
/// silently ignored.
pub fn apply<'a>(
    rows: &'a [ValidatedRow],
    binding: &RoleBinding,
    spec: &FilterSpec,
) -> PipelineResult<Vec<&'a ValidatedRow>> {
    for role in spec.roles() {
        if !binding.is_bound(role) {
            return Err(PipelineError::UnboundRole(role));
        }
    }
    Ok(rows.iter().filter(|row| spec.matches(row)).collect())
}

/// Builds an allow-set from repeated and/or comma-separated CLI values.
///
/// `None` when the flag was never given. Blank entries are dropped, so an
/// explicit empty value yields an empty set.
pub fn parse_allow_set(values: &[String]) -> Option<BTreeSet<String>> {
    if values.is_empty() {
        return None;
    }
    Some(
        values
            .iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Parses `LOW:HIGH`, where either bound may be omitted (`2000:`, `:2010`).
pub fn parse_year_range(value: &str) -> Result<YearRange> {
    let trimmed = value.trim();
    let (low, high) = trimmed
        .split_once(':')
        .ok_or_else(|| anyhow!("Year range '{trimmed}' must look like LOW:HIGH"))?;
    let parse_bound = |bound: &str, open: f64| -> Result<f64> {
        let bound = bound.trim();
        if bound.is_empty() {
            return Ok(open);
        }
        bound
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| anyhow!("Invalid year bound '{bound}' in '{trimmed}'"))
    };
    let low = parse_bound(low, f64::NEG_INFINITY)?;
    let high = parse_bound(high, f64::INFINITY)?;
    ensure!(
        low <= high,
        "Year range '{trimmed}' has its lower bound above its upper bound"
    );
    Ok(YearRange::new(low, high))
}
