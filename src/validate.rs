//! Type coercion and row validation.
//!
//! Sales and (when bound) year cells go through a permissive numeric parse.
//! A value that does not parse becomes a missing cell instead of an error.
//! By default any row left with a missing cell in any column is dropped;
//! [`Completeness::RoleColumns`] relaxes that to role-bound columns only.
//! Every drop is reported with its line number and reason so data loss is
//! visible to callers.

use std::fmt;

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::{RawDataset, Value, is_missing_token, parse_numeric},
    roles::{BoundColumn, Role, RoleBinding},
};

/// Which columns must be complete for a row to survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum Completeness {
    /// Only columns bound to a role.
    RoleColumns,
    /// Every column in the dataset.
    #[default]
    AllColumns,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRow {
    /// Source line number; the header is line 1.
    pub line: usize,
    /// Zero-based position in the source, used for stable tie-breaking.
    pub position: usize,
    pub title: String,
    pub sales: f64,
    pub year: Option<f64>,
    pub platform: Option<String>,
    pub publisher: Option<String>,
    /// Every column in canonical order, coerced.
    pub cells: Vec<Option<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropReason {
    /// A numeric role held a value that is not a number.
    Unparseable {
        role: Role,
        column: String,
        raw: String,
    },
    /// A required cell was empty or a placeholder such as `N/A`.
    Missing { role: Option<Role>, column: String },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::Unparseable { role, column, raw } => {
                write!(f, "{role} column '{column}' value '{raw}' is not numeric")
            }
            DropReason::Missing {
                role: Some(role),
                column,
            } => write!(f, "{role} column '{column}' is missing"),
            DropReason::Missing { role: None, column } => {
                write!(f, "column '{column}' is missing")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRow {
    pub line: usize,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Default)]
pub struct Validation {
    pub rows: Vec<ValidatedRow>,
    pub dropped: Vec<DroppedRow>,
}

impl Validation {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

pub fn validate(
    dataset: &RawDataset,
    binding: &RoleBinding,
    completeness: Completeness,
) -> Validation {
    let numeric_columns = [Some(binding.sales.index), binding.year.as_ref().map(|c| c.index)];
    let mut validation = Validation::default();

    for (position, raw) in dataset.rows.iter().enumerate() {
        let line = position + 2;
        let cells = raw
            .iter()
            .enumerate()
            .map(|(idx, value)| {
                if numeric_columns.contains(&Some(idx)) {
                    parse_numeric(value).map(Value::Number)
                } else if is_missing_token(value) {
                    None
                } else {
                    Some(Value::Text(value.clone()))
                }
            })
            .collect::<Vec<_>>();

        match build_row(dataset, binding, completeness, raw, cells, position) {
            Ok(row) => validation.rows.push(row),
            Err(reason) => {
                debug!("Dropping line {line}: {reason}");
                validation.dropped.push(DroppedRow { line, reason });
            }
        }
    }
    validation
}

fn build_row(
    dataset: &RawDataset,
    binding: &RoleBinding,
    completeness: Completeness,
    raw: &[String],
    cells: Vec<Option<Value>>,
    position: usize,
) -> Result<ValidatedRow, DropReason> {
    let sales = numeric_cell(raw, &cells, Role::Sales, &binding.sales)?;
    let year = binding
        .year
        .as_ref()
        .map(|column| numeric_cell(raw, &cells, Role::Year, column))
        .transpose()?;
    let title = text_cell(raw, Role::GameTitle, &binding.game_title)?;
    let platform = binding
        .platform
        .as_ref()
        .map(|column| text_cell(raw, Role::Platform, column))
        .transpose()?;
    let publisher = binding
        .publisher
        .as_ref()
        .map(|column| text_cell(raw, Role::Publisher, column))
        .transpose()?;

    if completeness == Completeness::AllColumns
        && let Some(idx) = cells.iter().position(Option::is_none)
    {
        return Err(DropReason::Missing {
            role: None,
            column: dataset.columns[idx].clone(),
        });
    }

    Ok(ValidatedRow {
        line: position + 2,
        position,
        title,
        sales,
        year,
        platform,
        publisher,
        cells,
    })
}

fn numeric_cell(
    raw: &[String],
    cells: &[Option<Value>],
    role: Role,
    column: &BoundColumn,
) -> Result<f64, DropReason> {
    if let Some(number) = cells
        .get(column.index)
        .and_then(|cell| cell.as_ref())
        .and_then(Value::as_number)
    {
        return Ok(number);
    }
    let raw_value = raw.get(column.index).map(String::as_str).unwrap_or("");
    if is_missing_token(raw_value) {
        Err(DropReason::Missing {
            role: Some(role),
            column: column.name.clone(),
        })
    } else {
        Err(DropReason::Unparseable {
            role,
            column: column.name.clone(),
            raw: raw_value.to_string(),
        })
    }
}

fn text_cell(raw: &[String], role: Role, column: &BoundColumn) -> Result<String, DropReason> {
    match raw.get(column.index) {
        Some(value) if !is_missing_token(value) => Ok(value.clone()),
        _ => Err(DropReason::Missing {
            role: Some(role),
            column: column.name.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::resolve_roles;

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> RawDataset {
        RawDataset {
            raw_headers: columns.iter().map(|s| s.to_string()).collect(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn unparseable_sales_is_reported_with_line() {
        let data = dataset(&["game", "sales"], &[&["A", "10"], &["B", "bad"]]);
        let binding = resolve_roles(&data.columns).unwrap();
        let validation = validate(&data, &binding, Completeness::RoleColumns);
        assert_eq!(validation.rows.len(), 1);
        assert_eq!(
            validation.dropped,
            vec![DroppedRow {
                line: 3,
                reason: DropReason::Unparseable {
                    role: Role::Sales,
                    column: "sales".into(),
                    raw: "bad".into(),
                },
            }]
        );
    }

    #[test]
    fn unbound_columns_only_matter_under_all_columns_policy() {
        assert_eq!(Completeness::default(), Completeness::AllColumns);
        let data = dataset(&["game", "sales", "notes"], &[&["A", "10", ""]]);
        let binding = resolve_roles(&data.columns).unwrap();
        assert_eq!(
            validate(&data, &binding, Completeness::RoleColumns)
                .rows
                .len(),
            1
        );
        let strict = validate(&data, &binding, Completeness::AllColumns);
        assert!(strict.rows.is_empty());
        assert_eq!(
            strict.dropped[0].reason,
            DropReason::Missing {
                role: None,
                column: "notes".into()
            }
        );
    }

    #[test]
    fn missing_optional_role_value_drops_row() {
        let data = dataset(
            &["game", "sales", "platform"],
            &[&["A", "1", "PS2"], &["B", "2", "N/A"]],
        );
        let binding = resolve_roles(&data.columns).unwrap();
        let validation = validate(&data, &binding, Completeness::RoleColumns);
        assert_eq!(validation.rows.len(), 1);
        assert_eq!(validation.rows[0].platform.as_deref(), Some("PS2"));
        assert_eq!(validation.dropped_count(), 1);
    }
}
