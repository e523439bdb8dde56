//! Semantic role resolution over canonical column names.
//!
//! Each [`Role`] owns one or more substring tokens. Columns are scanned in
//! their original order and the first column containing the token is bound;
//! later candidates are ignored but recorded as [`Ambiguity`] entries so
//! callers can surface them. `sales` is mandatory, `game_title` always
//! binds (falling back to the first column), every other role may stay
//! unbound and simply disables the features that depend on it.

use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::{PipelineError, PipelineResult},
    normalize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Sales,
    Year,
    GameTitle,
    Platform,
    Publisher,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Sales,
        Role::Year,
        Role::GameTitle,
        Role::Platform,
        Role::Publisher,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Sales => "sales",
            Role::Year => "year",
            Role::GameTitle => "game_title",
            Role::Platform => "platform",
            Role::Publisher => "publisher",
        }
    }

    /// Substring tokens tried in order; a later token is only consulted when
    /// no column matched any earlier one.
    pub fn tokens(self) -> &'static [&'static str] {
        match self {
            Role::Sales => &["sales"],
            Role::Year => &["year"],
            Role::GameTitle => &["game", "title"],
            Role::Platform => &["platform"],
            Role::Publisher => &["publisher"],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundColumn {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleSource {
    Token(&'static str),
    FirstColumn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ambiguity {
    /// More than one column matched the role token; the first one won.
    RoleCandidates {
        role: Role,
        bound: String,
        ignored: Vec<String>,
    },
    /// Several raw headers normalized to the same canonical name.
    DuplicateName { name: String, positions: Vec<usize> },
}

impl fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ambiguity::RoleCandidates {
                role,
                bound,
                ignored,
            } => write!(
                f,
                "role '{role}' bound to '{bound}', also matched {}",
                ignored.join(", ")
            ),
            Ambiguity::DuplicateName { name, positions } => {
                let positions = positions
                    .iter()
                    .map(|p| (p + 1).to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "canonical name '{name}' shared by columns {positions}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleBinding {
    pub sales: BoundColumn,
    pub year: Option<BoundColumn>,
    pub game_title: BoundColumn,
    pub title_source: TitleSource,
    pub platform: Option<BoundColumn>,
    pub publisher: Option<BoundColumn>,
    ambiguities: Vec<Ambiguity>,
}

impl RoleBinding {
    pub fn get(&self, role: Role) -> Option<&BoundColumn> {
        match role {
            Role::Sales => Some(&self.sales),
            Role::Year => self.year.as_ref(),
            Role::GameTitle => Some(&self.game_title),
            Role::Platform => self.platform.as_ref(),
            Role::Publisher => self.publisher.as_ref(),
        }
    }

    pub fn is_bound(&self, role: Role) -> bool {
        self.get(role).is_some()
    }

    pub fn require(&self, role: Role) -> PipelineResult<&BoundColumn> {
        self.get(role).ok_or(PipelineError::UnboundRole(role))
    }

    /// Bound roles paired with their column index, in [`Role::ALL`] order.
    pub fn bound(&self) -> Vec<(Role, &BoundColumn)> {
        Role::ALL
            .iter()
            .filter_map(|role| self.get(*role).map(|column| (*role, column)))
            .collect()
    }

    pub fn ambiguities(&self) -> &[Ambiguity] {
        &self.ambiguities
    }
}

/// Binds every role against `columns` (already canonical).
pub fn resolve_roles(columns: &[String]) -> PipelineResult<RoleBinding> {
    let mut ambiguities = Vec::new();

    let sales = bind_by_tokens(columns, Role::Sales, &mut ambiguities)
        .map(|(column, _)| column)
        .ok_or_else(|| PipelineError::MissingRequiredRole {
            role: Role::Sales,
            token: Role::Sales.tokens()[0],
            columns: columns.to_vec(),
        })?;
    let year = bind_by_tokens(columns, Role::Year, &mut ambiguities).map(|(column, _)| column);
    let platform =
        bind_by_tokens(columns, Role::Platform, &mut ambiguities).map(|(column, _)| column);
    let publisher =
        bind_by_tokens(columns, Role::Publisher, &mut ambiguities).map(|(column, _)| column);

    let (game_title, title_source) = match bind_by_tokens(columns, Role::GameTitle, &mut ambiguities)
    {
        Some((column, token)) => (column, TitleSource::Token(token)),
        None => {
            // sales bound, so at least one column exists
            let column = BoundColumn {
                index: 0,
                name: columns[0].clone(),
            };
            warn!(
                "No column matches {:?}; using first column '{}' as game title",
                Role::GameTitle.tokens(),
                column.name
            );
            (column, TitleSource::FirstColumn)
        }
    };

    for name in normalize::duplicate_names(columns) {
        let positions = columns
            .iter()
            .enumerate()
            .filter(|(_, column)| **column == name)
            .map(|(idx, _)| idx)
            .collect();
        ambiguities.push(Ambiguity::DuplicateName { name, positions });
    }
    for ambiguity in &ambiguities {
        warn!("Ambiguous binding: {ambiguity}");
    }

    Ok(RoleBinding {
        sales,
        year,
        game_title,
        title_source,
        platform,
        publisher,
        ambiguities,
    })
}

fn bind_by_tokens(
    columns: &[String],
    role: Role,
    ambiguities: &mut Vec<Ambiguity>,
) -> Option<(BoundColumn, &'static str)> {
    for token in role.tokens() {
        let mut candidates = columns
            .iter()
            .enumerate()
            .filter(|(_, name)| name.contains(token));
        let Some((index, name)) = candidates.next() else {
            continue;
        };
        let ignored = candidates.map(|(_, name)| name.clone()).collect::<Vec<_>>();
        if !ignored.is_empty() {
            ambiguities.push(Ambiguity::RoleCandidates {
                role,
                bound: name.clone(),
                ignored,
            });
        }
        debug!("Role '{role}' bound to column {} '{name}' via '{token}'", index + 1);
        return Some((
            BoundColumn {
                index,
                name: name.clone(),
            },
            token,
        ));
    }
    debug!("Role '{role}' left unbound");
    None
}
