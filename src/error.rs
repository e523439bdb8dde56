//! Typed failures raised by the normalization and aggregation pipeline.
//!
//! Only conditions a caller is expected to branch on live here. I/O, CSV
//! decoding and configuration problems travel as `anyhow::Error` with
//! context attached at the call site.

use thiserror::Error;

use crate::roles::Role;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// No column could be bound to a role every report depends on.
    #[error("No column matches required role '{role}' (looked for '{token}' in {columns:?})")]
    MissingRequiredRole {
        role: Role,
        token: &'static str,
        columns: Vec<String>,
    },

    /// The operation has no defined answer for an empty row set.
    #[error("No data matches: {operation} requires at least one row")]
    EmptyInput { operation: &'static str },

    /// A filter or grouping referenced a role with no bound column.
    #[error("Role '{0}' is not bound to any column in this dataset")]
    UnboundRole(Role),

    /// The input has no header row at all.
    #[error("Input does not contain a header row")]
    EmptyHeader,
}

impl PipelineError {
    pub fn is_empty_input(&self) -> bool {
        matches!(self, PipelineError::EmptyInput { .. })
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
