use serde::Serialize;
use std::io;
use thiserror::Error;

/// Failure to analyze one resource. Never fatal to the rest of a run.
#[derive(Debug, Clone, Error)]
pub enum AnalyzeError {
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error(
        "ambiguous anonymous module in {path}: only one declaration per file may omit a name"
    )]
    AmbiguousModuleName { path: String },
}

impl AnalyzeError {
    pub fn path(&self) -> &str {
        match self {
            AnalyzeError::Parse { path, .. } | AnalyzeError::AmbiguousModuleName { path } => path,
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to read {path}: {source}")]
pub struct ResourceIoError {
    pub path: String,
    pub source: io::Error,
}

#[derive(Debug, Clone, Error)]
#[error("expression parser unavailable: {message}")]
pub struct CollaboratorUnavailable {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    Parse,
    AmbiguousModuleName,
    ResourceIo,
    CollaboratorUnavailable,
    BindingExpression,
}

/// A non-fatal problem surfaced in a run's summary.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Affected resource, `None` for run-wide problems
    pub resource: Option<String>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl From<&AnalyzeError> for Diagnostic {
    fn from(err: &AnalyzeError) -> Self {
        let kind = match err {
            AnalyzeError::Parse { .. } => DiagnosticKind::Parse,
            AnalyzeError::AmbiguousModuleName { .. } => DiagnosticKind::AmbiguousModuleName,
        };
        Diagnostic { resource: Some(err.path().to_string()), kind, message: err.to_string() }
    }
}

impl From<&ResourceIoError> for Diagnostic {
    fn from(err: &ResourceIoError) -> Self {
        Diagnostic {
            resource: Some(err.path.clone()),
            kind: DiagnosticKind::ResourceIo,
            message: err.to_string(),
        }
    }
}

impl From<&CollaboratorUnavailable> for Diagnostic {
    fn from(err: &CollaboratorUnavailable) -> Self {
        Diagnostic {
            resource: None,
            kind: DiagnosticKind::CollaboratorUnavailable,
            message: err.to_string(),
        }
    }
}
