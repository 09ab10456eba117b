//! Error and warning types for the refactoring pipeline
//!
//! Fatal errors abort the run; warnings and per-service transform failures
//! are collected and reported as a batch so one broken service never hides
//! the rest of the chart.

use std::path::PathBuf;
use thiserror::Error;

use chartfold_core::CoreError;

/// Fatal pipeline error
#[derive(Debug, Error)]
pub enum RefactorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Input directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Output directory already exists: {0} (use --force to overwrite)")]
    OutputExists(PathBuf),

    #[error("No services found in {0}")]
    NoServices(PathBuf),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}

/// Template generation failure
///
/// Asking for a kind with no registered skeleton is a programming error,
/// not a data condition, so it aborts the whole run with no partial output.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("No template skeleton registered for resource kind '{kind}'")]
    UnsupportedKind { kind: String },
}

/// Per-service values transformation failure
///
/// These never abort the run; the orchestrator collects them and keeps
/// processing the remaining services.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    #[error("service '{service}': field '{path}' expected {expected}, found {found}")]
    ShapeMismatch {
        service: String,
        path: String,
        expected: String,
        found: String,
    },

    #[error(
        "service '{service}': '{existing}' and '{incoming}' both relocate to values key '{target}' with different content"
    )]
    RelocationConflict {
        service: String,
        existing: String,
        incoming: String,
        target: String,
    },
}

impl TransformError {
    /// The service this failure belongs to
    pub fn service(&self) -> &str {
        match self {
            Self::ShapeMismatch { service, .. } => service,
            Self::RelocationConflict { service, .. } => service,
        }
    }
}

// =============================================================================
// WARNING SYSTEM
// =============================================================================

/// Warning severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningSeverity {
    /// Informational
    Info,
    /// Succeeded but manual review recommended
    Warning,
    /// A file or document was skipped
    Error,
}

impl WarningSeverity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Warning category for grouping related warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningCategory {
    /// Input document could not be parsed
    Parse,
    /// Chart-level metadata issue
    Chart,
    /// A resource was carried through without templating
    Passthrough,
}

impl WarningCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Chart => "chart",
            Self::Passthrough => "passthrough",
        }
    }
}

/// A warning with context and an optional suggestion
#[derive(Debug, Clone)]
pub struct RefactorWarning {
    pub severity: WarningSeverity,
    pub category: WarningCategory,
    pub file: PathBuf,
    pub service: Option<String>,
    pub message: String,
    pub suggestion: Option<String>,
}

impl RefactorWarning {
    /// A document or file that failed to parse
    pub fn parse_error(file: PathBuf, message: impl Into<String>) -> Self {
        Self {
            severity: WarningSeverity::Error,
            category: WarningCategory::Parse,
            file,
            service: None,
            message: message.into(),
            suggestion: None,
        }
    }

    /// A document still carrying template directives
    pub fn templated_input(file: PathBuf) -> Self {
        Self {
            severity: WarningSeverity::Error,
            category: WarningCategory::Parse,
            file,
            service: None,
            message: "document contains template directives and is not plain YAML".to_string(),
            suggestion: Some(
                "render the chart first (e.g. `helm template`) and refactor the rendered manifests"
                    .to_string(),
            ),
        }
    }

    /// Chart.yaml problems degrade to defaults
    pub fn chart(file: PathBuf, message: impl Into<String>) -> Self {
        Self {
            severity: WarningSeverity::Warning,
            category: WarningCategory::Chart,
            file,
            service: None,
            message: message.into(),
            suggestion: None,
        }
    }

    /// A resource copied through without templating
    pub fn passthrough(file: PathBuf, service: &str, message: impl Into<String>) -> Self {
        Self {
            severity: WarningSeverity::Info,
            category: WarningCategory::Passthrough,
            file,
            service: Some(service.to_string()),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }
}

impl std::fmt::Display for RefactorWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.severity.label(), self.file.display())?;

        if let Some(ref service) = self.service {
            write!(f, " ({})", service)?;
        }

        write!(f, " - {}", self.message)?;

        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  → {}", suggestion)?;
        }

        Ok(())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, RefactorError>;
