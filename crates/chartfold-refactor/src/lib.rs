//! Chartfold Refactor - folds per-service Kubernetes manifests into a
//! deduplicated, parameterized template set
//!
//! The pipeline takes a directory of per-service manifest files (the
//! output of a chart-generation tool: one Deployment, Service, and
//! optionally ServiceAccount per service) and produces one shared
//! template per resource kind, a restructured values document with every
//! service's concrete settings, and thin per-service files invoking the
//! shared templates.
//!
//! # Strategy
//!
//! The shared templates are derived from **all** services, never from one
//! sample: the extractor computes the union of optional fields across the
//! full service set, and the generator gates each one behind a
//! conditional that renders only when the invoking service's values
//! provide it. Blocks pass their sub-structure through whole, so no field
//! a single service relies on can be silently lost.
//!
//! ```no_run
//! use std::path::Path;
//! use chartfold_refactor::{refactor, RefactorOptions, refactor_with_options};
//!
//! let result = refactor(
//!     Path::new("./helmify-output"),
//!     Path::new("./folded-chart"),
//! ).unwrap();
//!
//! println!("Generated {} files", result.generated_files.len());
//!
//! for failure in &result.failures {
//!     eprintln!("shape conflict: {}", failure);
//! }
//!
//! // With options
//! let options = RefactorOptions {
//!     force: true,
//!     dry_run: false,
//!     verbose: true,
//! };
//! let result = refactor_with_options(
//!     Path::new("./helmify-output"),
//!     Path::new("./folded-chart"),
//!     options,
//! ).unwrap();
//! ```

pub mod catalog;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod parser;
pub mod refactor;
pub mod service_files;
pub mod transformer;

// Re-exports
pub use error::{
    GenerateError, RefactorError, RefactorWarning, Result, TransformError, WarningCategory,
    WarningSeverity,
};
pub use extractor::{BlockUsage, FeatureDescriptor, extract};
pub use generator::{TemplateUnit, generate, helpers_file};
pub use parser::{ParsedChart, ServiceResources, parse_directory};
pub use refactor::{
    RefactorOptions, RefactorResult, Refactorer, ServiceSummary, refactor, refactor_with_options,
};
pub use transformer::transform;
