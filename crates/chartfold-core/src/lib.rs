//! Chartfold Core - foundational types for the manifest refactoring pipeline
//!
//! This crate provides the types shared across Chartfold:
//! - `Resource`: loss-preserving model of one parsed manifest document
//! - `Values`: configuration tree with path access and deep merge support
//! - `FieldPath`: dot/bracket field addressing (`spec.template.spec.containers[0]`)
//! - `ChartInfo`: Chart.yaml metadata

pub mod chart;
pub mod error;
pub mod path;
pub mod resource;
pub mod values;

pub use chart::ChartInfo;
pub use error::{CoreError, Result};
pub use path::{FieldPath, Segment};
pub use resource::{Lookup, Resource, ResourceKind};
pub use values::Values;
