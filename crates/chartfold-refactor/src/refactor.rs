//! Pipeline orchestration
//!
//! Wires the stages together: parse the input directory, extract the
//! per-kind feature descriptors from the complete service set, generate
//! the shared templates, transform each service's values, and write the
//! output chart.
//!
//! Extraction has a hard barrier: a kind's descriptor is computed from
//! every service before any template is generated. Per-service transform
//! failures are collected and reported as a batch - the remaining
//! services still produce complete output.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use chartfold_core::{Resource, ResourceKind, Values};

use crate::error::{RefactorError, RefactorWarning, Result, TransformError};
use crate::extractor;
use crate::generator;
use crate::parser;
use crate::service_files;
use crate::transformer;

/// Options for a refactoring run
#[derive(Debug, Clone, Default)]
pub struct RefactorOptions {
    /// Overwrite an existing output directory
    pub force: bool,
    /// Only report what would be written
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
}

/// Outcome for one service
#[derive(Debug, Clone)]
pub struct ServiceSummary {
    pub name: String,
    pub resources: Vec<String>,
    pub ok: bool,
}

/// Result of a refactoring run
#[derive(Debug, Default)]
pub struct RefactorResult {
    /// Files generated from templates and values
    pub generated_files: Vec<PathBuf>,
    /// Supporting files copied unchanged
    pub copied_files: Vec<PathBuf>,
    /// Per-service files skipped because their transform failed
    pub skipped_files: Vec<PathBuf>,
    pub warnings: Vec<RefactorWarning>,
    pub services: Vec<ServiceSummary>,
    /// Shape-conflict failures, one per affected service
    pub failures: Vec<TransformError>,
}

impl RefactorResult {
    fn new() -> Self {
        Self::default()
    }

    /// Every service transformed cleanly
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Folds a chart directory into shared templates plus values
pub struct Refactorer {
    options: RefactorOptions,
}

impl Refactorer {
    pub fn new(options: RefactorOptions) -> Self {
        Self { options }
    }

    /// Run the pipeline from `input` into `output`
    pub fn refactor(&self, input: &Path, output: &Path) -> Result<RefactorResult> {
        if output.exists() && !self.options.force {
            return Err(RefactorError::OutputExists(output.to_path_buf()));
        }

        let parsed = parser::parse_directory(input)?;
        if parsed.services.is_empty() {
            return Err(RefactorError::NoServices(input.to_path_buf()));
        }

        let mut result = RefactorResult::new();
        result.warnings = parsed.warnings.clone();

        // Group the complete service set by kind before any generation
        let groups: [(ResourceKind, Vec<&Resource>); 3] = [
            (
                ResourceKind::Deployment,
                parsed.services.iter().filter_map(|s| s.deployment.as_ref()).collect(),
            ),
            (
                ResourceKind::Service,
                parsed.services.iter().filter_map(|s| s.service.as_ref()).collect(),
            ),
            (
                ResourceKind::ServiceAccount,
                parsed.services.iter().filter_map(|s| s.service_account.as_ref()).collect(),
            ),
        ];

        let mut units = Vec::new();
        for (kind, resources) in &groups {
            if resources.is_empty() {
                continue;
            }
            let descriptor = extractor::extract(resources, *kind);
            units.push(generator::generate(&descriptor, &parsed.chart)?);
        }

        let templates_dir = output.join("templates");
        if !self.options.dry_run {
            fs::create_dir_all(&templates_dir)?;
        }

        let helpers_path = templates_dir.join("_helpers-microservice.yaml");
        if !self.options.dry_run {
            fs::write(&helpers_path, generator::helpers_file(&units))?;
        }
        result.generated_files.push(helpers_path);

        // Per-service values and include files; failures never stop the rest
        let mut values_doc = Values::new();
        values_doc.merge(&parsed.globals);

        for service in &parsed.services {
            let service_path = templates_dir.join(format!("{}.yaml", service.service_name));

            match transformer::transform(service) {
                Ok(values) => {
                    if let JsonValue::Object(map) = &mut values_doc.0 {
                        map.insert(service.service_name.clone(), values.into_inner());
                    }

                    if !self.options.dry_run {
                        fs::write(&service_path, service_files::service_file(service))?;
                    }
                    result.generated_files.push(service_path);
                    result.services.push(ServiceSummary {
                        name: service.service_name.clone(),
                        resources: service.resource_summary(),
                        ok: true,
                    });
                }
                Err(failure) => {
                    tracing::warn!(
                        service = %service.service_name,
                        error = %failure,
                        "values transform failed"
                    );
                    result.skipped_files.push(service_path);
                    result.failures.push(failure);
                    result.services.push(ServiceSummary {
                        name: service.service_name.clone(),
                        resources: service.resource_summary(),
                        ok: false,
                    });
                }
            }
        }

        let values_path = output.join("values.yaml");
        if !self.options.dry_run {
            fs::write(&values_path, values_doc.to_yaml()?)?;
        }
        result.generated_files.push(values_path);

        self.copy_supporting_files(input, output, &mut result)?;

        Ok(result)
    }

    /// Copy Chart.yaml and the chart's helper defines
    ///
    /// The generated templates reference `<chart>.fullname` and friends,
    /// so a missing _helpers.tpl is worth a warning.
    fn copy_supporting_files(
        &self,
        input: &Path,
        output: &Path,
        result: &mut RefactorResult,
    ) -> Result<()> {
        let candidates = [
            ("Chart.yaml", "Chart.yaml"),
            ("_helpers.tpl", "templates/_helpers.tpl"),
            ("templates/_helpers.tpl", "templates/_helpers.tpl"),
        ];

        let mut helpers_copied = false;

        for (src_rel, dst_rel) in candidates {
            let src = input.join(src_rel);
            if !src.exists() {
                continue;
            }
            let dst = output.join(dst_rel);
            if result.copied_files.contains(&dst) {
                continue;
            }

            if !self.options.dry_run {
                if let Some(parent) = dst.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(&src, &dst)?;
            }
            if dst_rel.ends_with("_helpers.tpl") {
                helpers_copied = true;
            }
            result.copied_files.push(dst);
        }

        if !helpers_copied {
            result.warnings.push(
                RefactorWarning::chart(
                    input.join("_helpers.tpl"),
                    "no _helpers.tpl found in the input chart",
                )
                .with_suggestion(
                    "the generated templates reference fullname/labels helpers; add a _helpers.tpl defining them",
                ),
            );
        }

        Ok(())
    }
}

/// Refactor with default options
pub fn refactor(input: &Path, output: &Path) -> Result<RefactorResult> {
    Refactorer::new(RefactorOptions::default()).refactor(input, output)
}

/// Refactor with options
pub fn refactor_with_options(
    input: &Path,
    output: &Path,
    options: RefactorOptions,
) -> Result<RefactorResult> {
    Refactorer::new(options).refactor(input, output)
}
