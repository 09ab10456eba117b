//! Inspect command - show what the pipeline sees in a chart directory
//!
//! Parses only; nothing is written. With `--features` it also prints the
//! per-kind feature breakdown the template generator would work from.

use console::style;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::Path;

use chartfold_core::{Resource, ResourceKind};
use chartfold_refactor::{ParsedChart, extract, parse_directory};

use crate::display;

pub fn run(path: &Path, features: bool) -> Result<()> {
    let parsed = parse_directory(path)
        .into_diagnostic()
        .wrap_err("Could not read chart directory")?;

    println!();
    println!(
        "  {} {} {}",
        style("Chart:").dim(),
        style(&parsed.chart.name).cyan().bold(),
        style(format!("v{}", parsed.chart.version)).dim()
    );
    println!();

    display::section("Services");
    for service in &parsed.services {
        println!(
            "  {} {} {}",
            style("•").cyan(),
            service.service_name,
            style(service.resource_summary().join(", ")).dim()
        );
    }
    println!();

    if features {
        for kind in [
            ResourceKind::Deployment,
            ResourceKind::Service,
            ResourceKind::ServiceAccount,
        ] {
            print_features(&parsed, kind);
        }
    }

    if !parsed.warnings.is_empty() {
        display::section("Warnings");
        for warning in &parsed.warnings {
            display::print_warning(warning);
        }
        println!();
    }

    Ok(())
}

fn print_features(parsed: &ParsedChart, kind: ResourceKind) {
    let resources: Vec<&Resource> = parsed
        .services
        .iter()
        .filter_map(|s| match kind {
            ResourceKind::Deployment => s.deployment.as_ref(),
            ResourceKind::Service => s.service.as_ref(),
            ResourceKind::ServiceAccount => s.service_account.as_ref(),
            ResourceKind::Other => None,
        })
        .collect();

    if resources.is_empty() {
        return;
    }

    let descriptor = extract(&resources, kind);

    display::section(&format!("{} features", kind));
    for (id, usage) in &descriptor.blocks {
        let mut details = vec![usage.scope.label().to_string()];
        if usage.dynamic {
            details.push("dynamic".to_string());
        }
        if !usage.variants.is_empty() {
            details.push(format!(
                "variants: {}",
                usage.variants.iter().cloned().collect::<Vec<_>>().join("/")
            ));
        }

        println!(
            "  {} {} {} {}",
            style("•").cyan(),
            id,
            style(format!("[{}]", details.join(", "))).dim(),
            style(format!(
                "{}/{} services",
                usage.services.len(),
                descriptor.resource_count
            ))
            .dim()
        );
    }

    if kind == ResourceKind::Deployment && !descriptor.container_keys.is_empty() {
        println!(
            "  {} containers: {}",
            style("•").cyan(),
            descriptor
                .container_keys
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    println!();
}
