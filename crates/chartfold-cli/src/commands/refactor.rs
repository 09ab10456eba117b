//! Refactor command - fold a chart directory into shared templates
//!
//! Runs the full pipeline and prints a styled report: which files were
//! generated, which services hit shape conflicts, and what to do next.

use console::style;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::Path;

use chartfold_refactor::{
    RefactorOptions, RefactorResult, WarningSeverity, refactor_with_options,
};

use crate::display;
use crate::exit_codes;

pub fn run(input: &Path, output: &Path, force: bool, dry_run: bool, verbose: bool) -> Result<()> {
    print_header(input, output);

    let options = RefactorOptions {
        force,
        dry_run,
        verbose,
    };

    let result = refactor_with_options(input, output, options)
        .into_diagnostic()
        .wrap_err("Refactoring failed")?;

    print_services(&result);
    print_files(&result, output);
    print_failures(&result);
    print_warnings(&result, verbose);
    print_summary(&result);
    print_next_steps(output, dry_run);

    if !result.is_clean() {
        std::process::exit(exit_codes::SHAPE_ERROR);
    }

    Ok(())
}

fn print_header(input: &Path, output: &Path) {
    println!();
    println!(
        "  {} {} {}",
        style("Chartfold").bold().cyan(),
        style("─").dim(),
        style("one template per kind, values per service").dim()
    );
    println!();
    println!(
        "  {} {} {}",
        style("Source:").dim(),
        style(input.display()).cyan(),
        style("(per-service manifests)").dim()
    );
    println!(
        "  {} {} {}",
        style("Target:").dim(),
        style(output.display()).green(),
        style("(folded chart)").dim()
    );
    println!();
}

fn print_services(result: &RefactorResult) {
    display::section("Services");

    for service in &result.services {
        let marker = if service.ok {
            style("✓").green().bold()
        } else {
            style("✗").red().bold()
        };
        println!(
            "  {} {} {}",
            marker,
            service.name,
            style(service.resources.join(", ")).dim()
        );
    }

    println!();
}

fn print_files(result: &RefactorResult, output: &Path) {
    display::section("Generated Files");

    for file in &result.generated_files {
        let rel_path = file.strip_prefix(output).unwrap_or(file);
        println!("  {} {}", style("✓").green().bold(), rel_path.display());
    }

    if !result.copied_files.is_empty() {
        println!();
        display::section("Copied Files");
        for file in &result.copied_files {
            let rel_path = file.strip_prefix(output).unwrap_or(file);
            println!("  {} {}", style("→").blue(), rel_path.display());
        }
    }

    if !result.skipped_files.is_empty() {
        println!();
        display::section("Skipped Files");
        for file in &result.skipped_files {
            let rel_path = file.strip_prefix(output).unwrap_or(file);
            println!("  {} {}", style("○").yellow(), rel_path.display());
        }
    }

    println!();
}

fn print_failures(result: &RefactorResult) {
    if result.failures.is_empty() {
        return;
    }

    display::section("Shape Conflicts");

    for failure in &result.failures {
        println!("  {} {}", style("✗").red().bold(), failure);
    }
    println!(
        "  {}",
        style("These services were skipped; the rest of the chart is complete.").dim()
    );
    println!();
}

fn print_warnings(result: &RefactorResult, verbose: bool) {
    if result.warnings.is_empty() {
        return;
    }

    let significant = result
        .warnings
        .iter()
        .filter(|w| w.severity != WarningSeverity::Info)
        .count();

    if significant == 0 && !verbose {
        println!(
            "  {} {} {}",
            style("ℹ").cyan(),
            result.warnings.len(),
            style("notes (use --verbose to see details)").dim()
        );
        println!();
        return;
    }

    display::section("Warnings");
    for warning in &result.warnings {
        if warning.severity == WarningSeverity::Info && !verbose {
            continue;
        }
        display::print_warning(warning);
    }
    println!();
}

fn print_summary(result: &RefactorResult) {
    display::section("Summary");

    let ok_count = result.services.iter().filter(|s| s.ok).count();
    println!(
        "  {} {} folded",
        style(format!("{:>3}", ok_count)).green().bold(),
        style("services").dim()
    );

    if !result.failures.is_empty() {
        println!(
            "  {} {} hit shape conflicts",
            style(format!("{:>3}", result.failures.len())).red().bold(),
            style("services").dim()
        );
    }

    println!(
        "  {} {} generated",
        style(format!("{:>3}", result.generated_files.len())).green().bold(),
        style("files").dim()
    );

    if !result.copied_files.is_empty() {
        println!(
            "  {} {} copied unchanged",
            style(format!("{:>3}", result.copied_files.len())).blue().bold(),
            style("files").dim()
        );
    }

    println!();
}

fn print_next_steps(output: &Path, dry_run: bool) {
    if dry_run {
        println!(
            "  {} {}",
            style("ℹ").cyan(),
            style("Dry run mode - no files were written").dim()
        );
        println!();
        return;
    }

    display::section("Next Steps");

    println!(
        "  {} {}",
        style("1.").dim(),
        style(format!("helm lint {}", output.display())).cyan()
    );
    println!("     {}", style("Validate the folded chart structure").dim());
    println!();
    println!(
        "  {} {}",
        style("2.").dim(),
        style(format!("helm template test-release {}", output.display())).cyan()
    );
    println!(
        "     {}",
        style("Render and diff against the original manifests").dim()
    );
    println!();
}
