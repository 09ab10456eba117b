//! Display formatting for CLI output

use chartfold_refactor::{RefactorWarning, WarningSeverity};
use console::{StyledObject, style};

/// Print a section heading with an underline
pub fn section(title: &str) {
    println!("  {}", style(title).bold());
    println!("  {}", style("─".repeat(title.chars().count())).dim());
}

/// Icon for a warning severity
pub fn severity_icon(severity: WarningSeverity) -> StyledObject<&'static str> {
    match severity {
        WarningSeverity::Info => style("ℹ").cyan(),
        WarningSeverity::Warning => style("⚠").yellow(),
        WarningSeverity::Error => style("✗").red().bold(),
    }
}

/// Print one warning with its suggestion
pub fn print_warning(warning: &RefactorWarning) {
    let location = match &warning.service {
        Some(service) => format!("{} ({})", warning.file.display(), service),
        None => format!("{}", warning.file.display()),
    };

    println!(
        "    {} {} {}",
        severity_icon(warning.severity),
        style(&warning.message).bold(),
        style(format!("in {}", location)).dim()
    );

    if let Some(ref suggestion) = warning.suggestion {
        println!("      {} {}", style("→").green(), suggestion);
    }
}
