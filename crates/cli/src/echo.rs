use corrigo_core::Report;
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!(
        "\n{} {} {}",
        "Corrigo".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!("{}", "Spell-check published articles\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print the per-run summary
pub fn print_summary(report: &Report) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Check Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());

    if let Some(feed) = report.feed() {
        eprintln!("  {} {}", "Feed:".dimmed(), feed.bright_white());
    }
    eprintln!(
        "  {} {}",
        "Articles:".dimmed(),
        report.entries().len().to_string().bright_white()
    );
    eprintln!(
        "  {} {}",
        "Flagged words:".dimmed(),
        report.descriptor_count().to_string().bright_white()
    );

    let failures = report.failure_count();
    let failures = if failures == 0 {
        failures.to_string().green().to_string()
    } else {
        failures.to_string().bright_red().to_string()
    };
    eprintln!("  {} {}", "Failures:".dimmed(), failures);
    eprintln!(
        "  {} {}\n",
        "Total length:".dimmed(),
        format!("{} chars", report.total_length()).bright_white()
    );
}
