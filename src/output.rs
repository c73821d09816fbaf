//! Console output: styled messages, the progress bar and the run summary.
//!
//! The log file gets the event-by-event record; this module is what a person
//! watching the terminal sees.

use crate::file_organizer::RunReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Centralised console formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filesorter::output::OutputFormatter;
    /// OutputFormatter::error("Source directory not found: /nope");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for `total` files.
    ///
    /// Returns a hidden bar when `hidden` is set, so callers can drive it
    /// unconditionally.
    pub fn create_progress_bar(total: u64, hidden: bool) -> ProgressBar {
        if hidden {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints the per-category table and the skip list for a finished run.
    pub fn summary(report: &RunReport) {
        Self::header(if report.dry_run {
            "SUMMARY (dry run)"
        } else {
            "SUMMARY"
        });

        let counts = report.category_counts();
        let width = counts
            .keys()
            .map(|category| category.dir_name().len())
            .max()
            .unwrap_or(0)
            .max(8);

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));
        for (category, count) in &counts {
            println!(
                "{:<width$} | {} {}",
                category.dir_name(),
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }
        println!("{}", "-".repeat(width + 10));
        let total = report.moved.len();
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            plural(total),
            width = width
        );

        if !report.skipped.is_empty() {
            Self::warning(&format!(
                "{} {} skipped:",
                report.skipped.len(),
                plural(report.skipped.len())
            ));
            for skipped in &report.skipped {
                println!("  - {}: {}", skipped.path.display(), skipped.reason);
            }
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
