//! Shared helpers for the demo binaries.

use vaskify::prelude::*;
use vaskify::report::{HumanFormatter, MarkdownFormatter};

/// Prints a section heading.
pub fn section(title: &str) {
    println!("\n=== {title} ===");
}

/// Prints the human-readable summary of one detection result, followed by
/// its markdown rendering when `markdown` is set.
pub fn print_summary(summary: &DetectionSummary, markdown: bool) -> Result<()> {
    println!("{}", HumanFormatter::new().format(summary)?);
    if markdown {
        let formatter = MarkdownFormatter::new().with_heading_level(3);
        println!("{}", formatter.format(summary)?);
    }
    Ok(())
}
