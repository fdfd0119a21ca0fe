//! CLI output formatting

use crate::execution::{PrefetchError, PrefetchReport};
use console::Emoji;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");

/// Format a duration for display
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Final status line of a successful run
pub fn format_report(report: &PrefetchReport) -> String {
    let failed = report.failed_count();
    let pulled = report.image_count() - failed;

    if failed == 0 {
        format!(
            "{} Prefetched {} images in {} ({})",
            CHECK,
            style(pulled).green(),
            style(format_duration(report.elapsed)).cyan(),
            style(&report.run_id.to_string()[..8]).dim()
        )
    } else {
        let images: Vec<&str> = report.pulls.failed().map(|o| o.image.as_str()).collect();
        format!(
            "{} Prefetched {} images in {}, {} failed: {} ({})",
            WARN,
            style(pulled).green(),
            style(format_duration(report.elapsed)).cyan(),
            style(failed).yellow(),
            style(images.join(", ")).dim(),
            style(&report.run_id.to_string()[..8]).dim()
        )
    }
}

/// Final status line of a failed run
pub fn format_failure(error: &PrefetchError) -> String {
    format!("{} Prefetch {}: {}", CROSS, style("failed").red(), style(error).dim())
}

/// Listing of Dockerfile base images
pub fn format_image_list(file: &str, images: &[String]) -> String {
    if images.is_empty() {
        return format!("{} No non-official base images in {}", INFO, style(file).bold());
    }

    let mut out = format!(
        "{} {} base images in {}:",
        INFO,
        style(images.len()).cyan(),
        style(file).bold()
    );
    for image in images {
        out.push_str(&format!("\n  {}", image));
    }
    out
}
