use mirrorgen_operations::MirrorReport;
use nu_ansi_term::Color::{Blue, Cyan, Green, Red, Yellow};
use tabled::{
    builder::Builder,
    settings::{peaker::PriorityMax, themes::BorderCorrection, Panel, Style, Width},
};
use tracing::{error, info};

use crate::utils::{term_width, Colored, Icons};

/// Prints the end-of-run table followed by one line per failed package.
pub fn print_summary(report: &MirrorReport, published: bool) {
    let mut builder = Builder::new();

    builder.push_record([
        "Registry entries".to_string(),
        format!(
            "{} of {}",
            Colored(Cyan, report.snapshot_rows),
            Colored(Cyan, report.total_rows)
        ),
    ]);
    builder.push_record([
        format!("{} Packages", Icons::PACKAGE),
        format!("{}", Colored(Blue, report.batches)),
    ]);
    builder.push_record([
        format!(
            "{} {}",
            Icons::CHECK,
            if published { "Published" } else { "Written" }
        ),
        format!(
            "{}/{}",
            Colored(Green, report.published.len()),
            Colored(Cyan, report.batches)
        ),
    ]);
    if !report.failed.is_empty() {
        builder.push_record([
            format!("{} Failed", Icons::CROSS),
            format!("{}", Colored(Red, report.failed.len())),
        ]);
    }
    if !report.cancelled.is_empty() {
        builder.push_record([
            format!("{} Cancelled", Icons::WARNING),
            format!("{}", Colored(Yellow, report.cancelled.len())),
        ]);
    }
    if report.duplicate_ids > 0 {
        builder.push_record([
            format!("{} Duplicate ids", Icons::WARNING),
            format!("{}", Colored(Yellow, report.duplicate_ids)),
        ]);
    }

    let table = builder
        .build()
        .with(Panel::header("Mirror Summary"))
        .with(Style::rounded())
        .with(BorderCorrection {})
        .with(Width::wrap(term_width()).priority(PriorityMax::default()))
        .to_string();

    info!("\n{table}");

    if !report.failed.is_empty() {
        error!("Failed packages:");
        for failure in &report.failed {
            error!(
                "  {} {}: {}",
                Icons::ARROW,
                Colored(Cyan, &failure.name),
                failure.error
            );
            if let Some(output) = &failure.output {
                for line in output.lines() {
                    error!("      {}", line);
                }
            }
        }
    }
}
