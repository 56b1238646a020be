//! Text rendering of view snapshots for the terminal.

use omni_core::{
    format_size, AppViewModel, ConversionRequest, CreditPolicy, Notice, TargetFormat, WorkflowState,
};

const BAR_WIDTH: usize = 30;

pub fn selection_summary(view: &AppViewModel) -> String {
    let mut lines = vec![format!("Selected {} file(s):", view.files.len())];
    for row in &view.files {
        lines.push(format!(
            "  {} ({}, {}, modified {})",
            row.name,
            format_size(row.size),
            row.media_type,
            row.last_modified.format("%Y-%m-%d %H:%M")
        ));
    }
    lines.join("\n")
}

pub fn quote_line(cost: u64, view: &AppViewModel) -> String {
    format!(
        "Cost: {} credit(s), balance: {} ({})",
        cost,
        view.balance,
        account_label(view)
    )
}

pub fn balance_line(view: &AppViewModel) -> String {
    format!("{} credits ({})", view.balance, account_label(view))
}

fn account_label(view: &AppViewModel) -> String {
    match &view.identity {
        Some(identity) => format!("signed in as {identity}"),
        None => "guest".to_string(),
    }
}

/// Progress line while a batch runs; `None` outside Processing.
pub fn progress_line(view: &AppViewModel) -> Option<String> {
    if view.workflow != WorkflowState::Processing {
        return None;
    }
    let percentage = usize::from(view.progress.percentage.min(100));
    let filled = percentage * BAR_WIDTH / 100;
    Some(format!(
        "[{}{}] {:>3}% {}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percentage,
        view.progress.step
    ))
}

pub fn outcome(view: &AppViewModel) -> String {
    let mut lines = Vec::new();
    match view.workflow {
        WorkflowState::Complete => {
            lines.push(format!("Converted {} file(s):", view.artifacts.len()));
            for artifact in &view.artifacts {
                lines.push(format!("  {} -> {}", artifact.filename, artifact.reference));
            }
        }
        WorkflowState::Error => lines.push("Conversion failed.".to_string()),
        _ => {}
    }
    if let Some(notice) = &view.notice {
        lines.push(notice_text(notice));
    }
    lines.push(format!("Remaining balance: {}", balance_line(view)));
    lines.join("\n")
}

pub fn notice_text(notice: &Notice) -> String {
    match notice {
        Notice::InsufficientCredits {
            required,
            available,
        } => format!(
            "Insufficient credits: this batch needs {required}, you have {available}."
        ),
        Notice::BatchFailed {
            file_index,
            file_name,
            reason,
        } => format!("File {} ({}) failed: {}", file_index + 1, file_name, reason),
    }
}

pub fn formats_table(policy: &CreditPolicy) -> String {
    TargetFormat::ALL
        .iter()
        .map(|format| {
            format!(
                "{:<5} {:<13} {} credit(s) per file",
                format.extension(),
                format.category().to_string(),
                policy.unit_cost(&ConversionRequest::for_target(*format))
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
