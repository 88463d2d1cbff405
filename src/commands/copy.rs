//! Main copy command

use crate::config::Settings;
use crate::scanner::copy;
use crate::types::{CopyEvent, CopyResult, EntryFailure, ErrorCode};
use crate::ui::ProgressReporter;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Run the copy described by `settings`, drawing progress and printing a
/// grouped summary of any failures.
pub async fn run(settings: Settings) -> CopyResult {
    let reporter = Arc::new(Mutex::new(if settings.show_progress {
        ProgressReporter::new()
    } else {
        ProgressReporter::hidden()
    }));

    let options = {
        let reporter = Arc::clone(&reporter);
        settings
            .options
            .with_event_callback(move |event: &CopyEvent| {
                if let Ok(mut progress) = reporter.lock() {
                    progress.record(event);
                }
            })
    };

    let result = copy(&settings.source, &settings.destination, options).await;

    if let Ok(progress) = reporter.lock() {
        match &result {
            Ok(stats) => progress.finish(stats),
            Err(failures) => progress.finish(&failures.stats),
        }
    }

    if let Err(failures) = &result {
        let records: Vec<ErrorRecord> = failures.iter().map(ErrorRecord::new).collect();
        eprintln!("{}", format_error_summary(&records));
    }

    result
}

#[derive(Debug)]
struct ErrorRecord {
    code: &'static str,
    path: PathBuf,
    message: String,
    suggestion: Option<&'static str>,
}

impl ErrorRecord {
    fn new(failure: &EntryFailure) -> Self {
        Self {
            code: failure.code.as_str(),
            path: failure.path.clone(),
            message: failure.message.clone(),
            suggestion: suggestion_for(failure.code),
        }
    }
}

fn suggestion_for(code: ErrorCode) -> Option<&'static str> {
    match code {
        ErrorCode::NotFound => Some("Verify the path still exists and retry."),
        ErrorCode::PermissionDenied => {
            Some("Check file permissions or run with a user that has access.")
        }
        ErrorCode::AlreadyExists => {
            Some("Remove or rename the conflicting destination path, then retry.")
        }
        ErrorCode::NoSpace => Some("Free disk space on destination and retry."),
        ErrorCode::ReadOnly => Some("Choose a destination on a writable filesystem."),
        ErrorCode::Loop => Some("Copy without --dereference to keep the links as links."),
        ErrorCode::NotADirectory | ErrorCode::IsADirectory => {
            Some("A file and a directory collide at this path; rename one of them.")
        }
        ErrorCode::InvalidInput | ErrorCode::Io => None,
    }
}

fn format_error_summary(records: &[ErrorRecord]) -> String {
    let mut groups: BTreeMap<&'static str, Vec<&ErrorRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.code).or_default().push(record);
    }

    let mut lines = Vec::new();
    lines.push("Error summary:".to_string());
    for (code, items) in groups {
        lines.push(format!("  {} ({}):", code, items.len()));
        for record in items.iter().take(3) {
            lines.push(format!("    - {}", record.message));
            lines.push(format!("      Path: {}", record.path.display()));
        }
        if items.len() > 3 {
            lines.push(format!("    - ... {} more", items.len() - 3));
        }
        if let Some(suggestion) = items.first().and_then(|r| r.suggestion) {
            lines.push(format!("      Try: {}", suggestion));
        }
    }
    lines.join("\n")
}
