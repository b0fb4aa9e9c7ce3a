//! Terminal rendering of upload events, batch outcomes and lookups.

use std::fmt::Write;
use std::io::Write as _;

use fileshare_store_client::{Client, Lookup};
use fileshare_transfer::format_size;
use fileshare_upload::{BatchOutcome, GroupOutcome, UploadEvent};
use tokio::sync::mpsc;

/// Prints live progress to stderr until the event channel closes.
pub async fn print_events(mut rx: mpsc::Receiver<UploadEvent>) {
    let mut stderr = std::io::stderr();
    while let Some(event) = rx.recv().await {
        match event {
            UploadEvent::UnitStarted {
                name,
                size,
                chunked,
                ..
            } => {
                let mode = if chunked { "chunked" } else { "single request" };
                let _ = writeln!(stderr, "Uploading {name} ({}, {mode})", format_size(size));
            }
            UploadEvent::UnitProgress { percent, .. } => {
                let _ = write!(stderr, "\r  {percent:>3}%");
                let _ = stderr.flush();
            }
            UploadEvent::UnitSucceeded(result) => {
                let _ = writeln!(stderr, "\r  done: {}", result.code);
            }
            UploadEvent::UnitFailed(failure) => {
                let _ = writeln!(stderr, "\r  {}: {}", failure.name, failure.message);
            }
            UploadEvent::GroupFailed { message } => {
                let _ = writeln!(stderr, "{message}");
            }
            UploadEvent::BatchProgress { .. }
            | UploadEvent::GroupCreated(_)
            | UploadEvent::BatchFinished { .. } => {}
        }
    }
}

/// Final batch report: one line per file, the group code, then the summary.
pub fn render_outcome(outcome: &BatchOutcome) -> String {
    let mut out = String::new();
    for result in &outcome.results {
        let _ = write!(
            out,
            "{}  {}  {}",
            result.code,
            result.filename,
            format_size(result.size)
        );
        if result.compressed
            && let Some(ratio) = result.compression_ratio
        {
            let _ = write!(out, "  (compressed, {ratio}x smaller)");
        }
        out.push('\n');
    }
    for failure in &outcome.failures {
        let _ = writeln!(out, "FAILED  {}  {}", failure.name, failure.message);
    }

    match &outcome.group {
        GroupOutcome::Created(group) => {
            let _ = writeln!(out, "Group code: {} ({} files)", group.code, group.member_count);
        }
        GroupOutcome::Failed(message) => {
            let _ = writeln!(out, "{message}");
        }
        GroupOutcome::Skipped if !outcome.cancelled => {
            let _ = writeln!(out, "Group not created: fewer than two files were uploaded.");
        }
        GroupOutcome::Skipped | GroupOutcome::NotRequested => {}
    }

    if outcome.cancelled {
        out.push_str("Upload cancelled. ");
    }
    let _ = writeln!(out, "{}.", outcome.summary());
    out
}

/// Describes a resolved code with direct download links.
pub fn render_lookup(client: &Client, lookup: &Lookup) -> String {
    let mut out = String::new();
    match lookup {
        Lookup::File(file) => {
            let _ = writeln!(out, "File {}: {}", file.code, file.filename);
            let _ = write!(out, "  size: {}", format_size(file.size));
            if let (Some(true), Some(original)) = (file.compressed, file.original_size) {
                let _ = write!(out, " (compressed from {}", format_size(original));
                if let Some(ratio) = file.compression_ratio {
                    let _ = write!(out, ", {ratio}x smaller");
                }
                out.push(')');
            }
            out.push('\n');
            if !file.upload_date.is_empty() {
                let _ = writeln!(out, "  uploaded: {}", file.upload_date);
            }
            let _ = writeln!(out, "  download: {}", client.file_url(&file.code));
        }
        Lookup::Group(group) => {
            let title = group.name.as_deref().unwrap_or("unnamed group");
            let _ = writeln!(
                out,
                "Group {}: {title} ({} files)",
                group.code, group.file_count
            );
            for member in &group.files {
                let _ = writeln!(
                    out,
                    "  {}  {}  {}",
                    member.filename,
                    format_size(member.size),
                    client.file_url(&member.id)
                );
            }
        }
    }
    out
}
