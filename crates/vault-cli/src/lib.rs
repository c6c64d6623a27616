pub mod browse;

use anyhow::Context;
use serde::Serialize;
use vault_core::{ErrorMetadata, PageKey, PageResult};
use vault_sync::{AddFilesReport, SkipReason, SubmitResult, UploadSnapshot};

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub fn print_page_table(page: &PageResult, key: &PageKey) {
    println!("\n=== Products ===\n");
    println!(
        "Page {} of {} ({} products, sorted by {} {})",
        page.page_number + 1,
        page.total_pages.max(1),
        page.total_elements,
        key.sort_by,
        key.sort_direction
    );

    if page.entries.is_empty() {
        println!("\nNo products found.");
        return;
    }

    println!(
        "\n{:>6} {:<30} {:<40} {:>20}",
        "ID", "Name", "Image URL", "Created At"
    );
    println!("{}", "-".repeat(99));

    for entry in &page.entries {
        let created = entry
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>6} {:<30} {:<40} {:>20}",
            entry.id,
            truncate_string(&entry.name, 30),
            truncate_string(&entry.image_url, 40),
            created
        );
    }

    if !page.is_last_page {
        println!("\n... (more products available, use --page to see more)");
    }
    println!();
}

pub fn print_add_report(report: &AddFilesReport) {
    for rejection in &report.rejected {
        println!("Skipped {}: {}", rejection.name, rejection.reason);
    }
}

/// One-line summary of the selection and what `upload` would do now
pub fn pending_summary(snapshot: &UploadSnapshot) -> String {
    let total: u64 = snapshot.pending.iter().map(|f| f.size_bytes).sum();
    format!(
        "{} file(s), {} [{}]",
        snapshot.pending.len(),
        format_size(total),
        snapshot.action_label()
    )
}

pub fn print_pending(snapshot: &UploadSnapshot) {
    if snapshot.pending.is_empty() {
        println!("No files selected.");
        return;
    }
    println!("Selected files:");
    for (index, file) in snapshot.pending.iter().enumerate() {
        println!(
            "  [{}] {:<30} {:>10}  {}",
            index,
            truncate_string(&file.name, 30),
            format_size(file.size_bytes),
            file.mime_type
        );
    }
    println!("{}", pending_summary(snapshot));
}

/// Map a one-shot upload to the process outcome: anything short of every
/// selected file being saved is an error.
pub fn ensure_uploaded(result: &SubmitResult) -> anyhow::Result<()> {
    match result {
        SubmitResult::Failed(err) => Err::<(), _>(err.clone()).context("Upload failed"),
        SubmitResult::Completed(outcome) if !outcome.failed.is_empty() => Err(anyhow::anyhow!(
            "{} file(s) were rejected by the server",
            outcome.failed.len()
        )),
        SubmitResult::Completed(_) => Ok(()),
        SubmitResult::Skipped(SkipReason::EmptyBatch) => {
            Err(anyhow::anyhow!("No files to upload"))
        }
        SubmitResult::Skipped(SkipReason::AlreadyUploading) => {
            Err(anyhow::anyhow!("Another upload is already running"))
        }
    }
}

pub fn print_submit_result(result: &SubmitResult, snapshot: &UploadSnapshot) {
    match result {
        SubmitResult::Skipped(reason) => println!("Nothing uploaded ({:?})", reason),
        SubmitResult::Completed(outcome) => {
            for entry in &outcome.successful {
                println!("  saved #{} {}", entry.id, entry.name);
            }
            for name in &outcome.failed {
                println!("  failed {}", name);
            }
        }
        SubmitResult::Failed(_) => {}
    }
    if let Some(status) = &snapshot.status {
        println!("{}", status);
    }
    if let SubmitResult::Failed(err) = result {
        if let Some(action) = err.suggested_action() {
            println!("Hint: {}", action);
        }
    }
}
