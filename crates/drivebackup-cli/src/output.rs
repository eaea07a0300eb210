//! Terminal output for command results
//!
//! Human output uses check marks and indentation; JSON output prints one
//! document per result so scripts can consume it.

use drivebackup_sync::engine::BackupSummary;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}

// ============================================================================
// Backup summary
// ============================================================================

/// JSON document for a finished backup
pub fn summary_json(summary: &BackupSummary) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "backup_root": summary.backup_root.display().to_string(),
        "files_done": summary.files_done,
        "folders_done": summary.folders_done,
        "files_failed": summary.files_failed,
        "files_downloaded": summary.files_downloaded,
        "files_reused": summary.files_reused,
        "files_skipped": summary.files_skipped,
        "duration_ms": summary.duration_ms,
    })
}

/// `1.5s` from one second on, `850ms` below
pub fn format_duration(duration_ms: u64) -> String {
    if duration_ms >= 1000 {
        format!("{:.1}s", duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", duration_ms)
    }
}

fn plural(count: u64, word: &str) -> String {
    format!("{} {}{}", count, word, if count == 1 { "" } else { "s" })
}

/// Prints the summary in the requested format
pub fn print_summary(format: OutputFormat, summary: &BackupSummary) {
    let formatter = get_formatter(format);
    if format == OutputFormat::Json {
        formatter.print_json(&summary_json(summary));
        return;
    }

    formatter.success(&format!(
        "Backup completed in {}",
        format_duration(summary.duration_ms)
    ));
    formatter.info(&format!("Location:   {}", summary.backup_root.display()));
    formatter.info(&format!(
        "Processed:  {}, {}",
        plural(summary.files_done, "file"),
        plural(summary.folders_done, "folder")
    ));
    formatter.info(&format!("Downloaded: {}", plural(summary.files_downloaded, "file")));
    if summary.files_reused > 0 {
        formatter.info(&format!("Reused:     {}", plural(summary.files_reused, "file")));
    }
    if summary.files_skipped > 0 {
        formatter.info(&format!("Skipped:    {}", plural(summary.files_skipped, "file")));
    }
    if summary.files_failed > 0 {
        formatter.error(&format!(
            "{} could not be backed up, see the log for details",
            plural(summary.files_failed, "file")
        ));
    }
}
