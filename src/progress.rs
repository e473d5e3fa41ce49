//! Progress reporting for the extract and audit phases
//!
//! Provides real-time status display using indicatif spinners. All
//! human-facing chrome goes to stderr: the audit writes its matches
//! to stdout and that stream stays machine-readable.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner-style status reporter
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Format an elapsed duration as h/m/s
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!("{}h{:02}m{:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// Print a header at the start of a run
pub fn print_header(phase: &str, source: &str, detail: &str) {
    eprintln!();
    eprintln!(
        "{} {} {}",
        style("keysweep").cyan().bold(),
        env!("CARGO_PKG_VERSION"),
        style(phase).bold()
    );
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Source:").bold(), source);
    if !detail.is_empty() {
        eprintln!("  {}", detail);
    }
    eprintln!();
}

/// Print a summary of an extract run
pub fn print_extract_summary(
    records: u64,
    keys_seen: u64,
    rsa_keys: u64,
    not_rsa: u64,
    malformed: u64,
    distinct: u64,
    duration: Duration,
    output: &str,
) {
    eprintln!();
    eprintln!("{}", style("Extract Complete").green().bold());
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Records:").bold(), format_number(records));
    eprintln!("  {} {}", style("Keys seen:").bold(), format_number(keys_seen));
    eprintln!("  {} {}", style("RSA keys:").bold(), format_number(rsa_keys));
    eprintln!("  {} {}", style("Non-RSA:").bold(), format_number(not_rsa));
    if malformed > 0 {
        eprintln!(
            "  {} {}",
            style("Malformed:").yellow().bold(),
            format_number(malformed)
        );
    }
    eprintln!(
        "  {} {}",
        style("Distinct moduli:").bold(),
        format_number(distinct)
    );
    eprintln!(
        "  {} {}",
        style("Duration:").bold(),
        format_elapsed(duration)
    );
    eprintln!("  {} {}", style("Output:").bold(), output);
    eprintln!();
}

/// Print a summary of an audit run
pub fn print_audit_summary(
    moduli: u64,
    padded: u64,
    workers: usize,
    matches: u64,
    duration: Duration,
) {
    eprintln!();
    eprintln!("{}", style("Audit Complete").green().bold());
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Moduli:").bold(), format_number(moduli));
    eprintln!("  {} {}", style("Padded to:").bold(), format_number(padded));
    eprintln!("  {} {}", style("Workers:").bold(), workers);
    let matches_styled = if matches > 0 {
        style(format_number(matches)).red().bold()
    } else {
        style(format_number(matches)).bold()
    };
    eprintln!("  {} {}", style("Matches:").bold(), matches_styled);
    eprintln!(
        "  {} {}",
        style("Duration:").bold(),
        format_elapsed(duration)
    );
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(5)), "5.0s");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "1m05s");
        assert_eq!(format_elapsed(Duration::from_secs(3700)), "1h01m40s");
    }
}
