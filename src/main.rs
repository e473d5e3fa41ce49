//! keysweep - SSH Public Key Corpus Auditor
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use humansize::{format_size, BINARY};
use keysweep::config::{AuditConfig, Cli, Command, ExtractConfig};
use keysweep::progress::{
    format_number, print_audit_summary, print_extract_summary, print_header, ProgressReporter,
};
use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose)?;

    match cli.command.clone() {
        Command::Extract { keys_dir, output } => {
            let config = ExtractConfig::new(keys_dir, output, cli.quiet)
                .context("Invalid configuration")?;
            run_extract(config)
        }
        Command::Audit {
            modulus_list,
            workers,
        } => {
            let config = AuditConfig::new(modulus_list, workers, cli.quiet)
                .context("Invalid configuration")?;
            run_audit(config)
        }
        Command::Stats { keys_dir } => run_stats(&keys_dir),
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("keysweep=info,warn")
    } else {
        EnvFilter::new("keysweep=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

fn run_extract(config: ExtractConfig) -> Result<()> {
    if config.show_progress {
        print_header(
            "extract",
            &config.keys_dir.display().to_string(),
            &format!("Output: {}", config.output_path.display()),
        );
    }

    // Stop at a record boundary on the first Ctrl+C, force exit on
    // the second.
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        if shutdown_handler.swap(true, Ordering::SeqCst) {
            eprintln!("\nForced exit!");
            std::process::exit(130);
        }
        eprintln!("\nInterrupt received, stopping at record boundary...");
    })
    .context("Failed to set signal handler")?;

    let progress = config.show_progress.then(ProgressReporter::new);

    let stats = {
        let progress = progress.as_ref();
        keysweep::run_extract(&config, shutdown, move |p| {
            if let Some(bar) = progress {
                bar.set_status(&format!(
                    "Records: {} | Keys: {} | Distinct moduli: {}",
                    format_number(p.records),
                    format_number(p.keys_seen),
                    format_number(p.distinct_moduli),
                ));
            }
        })
        .context("Extract failed")?
    };

    if let Some(ref bar) = progress {
        bar.finish("Extract completed");
    }

    if config.show_progress {
        let out_size = std::fs::metadata(&config.output_path)
            .map(|m| format_size(m.len(), BINARY))
            .unwrap_or_else(|_| "unknown".to_string());
        print_extract_summary(
            stats.records,
            stats.keys_seen,
            stats.rsa_keys,
            stats.not_rsa,
            stats.malformed,
            stats.distinct_moduli,
            stats.duration,
            &format!("{} ({})", config.output_path.display(), out_size),
        );
    }

    Ok(())
}

fn run_audit(config: AuditConfig) -> Result<()> {
    if config.show_progress {
        print_header(
            "audit",
            &config.modulus_path.display().to_string(),
            "",
        );
    }

    let progress = config.show_progress.then(ProgressReporter::new);
    if let Some(ref bar) = progress {
        bar.set_status("Running batch-GCD...");
    }

    let outcome = keysweep::run_audit(&config).context("Audit failed")?;

    if let Some(ref bar) = progress {
        bar.finish(&format!("Audit completed: {} matches", outcome.matches.len()));
    }

    // Matches go to stdout, one `index,hex-divisor` per line
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for m in &outcome.matches {
        writeln!(out, "{},{:x}", m.index, m.divisor).context("Failed to write match")?;
    }
    out.flush().context("Failed to write match")?;

    if config.show_progress {
        print_audit_summary(
            outcome.moduli_loaded as u64,
            outcome.padded_len as u64,
            outcome.workers,
            outcome.matches.len() as u64,
            outcome.duration,
        );
    }

    Ok(())
}

fn run_stats(keys_dir: &std::path::Path) -> Result<()> {
    let stats = keysweep::run_stats(keys_dir).context("Stats failed")?;

    println!();
    println!("Corpus Statistics");
    println!("─────────────────────────────────────────────────");
    println!("  Chunks:     {}", format_number(stats.chunks));
    println!("  Records:    {}", format_number(stats.records));
    println!("  Keys seen:  {}", format_number(stats.keys_seen));
    println!("  Malformed:  {}", format_number(stats.malformed));
    println!();

    if !stats.by_algorithm.is_empty() {
        println!("Keys by Algorithm:");
        println!("{:<24} {:>12}", "Algorithm", "Count");
        println!("{:<24} {:>12}", "---------", "-----");
        for (algorithm, count) in &stats.by_algorithm {
            println!("{:<24} {:>12}", algorithm, format_number(*count));
        }
        println!();
    }

    if !stats.rsa_by_bits.is_empty() {
        println!("RSA Moduli by Bit Length:");
        println!("{:<24} {:>12}", "Bits", "Count");
        println!("{:<24} {:>12}", "----", "-----");
        for (bits, count) in &stats.rsa_by_bits {
            println!("{:<24} {:>12}", bits, format_number(*count));
        }
        println!();
    }

    Ok(())
}
