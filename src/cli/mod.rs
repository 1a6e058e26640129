//! # CLI Module
//!
//! Command-line interface for the media organizer.
//!
//! ## Usage
//! ```bash
//! # Organize a folder in place
//! media-organize organize ~/Camera
//!
//! # Organize into another folder, with a zip backup first
//! media-organize organize ~/Camera --dest ~/Pictures/Sorted --backup
//!
//! # Monthly folders of at most 200 files, JSON report
//! media-organize organize ~/Camera --mode monthly --capacity 200 --output json
//!
//! # Count files by kind without moving anything
//! media-organize classify ~/Camera
//!
//! # Write the default settings file
//! media-organize config --init
//! ```
//!
//! While `organize` runs, type `p`, `r` or `t` followed by Enter to pause,
//! resume or terminate. A terminated run is rolled back.

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use media_organizer::core::config::{OrganizationMode, OrganizerConfig};
use media_organizer::core::organize::{
    format_eta, EngineHandle, OrganizeEngine, RunControl, RunOutcome, RunReport, RunRequest,
};
use media_organizer::core::scanner::{ClassifiedFiles, DirectoryScanner, ScanConfig, MAX_SCAN_WORKERS};
use media_organizer::error::Result;
use media_organizer::events::{Event, EventChannel, MessageLevel};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Media Organizer - Sort photos, videos and documents into dated folders
#[derive(Parser, Debug)]
#[command(name = "media-organize")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Move files into dated folders
    Organize {
        /// Folder to organize
        source: PathBuf,

        /// Destination folder (defaults to the source folder)
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Write a zip backup of the source first
        #[arg(short, long)]
        backup: bool,

        /// Folder granularity
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Files per folder; 0 for unlimited, otherwise a multiple of 100
        #[arg(long)]
        capacity: Option<u32>,

        /// Skip the resort pass over the destination
        #[arg(long)]
        no_resort: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Count files by kind without moving anything
    Classify {
        /// Folder to classify
        path: PathBuf,

        /// Worker threads (at most 4)
        #[arg(short, long, default_value = "4")]
        workers: usize,
    },

    /// Show the effective settings
    Config {
        /// Write the default settings to the settings file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// One folder per year
    Yearly,
    /// Year and month folders
    Monthly,
    /// Year, month and day folders
    Daily,
}

impl From<Mode> for OrganizationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Yearly => OrganizationMode::Yearly,
            Mode::Monthly => OrganizationMode::Monthly,
            Mode::Daily => OrganizationMode::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(OrganizerConfig::default_path);

    match cli.command {
        Commands::Organize {
            source,
            dest,
            backup,
            mode,
            capacity,
            no_resort,
            output,
        } => {
            let mut config = OrganizerConfig::load(&config_path);
            if let Some(mode) = mode {
                config = config.with_organization_mode(mode.into());
            }
            if let Some(capacity) = capacity {
                config = config.with_capacity(capacity)?;
            }
            let dest = dest.unwrap_or_else(|| source.clone());
            let request = RunRequest::new(source, dest)
                .with_backup(backup)
                .with_resort(!no_resort);
            run_organize(config, request, output)
        }
        Commands::Classify { path, workers } => {
            run_classify(&OrganizerConfig::load(&config_path), &path, workers)
        }
        Commands::Config { init } => run_config(&config_path, init),
    }
}

fn run_organize(config: OrganizerConfig, request: RunRequest, output: OutputFormat) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(output, OutputFormat::Pretty);

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Media Organizer").bold().cyan(),
            style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line(&format!(
            "  {} -> {}",
            request.source.display(),
            request.destination.display()
        ))
        .ok();
        term.write_line(&format!(
            "  {}",
            style("Type p / r / t + Enter to pause, resume or terminate").dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let (sender, receiver) = EventChannel::new();
    let destination = request.destination.clone();
    let engine = OrganizeEngine::new(config, sender);
    let handle = EngineHandle::spawn(engine, request)?;

    // Keyboard control; the thread ends with the process
    let control = ControlKeys::new(&handle);
    thread::spawn(move || control.listen());

    let progress = if pretty {
        let pb = ProgressBar::new(100);
        let bar_style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(bar_style);
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress else {
            for _ in receiver.iter() {}
            return;
        };
        for event in receiver.iter() {
            match event {
                Event::PhaseChanged { phase } => pb.set_message(phase.to_string()),
                Event::Progress(update) => {
                    if let Some(percent) = update.percent {
                        pb.set_position(u64::from(percent));
                    }
                    match update.level {
                        MessageLevel::Warning => {
                            pb.println(format!("{} {}", style("!").yellow(), update.message))
                        }
                        MessageLevel::Error => {
                            pb.println(format!("{} {}", style("✗").red(), update.message))
                        }
                        _ if !update.message.is_empty() && !update.message.contains('\n') => {
                            let eta = update
                                .eta_secs
                                .map(|s| format!(" ({} left)", format_eta(Duration::from_secs(s))))
                                .unwrap_or_default();
                            pb.set_message(format!("{}{}", update.message, eta));
                        }
                        _ => {}
                    }
                }
                Event::Paused => pb.println(format!("{} Paused", style("‖").yellow())),
                Event::Resumed => pb.println(format!("{} Resumed", style("▶").green())),
                Event::Terminated => pb.println(format!("{} Terminating...", style("■").red())),
                Event::RolledBack { restored, failed } => pb.println(format!(
                    "{} Rolled back {} changes ({} failed)",
                    style("↺").yellow(),
                    restored,
                    failed
                )),
                Event::Completed(_) | Event::Error { .. } => {}
                Event::FileMoved { .. } | Event::DuplicateRemoved { .. } => {}
            }
        }
        pb.finish_and_clear();
    });

    // Wait for the engine; dropping it closes the event channel
    let (engine, outcome) = handle.join();
    drop(engine);
    event_thread.join().ok();

    let outcome = outcome?;
    match output {
        OutputFormat::Pretty => print_pretty_outcome(&term, &outcome, &destination),
        OutputFormat::Json => print_json_outcome(&outcome),
    }
    Ok(())
}

/// Reads pause/resume/terminate commands from stdin
struct ControlKeys {
    control: Arc<RunControl>,
}

impl ControlKeys {
    fn new(handle: &EngineHandle) -> Self {
        Self {
            control: handle.control(),
        }
    }

    fn listen(self) {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match line.trim() {
                "p" => self.control.pause(),
                "r" => self.control.resume(),
                "t" => {
                    self.control.terminate();
                    break;
                }
                _ => {}
            }
        }
    }
}

fn print_pretty_outcome(term: &Term, outcome: &RunOutcome, destination: &Path) {
    let report = match outcome {
        RunOutcome::Terminated => {
            term.write_line(&format!(
                "{} Run terminated; moved files were restored",
                style("■").red().bold()
            ))
            .ok();
            return;
        }
        RunOutcome::Completed(report) => report,
    };

    term.write_line(&format!("{} Organizing Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();
    print_counts(term, report);

    if let Some(archive) = &report.archive {
        term.write_line(&format!("  backup: {}", style(archive.display()).dim()))
            .ok();
    }

    term.write_line("").ok();
    if report.folder_summary.is_empty() {
        term.write_line("  No files were moved").ok();
    } else {
        term.write_line(&format!(
            "{} {}",
            style("Folders in").bold().underlined(),
            style(destination.display()).bold()
        ))
        .ok();
        for line in &report.folder_summary {
            term.write_line(&format!("  {}", line)).ok();
        }
    }
}

fn print_counts(term: &Term, report: &RunReport) {
    let stats = &report.stats;
    term.write_line(&format!(
        "  {} images, {} videos, {} documents, {} other in {:.1}s",
        style(stats.images).cyan(),
        style(stats.videos).cyan(),
        style(stats.documents).cyan(),
        style(stats.others).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} identical files removed",
        style(stats.identical_files_removed).yellow()
    ))
    .ok();
    if stats.failed_moves > 0 {
        term.write_line(&format!(
            "  {} files could not be moved",
            style(stats.failed_moves).red()
        ))
        .ok();
    }
    if stats.skipped_others > 0 {
        term.write_line(&format!(
            "  {} other files left in place",
            style(stats.skipped_others).dim()
        ))
        .ok();
    }
}

fn print_json_outcome(outcome: &RunOutcome) {
    let output = match outcome {
        RunOutcome::Terminated => serde_json::json!({ "status": "terminated" }),
        RunOutcome::Completed(report) => serde_json::json!({
            "status": "completed",
            "report": report,
        }),
    };
    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode report: {}", e),
    }
}

fn run_classify(config: &OrganizerConfig, path: &Path, workers: usize) -> Result<()> {
    let term = Term::stderr();
    let scanner = DirectoryScanner::new(config, ScanConfig::default());

    let pb = ProgressBar::new(0);
    let bar_style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} folders")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    pb.set_style(bar_style);

    let files = scanner.classify_concurrent(path, None, workers.min(MAX_SCAN_WORKERS), |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    })?;
    pb.finish_and_clear();

    print_classified(&term, path, &files);
    Ok(())
}

fn print_classified(term: &Term, path: &Path, files: &ClassifiedFiles) {
    term.write_line(&format!(
        "{} {}",
        style("Files in").bold(),
        style(path.display()).bold()
    ))
    .ok();
    for (label, count) in [
        ("images", files.images.len()),
        ("videos", files.videos.len()),
        ("documents", files.documents.len()),
        ("other", files.others.len()),
    ] {
        term.write_line(&format!("  {:>6} {}", style(count).cyan(), label))
            .ok();
    }
}

fn run_config(path: &Path, init: bool) -> Result<()> {
    let config = if init {
        let config = OrganizerConfig::default();
        config.save(path)?;
        eprintln!("Wrote default settings to {}", path.display());
        config
    } else {
        OrganizerConfig::load(path)
    };

    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode settings: {}", e),
    }
    Ok(())
}
