//! CLI entrypoint for the mmload harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mmload_core::{Policy, TargetPlatform, Validator, target_platform};
use mmload_harness::hexdump::hex_dump;
use mmload_harness::smoke::DEFAULT_ITERATIONS;
use mmload_harness::structured_log::LogLevel;
use mmload_harness::{CycleReport, LogEmitter, StatsReport, load_corpus, replay, run_smoke};
use parking_lot::Mutex;

/// Decode and validate MM load-from-file fuzz inputs.
#[derive(Debug, Parser)]
#[command(name = "mmload-harness")]
#[command(about = "Fuzz-input harness for the MM load-from-file command")]
struct Cli {
    /// Flight target profile; overrides MMLOAD_TARGET.
    #[arg(long, global = true)]
    target: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the fixed smoke input and a memory-type sweep.
    Smoke {
        /// Number of sweep iterations.
        #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
        iterations: usize,
        /// JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Replay every file of a corpus directory.
    Replay {
        /// Corpus directory.
        #[arg(long)]
        corpus: PathBuf,
        /// Worker threads.
        #[arg(long, default_value_t = 1)]
        workers: usize,
        /// JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Markdown report output path (JSON alongside, `.json`).
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Decode one input file and print the record, verdict and hex dump.
    Decode {
        /// Input file.
        #[arg(long)]
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let platform = cli
        .target
        .as_deref()
        .map_or_else(target_platform, TargetPlatform::from_str_loose);
    let policy = Policy::new(platform);
    eprintln!("Target platform: {}", platform.name());

    match cli.command {
        Command::Smoke { iterations, log } => {
            let mut emitter = log
                .as_deref()
                .map(|path| LogEmitter::to_file(path, "smoke", &run_id()))
                .transpose()?;
            let run = run_smoke(policy, iterations, emitter.as_mut())?;
            if let Some(emitter) = emitter.as_mut() {
                emitter.emit(LogLevel::Info, "smoke_end")?;
                emitter.flush()?;
            }
            println!("{}", run.to_text());
            println!("{}", run.stats);
        }
        Command::Replay {
            corpus,
            workers,
            log,
            report,
        } => {
            eprintln!("Replaying corpus in {}", corpus.display());
            let entries = load_corpus(&corpus)?;
            let emitter = log
                .as_deref()
                .map(|path| LogEmitter::to_file(path, "replay", &run_id()).map(Mutex::new))
                .transpose()?;
            let summary = replay(&entries, policy, workers, emitter.as_ref())?;
            eprintln!(
                "Replayed {} inputs on {} worker(s)",
                entries.len(),
                summary.workers
            );
            println!("{}", summary.stats);

            if let Some(path) = report {
                let report = StatsReport::new(
                    format!("Corpus replay: {}", corpus.display()),
                    platform,
                    summary.stats,
                    summary.rejections,
                );
                report.write_to(&path)?;
                eprintln!("Report written to {}", path.display());
            }
        }
        Command::Decode { input } => {
            let bytes = std::fs::read(&input)?;
            let report = CycleReport::build(&bytes, &Validator::simulation(policy));
            println!("{}", report.to_json()?);
            print!("{}", hex_dump(&bytes, ""));
        }
    }

    Ok(())
}

fn run_id() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("run-{secs}-{}", std::process::id())
}
