use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use port_hunter_rs::error::CycleError;
use port_hunter_rs::pipeline::{self, CycleOutcome, ScanOptions};
use port_hunter_rs::report::ChangeReport;
use port_hunter_rs::runner::ScanCommand;
use port_hunter_rs::store::{SnapshotStore, StoreConfig, DEFAULT_DIR};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BANNER: &str = r"
 ____   ___  ____ _____ _   _ _   _ _   _ _____ _____ ____
|  _ \ / _ \|  _ |_   _| | | | | | | \ | |_   _| ____|  _ \
| |_) | | | | |_) || | | |_| | | | |  \| | | | |  _| | |_) |
|  __/| |_| |  _ < | | |  _  | |_| | |\  | | | | |___|  _ <
|_|    \___/|_| \_\|_| |_| |_|\___/|_| \_| |_| |_____|_| \_\
";

/// port-hunter-rs — run a port scanner and report which ports changed since the last run.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "port-hunter-rs",
    version,
    about = "Run a port scanner and report which ports changed since the last run.",
    long_about = None
)]
struct Cli {
    /// Full scan command without the target (e.g. 'nmap -p- -T4').
    #[arg(short = 'c', long = "command", env = "PORT_HUNTER_COMMAND")]
    command: String,

    /// Target IP, hostname or range; appended as the last argument.
    #[arg(short = 't', long)]
    target: String,

    /// Directory holding the current and backup snapshots.
    #[arg(long = "data-dir", env = "PORT_HUNTER_DATA_DIR", default_value = DEFAULT_DIR)]
    data_dir: PathBuf,

    /// Kill the scanner after this many seconds (0 = wait indefinitely).
    #[arg(long = "timeout-secs", default_value_t = 0)]
    timeout_secs: u64,

    /// Write the change report as pretty JSON to this path (optional).
    #[arg(long = "report-json")]
    report_json: Option<PathBuf>,

    /// Disable ANSI colors in the report.
    #[arg(long = "no-color", default_value_t = false)]
    no_color: bool,

    /// Do not animate a spinner while the scan runs.
    #[arg(long = "no-spinner", default_value_t = false)]
    no_spinner: bool,

    /// Log debug details to stderr.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    println!("{BANNER}");

    let cmd = ScanCommand::new(&cli.command, &cli.target)?;
    let opts = ScanOptions {
        timeout: (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs)),
        spinner: !cli.no_spinner,
    };
    println!("Scanning {} with {}", cmd.target(), cmd.executable());

    let snapshot = pipeline::run_scan(&cmd, &opts)
        .await
        .context("scan aborted, nothing saved")?;

    let store = SnapshotStore::new(StoreConfig::in_dir(&cli.data_dir));
    match pipeline::process_snapshot(&store, &snapshot) {
        Ok(CycleOutcome::Baseline) => {
            println!("No previous scan data found.");
            println!("Scan completed and saved.");
        }
        Ok(CycleOutcome::Unchanged(report)) => {
            print!("{}", report.render(!cli.no_color));
            write_report(cli.report_json.as_deref(), &report);
        }
        Ok(CycleOutcome::Changed(report)) => {
            print!("{}", report.render(!cli.no_color));
            write_report(cli.report_json.as_deref(), &report);
            println!("Scan completed and saved.");
        }
        Err(CycleError::Compare(e)) => {
            eprintln!("Error: {e}");
        }
        Err(CycleError::Persist { report, source }) => {
            print!("{}", report.render(!cli.no_color));
            write_report(cli.report_json.as_deref(), &report);
            return Err(source).with_context(|| {
                format!(
                    "ports changed but the snapshot in {} was not updated",
                    cli.data_dir.display()
                )
            });
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("failed to update snapshots in {}", cli.data_dir.display())
            })
        }
    }

    Ok(())
}

fn write_report(path: Option<&Path>, report: &ChangeReport) {
    let Some(path) = path else { return };
    if let Err(e) = write_report_json(path, report) {
        eprintln!("Failed to write JSON to {}: {}", path.display(), e);
    } else {
        println!("Wrote JSON report to {}", path.display());
    }
}

fn write_report_json(path: &Path, report: &ChangeReport) -> anyhow::Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}
