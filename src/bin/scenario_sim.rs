//! 场景文件仿真
//!
//! 读取 scenario.json，运行到空闲，并可把结果写成 JSON。

use clap::Parser;
use cloudsim_rs::setup::{load_scenario, run_scenario};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "scenario-sim", about = "Run scenario.json on the datacenter simulator")]
struct Args {
    /// Path to scenario.json
    #[arg(long)]
    scenario: PathBuf,

    /// Write the full report (summary, job results, vm states) as JSON
    #[arg(long)]
    results_json: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let report = match load_scenario(&args.scenario).and_then(|spec| run_scenario(&spec)) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("scenario failed: {e}");
            std::process::exit(1);
        }
    };

    if let Some(path) = &args.results_json {
        let raw = serde_json::to_string_pretty(&report).expect("report serializes");
        if let Err(e) = fs::write(path, raw) {
            eprintln!("failed to write {}: {e}", path.display());
            std::process::exit(1);
        }
    }

    println!(
        "done @ {}, events={}, succeeded={}, failed={}, cancelled={}",
        report.summary.total_elapsed_time,
        report.summary.events,
        report.summary.succeeded,
        report.summary.failed,
        report.summary.cancelled
    );
}
