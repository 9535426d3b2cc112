use clap::Parser;

use log::{error, info};
use std::process::ExitCode;

use itnconv::{run_export, ExportArgs};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = ExportArgs::parse();

    info!("Starting the export of {:?}...", args.project);

    match run_export(&args) {
        Ok(stats) => {
            stats.print_summary();
            info!("Export written to {:?}.", args.output_dir);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Export failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
