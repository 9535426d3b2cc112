use clap::Parser;

use log::{error, info};
use std::process::ExitCode;

use itnconv::{run_import, ImportArgs};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = ImportArgs::parse();

    info!("Starting the import from {:?}...", args.src_dir);

    match run_import(&args) {
        Ok(stats) => {
            stats.print_summary();
            info!("Import completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Import failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
