//! # Load Driver - Entry Point
//! src/bin/load_driver.rs
//!
//! ```bash
//! load_driver <url> <clients> <requests> <delay_ms>
//! ```
//!
//! Ejecuta un test, lo agrega a `server_logs/performance_log.csv` y reescribe
//! `server_logs/comparison_results.txt`.

use clap::Parser;
use server_bench::config::LoadConfig;
use server_bench::loadgen;
use server_bench::results::ResultStore;
use tracing::error;

fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            match tracing_subscriber::EnvFilter::try_from_default_env() {
                Ok(filter) => filter,
                Err(_) => tracing_subscriber::EnvFilter::new("info"),
            },
        )
        .init();

    // clap termina con código 2 si los argumentos no parsean
    let config = LoadConfig::parse();
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let store = match ResultStore::open(&config.log_dir) {
        Ok(store) => store,
        Err(e) => {
            error!(dir = %config.log_dir.display(), error = %e, "cannot open results log");
            std::process::exit(1);
        }
    };

    let run = match loadgen::run_and_record(&config, &store, store.report_path()) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if config.json {
        match run.result.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => error!(error = %e, "failed to serialize result"),
        }
    }

    if run.result.aborted {
        std::process::exit(1);
    }
}
