//! Loads the tables of a completed snapshot export from S3 into BigQuery.

use std::process::ExitCode;

use rds2bq_runner::config::load_transferer_config;
use rds2bq_runner::core::transfer_to_bigquery;
use rds2bq_runner::error::{RunnerError, RunnerResult};
use rds2bq_telemetry::tracing::init_tracing;
use tracing::error;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report(env!("CARGO_BIN_NAME")));
            ExitCode::FAILURE
        }
    }
}

fn run() -> RunnerResult<()> {
    let config = load_transferer_config()?;

    init_tracing(env!("CARGO_BIN_NAME")).map_err(RunnerError::config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            if let Err(err) = transfer_to_bigquery(config).await {
                error!("{err}");
                return Err(err);
            }

            Ok(())
        })
}
