//! Requests the export of the latest manual database snapshot to S3.

use std::process::ExitCode;

use rds2bq_runner::config::load_exporter_config;
use rds2bq_runner::core::export_snapshot;
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
    let config = load_exporter_config()?;

    init_tracing(env!("CARGO_BIN_NAME")).map_err(RunnerError::config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            if let Err(err) = export_snapshot(config).await {
                error!("{err}");
                return Err(err);
            }

            Ok(())
        })
}
