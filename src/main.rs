//! `pgferry` binary entry point: parse flags, load the configuration
//! record, wire the interrupt handler, run the orchestrator, and map the
//! outcome to an exit code.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pg_ferry::cli::CliArgs;
use pg_ferry::config::FerryConfig;
use pg_ferry::orchestrator::{Orchestrator, RunOptions};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    std::process::exit(run().await);
}

async fn run() -> i32 {
    let args = CliArgs::parse();

    let filter = match args.row_filter() {
        Ok(filter) => filter,
        Err(e) => {
            error!(error = %e, "invalid arguments");
            return 2;
        }
    };

    let mut config = match FerryConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, path = %args.config.display(), "cannot load configuration");
            return 2;
        }
    };
    config.merge_table_filters(&args.tables, &args.skip_tables);

    let options = RunOptions {
        mode: args.mode(),
        resume: args.resume,
        dry_run: args.dry_run,
        skip_indexes: args.skip_indexes,
        filter,
    };

    let orchestrator = Orchestrator::new(config, options);

    // ctrl-c flips the cancel flag; the data phase checkpoints, restores
    // the target session flags, and winds down between chunks.
    let cancel = orchestrator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing in-flight chunk");
            cancel.cancel();
        }
    });

    match orchestrator.run().await {
        Ok(report) if report.succeeded() => 0,
        Ok(report) => {
            if report.cancelled {
                error!("run cancelled; resume with --resume");
            } else {
                error!(failed = report.failed_count(), "run finished with failures");
            }
            1
        }
        Err(e) => {
            error!(error = %e, "migration aborted");
            1
        }
    }
}
