//! Runs the trading checkpoint against a PostgreSQL database.
//!
//! ```text
//! dq-checkpoint --username analyst --password ... --host db --port 5432 --database trading
//! ```

use clap::{Parser, ValueEnum};
use dq_guard::actions::{RenderReportAction, ResultSink, StoreResultAction};
use dq_guard::core::CheckpointResult;
use dq_guard::formatters::{HumanFormatter, JsonFormatter, MarkdownFormatter, ResultFormatter};
use dq_guard::logging::setup::{init_logging, LoggingConfig};
use dq_guard::presets::trading;
use dq_guard::prelude::*;
use dq_guard::sources::{PostgresConfig, PostgresSource};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Validate the users and trades tables of a trading database
#[derive(Parser)]
#[command(name = "dq-checkpoint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database username
    #[arg(long)]
    username: String,

    /// Database password
    #[arg(long)]
    password: String,

    /// Database host
    #[arg(long)]
    host: String,

    /// Database port
    #[arg(long)]
    port: u16,

    /// Database name
    #[arg(long)]
    database: String,

    /// PostgreSQL sslmode
    #[arg(long, default_value = "disable")]
    sslmode: String,

    /// Directory for stored results and data docs
    #[arg(long, default_value = "dq_results")]
    results_dir: PathBuf,

    /// Format of the report printed to stdout
    #[arg(long, value_enum, default_value_t = Format::Human)]
    format: Format,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Human,
    Json,
    Markdown,
}

impl Format {
    fn formatter(self) -> Box<dyn ResultFormatter> {
        match self {
            Format::Human => Box::new(HumanFormatter::new()),
            Format::Json => Box::new(JsonFormatter::new()),
            Format::Markdown => Box::new(MarkdownFormatter::new()),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(LoggingConfig::default().with_json_format(cli.json_logs)) {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            error!(error = %e, "Checkpoint aborted");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

/// How a completed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Outcome {
    validation_passed: bool,
    actions_failed: bool,
}

impl Outcome {
    /// 0 passed, 1 validation failed, 2 aborted, 3 an action failed.
    fn exit_code_value(self) -> u8 {
        if self.actions_failed {
            3
        } else if self.validation_passed {
            0
        } else {
            1
        }
    }

    fn exit_code(self) -> ExitCode {
        ExitCode::from(self.exit_code_value())
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    let source = PostgresSource::new(
        PostgresConfig::new(
            cli.host,
            cli.port,
            cli.database,
            cli.username,
            cli.password,
        )
        .with_sslmode(cli.sslmode),
    );

    let actions: Vec<Arc<dyn ResultSink>> = vec![
        Arc::new(StoreResultAction::new(cli.results_dir.join("validations"))),
        Arc::new(RenderReportAction::new(
            cli.results_dir.join("docs").join("index.md"),
        )),
    ];
    let checkpoint = trading::checkpoint(actions)?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current table");
            let _ = cancel_tx.send(true);
        }
    });

    let (result, actions_failed) = match checkpoint.run_with_cancellation(&source, cancel_rx).await
    {
        Ok(result) => (result, false),
        Err(GuardError::ActionsFailed { failures, result }) => {
            for failure in &failures {
                error!(action = %failure.action, error = %failure.message, "Action failed");
            }
            (*result, true)
        }
        Err(e) => return Err(e),
    };

    print_report(&result, cli.format)?;
    info!(
        run_id = %result.run_id(),
        success = result.success(),
        docs = %cli.results_dir.join("docs").join("index.md").display(),
        "Checkpoint finished"
    );
    Ok(Outcome {
        validation_passed: result.success(),
        actions_failed,
    })
}

fn print_report(result: &CheckpointResult, format: Format) -> Result<()> {
    let report = format
        .formatter()
        .format(result)
        .context("rendering the report")?;
    println!("{report}");
    Ok(())
}
