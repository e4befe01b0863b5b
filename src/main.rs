mod ci;
mod cli;
mod config;
mod dispatch;
mod env;
mod reporter;
mod telemetry;

use anyhow::Result;
use clap::CommandFactory;
use clap::error::ErrorKind;
use cli::Cli;
use config::{ServiceSettings, UsageError};
use dispatch::Dispatcher;
use env::ProcessEnv;
use std::process::exit;
use std::time::Instant;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let start_time = Instant::now();
    telemetry::init_tracing();

    let env = ProcessEnv;
    // Read first so API key warnings show even when the arguments are bad
    let settings = ServiceSettings::from_env(&env);
    let args = match cli::parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => usage_failure(e, false),
    };

    let resolved = config::resolve(&args, &env).and_then(|config| Ok((config, settings?)));
    let (config, settings) = match resolved {
        Ok(resolved) => resolved,
        Err(e) => usage_failure(e, args.json),
    };
    if let Some(provider) = config.ci_provider {
        tracing::debug!(provider, "detected CI provider");
    }

    let dispatcher = Dispatcher::new(settings)?;
    match dispatcher.dispatch(&config).await {
        Ok(outcome) => {
            if args.json {
                reporter::print_json_report(&outcome);
            } else {
                reporter::print_human_report(&config, &outcome, start_time);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "audit submission failed");
            if args.json {
                reporter::print_json_error(&e.to_string());
            } else {
                reporter::print_human_error(&format!("Error: {e}"));
            }
            exit(1);
        }
    }
}

/// Prints the error with usage guidance and exits 1. `--version` exits 0.
fn usage_failure(err: UsageError, json: bool) -> ! {
    if let UsageError::Arguments(e) = &err {
        let _ = e.print();
        exit(match e.kind() {
            ErrorKind::DisplayVersion => 0,
            _ => 1,
        });
    }

    if json {
        reporter::print_json_error(&err.to_string());
    } else {
        reporter::print_human_error(&format!("Error: {err}"));
    }
    eprintln!();
    eprintln!("{}", Cli::command().render_help());
    exit(1);
}
