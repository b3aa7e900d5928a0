//! `sealctl`: batch tooling for tokens and encrypted record exports.
//!
//! Startup sequence:
//! 1. Parse the command line.
//! 2. Load and validate [`SecurityConfig`] from the optional file and the
//!    environment.
//! 3. Initialise structured logging on stderr.
//! 4. Build the [`SecurityContext`] and run the subcommand.
//!
//! Exit codes: 0 success, 1 token invalid, 65 bad record data, 78 missing
//! configuration, 70 anything else.

mod cli;
mod commands;
mod telemetry;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use common::SecurityError;
use security::{SecurityConfig, SecurityContext};
use tokio::io::stdout;
use tracing::{error, info};

use cli::{Cli, Command, TokenCommand};
use commands::{CheckOutcome, RecordOp};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = match SecurityConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Telemetry is not yet up; write to stderr directly.
            eprintln!("ERROR: configuration invalid: {e:#}");
            return exit_code_for(&e);
        }
    };

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    if let Err(e) = telemetry::init(&cfg.log_level, &cfg.log_format) {
        eprintln!("ERROR: {e:#}");
        return ExitCode::from(70);
    }
    info!(version = env!("CARGO_PKG_VERSION"), "sealctl starting");

    // -----------------------------------------------------------------------
    // 3. Command
    // -----------------------------------------------------------------------
    match run(cli.command, &cfg).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "sealctl failed");
            eprintln!("ERROR: {e:#}");
            exit_code_for(&e)
        }
    }
}

async fn run(command: Command, cfg: &SecurityConfig) -> Result<ExitCode> {
    let ctx = SecurityContext::from_config(cfg)?;

    match command {
        Command::Token(TokenCommand::Issue(args)) => {
            println!("{}", commands::issue_token(&ctx, &args)?);
        }
        Command::Token(TokenCommand::Check { args, token }) => {
            let outcome = commands::check_token(&ctx, &args, &token)?;
            println!("{}", if outcome == CheckOutcome::Valid { "valid" } else { "invalid" });
            if outcome == CheckOutcome::Invalid {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Encrypt(args) => {
            let op = RecordOp::Encrypt(ctx.cipher.clone());
            commands::run_records(&ctx.registry, &args, op, stdout()).await?;
        }
        Command::Decrypt(args) => {
            let op = RecordOp::Decrypt(ctx.cipher.clone());
            commands::run_records(&ctx.registry, &args, op, stdout()).await?;
        }
        Command::Rekey(args) => {
            let to = commands::rekey_target(cfg, &args)?;
            let op = RecordOp::Rekey {
                from: ctx.cipher.clone(),
                to,
            };
            commands::run_records(&ctx.registry, &args.records, op, stdout()).await?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let code = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<SecurityError>())
        .map(SecurityError::exit_code)
        .unwrap_or(70);
    ExitCode::from(u8::try_from(code).unwrap_or(70))
}
