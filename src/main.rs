//! Main entry point for aifix.
//!
//! Reads the configuration from the environment, acquires the error context
//! and prints the block handed to the model request layer. Any arguments are
//! taken together as error text pasted by the user.

use std::ffi::OsString;

use aifix::error::SHELL_INTEGRATION_TIP;
use aifix::utils;
use aifix::{Acquirer, EngineConfig, Outcome, ShellRunner};

use anyhow::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging before anything else
    let log_guard = utils::logger::init_logging();

    let manual = manual_error_from_args(std::env::args_os());
    let manual = Some(manual.as_str()).filter(|m| !m.trim().is_empty());

    let config = EngineConfig::from_env();
    tracing::debug!("Config: {:?}", config);
    let acquirer = Acquirer::new(config, ShellRunner);

    let exit_code = match acquirer.acquire(manual).await {
        Ok(Outcome::Captured(ctx)) => {
            println!("{}", ctx.format_for_prompt());
            0
        }
        Ok(Outcome::LastCommandSucceeded { command }) => {
            println!("Last command succeeded ({}). No errors to analyze\n", command);
            println!("{}", SHELL_INTEGRATION_TIP);
            0
        }
        Err(e) => {
            tracing::debug!("Acquisition failed: {:?}", e);
            eprintln!("Error: {}", e);
            if let Some(hint) = e.hint() {
                eprintln!("\n{}", hint);
            }
            1
        }
    };

    // Flush the log file before a non-zero exit skips destructors.
    drop(log_guard);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

/// Join everything after the program name; bytes that are not UTF-8 are replaced.
fn manual_error_from_args(args: impl IntoIterator<Item = OsString>) -> String {
    args.into_iter()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
