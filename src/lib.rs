//! aifix - error context acquisition for AI-assisted fixes
//!
//! This library works out what failed before any model call happens and
//! reconstructs a bounded error report for it:
//! - Reading bash, zsh and fish history to find the last command
//! - Consuming the shell integration hook signal when present
//! - Re-running the command under a timeout to recover its error output
//! - Truncating and formatting everything into one prompt block
//!
//! # Example
//!
//! ```no_run
//! use aifix::{Acquirer, EngineConfig, Outcome, ShellRunner};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let acquirer = Acquirer::new(EngineConfig::from_env(), ShellRunner);
//!
//!     match acquirer.acquire(None).await? {
//!         Outcome::Captured(ctx) => println!("{}", ctx.format_for_prompt()),
//!         Outcome::LastCommandSucceeded { command } => {
//!             println!("'{}' succeeded, nothing to fix", command)
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod acquire;
pub mod config;
pub mod context;
pub mod error;
pub mod shell;
pub mod utils;

// Re-export commonly used types
pub use acquire::{Acquirer, AcquisitionTier, Outcome};
pub use config::{EngineConfig, HookSignal};
pub use context::{ErrorContext, Shell};
pub use error::AcquireError;
pub use shell::{CommandRunner, ShellRunner};
