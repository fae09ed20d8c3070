//! Error context acquisition.
//!
//! Exactly one tier fills the [`ErrorContext`], chosen in fixed precedence:
//! error text supplied by the user, then the shell hook signal, then the
//! shell history. Tiers never run speculatively; once a tier is selected its
//! failure is final, because falling through after a re-run could execute the
//! user's command a second time.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{EngineConfig, HookSignal};
use crate::context::history::{self, HistoryDialect, LastCommandResolver};
use crate::context::{ErrorContext, MANUAL_COMMAND, truncate_error};
use crate::error::{AcquireError, Result};
use crate::shell::{CommandRunner, ErrorReproducer};

/// Where the error context comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcquisitionTier {
    Manual(String),
    HookFile { path: PathBuf, last_exit_code: i32 },
    HistoryFallback,
}

impl AcquisitionTier {
    /// Pick the tier for this run.
    ///
    /// Blank manual text counts as absent. The hook is selected only when its
    /// exit code is present, non-empty and not `0`.
    pub fn select(manual: Option<&str>, hook: Option<&HookSignal>) -> Self {
        if let Some(text) = manual.filter(|t| !t.trim().is_empty()) {
            return AcquisitionTier::Manual(text.to_string());
        }

        if let Some(hook) = hook {
            let code = hook.last_exit.as_deref().map(str::trim).unwrap_or("");
            if !code.is_empty() && code != "0" {
                let last_exit_code = code.parse::<i32>().unwrap_or_else(|_| {
                    warn!("Unparseable exit code '{}' from hook, recording 1", code);
                    1
                });
                if last_exit_code != 0 {
                    return AcquisitionTier::HookFile {
                        path: hook.command_file.clone(),
                        last_exit_code,
                    };
                }
            }
        }

        AcquisitionTier::HistoryFallback
    }
}

/// Result of a run that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Captured(ErrorContext),
    /// History fallback re-ran the last command and it succeeded quietly.
    LastCommandSucceeded { command: String },
}

/// Drives the acquisition tiers over an injected [`CommandRunner`].
pub struct Acquirer<R> {
    config: EngineConfig,
    resolver: LastCommandResolver,
    reproducer: ErrorReproducer<R>,
}

impl<R: CommandRunner> Acquirer<R> {
    pub fn new(config: EngineConfig, runner: R) -> Self {
        let resolver = LastCommandResolver::new(config.self_names.clone());
        let reproducer = ErrorReproducer::new(runner, config.reproduce_timeout);
        Self {
            config,
            resolver,
            reproducer,
        }
    }

    pub fn runner(&self) -> &R {
        self.reproducer.runner()
    }

    /// Acquire the error context for this run.
    pub async fn acquire(&self, manual: Option<&str>) -> Result<Outcome> {
        let tier = AcquisitionTier::select(manual, self.config.hook.as_ref());
        debug!("Selected acquisition tier: {:?}", tier);

        let mut ctx = ErrorContext::new(self.config.shell.clone(), self.config.os.clone());
        match tier {
            AcquisitionTier::Manual(text) => {
                ctx.command = MANUAL_COMMAND.to_string();
                ctx.error = text;
            }
            AcquisitionTier::HookFile {
                path,
                last_exit_code,
            } => {
                ctx.command = read_hook_command(&path)?;
                ctx.recent_commands = self.enrichment_window(&ctx.command);
                let repro = self
                    .reproducer
                    .reproduce(&ctx.command, &self.config.shell, &self.config.os)
                    .await?;
                ctx.error = truncate_error(&repro.output, self.config.max_error_lines);
                ctx.exit_code = last_exit_code;
            }
            AcquisitionTier::HistoryFallback => {
                let (path, commands) = self.read_history()?;
                let Some((_, last)) = self.resolver.resolve(&commands) else {
                    return Err(AcquireError::NoQualifyingCommand {
                        path,
                        self_names: self.resolver.self_names().to_vec(),
                    });
                };
                ctx.command = last.to_string();
                ctx.recent_commands = history::window_before(
                    &commands,
                    &self.resolver,
                    &ctx.command,
                    self.config.window_size,
                );

                let repro = match self
                    .reproducer
                    .reproduce(&ctx.command, &self.config.shell, &self.config.os)
                    .await
                {
                    Ok(repro) => repro,
                    Err(AcquireError::NoErrorDetected { command }) => {
                        info!("'{}' succeeded on re-run, nothing to fix", command);
                        return Ok(Outcome::LastCommandSucceeded { command });
                    }
                    Err(e) => return Err(e),
                };
                ctx.error = truncate_error(&repro.output, self.config.max_error_lines);
                ctx.exit_code = repro.exit_code.unwrap_or(-1);
            }
        }

        debug!(
            "Acquired context: {}",
            serde_json::to_string(&ctx).unwrap_or_default()
        );
        Ok(Outcome::Captured(ctx))
    }

    fn read_history(&self) -> Result<(PathBuf, Vec<String>)> {
        let home = self
            .config
            .home_dir
            .as_deref()
            .ok_or(AcquireError::HomeDirUnavailable)?;
        let path = history::locate(&self.config.shell, home)?;
        let commands = history::read(&path, HistoryDialect::for_shell(&self.config.shell))?;
        Ok((path, commands))
    }

    /// Recent commands for the hook tier. History here only enriches the
    /// context, so failing to read it leaves the list empty.
    fn enrichment_window(&self, command: &str) -> Vec<String> {
        match self.read_history() {
            Ok((_, commands)) => {
                history::window_before(&commands, &self.resolver, command, self.config.window_size)
            }
            Err(e) => {
                warn!("Recent commands unavailable: {}", e);
                Vec::new()
            }
        }
    }
}

fn read_hook_command(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path).map_err(|e| AcquireError::HookFileUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let command = raw.trim();
    if command.is_empty() {
        return Err(AcquireError::HookFileUnreadable {
            path: path.to_path_buf(),
            reason: "file is empty".to_string(),
        });
    }
    Ok(command.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Shell;
    use crate::shell::{Invocation, RunError, RunOutput};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeRunner {
        results: RefCell<VecDeque<std::result::Result<RunOutput, RunError>>>,
        calls: RefCell<Vec<Invocation>>,
    }

    impl FakeRunner {
        fn returning(code: i32, stderr: &str) -> Self {
            let runner = Self::default();
            runner.results.borrow_mut().push_back(Ok(RunOutput {
                exit_code: Some(code),
                stdout: Vec::new(),
                stderr: stderr.as_bytes().to_vec(),
            }));
            runner
        }

        fn timing_out() -> Self {
            let runner = Self::default();
            runner.results.borrow_mut().push_back(Err(RunError::TimedOut));
            runner
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl CommandRunner for FakeRunner {
        async fn run(
            &self,
            invocation: &Invocation,
            _timeout: Duration,
        ) -> std::result::Result<RunOutput, RunError> {
            self.calls.borrow_mut().push(invocation.clone());
            self.results
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(RunOutput::default()))
        }
    }

    struct Fixture {
        home: TempDir,
        config: EngineConfig,
    }

    impl Fixture {
        fn new(history: &str) -> anyhow::Result<Self> {
            let home = TempDir::new()?;
            fs::write(home.path().join(".zsh_history"), history)?;
            let config = EngineConfig {
                shell: Shell::Zsh,
                os: "linux".to_string(),
                home_dir: Some(home.path().to_path_buf()),
                ..EngineConfig::default()
            };
            Ok(Self { home, config })
        }

        fn with_hook(mut self, command: &str, last_exit: &str) -> anyhow::Result<Self> {
            let path = self.home.path().join("aifix_last_cmd");
            fs::write(&path, format!("{command}\n"))?;
            self.config.hook = Some(HookSignal {
                command_file: path,
                last_exit: Some(last_exit.to_string()),
            });
            Ok(self)
        }
    }

    const HISTORY: &str = "\
: 1700000000:0;cd ~/app
: 1700000001:0;npm install
: 1700000002:0;npm start
: 1700000003:0;aifix
";

    fn captured(outcome: Outcome) -> ErrorContext {
        match outcome {
            Outcome::Captured(ctx) => ctx,
            other => panic!("Expected captured context, got {:?}", other),
        }
    }

    #[test]
    fn test_select_precedence() {
        let hook = HookSignal {
            command_file: PathBuf::from("/tmp/cmd"),
            last_exit: Some("2".to_string()),
        };
        assert_eq!(
            AcquisitionTier::select(Some("boom"), Some(&hook)),
            AcquisitionTier::Manual("boom".to_string())
        );
        assert_eq!(
            AcquisitionTier::select(None, Some(&hook)),
            AcquisitionTier::HookFile {
                path: PathBuf::from("/tmp/cmd"),
                last_exit_code: 2
            }
        );
        assert_eq!(
            AcquisitionTier::select(Some("   "), Some(&hook)),
            AcquisitionTier::HookFile {
                path: PathBuf::from("/tmp/cmd"),
                last_exit_code: 2
            }
        );
        assert_eq!(AcquisitionTier::select(None, None), AcquisitionTier::HistoryFallback);
    }

    #[test]
    fn test_select_hook_requires_nonzero_exit() {
        let hook = |code: Option<&str>| HookSignal {
            command_file: PathBuf::from("/tmp/cmd"),
            last_exit: code.map(str::to_string),
        };
        for code in [None, Some(""), Some("0"), Some(" 0 "), Some("00")] {
            assert_eq!(
                AcquisitionTier::select(None, Some(&hook(code))),
                AcquisitionTier::HistoryFallback,
                "exit code {:?}",
                code
            );
        }
        assert_eq!(
            AcquisitionTier::select(None, Some(&hook(Some("oops")))),
            AcquisitionTier::HookFile {
                path: PathBuf::from("/tmp/cmd"),
                last_exit_code: 1
            }
        );
    }

    #[tokio::test]
    async fn test_manual_error_input() -> anyhow::Result<()> {
        let acquirer = Acquirer::new(EngineConfig::default(), FakeRunner::default());
        let ctx = captured(acquirer.acquire(Some("Module not found: 'react-dom'")).await?);

        assert_eq!(ctx.command, "N/A (manual error input)");
        assert_eq!(ctx.error, "Module not found: 'react-dom'");
        assert!(ctx.recent_commands.is_empty());
        assert_eq!(acquirer.runner().call_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_manual_wins_over_hook() -> anyhow::Result<()> {
        let fx = Fixture::new(HISTORY)?.with_hook("npm start", "1")?;
        let acquirer = Acquirer::new(fx.config.clone(), FakeRunner::returning(1, "boom"));
        let ctx = captured(acquirer.acquire(Some("pasted error")).await?);

        assert_eq!(ctx.command, MANUAL_COMMAND);
        assert_eq!(ctx.error, "pasted error");
        assert_eq!(acquirer.runner().call_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_hook_tier_reproduces_hook_command() -> anyhow::Result<()> {
        let fx = Fixture::new(HISTORY)?.with_hook("npm start", "127")?;
        let acquirer = Acquirer::new(
            fx.config.clone(),
            FakeRunner::returning(1, "Error: Cannot find module 'react-dom'\n"),
        );
        let ctx = captured(acquirer.acquire(None).await?);

        assert_eq!(ctx.command, "npm start");
        assert_eq!(ctx.error, "Error: Cannot find module 'react-dom'\n");
        assert_eq!(ctx.exit_code, 127);
        assert_eq!(ctx.recent_commands, vec!["cd ~/app", "npm install"]);
        assert_eq!(ctx.shell, Shell::Zsh);

        let calls = acquirer.runner().calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "zsh");
        assert_eq!(calls[0].args, vec!["-i", "-c", "npm start"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_hook_tier_empty_file_is_fatal() -> anyhow::Result<()> {
        let fx = Fixture::new(HISTORY)?.with_hook("   ", "1")?;
        let acquirer = Acquirer::new(fx.config.clone(), FakeRunner::returning(1, "boom"));
        let err = acquirer.acquire(None).await;

        assert!(matches!(err, Err(AcquireError::HookFileUnreadable { .. })));
        assert_eq!(acquirer.runner().call_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_hook_tier_missing_file_does_not_fall_back() -> anyhow::Result<()> {
        let mut fx = Fixture::new(HISTORY)?;
        fx.config.hook = Some(HookSignal {
            command_file: fx.home.path().join("missing"),
            last_exit: Some("1".to_string()),
        });
        let acquirer = Acquirer::new(fx.config.clone(), FakeRunner::returning(1, "boom"));

        let err = acquirer.acquire(None).await;
        assert!(matches!(err, Err(AcquireError::HookFileUnreadable { .. })));
        assert_eq!(acquirer.runner().call_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_hook_tier_quiet_success_is_hard_failure() -> anyhow::Result<()> {
        let fx = Fixture::new(HISTORY)?.with_hook("npm start", "1")?;
        let acquirer = Acquirer::new(fx.config.clone(), FakeRunner::returning(0, ""));

        let err = acquirer.acquire(None).await;
        assert!(matches!(err, Err(AcquireError::NoErrorDetected { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_hook_tier_without_history_still_captures() -> anyhow::Result<()> {
        let mut fx = Fixture::new(HISTORY)?.with_hook("make", "2")?;
        fx.config.shell = Shell::Fish;
        let acquirer = Acquirer::new(fx.config.clone(), FakeRunner::returning(2, "make: *** No targets.  Stop.\n"));

        let ctx = captured(acquirer.acquire(None).await?);
        assert_eq!(ctx.command, "make");
        assert!(ctx.recent_commands.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_history_fallback() -> anyhow::Result<()> {
        let fx = Fixture::new(HISTORY)?;
        let acquirer = Acquirer::new(fx.config.clone(), FakeRunner::returning(1, "npm ERR! missing script: start\n"));
        let ctx = captured(acquirer.acquire(None).await?);

        assert_eq!(ctx.command, "npm start");
        assert_eq!(ctx.error, "npm ERR! missing script: start\n");
        assert_eq!(ctx.exit_code, 1);
        assert_eq!(ctx.recent_commands, vec!["cd ~/app", "npm install"]);
        assert!(!ctx.recent_commands.contains(&ctx.command));
        Ok(())
    }

    #[tokio::test]
    async fn test_history_fallback_truncates_error() -> anyhow::Result<()> {
        let fx = Fixture::new(HISTORY)?;
        let long = (1..=100).map(|i| format!("error {i}")).collect::<Vec<_>>().join("\n");
        let acquirer = Acquirer::new(fx.config.clone(), FakeRunner::returning(1, &long));
        let ctx = captured(acquirer.acquire(None).await?);

        assert!(ctx.error.contains("[60 lines omitted]"));
        assert!(ctx.error.starts_with("error 1\n"));
        assert!(ctx.error.ends_with("error 100"));
        Ok(())
    }

    #[tokio::test]
    async fn test_history_fallback_quiet_success_is_soft() -> anyhow::Result<()> {
        let fx = Fixture::new(HISTORY)?;
        let acquirer = Acquirer::new(fx.config.clone(), FakeRunner::returning(0, ""));
        let outcome = acquirer.acquire(None).await?;

        assert_eq!(
            outcome,
            Outcome::LastCommandSucceeded {
                command: "npm start".to_string()
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_history_fallback_timeout() -> anyhow::Result<()> {
        let fx = Fixture::new(HISTORY)?;
        let acquirer = Acquirer::new(fx.config.clone(), FakeRunner::timing_out());

        let err = acquirer.acquire(None).await;
        assert!(matches!(err, Err(AcquireError::ReproductionTimeout { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_history_only_self_invocations() -> anyhow::Result<()> {
        let fx = Fixture::new("aifix\nfix\naifix 'x'\n")?;
        let acquirer = Acquirer::new(fx.config.clone(), FakeRunner::default());

        let err = acquirer.acquire(None).await;
        assert!(matches!(err, Err(AcquireError::NoQualifyingCommand { .. })));
        assert_eq!(acquirer.runner().call_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_history_missing_home() {
        let config = EngineConfig {
            home_dir: None,
            ..EngineConfig::default()
        };
        let acquirer = Acquirer::new(config, FakeRunner::default());
        let err = acquirer.acquire(None).await;
        assert!(matches!(err, Err(AcquireError::HomeDirUnavailable)));
    }

    #[tokio::test]
    async fn test_history_file_missing_for_known_shell() -> anyhow::Result<()> {
        let mut fx = Fixture::new(HISTORY)?;
        fx.config.shell = Shell::Bash;
        let acquirer = Acquirer::new(fx.config.clone(), FakeRunner::default());

        let err = acquirer.acquire(None).await;
        assert!(matches!(err, Err(AcquireError::HistoryReadFailure { .. })));
        Ok(())
    }
}
