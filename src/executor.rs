//! executor - runs resolved actions
//! - shell actions go through `sh -c` or `cmd /C` with a timeout
//! - builtin actions go through the registry
//! - returns normalized outcomes; failures become non-zero exit codes

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::actions::Action;
use crate::builtins::BuiltinRegistry;
use crate::platform::OsFamily;

/// Exit code reported when a command could not be started or timed out
pub const EXEC_FAILURE: i32 = 127;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOpts {
    pub cwd: Option<PathBuf>,
    pub timeout_ms: u64,
}

impl Default for ExecOpts {
    fn default() -> Self {
        Self {
            cwd: None,
            timeout_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Output worth remembering as `last_output`: stdout, else stderr
    pub fn result_text(&self) -> Option<String> {
        let out = self.stdout.trim();
        let text = if out.is_empty() { self.stderr.trim() } else { out };
        (!text.is_empty()).then(|| text.to_string())
    }

    fn failed(message: String) -> Self {
        Self {
            exit_code: EXEC_FAILURE,
            stdout: String::new(),
            stderr: message,
            timed_out: false,
        }
    }
}

/// Run a command line in the platform shell
pub async fn run_shell(command_line: &str, family: OsFamily, opts: &ExecOpts) -> Result<ExecOutcome> {
    let (program, flag) = family.shell();
    let cwd = opts
        .cwd
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default();

    let mut cmd = Command::new(program);
    cmd.arg(flag)
        .arg(command_line)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(command = %command_line, error = %e, "failed to spawn shell");
            return Ok(ExecOutcome::failed(e.to_string()));
        }
    };

    let waited = timeout(Duration::from_millis(opts.timeout_ms), child.wait_with_output()).await;

    match waited {
        Ok(Ok(output)) => Ok(ExecOutcome {
            exit_code: output.status.code().unwrap_or(EXEC_FAILURE),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            timed_out: false,
        }),
        Ok(Err(e)) => Ok(ExecOutcome::failed(e.to_string())),
        Err(_) => {
            tracing::warn!(command = %command_line, timeout_ms = opts.timeout_ms, "command timed out");
            Ok(ExecOutcome {
                timed_out: true,
                ..ExecOutcome::failed("Timeout exceeded".to_string())
            })
        }
    }
}

/// Run a builtin; handler errors become a failed outcome
pub fn run_builtin(registry: &BuiltinRegistry, name: &str, args: &[String]) -> ExecOutcome {
    match registry.invoke(name, args) {
        Ok(out) => ExecOutcome {
            exit_code: out.exit_code,
            stdout: out.output,
            stderr: String::new(),
            timed_out: false,
        },
        Err(e) => ExecOutcome {
            exit_code: 1,
            stdout: String::new(),
            stderr: e.to_string(),
            timed_out: false,
        },
    }
}

/// Execute any action; `NoMatch` yields `None`
pub async fn execute(
    action: &Action,
    registry: &BuiltinRegistry,
    family: OsFamily,
    opts: &ExecOpts,
) -> Result<Option<ExecOutcome>> {
    match action {
        Action::Builtin { name, args } => Ok(Some(run_builtin(registry, name, args))),
        Action::Shell { command_line } => run_shell(command_line, family, opts).await.map(Some),
        Action::NoMatch => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::BuiltinOutput;

    #[test]
    fn test_result_text_prefers_stdout() {
        let outcome = ExecOutcome {
            exit_code: 0,
            stdout: " hi \n".into(),
            stderr: "warn".into(),
            timed_out: false,
        };
        assert_eq!(outcome.result_text().as_deref(), Some("hi"));

        let outcome = ExecOutcome {
            stdout: String::new(),
            ..outcome
        };
        assert_eq!(outcome.result_text().as_deref(), Some("warn"));
        assert_eq!(ExecOutcome::default().result_text(), None);
    }

    #[test]
    fn test_run_builtin() {
        let mut registry = BuiltinRegistry::new();
        registry.register("fail", "Always fails", |_| anyhow::bail!("boom"));
        registry.register("count", "Count args", |args| {
            Ok(BuiltinOutput::ok(args.len().to_string()))
        });

        let ok = run_builtin(&registry, "count", &["a".into(), "b".into()]);
        assert!(ok.success());
        assert_eq!(ok.stdout, "2");

        let err = run_builtin(&registry, "fail", &[]);
        assert_eq!(err.exit_code, 1);
        assert_eq!(err.stderr, "boom");
    }

    #[tokio::test]
    async fn test_no_match_is_not_executed() {
        let registry = BuiltinRegistry::new();
        let outcome = execute(&Action::NoMatch, &registry, OsFamily::Posix, &ExecOpts::default())
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_shell_captures_output() {
        let outcome = run_shell("echo hello && echo oops 1>&2", OsFamily::Posix, &ExecOpts::default())
            .await
            .unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.stdout.trim(), "hello");
        assert_eq!(outcome.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_shell_exit_code_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ExecOpts {
            cwd: Some(dir.path().to_path_buf()),
            ..ExecOpts::default()
        };
        let outcome = run_shell("pwd; exit 3", OsFamily::Posix, &opts).await.unwrap();
        assert_eq!(outcome.exit_code, 3);
        let reported = PathBuf::from(outcome.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_shell_timeout() {
        let opts = ExecOpts {
            cwd: None,
            timeout_ms: 100,
        };
        let outcome = run_shell("sleep 5", OsFamily::Posix, &opts).await.unwrap();
        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, EXEC_FAILURE);
    }
}
