//! One interactive turn
//!
//! Input goes through reference resolution and the tiered resolver to give a
//! `Plan`. Executing a plan runs the action, then records the command in the
//! session context and the persisted history. Planning never executes
//! anything, so the host can inspect a plan (safety check, confirmation)
//! before running it.

use anyhow::Result;
use serde::Serialize;
use uuid::Uuid;

use crate::actions::{Action, Resolution, ResolveError};
use crate::builtins::BuiltinRegistry;
use crate::config::AishConfig;
use crate::context::SharedContext;
use crate::entities;
use crate::executor::{self, ExecOpts, ExecOutcome};
use crate::history_log::{HistoryLog, HistoryRecord};
use crate::platform::{detect_os, OsFamily};
use crate::references::{self, ReferenceRule};
use crate::resolver::{ResolveOptions, Resolver};
use crate::safety::{self, SafetyReport};
use crate::suggestions::{suggest, Suggestion};
use crate::tables::CommandTables;

const CLEAR_COMMANDS: [&str; 2] = ["clear", "cls"];

/// A resolved but not yet executed turn
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Plan {
    pub input: String,
    /// Input after reference resolution
    pub expanded: String,
    pub rule: Option<ReferenceRule>,
    pub resolution: Resolution,
}

impl Plan {
    pub fn action(&self) -> &Action {
        &self.resolution.action
    }

    /// What actually runs: the command line, or the builtin call
    pub fn command_text(&self) -> Option<String> {
        match self.action() {
            Action::Shell { command_line } => Some(command_line.clone()),
            Action::Builtin { name, args } if args.is_empty() => Some(name.clone()),
            Action::Builtin { name, args } => Some(format!("{} {}", name, args.join(" "))),
            Action::NoMatch => None,
        }
    }

    /// Safety report for shell actions
    pub fn safety(&self) -> Option<SafetyReport> {
        match self.action() {
            Action::Shell { command_line } => Some(safety::check(command_line)),
            _ => None,
        }
    }

    fn is_clear(&self) -> bool {
        match self.action() {
            Action::Shell { command_line } => CLEAR_COMMANDS
                .iter()
                .any(|c| command_line.eq_ignore_ascii_case(c)),
            _ => false,
        }
    }
}

/// Result of executing a plan
#[derive(Clone, Debug, Serialize)]
pub struct Turn {
    pub plan: Plan,
    /// `None` when nothing ran
    pub outcome: Option<ExecOutcome>,
    /// The host should clear its screen
    pub cleared: bool,
    pub suggestions: Vec<Suggestion>,
}

impl Turn {
    pub fn success(&self) -> bool {
        self.outcome.as_ref().map(ExecOutcome::success).unwrap_or(false) || self.cleared
    }
}

pub struct Session {
    id: Uuid,
    tables: CommandTables,
    builtins: BuiltinRegistry,
    context: SharedContext,
    history: Option<HistoryLog>,
    os: String,
    options: ResolveOptions,
    exec: ExecOpts,
}

impl Session {
    pub fn new(tables: CommandTables, builtins: BuiltinRegistry, os: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            tables,
            builtins,
            context: SharedContext::new(),
            history: None,
            os: os.to_lowercase(),
            options: ResolveOptions::default(),
            exec: ExecOpts::default(),
        }
    }

    /// Build a session from configuration: tables, default builtins, history
    pub fn from_config(config: &AishConfig) -> Result<Self> {
        let tables = CommandTables::load(
            config.patterns_path.as_deref(),
            config.commands_path.as_deref(),
        )?;
        let builtins = BuiltinRegistry::with_defaults();
        for issue in tables.validate(&builtins) {
            tracing::warn!(%issue, "command table issue");
        }

        let os = config.os.clone().unwrap_or_else(detect_os);
        Ok(Self::new(tables, builtins, &os)
            .with_options(config.resolve_options())
            .with_exec_opts(ExecOpts {
                cwd: None,
                timeout_ms: config.exec_timeout_ms,
            })
            .with_history(HistoryLog::new(&config.history_path, config.history_limit)))
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_exec_opts(mut self, exec: ExecOpts) -> Self {
        self.exec = exec;
        self
    }

    pub fn with_history(mut self, history: HistoryLog) -> Self {
        self.history = Some(history);
        self
    }

    /// Share context with another session
    pub fn with_context(mut self, context: SharedContext) -> Self {
        self.context = context;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn tables(&self) -> &CommandTables {
        &self.tables
    }

    pub fn builtins(&self) -> &BuiltinRegistry {
        &self.builtins
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn history(&self) -> Option<&HistoryLog> {
        self.history.as_ref()
    }

    /// Reference resolution followed by the tiered resolver
    pub fn plan(&self, input: &str) -> Result<Plan, ResolveError> {
        let expansion = self
            .context
            .read(|store| references::expand(input, store, &self.os));
        if let Some(rule) = expansion.rule {
            tracing::debug!(input, expanded = %expansion.text, ?rule, "reference expanded");
        }

        let resolution = Resolver::new(&self.tables, &self.builtins, &self.os)
            .with_options(self.options.clone())
            .resolve(&expansion.text)?;

        Ok(Plan {
            input: input.to_string(),
            expanded: expansion.text,
            rule: expansion.rule,
            resolution,
        })
    }

    /// Run a plan and record it
    pub async fn execute(&self, plan: Plan) -> Result<Turn> {
        if plan.is_clear() {
            return Ok(Turn {
                plan,
                outcome: None,
                cleared: true,
                suggestions: Vec::new(),
            });
        }

        let family = OsFamily::from_os_id(&self.os);
        let outcome = executor::execute(plan.action(), &self.builtins, family, &self.exec).await?;

        let (outcome, command) = match (outcome, plan.command_text()) {
            (Some(outcome), Some(command)) => (outcome, command),
            _ => {
                tracing::info!(session = %self.id, input = %plan.input, "no match");
                let suggestions = suggest(&plan.expanded, &self.tables, &self.builtins);
                return Ok(Turn {
                    plan,
                    outcome: None,
                    cleared: false,
                    suggestions,
                });
            }
        };

        self.record(&plan.expanded, &command, &outcome).await;

        tracing::info!(
            session = %self.id,
            command = %command,
            tier = ?plan.resolution.tier,
            exit_code = outcome.exit_code,
            "command executed"
        );

        let suggestions = if outcome.success() {
            Vec::new()
        } else {
            suggest(&plan.expanded, &self.tables, &self.builtins)
        };

        Ok(Turn {
            plan,
            outcome: Some(outcome),
            cleared: false,
            suggestions,
        })
    }

    /// Plan and execute in one step
    pub async fn run(&self, input: &str) -> Result<Turn> {
        let plan = self.plan(input)?;
        self.execute(plan).await
    }

    /// History keeps the expanded input; entities come from the executed command
    async fn record(&self, typed: &str, executed: &str, outcome: &ExecOutcome) {
        let result = outcome.result_text();
        let family = OsFamily::from_os_id(&self.os);
        let extraction = entities::extract(executed, result.as_deref(), family);
        self.context.append(
            typed,
            result,
            extraction.kind,
            extraction.entities,
            outcome.exit_code,
        );

        if let Some(log) = &self.history {
            let record = HistoryRecord::new(
                typed,
                outcome.exit_code,
                &outcome.stdout,
                Some(self.id.to_string()),
            );
            if let Err(e) = log.append(record).await {
                tracing::warn!(path = %log.path().display(), error = %e, "failed to persist history");
            }
        }
    }
}
