/*!
 * AISH CLI
 *
 * Interactive natural-language shell plus one-shot subcommands for
 * resolving input, checking commands and inspecting history and tables.
 */

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use aish_core::actions::{Action, ResolveError};
use aish_core::builtins::BuiltinRegistry;
use aish_core::config::AishConfig;
use aish_core::history_log::HistoryLog;
use aish_core::platform::detect_os;
use aish_core::resolver::Resolver;
use aish_core::safety;
use aish_core::session::{Session, Turn};
use aish_core::suggestions::FALLBACK_HINTS;
use aish_core::tables::CommandTables;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "AISH_LOG";
const PROMPT: &str = "aish> ";

#[derive(Parser)]
#[command(name = "aish")]
#[command(about = "AISH - natural-language command shell", long_about = None, version)]
struct Cli {
    /// Pattern table (JSON or YAML)
    #[arg(long, global = true)]
    patterns: Option<PathBuf>,

    /// Command table (JSON or YAML)
    #[arg(long, global = true)]
    commands: Option<PathBuf>,

    /// Config file (default: $AISH_CONFIG or ~/.aish/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive shell (default)
    Repl,

    /// Print the action for some input without running it
    Resolve {
        /// Input text
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,

        /// OS id to resolve for (linux, darwin, windows, ...)
        #[arg(long)]
        os: Option<String>,

        /// Emit the action as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the safety checker on a command
    Check {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Show persisted history, newest first
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show table sizes and validation issues
    Tables,
}

fn main() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = AishConfig::load(cli.config.as_deref())?;
    if cli.patterns.is_some() {
        config.patterns_path = cli.patterns;
    }
    if cli.commands.is_some() {
        config.commands_path = cli.commands;
    }

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => repl(&config),
        Commands::Resolve { text, os, json } => resolve(&config, &text.join(" "), os, json),
        Commands::Check { command } => Ok(check(&command.join(" "))),
        Commands::History { limit } => history(&config, limit),
        Commands::Tables => tables(&config),
    }
}

fn load_tables(config: &AishConfig) -> Result<CommandTables> {
    CommandTables::load(config.patterns_path.as_deref(), config.commands_path.as_deref())
}

fn resolve(config: &AishConfig, text: &str, os: Option<String>, json: bool) -> Result<i32> {
    let tables = load_tables(config)?;
    let builtins = BuiltinRegistry::with_defaults();
    let os = os
        .or_else(|| config.os.clone())
        .unwrap_or_else(detect_os);

    let resolution = match Resolver::new(&tables, &builtins, &os)
        .with_options(config.resolve_options())
        .resolve(text)
    {
        Ok(resolution) => resolution,
        Err(ResolveError::NoActionableInput) => {
            eprintln!("{}", ResolveError::NoActionableInput);
            return Ok(2);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution.action)?);
    } else {
        println!("{}  [{:?}]", resolution.action.describe(), resolution.tier);
    }
    Ok(0)
}

fn check(command: &str) -> i32 {
    let report = safety::check(command);
    println!("{}", report);
    if report.is_safe() {
        0
    } else {
        1
    }
}

fn history(config: &AishConfig, limit: usize) -> Result<i32> {
    let rt = Runtime::new()?;
    let log = HistoryLog::new(&config.history_path, config.history_limit);
    let records = rt.block_on(log.recent(limit))?;

    if records.is_empty() {
        println!("No history yet. Run some commands first!");
    }
    for record in records {
        println!(
            "{}  [{}]  {}",
            record.time.format("%Y-%m-%d %H:%M:%S"),
            record.exit_code,
            record.command
        );
    }
    Ok(0)
}

fn tables(config: &AishConfig) -> Result<i32> {
    let tables = load_tables(config)?;
    let builtins = BuiltinRegistry::with_defaults();

    println!("patterns: {}", tables.patterns.len());
    println!("commands: {}", tables.commands.len());
    println!("builtins: {}", builtins.len());
    for (name, summary) in builtins.list() {
        println!("  {:<10} {}", name, summary);
    }

    let issues = tables.validate(&builtins);
    if issues.is_empty() {
        println!("no issues");
    } else {
        println!("issues: {}", issues.len());
        for issue in &issues {
            println!("  {}", issue);
        }
    }
    Ok(0)
}

fn repl(config: &AishConfig) -> Result<i32> {
    let rt = Runtime::new()?;
    let session = Session::from_config(config)?;
    tracing::info!(session = %session.id(), os = session.os(), "repl started");

    println!("AISH - type 'help' for options, 'exit' to quit");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}", PROMPT);
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line.context("Failed to read input")?,
            None => break,
        };
        let input = line.trim();

        match input.to_lowercase().as_str() {
            "exit" | "quit" => break,
            "help" | "?" => {
                print_help(&session);
                continue;
            }
            "history" => {
                print_history(&rt, &session)?;
                continue;
            }
            _ => {}
        }

        let plan = match session.plan(input) {
            Ok(plan) => plan,
            Err(ResolveError::NoActionableInput) => {
                println!("Please enter a command. Type 'help' for options.");
                continue;
            }
        };

        if plan.rule.is_some() {
            println!("→ {}", plan.expanded);
        }

        if config.confirm_dangerous {
            if let Some(report) = plan.safety().filter(|r| r.needs_confirmation()) {
                println!("{}", report);
                if !confirm(&mut lines)? {
                    println!("Cancelled.");
                    continue;
                }
            }
        }

        let turn = rt.block_on(session.execute(plan))?;
        print_turn(&turn);
    }

    Ok(0)
}

fn confirm(lines: &mut impl Iterator<Item = io::Result<String>>) -> Result<bool> {
    print!("Run anyway? [y/N] ");
    io::stdout().flush()?;
    let answer = match lines.next() {
        Some(line) => line.context("Failed to read input")?,
        None => return Ok(false),
    };
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_turn(turn: &Turn) {
    if turn.cleared {
        print!("\x1b[2J\x1b[H");
        let _ = io::stdout().flush();
        return;
    }

    match &turn.outcome {
        Some(outcome) => {
            if !outcome.stdout.is_empty() {
                print!("{}", outcome.stdout);
                if !outcome.stdout.ends_with('\n') {
                    println!();
                }
            }
            if !outcome.stderr.is_empty() {
                eprint!("{}", outcome.stderr);
                if !outcome.stderr.ends_with('\n') {
                    eprintln!();
                }
            }
            if !outcome.success() {
                println!("Exit code: {}", outcome.exit_code);
            }
        }
        None if turn.plan.action() == &Action::NoMatch => {
            println!("No matching command: {}", turn.plan.input);
        }
        None => {}
    }

    if turn.success() {
        return;
    }
    println!("Suggestions:");
    if turn.suggestions.is_empty() {
        for hint in FALLBACK_HINTS {
            println!("  • {}", hint);
        }
    }
    for (i, suggestion) in turn.suggestions.iter().enumerate() {
        println!("  {}. {}", i + 1, suggestion);
    }
}

fn print_help(session: &Session) {
    println!("Type what you want in plain words, or a command.");
    println!();
    println!("Examples:");
    for (phrase, key) in session.tables().patterns.iter().take(5) {
        println!("  {:<28} → {}", phrase, key);
    }
    println!();
    println!("Built-in commands:");
    for (name, summary) in session.builtins().list() {
        println!("  {:<10} {}", name, summary);
    }
    println!();
    println!("References: again, 2 commands ago, delete them, kill it, list there,");
    println!("            with details, sort by size, now in <dir>");
    println!("Meta: help, history, clear, exit");
}

fn print_history(rt: &Runtime, session: &Session) -> Result<()> {
    let Some(log) = session.history() else {
        return Ok(());
    };
    let records = rt.block_on(log.recent(20))?;
    if records.is_empty() {
        println!("No history yet. Run some commands first!");
    }
    for record in records {
        println!("  [{}] {}", record.exit_code, record.command);
    }
    Ok(())
}
