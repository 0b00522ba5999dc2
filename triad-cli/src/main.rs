//! # Triad CLI
//!
//! Command-line interface for the planner -> context -> coder chain.
//!
//! Usage:
//!   triad [GOAL]...
//!   triad run [GOAL]...
//!   triad memory [--limit N]
//!
//! Examples:
//!   triad "Build a CLI that renames photos by EXIF date"
//!   triad --provider openai --model gpt-4o-mini run "Write a port scanner"
//!   triad memory --limit 3

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use triad_agent::{SessionController, StageError};
use triad_core::{
    AgentRole, AnyProvider, InteractionLog, InteractionRecord, LlmProvider, PromptRunner,
    ProviderConfig, ProviderType, SessionState, DEFAULT_DB_PATH, DEFAULT_GOAL,
    DEFAULT_RECENT_LIMIT,
};

#[derive(Parser)]
#[command(name = "triad")]
#[command(author, version, about = "Triad - planner, context and coder agents in a row")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Goal to run (when not using subcommands); put `--` before a goal
    /// that starts with a dash
    goal: Vec<String>,

    /// SQLite file holding the interaction log
    #[arg(long, global = true, env = "TRIAD_DB", default_value = DEFAULT_DB_PATH)]
    db: PathBuf,

    /// Model API to use: gemini or openai
    #[arg(short, long, global = true, env = "TRIAD_PROVIDER", default_value = "gemini")]
    provider: String,

    /// Model name (provider default when omitted)
    #[arg(short, long, global = true, env = "TRIAD_MODEL")]
    model: Option<String>,

    /// Request timeout in seconds (no timeout when omitted)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show results
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the three agents for a goal
    Run {
        /// The goal description
        goal: Vec<String>,
    },
    /// Show the most recent agent replies
    Memory {
        /// How many records to show
        #[arg(short = 'n', long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_filter = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        // prefix match: covers triad_core and triad_agent too
        (false, 1) => "warn,triad=info",
        _ => "warn,triad=debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn goal_or_default(words: &[String]) -> String {
    let goal = words.join(" ");
    if goal.trim().is_empty() {
        DEFAULT_GOAL.to_string()
    } else {
        goal
    }
}

fn open_log(cli: &Cli) -> InteractionLog {
    match InteractionLog::open(&cli.db) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Failed to open memory at {}: {}", cli.db.display(), e);
            std::process::exit(1);
        }
    }
}

fn build_provider(cli: &Cli) -> triad_core::Result<AnyProvider> {
    let provider_type: ProviderType = cli.provider.parse()?;
    let mut config = ProviderConfig::from_env(provider_type)?;
    if let Some(model) = &cli.model {
        config = config.with_model(model);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(secs);
    }
    AnyProvider::from_config(config)
}

/// Plan / Context / Code sections for whatever stages have finished
fn render_state(state: &SessionState) -> String {
    let mut out = String::new();
    for (title, agent) in [
        ("Plan", AgentRole::Planner),
        ("Context", AgentRole::Context),
        ("Code", AgentRole::Coder),
    ] {
        if let Some(text) = state.output_of(agent) {
            out.push_str(&format!("\n--- {} ---\n\n{}\n", title, text));
        }
    }
    out
}

fn render_record(record: &InteractionRecord) -> String {
    format!(
        "{} @ {}\nGoal: {}\n\n{}\n",
        record.agent,
        record.display_timestamp(),
        record.goal,
        record.output
    )
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: could not encode JSON: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_goal(cli: &Cli, goal: &str) {
    let provider = match build_provider(cli) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let log = open_log(cli);

    if !cli.quiet {
        eprintln!("Goal: {}", goal);
        let model = cli.model.as_deref().unwrap_or(provider.default_model());
        eprintln!("Provider: {} ({})\n", provider.name(), model);
    }

    let mut runner = PromptRunner::new(provider);
    if let Some(model) = &cli.model {
        runner = runner.with_model(model);
    }

    let quiet = cli.quiet;
    let mut controller = SessionController::new(runner, log).with_progress_callback(move |agent| {
        if !quiet {
            eprintln!("{}", agent.progress_label());
        }
    });

    let outcome = controller.run(goal).await;

    if cli.verbose > 0 {
        let usage = controller.runner().usage();
        eprintln!(
            "\nToken usage: {} calls, {} prompt + {} completion tokens",
            usage.total_calls, usage.total_prompt_tokens, usage.total_completion_tokens
        );
    }

    match outcome {
        Ok(state) => {
            if cli.json {
                print_json(&state);
            } else {
                print!("{}", render_state(&state));
            }
        }
        Err(StageError { stage, state, error }) => {
            if cli.json {
                print_json(&state);
            } else {
                print!("{}", render_state(&state));
            }
            match stage {
                Some(agent) => eprintln!("\n{} failed: {}", agent, error),
                None => eprintln!("\nError: {}", error),
            }
            if error.is_retryable() {
                eprintln!("(this may succeed if you try again later)");
            }
            std::process::exit(1);
        }
    }
}

fn load_memory(cli: &Cli, limit: usize) {
    let log = open_log(cli);
    let records = match log.recent(limit) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.json {
        print_json(&records);
        return;
    }

    if records.is_empty() {
        println!("(memory is empty)");
        return;
    }

    for record in &records {
        println!("{}", render_record(record));
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match &cli.command {
        Some(Commands::Memory { limit }) => load_memory(&cli, *limit),
        Some(Commands::Run { goal }) => {
            let goal = goal_or_default(goal);
            run_goal(&cli, &goal).await;
        }
        None => {
            // Default: treat remaining args as the goal
            let goal = goal_or_default(&cli.goal);
            run_goal(&cli, &goal).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_goal_defaults_when_missing() {
        assert_eq!(goal_or_default(&[]), DEFAULT_GOAL);
        assert_eq!(goal_or_default(&["  ".to_string()]), DEFAULT_GOAL);
        assert_eq!(
            goal_or_default(&["build".to_string(), "X".to_string()]),
            "build X"
        );
    }

    #[test]
    fn test_render_partial_state() {
        let state = SessionState::new("g").with_output(AgentRole::Planner, "1. do it");
        let text = render_state(&state);

        assert!(text.contains("--- Plan ---\n\n1. do it\n"));
        assert!(!text.contains("--- Context ---"));
        assert!(!text.contains("--- Code ---"));
    }

    #[test]
    fn test_render_record_truncates_timestamp() {
        let record = InteractionRecord {
            id: 1,
            agent: AgentRole::Coder,
            goal: "build X".into(),
            output: "print('x')".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 12).unwrap().fixed_offset(),
        };

        let text = render_record(&record);
        assert!(text.starts_with("CoderAgent @ 2024-05-01T09:30:12\n"));
        assert!(text.contains("Goal: build X"));
        assert!(text.ends_with("print('x')\n"));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["triad", "memory", "-n", "3"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Memory { limit: 3 })));

        let cli = Cli::try_parse_from(["triad", "--provider", "openai", "build", "X"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.provider, "openai");
        assert_eq!(goal_or_default(&cli.goal), "build X");
    }

    #[test]
    fn test_flags_after_goal_are_parsed() {
        let cli = Cli::try_parse_from(["triad", "run", "build", "X", "--json", "-v"]).unwrap();
        match cli.command {
            Some(Commands::Run { goal }) => assert_eq!(goal, vec!["build", "X"]),
            _ => panic!("expected run subcommand"),
        }
        assert!(cli.json);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::try_parse_from(["triad", "build", "X", "--db", "other.db", "-q"]).unwrap();
        assert_eq!(cli.goal, vec!["build", "X"]);
        assert_eq!(cli.db, PathBuf::from("other.db"));
        assert!(cli.quiet);
    }

    #[test]
    fn test_dashed_goal_after_separator() {
        let cli = Cli::try_parse_from(["triad", "run", "--json", "--", "-x", "marks", "the spot"])
            .unwrap();
        match cli.command {
            Some(Commands::Run { goal }) => assert_eq!(goal_or_default(&goal), "-x marks the spot"),
            _ => panic!("expected run subcommand"),
        }
        assert!(cli.json);
    }
}
