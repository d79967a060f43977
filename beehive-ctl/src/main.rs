//! `beehive-ctl` — the beekeeper-facing CLI (§6).
//!
//! Every subcommand opens a short-lived [`hive::Hive`] against the
//! configured store and exits with the mapping in §6/§7: 0 success, 1
//! generic error, 2 precondition violation, 3 external dependency failure.

mod cli_config;
mod commands;
mod hive;
mod output;

use std::path::PathBuf;

use beehive_shared::errors::BeehiveError;
use beehive_shared::BeehiveConfig;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "beehive-ctl", version, about = "Beekeeper CLI for the hive coordination substrate", styles = output::clap_styles())]
struct Cli {
    /// Path to a BeehiveConfig TOML file (layered under env vars and CLI flags).
    #[arg(long, global = true, env = "BEEHIVE_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Path to the session spec (`hive/session.toml`) used by `init`/`daemon start`.
    #[arg(long, global = true, env = "BEEHIVE_SESSION_CONFIG")]
    session_config: Option<PathBuf>,

    /// Override `db_path` from the loaded config.
    #[arg(long, global = true, env = "BEEHIVE_DB_PATH")]
    db: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the multiplexer session, spawn bees, inject roles.
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Reinject role prompts into one bee or every bee.
    InjectRoles {
        bee: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Create a task assigned to the queen and notify via the Message Bus.
    StartTask { text: String },
    /// Task Engine operations.
    Task {
        #[command(subcommand)]
        cmd: TaskCommands,
    },
    /// Print bee liveness and task counts.
    Status,
    /// Read recent pane output.
    Logs {
        bee: Option<String>,
        #[arg(long, default_value_t = 50)]
        lines: u32,
    },
    /// Hand off to the multiplexer's attach.
    Attach,
    /// Force an immediate role reminder sweep.
    Remind {
        #[arg(long)]
        bee: Option<String>,
    },
    /// Manage the Supervisor process.
    Daemon {
        #[command(subcommand)]
        cmd: DaemonCommand,
    },
    /// Graceful shutdown with interactive confirmation.
    Stop,
    /// Internal entry point: re-exec target for `daemon start` — runs the
    /// Supervisor tick loop in the foreground until terminated. Hidden
    /// because beekeepers never invoke it directly.
    #[command(hide = true, name = "__supervisor")]
    Supervisor,
}

#[derive(Debug, Subcommand)]
enum DaemonCommand {
    Start,
    Stop,
    Status,
    Restart,
    Remind,
    Logs {
        #[arg(default_value_t = 100)]
        n: usize,
    },
}

#[derive(Debug, Subcommand)]
enum TaskCommands {
    /// List tasks, optionally filtered.
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Show a task's status, assignee, and recent activity.
    Details { task_id: String },
    /// Create a task.
    Create {
        title: String,
        description: String,
        #[arg(long, default_value = "medium")]
        priority: String,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long = "depends-on")]
        dependencies: Vec<String>,
        #[arg(long = "requires")]
        requirements: Vec<String>,
    },
    /// Assign a task to a bee.
    Assign {
        task_id: String,
        assignee: String,
        #[arg(long, default_value = "primary")]
        role: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Transition a task's status.
    Status {
        task_id: String,
        status: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Send a message through the Message Bus (the sanctioned bee-reply path).
    Message {
        #[arg(long)]
        task_id: Option<String>,
        from: String,
        to: String,
        #[arg(long = "type", default_value = "conversation")]
        message_type: String,
        #[arg(long)]
        subject: Option<String>,
        content: String,
    },
    /// Aggregate task counts per status and assignee.
    Stats,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(format!(
            "beehive={filter},{filter}"
        )))
        .init();

    let exit_code = run(cli).await;
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> i32 {
    let mut config = match BeehiveConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            output::error(format!("failed to load configuration: {e}"));
            return 1;
        }
    };
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }

    let result = match cli.command {
        Command::Init { force } => commands::handle_init(config, cli.session_config.as_deref(), force).await,
        Command::InjectRoles { bee, all } => {
            commands::handle_inject_roles(config, cli.session_config.as_deref(), bee, all).await
        }
        Command::StartTask { text } => commands::handle_start_task(config, text).await,
        Command::Task { cmd } => commands::handle_task_command(config, cmd).await,
        Command::Status => commands::handle_status(config).await,
        Command::Logs { bee, lines } => commands::handle_logs(config, bee, lines).await,
        Command::Attach => commands::handle_attach(config).await,
        Command::Remind { bee } => commands::handle_remind(config, bee).await,
        Command::Daemon { cmd } => commands::handle_daemon_command(config, cmd).await,
        Command::Stop => commands::handle_stop(config).await,
        Command::Supervisor => commands::daemon::run_supervisor_foreground(config).await,
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            output::error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<BeehiveError>()
        .map(BeehiveError::exit_code)
        .unwrap_or(1)
}
