//! Workspace materializer CLI.
//!
//! Drives a generation session against the builder backend and materializes
//! the resulting project into a local directory, or replays saved model
//! replies offline.

use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use materializer::builder::Builder;
use materializer::core::decoder::{ArtifactDecoder, StepDecoder};
use materializer::core::integrator::{IntegrationError, integrate};
use materializer::core::invariants::validate_invariants;
use materializer::core::projector::project;
use materializer::core::rate_limit::RateLimitState;
use materializer::core::types::{Step, StepStatus};
use materializer::exit_codes;
use materializer::io::backend::HttpBackend;
use materializer::io::config::{CONFIG_FILE, MaterializerConfig, load_config, write_config};
use materializer::io::mount::{DirectoryMount, Mount};
use materializer::logging;
use materializer::session::SessionError;
use materializer::tree::WorkspaceTree;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "materializer",
    version,
    about = "Materialize model-generated build plans into a workspace"
)]
struct Cli {
    /// Config file (defaults to `materializer.toml` in the working directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a session for a prompt, then read follow-up messages from stdin.
    Build {
        /// Initial project prompt.
        #[arg(short, long)]
        prompt: String,
        /// Directory to materialize into (overrides `mount.root`).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Materialize a saved model reply without contacting the backend.
    Replay {
        /// File containing the raw model reply.
        reply: PathBuf,
        /// Directory to materialize into (overrides `mount.root`).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the mount descriptor for a saved model reply.
    Project {
        /// File containing the raw model reply.
        reply: PathBuf,
    },
    /// Write a default config file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    match cli.command {
        Command::Build { prompt, out } => cmd_build(&config_path, &prompt, out),
        Command::Replay { reply, out } => cmd_replay(&config_path, &reply, out),
        Command::Project { reply } => cmd_project(&reply),
        Command::InitConfig { force } => cmd_init_config(&config_path, force),
    }
}

fn cmd_build(config_path: &Path, prompt: &str, out: Option<PathBuf>) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let backend = HttpBackend::new(
        &cfg.backend.url,
        Duration::from_secs(cfg.backend.timeout_secs),
    );
    let mount = DirectoryMount::new(out.unwrap_or_else(|| cfg.mount.root.clone()));
    info!(root = %mount.root().display(), url = %cfg.backend.url, "starting build session");
    let mut builder =
        Builder::with_defaults(backend, mount, cfg.rate_limit.default_retry_after_secs);

    match builder.start(prompt) {
        Ok(conflicts) => {
            print_conflicts(&conflicts);
            print_steps(builder.steps());
        }
        Err(err @ SessionError::Throttled { .. }) => {
            eprintln!("{err}");
            return Ok(exit_codes::LIMITED);
        }
        Err(err) => bail!("start session: {err}"),
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("read follow-up from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let before = builder.steps().len();
        match builder.submit_follow_up(&line) {
            Ok(conflicts) => {
                print_conflicts(&conflicts);
                print_steps(&builder.steps()[before..]);
            }
            Err(err) => eprintln!("{err}"),
        }
    }

    if let RateLimitState::Limited { remaining_secs } = builder.rate_limit() {
        eprintln!("rate limited: retry in {remaining_secs}s");
        return Ok(exit_codes::LIMITED);
    }
    Ok(exit_code_for(builder.steps()))
}

fn cmd_replay(config_path: &Path, reply_path: &Path, out: Option<PathBuf>) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let steps = decode_reply(reply_path)?;
    let mount = DirectoryMount::new(out.unwrap_or(cfg.mount.root));

    let integration = integrate(&WorkspaceTree::new(), &steps);
    print_conflicts(&integration.conflicts);
    check_tree(&integration.tree)?;
    if !integration.tree.is_empty() {
        mount
            .mount(&project(&integration.tree))
            .with_context(|| format!("mount into {}", mount.root().display()))?;
    }
    print_steps(&integration.steps);
    Ok(exit_code_for(&integration.steps))
}

fn cmd_project(reply_path: &Path) -> Result<i32> {
    let steps = decode_reply(reply_path)?;
    let integration = integrate(&WorkspaceTree::new(), &steps);
    print_conflicts(&integration.conflicts);
    check_tree(&integration.tree)?;
    let payload =
        serde_json::to_string_pretty(&project(&integration.tree)).context("serialize descriptor")?;
    println!("{payload}");
    Ok(exit_code_for(&integration.steps))
}

fn cmd_init_config(config_path: &Path, force: bool) -> Result<i32> {
    if !force && config_path.exists() {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    write_config(config_path, &MaterializerConfig::default())
        .with_context(|| format!("write {}", config_path.display()))?;
    Ok(exit_codes::OK)
}

fn decode_reply(path: &Path) -> Result<Vec<Step>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read reply {}", path.display()))?;
    let steps = ArtifactDecoder.decode(&raw, 1);
    if steps.is_empty() {
        bail!("no build artifact found in {}", path.display());
    }
    Ok(steps)
}

fn check_tree(tree: &WorkspaceTree) -> Result<()> {
    let errors = validate_invariants(tree);
    if !errors.is_empty() {
        bail!("invariant violations:\n- {}", errors.join("\n- "));
    }
    Ok(())
}

fn print_conflicts(conflicts: &[IntegrationError]) {
    for conflict in conflicts {
        eprintln!("{conflict}");
    }
}

fn print_steps(steps: &[Step]) {
    for step in steps {
        let mark = match step.status {
            StepStatus::Completed => "x",
            StepStatus::Pending => " ",
        };
        println!("[{mark}] {:>3} {}", step.id, step.title);
    }
}

fn exit_code_for(steps: &[Step]) -> i32 {
    if steps.iter().any(Step::is_pending) {
        exit_codes::CONFLICT
    } else {
        exit_codes::OK
    }
}
