//! CLI entry point: argument surface, config merge, command dispatch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use ticket_runner::core::issues;
use ticket_runner::core::types::AgentKind;
use ticket_runner::exit_codes;
use ticket_runner::io::completions::CompletionStore;
use ticket_runner::io::config::{BinsConfig, RunnerConfig, load_config, resolve_path};
use ticket_runner::io::git::Git;
use ticket_runner::io::invoker::CliAgentInvoker;
use ticket_runner::io::prompt::PromptBuilder;
use ticket_runner::io::tracker::GhIssueTracker;
use ticket_runner::logging;
use ticket_runner::looping::{RunSummary, run_queue};
use ticket_runner::processor::{CountdownWaiter, IssueProcessor, ProcessOptions};
use ticket_runner::report::Reporter;

const CONFIG_FILE: &str = ".ticket-runner/config.toml";
const DEFAULT_PROMPT_TEMPLATE: &str = ".ticket-runner/prompt.tmpl";
const DONE_FILE_NAME: &str = ".completed";

#[derive(Parser)]
#[command(
    name = "ticket-runner",
    version,
    about = "Queue-driven issue runner for coding-agent CLIs"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CommonArgs {
    /// Agent CLI to run (claude, codex, gemini, cursor-agent).
    #[arg(long, global = true)]
    agent: Option<AgentKind>,

    /// Model override for the selected agent.
    #[arg(long, global = true)]
    model: Option<String>,

    /// Comma-separated issue list (overrides the issues file).
    #[arg(long, global = true, value_name = "ID1,ID2,...")]
    issues: Option<String>,

    /// Issue list file (default: .ticket-runner/issues.txt).
    #[arg(long, global = true, value_name = "PATH")]
    issues_file: Option<String>,

    /// Log directory (default: .ticket-runs).
    #[arg(long, global = true, value_name = "PATH")]
    log_dir: Option<String>,

    /// Completion file (default: <log-dir>/.completed).
    #[arg(long, global = true, value_name = "PATH")]
    done_file: Option<String>,

    /// Prompt template using {{ issue_number }}, {{ issue_title }}, {{ issue_body }}.
    #[arg(long, global = true, value_name = "PATH")]
    prompt_template: Option<String>,

    /// Claude CLI command.
    #[arg(long, global = true, value_name = "BIN")]
    claude_bin: Option<String>,

    /// Codex CLI command.
    #[arg(long, global = true, value_name = "BIN")]
    codex_bin: Option<String>,

    /// Gemini CLI command.
    #[arg(long, global = true, value_name = "BIN")]
    gemini_bin: Option<String>,

    /// Cursor-agent CLI command.
    #[arg(long, global = true, value_name = "BIN")]
    cursor_bin: Option<String>,

    /// GitHub CLI command.
    #[arg(long, global = true, value_name = "BIN")]
    gh_bin: Option<String>,

    /// Disable ANSI colors.
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Process the configured issues with the selected agent.
    Run {
        /// Show what would run without invoking the agent CLI.
        #[arg(long)]
        dry_run: bool,

        /// Re-run issues already marked completed.
        #[arg(long)]
        force: bool,

        /// Process exactly one issue (implies --force).
        #[arg(long, value_name = "ID")]
        issue: Option<String>,

        /// Extra wait seconds after a parsed reset time (default: 120).
        #[arg(long, value_name = "SECONDS")]
        wait_buffer_sec: Option<i64>,
    },
    /// Show completion status for the configured issues.
    Status,
    /// Clear completion tracking for all issues, or one.
    Reset {
        /// Issue id to reset; omit to reset everything.
        issue: Option<String>,
    },
}

/// Effective settings after merging CLI flags over the config file.
struct Settings {
    agent: AgentKind,
    model: Option<String>,
    issues_file: PathBuf,
    log_dir: PathBuf,
    done_file: PathBuf,
    prompt_template: Option<PathBuf>,
    bins: BinsConfig,
    wait_buffer_secs: i64,
    timeout: Option<Duration>,
    countdown_interval_secs: u64,
}

impl Settings {
    fn merge(root: &Path, cfg: &RunnerConfig, args: &CommonArgs) -> Result<Self> {
        let agent = match args.agent {
            Some(kind) => kind,
            None => cfg.agent.parse()?,
        };
        let model = args
            .model
            .clone()
            .or_else(|| (!cfg.model.is_empty()).then(|| cfg.model.clone()));

        let issues_file = resolve_path(
            root,
            args.issues_file.as_deref().unwrap_or(&cfg.issues_file),
        );
        let log_dir = resolve_path(root, args.log_dir.as_deref().unwrap_or(&cfg.log_dir));
        let done_file = match args
            .done_file
            .as_deref()
            .or((!cfg.done_file.is_empty()).then_some(cfg.done_file.as_str()))
        {
            Some(path) => resolve_path(root, path),
            None => log_dir.join(DONE_FILE_NAME),
        };

        let prompt_template = args
            .prompt_template
            .as_deref()
            .or((!cfg.prompt_template.is_empty()).then_some(cfg.prompt_template.as_str()))
            .map(|path| resolve_path(root, path))
            .or_else(|| {
                let candidate = root.join(DEFAULT_PROMPT_TEMPLATE);
                candidate.exists().then_some(candidate)
            });

        let mut bins = cfg.bins.clone();
        if let Some(bin) = &args.claude_bin {
            bins.claude = bin.clone();
        }
        if let Some(bin) = &args.codex_bin {
            bins.codex = bin.clone();
        }
        if let Some(bin) = &args.gemini_bin {
            bins.gemini = bin.clone();
        }
        if let Some(bin) = &args.cursor_bin {
            bins.cursor_agent = bin.clone();
        }
        if let Some(bin) = &args.gh_bin {
            bins.gh = bin.clone();
        }

        Ok(Self {
            agent,
            model,
            issues_file,
            log_dir,
            done_file,
            prompt_template,
            bins,
            wait_buffer_secs: cfg.wait_buffer_secs,
            timeout: (cfg.agent_timeout_secs > 0)
                .then(|| Duration::from_secs(cfg.agent_timeout_secs)),
            countdown_interval_secs: cfg.countdown_interval_secs,
        })
    }
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let reporter = Reporter::new(cli.common.no_color);
    match run(cli, reporter) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(exit_codes::FAILED);
        }
    }
}

fn run(cli: Cli, reporter: Reporter) -> Result<i32> {
    let cwd = std::env::current_dir().context("determine current directory")?;
    let repo_root = Git::discover_root(&cwd)?;
    let git = Git::new(&repo_root);

    let config = load_config(&repo_root.join(CONFIG_FILE))?;
    let settings = Settings::merge(&repo_root, &config, &cli.common)?;

    std::fs::create_dir_all(&settings.log_dir)
        .with_context(|| format!("create log dir {}", settings.log_dir.display()))?;
    let mut store = CompletionStore::open(&settings.done_file)?;

    match cli.command {
        Command::Reset { issue } => cmd_reset(&mut store, issue.as_deref(), reporter),
        Command::Status => {
            let queue = load_queue(&settings, cli.common.issues.as_deref(), None)?;
            cmd_status(&store, &queue, reporter);
            Ok(exit_codes::OK)
        }
        Command::Run {
            dry_run,
            force,
            issue,
            wait_buffer_sec,
        } => cmd_run(
            &git,
            &settings,
            &mut store,
            reporter,
            RunArgs {
                dry_run,
                force,
                issue,
                issues_csv: cli.common.issues.clone(),
                wait_buffer_sec,
            },
        ),
    }
}

struct RunArgs {
    dry_run: bool,
    force: bool,
    issue: Option<String>,
    issues_csv: Option<String>,
    wait_buffer_sec: Option<i64>,
}

fn cmd_run(
    git: &Git,
    settings: &Settings,
    store: &mut CompletionStore,
    reporter: Reporter,
    args: RunArgs,
) -> Result<i32> {
    if let Some(id) = &args.issue
        && !issues::is_valid_id(id)
    {
        bail!("--issue must be numeric: {id:?}");
    }
    let wait_buffer_secs = args.wait_buffer_sec.unwrap_or(settings.wait_buffer_secs);
    if wait_buffer_secs < 0 {
        bail!("--wait-buffer-sec must be a non-negative integer");
    }

    let queue = load_queue(settings, args.issues_csv.as_deref(), args.issue.as_deref())?;
    print_banner(reporter, settings, store, &queue);

    let prompts = match &settings.prompt_template {
        Some(path) => PromptBuilder::from_file(path)?,
        None => PromptBuilder::embedded(),
    };
    let tracker = GhIssueTracker {
        bin: settings.bins.gh.clone(),
        workdir: git.workdir().to_path_buf(),
    };
    let invoker = CliAgentInvoker {
        kind: settings.agent,
        bins: settings.bins.clone(),
        model: settings.model.clone(),
        workdir: git.workdir().to_path_buf(),
        timeout: settings.timeout,
    };
    let waiter = CountdownWaiter {
        reporter,
        interval_secs: settings.countdown_interval_secs,
    };

    let mut processor = IssueProcessor {
        git,
        tracker: &tracker,
        invoker: &invoker,
        waiter: &waiter,
        store,
        prompts: &prompts,
        reporter,
        opts: ProcessOptions {
            agent: settings.agent,
            dry_run: args.dry_run,
            // Explicitly-selected single issues always reprocess.
            force: args.force || args.issue.is_some(),
            wait_buffer_secs,
            log_dir: settings.log_dir.clone(),
        },
    };

    let summary = run_queue(&mut processor, &queue);
    print_summary(reporter, summary);
    Ok(if summary.all_ok() {
        exit_codes::OK
    } else {
        exit_codes::FAILED
    })
}

fn cmd_status(store: &CompletionStore, queue: &[String], reporter: Reporter) {
    reporter.info("Completion status:");
    for issue in queue {
        if store.contains(issue) {
            reporter.success(format!("  #{issue} done"));
        } else {
            reporter.warn(format!("  #{issue} pending"));
        }
    }
}

fn cmd_reset(store: &mut CompletionStore, issue: Option<&str>, reporter: Reporter) -> Result<i32> {
    match issue {
        Some(id) => {
            if !issues::is_valid_id(id) {
                bail!("reset issue must be numeric: {id:?}");
            }
            store.reset_one(id)?;
            reporter.success(format!("Reset completion for issue #{id}"));
        }
        None => {
            store.reset_all()?;
            reporter.success("Reset all completion tracking");
        }
    }
    Ok(exit_codes::OK)
}

/// Resolve the ordered issue queue: explicit single issue, then CSV, then the
/// issues file.
fn load_queue(
    settings: &Settings,
    issues_csv: Option<&str>,
    single: Option<&str>,
) -> Result<Vec<String>> {
    if let Some(id) = single {
        return Ok(vec![id.to_string()]);
    }
    if let Some(csv) = issues_csv {
        return issues::parse_csv(csv);
    }
    let path = &settings.issues_file;
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            bail!("issue file not found: {} (or pass --issues)", path.display());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read issues file {}", path.display()));
        }
    };
    issues::parse_issue_lines(&contents, &path.display().to_string())
}

fn print_banner(reporter: Reporter, settings: &Settings, store: &CompletionStore, queue: &[String]) {
    let completed = queue.iter().filter(|issue| store.contains(issue)).count();
    let remaining = queue.len() - completed;
    reporter.info("============================================================");
    reporter.info("                     Ticket Runner");
    reporter.info("============================================================");
    reporter.info(format!("Agent: {}", settings.agent.display_name()));
    if let Some(model) = &settings.model {
        reporter.info(format!("Model override: {model}"));
    }
    reporter.info(format!(
        "Total: {} | Completed: {} | Remaining: {}",
        queue.len(),
        completed,
        remaining
    ));
    reporter.info("============================================================");
    reporter.blank();
}

fn print_summary(reporter: Reporter, summary: RunSummary) {
    reporter.blank();
    reporter.info("============================================================");
    reporter.success(format!("Succeeded: {}", summary.succeeded));
    reporter.fail(format!("Failed: {}", summary.failed));
    reporter.info("============================================================");
}
