use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use issue_finder::app::{IssueFinder, IssueLookup};
use issue_finder::config::loader;
use issue_finder::config::types::AppConfig;
use issue_finder::context::AppContext;
use issue_finder::engine::{Engine, GitHubEngine};
use issue_finder::filter::FilterState;
use issue_finder::local::{LocalField, LocalValue};
use issue_finder::query::build_query;
use issue_finder::url::{History, LABELS_PARAM, LANGUAGE_PARAM, RouteParams, percent_encode};
use issue_finder::views::issues::{render_languages, render_list, render_lookup};

/// How long the interactive loop waits for the engine after each command.
const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "issue-finder", version, about = "Find GitHub issues by language and labels")]
struct Cli {
    /// Path to config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging to debug.log.
    #[arg(long)]
    debug: bool,

    /// Page URL (or bare query string) carrying `language` and `labels`.
    #[arg(long, value_name = "URL", conflicts_with_all = ["language", "labels"])]
    url: Option<String>,

    /// Repository language to search.
    #[arg(short, long)]
    language: Option<String>,

    /// Comma-separated labels, e.g. `bug,good first issue`.
    #[arg(long)]
    labels: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search interactively (the default).
    Search,
    /// Print the search query for the given filters and exit.
    Query,
    /// Show a single issue by its GraphQL node id.
    Issue {
        /// Issue node id, e.g. `I_kwDOAbc123`.
        id: String,
    },
}

/// Route parameters from `--url`, or from `--language` / `--labels`.
fn initial_route(cli: &Cli) -> Result<RouteParams> {
    if let Some(url) = &cli.url {
        return RouteParams::from_url(url).with_context(|| format!("parsing --url {url:?}"));
    }
    let mut route = RouteParams::default();
    if let Some(language) = &cli.language {
        route.set_raw(LANGUAGE_PARAM, percent_encode(language));
    }
    if let Some(labels) = &cli.labels {
        route.set_raw(LABELS_PARAM, percent_encode(labels));
    }
    Ok(route)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing.
    if cli.debug {
        let file = std::fs::File::create("debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(file)
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
    }

    let config = loader::load_config(cli.config.as_deref())?;
    let route = initial_route(&cli)?;
    let filters = FilterState::from_route(&route, &config.defaults.language, &config.defaults.labels);

    if let Some(Commands::Query) = cli.command {
        if !filters.is_searchable() {
            anyhow::bail!("no search: pick a language and at least one label");
        }
        println!("{}", build_query(&filters.language, &filters.labels));
        return Ok(());
    }

    // Install the rustls CryptoProvider before any TLS client is constructed.
    // Fails only if one is already installed, which is fine.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    // The engine runs on its own OS thread; `shutdown` stops it.
    let engine = GitHubEngine::new(&config.github);
    tracing::info!("issue-finder starting");

    match cli.command {
        Some(Commands::Issue { id }) => show_issue(engine, &id, &config),
        _ => run_interactive(engine, filters, route, &config),
    }
}

fn show_issue(engine: impl Engine, id: &str, config: &AppConfig) -> Result<()> {
    // Empty filters: no search is started, only the lookup.
    let ctx = AppContext::init(engine, FilterState::default());
    let mut finder = IssueFinder::new(ctx, History::new(), RouteParams::default(), "/");
    finder.lookup_issue(id);
    let settled = finder.wait_until_idle(REPLY_TIMEOUT);
    let failed = !settled || !matches!(finder.lookup(), IssueLookup::Found(_));
    if settled {
        print!("{}", render_lookup(finder.lookup(), &config.defaults.date_format));
    } else {
        eprintln!("timed out waiting for GitHub");
    }
    finder.shutdown();
    if failed {
        anyhow::bail!("could not show issue {id}");
    }
    Ok(())
}

const HELP: &str = "\
commands:
  lang <language>   switch language (empty to unset)
  langs             list configured languages
  label <label>     add a label
  more              fetch the next page
  retry             retry the last failed request
  show <id>         show one issue
  clear             reset to the configured defaults
  url               print the shareable URL
  help              this text
  quit              exit";

fn run_interactive(
    engine: impl Engine,
    filters: FilterState,
    route: RouteParams,
    config: &AppConfig,
) -> Result<()> {
    let date_format = config.defaults.date_format.as_str();
    let ctx = AppContext::init(engine, filters);
    let mut finder = IssueFinder::new(ctx, History::new(), route, "/");
    finder.subscribe(LocalField::Labels, |value| {
        if let LocalValue::Labels(labels) = value {
            println!("labels: {}", labels.join(", "));
        }
    });

    if !finder.wait_until_idle(REPLY_TIMEOUT) {
        eprintln!("still waiting for GitHub...");
    }
    print!("{}", render_list(&finder.view(), date_format));
    println!("(type `help` for commands)");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line.context("reading stdin")?;
        let (command, arg) = line.trim().split_once(' ').unwrap_or((line.trim(), ""));
        let arg = arg.trim();

        match command {
            "" => continue,
            "quit" | "exit" | "q" => break,
            "help" => {
                println!("{HELP}");
                continue;
            }
            "langs" => {
                print!("{}", render_languages(&config.languages));
                continue;
            }
            "url" => {
                println!("{}", finder.href());
                continue;
            }
            "lang" | "language" => {
                if !arg.is_empty() && !config.offers_language(arg) {
                    println!("unknown language {arg:?}; choose one of:");
                    print!("{}", render_languages(&config.languages));
                    continue;
                }
                finder.set_language(arg)?;
            }
            "label" => {
                if !finder.add_label(arg)? {
                    println!("nothing to add");
                    continue;
                }
            }
            "clear" => {
                let defaults = FilterState::initialize(
                    Some(&config.defaults.language),
                    None,
                    &config.defaults.labels,
                );
                finder.clear(&defaults)?;
            }
            "more" => {
                if !finder.fetch_next_page() {
                    println!("nothing more to fetch");
                    continue;
                }
            }
            "retry" => {
                if !finder.retry() {
                    println!("nothing to retry");
                    continue;
                }
            }
            "show" => {
                if arg.is_empty() {
                    println!("usage: show <id>");
                    continue;
                }
                finder.lookup_issue(arg);
                if finder.wait_until_idle(REPLY_TIMEOUT) {
                    print!("{}", render_lookup(finder.lookup(), date_format));
                } else {
                    eprintln!("timed out waiting for GitHub");
                }
                continue;
            }
            other => {
                println!("unknown command {other:?}; type `help`");
                continue;
            }
        }

        if !finder.wait_until_idle(REPLY_TIMEOUT) {
            eprintln!("timed out waiting for GitHub");
        }
        print!("{}", render_list(&finder.view(), date_format));
        if let Some(rl) = finder.rate_limit() {
            tracing::debug!("rate limit: {}/{} (cost {})", rl.remaining, rl.limit, rl.cost);
        }
    }

    finder.shutdown();
    Ok(())
}
