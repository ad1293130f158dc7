use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use enrichfeed::feed::HttpClient;
use enrichfeed::rewrite::{download_and_rewrite, parse_pairs};
use enrichfeed::{Config, Overrides, Pipeline, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "enrichfeed",
    version,
    about = "Re-publish a feed as Atom with each entry's article body embedded"
)]
struct Cli {
    /// Config file (default: ~/.config/enrichfeed/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log more to stderr (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a feed, embed each entry's article body, and print it as Atom
    Enrich(EnrichArgs),
    /// Download a document, apply regex substitutions in order, and print it
    Rewrite(RewriteArgs),
}

#[derive(Args, Debug)]
struct EnrichArgs {
    /// The feed URL
    url: String,

    /// CSS selector capturing the article body [default: article]
    #[arg(long)]
    selector: Option<String>,

    /// Per-request timeout in seconds [default: 10]
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// User agent. Falls back to RSS_USER_AGENT, then USER_AGENT
    #[arg(long)]
    user_agent: Option<String>,

    /// Proxy URL, e.g. socks5h://localhost:8090
    #[arg(long, value_name = "URL")]
    proxy: Option<String>,

    /// Drop items older than this many days; 0 keeps everything [default: 15]
    #[arg(long, value_name = "DAYS")]
    max_days_back: Option<u32>,

    /// Concurrent article fetches [default: 3]
    #[arg(long, value_name = "N")]
    pool_size: Option<usize>,

    /// With --pool-size 1, wait this long between launching fetches
    #[arg(long, value_name = "MS")]
    stagger_ms: Option<u64>,

    /// Drop items with a category containing TERM (case-insensitive, repeatable)
    #[arg(long = "exclude-category", value_name = "TERM")]
    exclude_categories: Vec<String>,
}

#[derive(Args, Debug)]
struct RewriteArgs {
    /// The document URL
    url: String,

    /// Pattern/replacement pairs, applied in order
    #[arg(value_name = "PATTERN REPLACEMENT", allow_hyphen_values = true)]
    pairs: Vec<String>,

    /// Request timeout in seconds [default: 10]
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// User agent. Falls back to RSS_USER_AGENT, then USER_AGENT
    #[arg(long)]
    user_agent: Option<String>,

    /// Proxy URL, e.g. socks5h://localhost:8090
    #[arg(long, value_name = "URL")]
    proxy: Option<String>,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries the document
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let Some(path) = path.or_else(Config::default_path) else {
        tracing::debug!("HOME not set, using default configuration");
        return Ok(Config::default());
    };
    Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

async fn enrich(config: &Config, args: EnrichArgs) -> Result<String> {
    let overrides = Overrides {
        selector: args.selector,
        user_agent: args.user_agent,
        timeout_secs: args.timeout,
        proxy: args.proxy,
        max_days_back: args.max_days_back,
        pool_size: args.pool_size,
        stagger_ms: args.stagger_ms,
        exclude_categories: (!args.exclude_categories.is_empty())
            .then_some(args.exclude_categories),
    };
    let settings = Settings::resolve(config, overrides, env_var);
    tracing::debug!(?settings, "Resolved settings");

    let pipeline = Pipeline::new(&settings).context("Invalid settings")?;
    let (document, _summary) = pipeline
        .run(&args.url)
        .await
        .with_context(|| format!("Failed to enrich feed {}", args.url))?;
    Ok(document)
}

async fn rewrite(config: &Config, args: RewriteArgs) -> Result<String> {
    let rules = parse_pairs(&args.pairs).context("Invalid substitutions")?;

    let overrides = Overrides {
        user_agent: args.user_agent,
        timeout_secs: args.timeout,
        proxy: args.proxy,
        ..Default::default()
    };
    let settings = Settings::resolve(config, overrides, env_var);
    let client = HttpClient::new(
        &settings.user_agent,
        settings.timeout,
        settings.proxy.as_deref(),
    )
    .context("Invalid settings")?;

    download_and_rewrite(&client, &args.url, &rules)
        .await
        .with_context(|| format!("Unable to download {}", args.url))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config)?;

    let output = match cli.command {
        Command::Enrich(args) => enrich(&config, args).await?,
        Command::Rewrite(args) => rewrite(&config, args).await?,
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}").context("Failed to write to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}
