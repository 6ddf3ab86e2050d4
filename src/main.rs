use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};

use ghvr::github::{GitHub, GitHubRepo};
use ghvr::platform::DefaultPlatformResolver;
use ghvr::version::{FilterOptions, VersionCatalog, VersionError};

/// ghvr - GitHub Version Resolver
///
/// Query, filter, and resolve release versions of a GitHub repository.
///
/// If the GITHUB_TOKEN environment variable is set, it will be used for
/// authentication. This is useful for accessing private repositories or
/// avoiding rate limits.
///
/// Examples:
///   ghvr list owner/repo                  # All known versions
///   ghvr get owner/repo 1.2.3             # One specific version
///   ghvr resolve owner/repo --tag ^1.0.0  # Best match for a range
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// GitHub API URL (defaults to https://api.github.com)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Release list cache TTL in seconds (also via GHVR_TTL)
    #[arg(long = "ttl", env = "GHVR_TTL", value_name = "SECONDS", default_value_t = 60, global = true)]
    pub ttl: u64,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List all known versions, highest first
    List(ListArgs),

    /// Fetch a specific version by tag
    Get(GetArgs),

    /// Resolve the single best-matching version
    Resolve(ResolveArgs),
}

#[derive(clap::Args, Debug)]
struct ListArgs {
    /// The GitHub repository in the format "owner/repo"
    #[arg(value_name = "OWNER/REPO")]
    repo: String,
}

#[derive(clap::Args, Debug)]
struct GetArgs {
    /// The GitHub repository in the format "owner/repo"
    #[arg(value_name = "OWNER/REPO")]
    repo: String,

    /// Version tag to fetch (e.g. "1.2.3")
    #[arg(value_name = "TAG")]
    tag: String,
}

#[derive(clap::Args, Debug)]
struct ResolveArgs {
    /// The GitHub repository in the format "owner/repo"
    #[arg(value_name = "OWNER/REPO")]
    repo: String,

    /// Semver range, exact version, or "latest"
    #[arg(long, default_value = "latest")]
    tag: String,

    /// Restrict to versions available for a platform (e.g. "linux-64")
    #[arg(long)]
    platform: Option<String>,

    /// Release channel; "*" matches any channel
    #[arg(long, default_value = "stable")]
    channel: String,
}

fn build_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        debug!("Using GITHUB_TOKEN for authentication");
    }

    Client::builder()
        .user_agent("ghvr-cli")
        .default_headers(headers)
        .build()
        .context("Failed to build HTTP client")
}

fn build_catalog(repo: &str, api_url: Option<String>, ttl: u64) -> Result<VersionCatalog> {
    let repo = GitHubRepo::from_str(repo)?;
    let github = GitHub::new(build_client()?, repo, api_url);
    Ok(VersionCatalog::new(
        Arc::new(github),
        Arc::new(DefaultPlatformResolver),
        Duration::from_secs(ttl),
    ))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::List(args) => {
            let catalog = build_catalog(&args.repo, cli.api_url, cli.ttl)?;
            let versions = catalog.list().await?;
            print_json(versions.as_ref())
        }
        Commands::Get(args) => {
            let catalog = build_catalog(&args.repo, cli.api_url, cli.ttl)?;
            let version = catalog.get(&args.tag).await?;
            print_json(&version)
        }
        Commands::Resolve(args) => {
            let catalog = build_catalog(&args.repo, cli.api_url, cli.ttl)?;
            let opts = FilterOptions {
                tag: args.tag,
                platform: args.platform,
                channel: args.channel,
            };
            let version = catalog.resolve(&opts).await?;
            print_json(&version)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => Ok(()),
        // "Not found" is an expected outcome, not a crash with a backtrace
        Err(e) => match e.downcast_ref::<VersionError>() {
            Some(VersionError::NotFound { .. }) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
            _ => Err(e),
        },
    }
}
