//! cpd package manager (cpd)

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use cpd_pm::{
    CacheError, DependencySpecifier, PackageCache, PmConfig, SpecifierError, StoreConfig,
    VersionSpecType,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cpd")]
#[command(about = "cpd package manager", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Command line overrides of the configuration file
#[derive(Args)]
struct Overrides {
    /// Config file (default: ~/.cpd/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Use a local directory as the package store
    #[arg(long, global = true, conflicts_with = "store_url")]
    store_dir: Option<PathBuf>,

    /// Use an HTTP(S) package store
    #[arg(long, global = true)]
    store_url: Option<String>,

    /// Repository used when a specifier does not name one
    #[arg(long, global = true)]
    repository: Option<String>,

    /// Seconds to wait for the cache lock
    #[arg(long, global = true)]
    lock_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the repository indices
    Update,
    /// Parse a dependency specifier and print its parts
    Parse {
        /// Specifier, e.g. official/boost[>=1.5,<2.0]
        specifier: String,
    },
    /// Print every package a specifier needs
    Resolve {
        /// Specifier, e.g. official/boost[>=1.5,<2.0]
        specifier: String,
    },
    /// Download and extract a package with its dependencies
    Install {
        /// Specifier, e.g. official/boost[>=1.5,<2.0]
        specifier: String,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            if let Some(hint) = err.downcast_ref::<CacheError>().and_then(CacheError::hint) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug; RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("cpd_pm=warn"),
        1 => EnvFilter::new("cpd_pm=info"),
        _ => EnvFilter::new("cpd_pm=debug"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Parse { specifier } => parse(&specifier)?,
        Commands::Update => {
            let config = load_config(&cli.overrides)?;
            let cache = open_cache(&config)?;
            let repositories = cache.update_repositories()?;
            println!("Updated {} repositories", repositories.len());
            for repository in repositories {
                println!("  {}", repository);
            }
        }
        Commands::Resolve { specifier } => {
            let config = load_config(&cli.overrides)?;
            let cache = open_cache(&config)?;
            let specifier = parse_specifier(&specifier)?;
            let package_ref =
                cache.resolve_specifier(specifier.parts(), &config.default_repository)?;

            let mut resolved: Vec<_> = cache.resolve(&package_ref)?.into_iter().collect();
            resolved.sort();
            for package_ref in resolved {
                println!("{}", package_ref);
            }
        }
        Commands::Install { specifier } => {
            let config = load_config(&cli.overrides)?;
            let cache = open_cache(&config)?;
            let specifier = parse_specifier(&specifier)?;
            let package_ref =
                cache.resolve_specifier(specifier.parts(), &config.default_repository)?;

            let mut packages: Vec<_> = cache
                .get_package_with_dependencies(&package_ref)?
                .into_iter()
                .collect();
            packages.sort_by(|a, b| a.package_ref.cmp(&b.package_ref));
            for package in packages {
                println!("{} -> {}", package.package_ref, package.path.display());
                let specs = &package.file_specs;
                if !specs.binaries.is_empty() {
                    println!("  bin:     {}", specs.binaries.join(", "));
                }
                if !specs.libraries.is_empty() {
                    println!("  lib:     {}", specs.libraries.join(", "));
                }
                if !specs.includes.is_empty() {
                    println!("  include: {}", specs.includes.join(", "));
                }
            }
        }
    }

    Ok(())
}

fn parse_specifier(specifier: &str) -> Result<DependencySpecifier, SpecifierError> {
    DependencySpecifier::parse(specifier)
}

fn parse(specifier: &str) -> anyhow::Result<()> {
    let specifier = parse_specifier(specifier)?;
    let parts = specifier.parts();

    println!(
        "repository: {}",
        parts.repository.as_deref().unwrap_or("(default)")
    );
    println!("name:       {}", parts.name);
    match parts.version_spec {
        VersionSpecType::Latest => println!("version:    latest"),
        VersionSpecType::Exact(version) => println!("version:    = {}", version),
        VersionSpecType::Bounds(ref bounds) => {
            for bound in bounds {
                println!("version:    {} {}", bound.operand, bound.version);
            }
        }
    }
    println!("canonical:  {}", DependencySpecifier::from_parts(parts)?);
    Ok(())
}

fn load_config(overrides: &Overrides) -> anyhow::Result<PmConfig> {
    let mut config = match overrides.config {
        Some(ref path) => PmConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PmConfig::load()?,
    };

    if let Some(ref dir) = overrides.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if let Some(ref dir) = overrides.store_dir {
        config.store = Some(StoreConfig::Local(dir.clone()));
    }
    if let Some(ref url) = overrides.store_url {
        config.store = Some(StoreConfig::Url(url.clone()));
    }
    if let Some(ref repository) = overrides.repository {
        config.default_repository = repository.clone();
    }
    if let Some(secs) = overrides.lock_timeout {
        config.lock_timeout_secs = Some(secs);
    }
    config.validate()?;

    debug!(platform = %config.platform, "loaded configuration");
    Ok(config)
}

fn open_cache(config: &PmConfig) -> anyhow::Result<PackageCache> {
    let cache_dir = config.cache_dir()?;
    let cache = PackageCache::open(&cache_dir, config.package_store()?)
        .with_context(|| format!("Failed to open cache at {}", cache_dir.display()))?
        .with_lock_timeout(config.lock_timeout());
    Ok(cache)
}
