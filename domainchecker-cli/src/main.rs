mod display;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use domainchecker_core::colors::PaletteExt;
use domainchecker_core::config::DEFAULT_CACHE_FILE;
use domainchecker_core::{
    output, parse_domains_from_file, BatchChecker, CacheStore, CheckerConfig, HumanFormatter,
    ProgressCallback,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use display::progress::{self, LogWriterFactory};
use display::Spinner;

#[derive(Parser)]
#[command(name = "domainchecker")]
#[command(about = "Check domain registration status, expiration dates and DNS records")]
#[command(version)]
struct Cli {
    /// Domain names to check
    domains: Vec<String>,

    /// File containing domains: one per line, # for comments, or CSV (uses first column)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Write results to a CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use batch processing even for a single domain
    #[arg(long)]
    batch: bool,

    /// Number of concurrent workers in batch mode
    #[arg(short, long, default_value_t = 10)]
    workers: usize,

    /// Days before expiration at which a domain counts as expiring soon
    #[arg(short = 't', long, default_value_t = 30)]
    expiring_threshold: i64,

    /// Keep only domains expiring within the threshold
    #[arg(long)]
    expiring_only: bool,

    /// Skip DNS record checking
    #[arg(long)]
    no_dns: bool,

    /// SQLite cache file path
    #[arg(long, default_value = DEFAULT_CACHE_FILE)]
    cache_file: PathBuf,

    /// Disable caching
    #[arg(long)]
    no_cache: bool,

    /// Lifetime of new cache entries in seconds
    #[arg(long, value_name = "SECS")]
    cache_ttl: Option<u64>,

    /// Pause between worker waves in seconds
    #[arg(long, value_name = "SECS", default_value_t = 1.0)]
    batch_delay: f64,

    /// Empty the cache before checking
    #[arg(long)]
    clear_cache: bool,

    /// Print cache statistics after the run
    #[arg(long)]
    cache_stats: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> anyhow::Result<CheckerConfig> {
        let mut config = CheckerConfig {
            check_dns: !self.no_dns,
            expiring_threshold_days: self.expiring_threshold,
            workers: self.workers,
            batch_delay: Duration::try_from_secs_f64(self.batch_delay)?,
            cache_enabled: !self.no_cache,
            cache_file: self.cache_file.clone(),
            ..CheckerConfig::default()
        };
        if let Some(ttl) = self.cache_ttl {
            config.cache_ttl = Duration::from_secs(ttl);
        }
        Ok(config)
    }

    fn maintenance_only(&self) -> bool {
        self.clear_cache || self.cache_stats
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(LogWriterFactory)
        .init();

    let config = cli.config()?;
    let formatter = HumanFormatter::new(std::io::stdout().is_terminal());

    let mut domains = cli.domains.clone();
    if let Some(file) = &cli.file {
        if !file.exists() {
            eprintln!("{} File not found: {}", "Error:".failure(), file.display());
            std::process::exit(1);
        }
        let content = tokio::fs::read_to_string(file).await?;
        domains.extend(parse_domains_from_file(&content));
    }

    if domains.is_empty() && !cli.maintenance_only() {
        eprintln!(
            "{} No domains specified. Use --file or provide domain names.",
            "Error:".failure()
        );
        Cli::command().print_help()?;
        std::process::exit(1);
    }

    let cache = open_cache(&config).await;
    if cli.clear_cache {
        match &cache {
            Some(cache) => {
                let removed = cache.clear().await?;
                println!(
                    "Cleared {} cached entries from {}",
                    removed,
                    cache.path().display()
                );
            }
            None => println!("Cache disabled, nothing to clear"),
        }
    }

    let batch = BatchChecker::from_config(&config, cache);

    let mut succeeded = true;
    if cli.batch || domains.len() > 1 {
        check_batch(&cli, &batch, domains, formatter).await?;
    } else if let Some(domain) = domains.first() {
        succeeded = check_single(&cli, &batch, domain, formatter).await?;
    }

    if cli.cache_stats {
        print_cache_stats(batch.cache(), formatter).await;
    }
    if let Some(cache) = batch.cache() {
        cache.close().await;
    }

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

async fn open_cache(config: &CheckerConfig) -> Option<CacheStore> {
    if !config.cache_enabled {
        return None;
    }
    match CacheStore::open(&config.cache_file).await {
        Ok(store) => Some(store.with_default_ttl(config.cache_ttl)),
        Err(e) => {
            warn!(
                path = %config.cache_file.display(),
                error = %e,
                "Cache unavailable, continuing without it"
            );
            None
        }
    }
}

async fn check_batch(
    cli: &Cli,
    batch: &BatchChecker,
    domains: Vec<String>,
    formatter: HumanFormatter,
) -> anyhow::Result<()> {
    println!("Checking {} domains...", domains.len());

    let bar = progress::start_batch_bar(domains.len());
    let callback_bar = bar.clone();
    let verbose = cli.verbose;
    let callback: ProgressCallback = Box::new(move |done, total, outcome| {
        callback_bar.set_position(done as u64);
        callback_bar.set_message(outcome.domain.clone());
        if verbose {
            callback_bar.println(formatter.format_progress_line(done, total, outcome));
        }
    });

    let mut outcome = batch.check_many(domains, Some(callback)).await;
    progress::finish_batch_bar(&bar);

    let threshold = batch.checker().expiring_threshold();
    let expiring = outcome.expiring_soon(threshold);
    if cli.expiring_only {
        outcome = outcome.into_expiring_soon(threshold);
    }

    if let Some(path) = &cli.output {
        output::write_csv(path, &outcome.results)?;
        println!("Results saved to: {}", path.display());
    }

    println!();
    println!("{}", formatter.format_summary(&outcome));

    if (cli.expiring_only || cli.verbose) && !expiring.is_empty() {
        println!();
        println!("{}", formatter.format_expiring(&expiring, threshold));
    }

    Ok(())
}

/// Returns whether the check succeeded.
async fn check_single(
    cli: &Cli,
    batch: &BatchChecker,
    domain: &str,
    formatter: HumanFormatter,
) -> anyhow::Result<bool> {
    let outcome = {
        let _spinner = Spinner::new(format!("Checking domain: {}", domain));
        batch.check_one(domain).await
    };

    if let Some(path) = &cli.output {
        output::write_csv(path, std::slice::from_ref(&outcome))?;
        println!("Results saved to: {}", path.display());
    }

    if outcome.success {
        println!("{}", formatter.format_outcome(&outcome, cli.verbose));
        Ok(true)
    } else {
        eprintln!(
            "{} {}",
            "Error:".failure(),
            outcome.error.as_deref().unwrap_or("check failed")
        );
        Ok(false)
    }
}

async fn print_cache_stats(cache: Option<&CacheStore>, formatter: HumanFormatter) {
    let Some(cache) = cache else {
        println!("Cache disabled");
        return;
    };
    match cache.stats().await {
        Ok(stats) => {
            println!();
            println!("{}", formatter.format_cache_stats(&stats));
        }
        Err(e) => eprintln!("{} {}", "Error:".failure(), e),
    }
}
