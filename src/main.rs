use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use vitalwiki::articles::ArticleSetBuilder;
use vitalwiki::config::{Config, DEFAULT_CONFIG_PATH};
use vitalwiki::error::PipelineError;
use vitalwiki::extract::{DumpExtractor, ModeOutcome};
use vitalwiki::fetch::HttpFetcher;
use vitalwiki::models::CategoryMode;
use vitalwiki::titles::{title_set_path, TitleSet};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "vitalwiki")]
#[command(about = "Resolve Wikipedia vital articles and extract their text from dumps")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the JSON configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and save the title set of every configured mode
    Articles,
    /// Extract matching articles from the dump into per-mode text files
    Extract(ExtractArgs),
}

#[derive(Args)]
struct ExtractArgs {
    /// Dry run - count matches without writing output files
    #[arg(long)]
    dry_run: bool,

    /// Remove the output directory before starting
    #[arg(long)]
    clean: bool,

    /// Re-resolve title sets even when saved ones exist
    #[arg(long)]
    rebuild_titles: bool,
}

fn run_articles(config: &Config) -> Result<()> {
    let start = Instant::now();
    let fetcher = HttpFetcher::new()?;
    let builder = ArticleSetBuilder::new(&fetcher, config)?;
    let written = builder.build_all(config)?;

    println!();
    println!("=== Summary ===");
    for (mode, path) in &written {
        let titles = TitleSet::load(path)?;
        println!(
            "{:<8} level {}: {:>6} titles -> {}",
            mode.name(),
            mode.level,
            titles.len(),
            path.display()
        );
    }
    println!("Total time:         {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}

/// Loads each mode's saved title set, resolving it first when missing.
fn load_title_sets(
    config: &Config,
    rebuild: bool,
    interrupted: &Arc<AtomicBool>,
) -> Result<Vec<(CategoryMode, TitleSet)>> {
    let mut fetcher: Option<HttpFetcher> = None;
    let mut sets = Vec::new();

    for mode in config.modes() {
        let path = title_set_path(&config.process_dir, &mode);
        if rebuild || !path.exists() {
            info!(mode = mode.name(), path = %path.display(), "Building title set");
            if fetcher.is_none() {
                fetcher = Some(HttpFetcher::new()?);
            }
            if let Some(fetcher) = fetcher.as_ref() {
                ArticleSetBuilder::new(fetcher, config)?
                    .with_cancel_flag(Arc::clone(interrupted))
                    .build_and_save(&mode, config)?;
            }
        }

        let titles = TitleSet::load(&path)
            .with_context(|| format!("Failed to load title set for mode `{}`", mode.name()))?;
        info!(mode = mode.name(), titles = titles.len(), "Loaded title set");
        sets.push((mode, titles));
    }

    Ok(sets)
}

fn run_extract(config: &Config, args: ExtractArgs) -> Result<()> {
    if args.clean && config.output_dir.exists() {
        info!("Cleaning output directory: {}", config.output_dir.display());
        fs::remove_dir_all(&config.output_dir).with_context(|| {
            format!(
                "Failed to clean output directory: {}",
                config.output_dir.display()
            )
        })?;
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let start_titles = Instant::now();
    let title_sets = load_title_sets(config, args.rebuild_titles, &interrupted)?;
    let titles_duration = start_titles.elapsed();

    info!("Starting extraction pass");
    let start_extracting = Instant::now();
    let extractor = DumpExtractor::from_config(config)
        .dry_run(args.dry_run)
        .with_cancel_flag(interrupted);
    let reports = extractor.run(config, title_sets)?;
    let extraction_duration = start_extracting.elapsed();
    info!(
        duration_secs = extraction_duration.as_secs_f64(),
        "Extraction complete"
    );

    println!();
    println!("=== Summary ===");
    println!("Title sets time:    {:.2}s", titles_duration.as_secs_f64());
    println!(
        "Extraction time:    {:.2}s",
        extraction_duration.as_secs_f64()
    );

    let mut was_interrupted = false;
    for report in &reports {
        println!();
        println!("[{}] level {}", report.mode.name(), report.mode.level);
        match &report.outcome {
            ModeOutcome::Completed(stats) => {
                println!("Pages scanned:      {}", stats.scanned());
                println!("Pages matched:      {}", stats.matched());
                println!("Files written:      {}", stats.written());
                println!("Bytes written:      {}", stats.bytes());
                println!("Titles not found:   {}", stats.missing());
            }
            ModeOutcome::Skipped(e) => println!("Skipped:            {}", e),
            ModeOutcome::Interrupted => {
                println!("Interrupted; partial output left in place");
                was_interrupted = true;
            }
        }
    }

    if was_interrupted {
        warn!("Run cancelled before all modes finished");
        return Err(PipelineError::Interrupted.into());
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: failed to set tracing subscriber: {}", e);
        return ExitCode::FAILURE;
    }

    let result = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))
        .and_then(|config| match cli.command {
            Commands::Articles => run_articles(&config),
            Commands::Extract(args) => run_extract(&config, args),
        });

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
