use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use amazon_reviews_downloader::app::{App, BatchReport, BatchRequest, ProgressSink};
use amazon_reviews_downloader::cache;
use amazon_reviews_downloader::config::{self, ConfigLoader, Overrides};
use amazon_reviews_downloader::domain::{CATEGORIES, CompressionFormat};
use amazon_reviews_downloader::error::ReviewsError;
use amazon_reviews_downloader::fs_util;
use amazon_reviews_downloader::hub::HubHttpClient;
use amazon_reviews_downloader::output::{
    CacheLocation, CategoryList, ConsoleOutput, JsonOutput, OutputMode,
};
use amazon_reviews_downloader::tui::Tui;

#[derive(Parser)]
#[command(name = "amazon-reviews")]
#[command(about = "Download the Amazon Reviews 2023 dataset by category")]
#[command(version, author)]
struct Cli {
    /// Print plain progress lines instead of the full-screen view
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Print results as JSON on stdout; progress goes to the log
    #[arg(long, global = true, conflicts_with = "non_interactive")]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download review and meta splits (default command)")]
    Download(DownloadArgs),
    #[command(about = "Inspect or clear the download cache")]
    Cache(CacheArgs),
    #[command(about = "List valid category names")]
    Categories,
}

#[derive(Args, Clone, Default)]
struct DownloadArgs {
    /// Output directory (default: Amazon_Reviews_2023)
    base_path: Option<PathBuf>,

    /// Category to download; repeat for several (default: all)
    #[arg(long = "category", short = 'c')]
    categories: Vec<String>,

    /// Pack each dataset folder into a tar archive
    #[arg(long)]
    compress: bool,

    #[arg(long, value_enum)]
    format: Option<CompressionFormat>,

    /// Compression level, 1 to 9
    #[arg(long)]
    level: Option<u32>,

    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[arg(long)]
    config: Option<String>,
}

#[derive(Args)]
struct CacheArgs {
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Subcommand)]
enum CacheCommand {
    #[command(about = "Show the active cache directory")]
    Location {
        #[arg(long, short)]
        verbose: bool,
    },
    #[command(about = "Show the platform default cache directory")]
    Default,
    #[command(about = "Delete the download cache directory")]
    Clear,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<ReviewsError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ReviewsError) -> u8 {
    match error {
        ReviewsError::InvalidCategories(_)
        | ReviewsError::InvalidDatasetType(_)
        | ReviewsError::InvalidCompressionLevel(_)
        | ReviewsError::UnsupportedCompressionFormat(_)
        | ReviewsError::PathConflict { .. }
        | ReviewsError::ConfigRead(_)
        | ReviewsError::ConfigParse(_) => 2,
        ReviewsError::HubHttp(_) | ReviewsError::HubStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else if cli.non_interactive || !std::io::stdout().is_terminal() {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Some(Commands::Download(args)) => run_download(args, output_mode),
        Some(Commands::Cache(args)) => run_cache(args, output_mode),
        Some(Commands::Categories) => run_categories(output_mode),
        None => run_download(DownloadArgs::default(), output_mode),
    }
}

fn run_download(args: DownloadArgs, output_mode: OutputMode) -> miette::Result<()> {
    let DownloadArgs {
        base_path,
        categories,
        compress,
        format,
        level,
        cache_dir,
        config: config_path,
    } = args;

    let resolved = ConfigLoader::resolve(config_path.as_deref())?;
    let settings = config::merge(
        resolved,
        Overrides {
            base_path,
            categories,
            compress,
            compression_format: format,
            compression_level: level,
            cache_dir,
        },
    );

    let cache_dir = cache::download_cache_dir(settings.cache_dir.as_deref())?;
    let hub = HubHttpClient::new()?;
    let app = App::new(hub, cache_dir);
    let request = BatchRequest {
        base_path: settings.base_path.clone(),
        categories: settings.categories.clone(),
        compress: settings.compress,
        compression_format: settings.compression_format,
        compression_level: settings.compression_level,
    };

    match output_mode {
        OutputMode::Json => {
            let report = app.run(request, &JsonOutput)?;
            JsonOutput::print_report(&report).into_diagnostic()?;
            Ok(())
        }
        OutputMode::NonInteractive => {
            app.run(request, &ConsoleOutput)?;
            Ok(())
        }
        OutputMode::Interactive => {
            let names = settings.categories.clone().unwrap_or_else(|| {
                CATEGORIES.iter().map(|name| name.to_string()).collect()
            });
            let title = format!("→ {}", settings.base_path.display());
            let mut tui = Tui::new(title, names);
            let report = tui.run(move |sink| app.run(request, sink))?;
            print_download_summary(&report);
            Ok(())
        }
    }
}

fn print_download_summary(report: &BatchReport) {
    let green = "\x1b[32m";
    let red = "\x1b[31m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}📦 Download summary → {}{reset}", report.base_path);
    for category in &report.categories {
        for item in &category.items {
            println!("   {item}");
        }
    }
    for (index, line) in report.summary_lines().into_iter().enumerate() {
        let color = if index == 0 { green } else { red };
        println!("{color}{line}{reset}");
    }
}

fn run_cache(args: CacheArgs, output_mode: OutputMode) -> miette::Result<()> {
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Json => &JsonOutput,
        _ => &ConsoleOutput,
    };

    match args.command {
        CacheCommand::Location { verbose } => {
            let cache_dir = cache::download_cache_dir(args.cache_dir.as_deref())?;
            let path = cache::get_cache_location(&cache_dir, verbose, sink);
            print_location(&path, output_mode)
        }
        CacheCommand::Default => {
            let path = cache::default_cache_location()?;
            print_location(&path, output_mode)
        }
        CacheCommand::Clear => {
            let cache_dir = cache::download_cache_dir(args.cache_dir.as_deref())?;
            let cleanup = cache::delete_cache(&cache_dir, sink);
            if output_mode == OutputMode::Json {
                JsonOutput::print_cleanup(&cleanup).into_diagnostic()?;
            }
            Ok(())
        }
    }
}

fn print_location(path: &std::path::Path, output_mode: OutputMode) -> miette::Result<()> {
    if output_mode == OutputMode::Json {
        JsonOutput::print_cache_location(&CacheLocation {
            path: path.display().to_string(),
            exists: path.exists(),
            size_bytes: fs_util::dir_size(path).ok(),
        })
        .into_diagnostic()?;
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

fn run_categories(output_mode: OutputMode) -> miette::Result<()> {
    let list = CategoryList {
        categories: CATEGORIES.to_vec(),
    };
    if output_mode == OutputMode::Json {
        JsonOutput::print_categories(&list).into_diagnostic()?;
    } else {
        ConsoleOutput::print_categories(&list);
    }
    Ok(())
}
