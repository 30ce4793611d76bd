mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use define_cache::{
    resolve, BoundedWordCache, CacheError, FetchConfig, JsonFileStore, OpenMode, ResolveError,
    ResolveOptions, TrimTarget, WordStore, YoudaoFetcher,
};
use render::RenderOptions;

#[derive(Parser)]
#[command(
    name = "define",
    version,
    about = "Look up English words in the Youdao dictionary, with a local cache"
)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["word", "list", "trim", "clear", "cache_path"])
))]
struct Cli {
    /// Word to look up
    word: Option<String>,

    /// Also show examples and word groups
    #[arg(short, long)]
    verbose: bool,
    /// Show at most N meanings
    #[arg(short = 'm', long, value_name = "N")]
    max_meanings: Option<usize>,
    /// Always fetch, even if the word is cached
    #[arg(long)]
    no_cache: bool,
    /// Do not store the fetched result
    #[arg(long)]
    no_store: bool,

    /// List cached words, oldest first
    #[arg(long)]
    list: bool,
    /// Keep only the N most recently added words
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    trim: Option<String>,
    /// Remove every cached word
    #[arg(long)]
    clear: bool,
    /// Print the cache file location
    #[arg(long)]
    cache_path: bool,

    /// Cache directory
    #[arg(long, env = "DEFINE_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
    /// Dictionary search endpoint
    #[arg(long, default_value = "https://dict.youdao.com/search")]
    base_url: String,
    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout_secs: u64,
    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Already reported to the user.
    #[error("lookup failed")]
    NotFound,
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::NotFound => 1,
            CliError::Resolve(ResolveError::Fetch(_) | ResolveError::Parse(_)) => 1,
            CliError::Resolve(ResolveError::EmptyWord | ResolveError::Cache(_)) => 2,
            CliError::Cache(_) => 2,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::NotFound) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let store = JsonFileStore::in_dir(&cli.cache_dir.clone().unwrap_or_else(default_cache_dir));

    if cli.cache_path {
        println!("{}", store.location());
        return Ok(());
    }

    if cli.list {
        let cache = BoundedWordCache::open_with(store, OpenMode::ResetCorrupt)?;
        for word in cache.list_words() {
            println!("{}", word);
        }
        return Ok(());
    }

    if let Some(target) = &cli.trim {
        let target: TrimTarget = target.parse()?;
        return session(store, |cache| {
            let evicted = cache.trim(target);
            println!("Removed {} word(s), {} left", evicted.len(), cache.list_words().len());
            Ok(())
        });
    }

    if cli.clear {
        return session(store, |cache| {
            let evicted = cache.trim(TrimTarget::ALL);
            println!("Removed {} word(s)", evicted.len());
            Ok(())
        });
    }

    let Some(word) = cli.word.as_deref() else {
        return Ok(());
    };
    let fetcher = YoudaoFetcher::new(FetchConfig {
        base_url: cli.base_url.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
        ..Default::default()
    });
    let options = ResolveOptions {
        bypass_cache: cli.no_cache,
        store_result: !cli.no_store,
    };
    let render_options = RenderOptions {
        verbose: cli.verbose,
        max_meanings: cli.max_meanings,
    };

    session(store, |cache| match resolve(cache, &fetcher, word, options) {
        Ok(resolution) => {
            tracing::debug!(source = ?resolution.source, "resolved");
            print!("{}", render::render_record(&resolution.record, &render_options));
            Ok(())
        }
        Err(ResolveError::Parse(failure)) => {
            print!("{}", render::render_failure(word, &failure, &render_options));
            Err(CliError::NotFound)
        }
        Err(e) => Err(e.into()),
    })
}

/// One cache session; a corrupt store is replaced on the next write.
fn session<T>(
    store: JsonFileStore,
    f: impl FnOnce(&mut BoundedWordCache<JsonFileStore>) -> Result<T, CliError>,
) -> Result<T, CliError> {
    BoundedWordCache::transact(store, OpenMode::ResetCorrupt, f)
}

fn default_cache_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_CACHE_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir).join("define");
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".cache").join("define"),
        None => PathBuf::from(".define"),
    }
}
