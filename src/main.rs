use clap::{Parser, Subcommand};
use comic::cache::Cache;
use comic::config::{self, ViewerConfig};
use comic::debounce::Debouncer;
use comic::imaging::{Bitmap, Placeholder};
use comic::navigator::{Navigator, PageList, Pager, Shelf};
use comic::{ingest, output};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

/// Root paths shared by the scanning commands.
#[derive(clap::Args, Clone)]
struct Roots {
    /// Directories, archives or images to open (default: current directory)
    paths: Vec<PathBuf>,
}

#[derive(Parser)]
#[command(name = "comic")]
#[command(about = "Browse folders and archives of images as books")]
#[command(long_about = "\
Browse folders and archives of images as books

Every directory holding images is a book, every archive (.zip, .cbz, .tar,
.cbt) is a book, and a loose image given on the command line is a book of
one page.
Files are recognized by their content, not their extension.

  comics/
  ├── cover.jpg            # page 1 of book \"comics\"
  ├── Saga/                # book \"Saga\"
  │   ├── 001.png
  │   └── vol1.cbz         # book \"vol1.cbz\", visited after Saga's own pages
  └── notes.txt            # ignored

Pages are copied into a local cache as they are found, so revisiting a
book never decompresses it twice.

Run 'comic gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Page cache directory, overrides `cache_dir` from the config
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Page through books read from stdin: n/Enter next, p previous,
    /// f first page of book, l last page of book, q quit
    Browse {
        /// Wait for the whole scan, then page over a flat list
        #[arg(long)]
        flat: bool,
        #[command(flatten)]
        roots: Roots,
    },
    /// Scan, fill the cache, and print every book
    List {
        /// Print the books as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        roots: Roots,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let (roots, browse_flat, json) = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        Command::Browse { flat, roots } => (roots, Some(flat), false),
        Command::List { json, roots } => (roots, None, json),
    };

    let config = load_config(cli.config.as_deref())?;
    init_thread_pool(&config.processing);
    let roots = resolve_roots(roots.paths)?;

    let cache_dir = cli.cache_dir.unwrap_or_else(|| config.cache_dir());
    let cache = Cache::open(&cache_dir)
        .inspect_err(|e| log::error!("cannot open cache in {}: {e}", cache_dir.display()))?;
    let cache = Arc::new(cache);

    match browse_flat {
        Some(flat) => browse(roots, &config, Arc::clone(&cache), flat)?,
        None => list(roots, Arc::clone(&cache), json)?,
    }

    close_cache(cache)?;
    Ok(())
}

/// Load the explicit config file, or `./config.toml` when present.
fn load_config(explicit: Option<&Path>) -> Result<ViewerConfig, config::ConfigError> {
    match explicit {
        Some(path) if !path.exists() => Err(config::ConfigError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("config file not found: {}", path.display()),
        ))),
        Some(path) => config::load_config(path),
        None => config::load_config(Path::new(config::CONFIG_FILENAME)),
    }
}

/// Default to the working directory and make every root absolute.
fn resolve_roots(paths: Vec<PathBuf>) -> io::Result<Vec<PathBuf>> {
    let paths = if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths
    };
    paths.iter().map(std::path::absolute).collect()
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .panic_handler(|_| log::error!("background cache write panicked"))
        .build_global()
        .ok();
}

fn lock(pager: &Mutex<Box<dyn Pager>>) -> MutexGuard<'_, Box<dyn Pager>> {
    pager.lock().unwrap_or_else(|e| e.into_inner())
}

fn browse(
    roots: Vec<PathBuf>,
    config: &ViewerConfig,
    cache: Arc<Cache>,
    flat: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (rx, ingest) = ingest::spawn(roots, Arc::clone(&cache))?;
    let shelf = Arc::new(Shelf::new());
    let consumer = {
        let shelf = Arc::clone(&shelf);
        std::thread::spawn(move || {
            shelf.consume(rx, |book| log::debug!("found {}", book.path));
        })
    };

    let pager: Box<dyn Pager> = if flat {
        shelf.wait_complete();
        Box::new(PageList::from_books(&shelf.snapshot()))
    } else {
        let navigator = Navigator::new(Arc::clone(&shelf));
        navigator.current_timeout(config.timing.wait());
        Box::new(navigator)
    };
    let pager = Arc::new(Mutex::new(pager));

    let show = {
        let pager = Arc::clone(&pager);
        let cache = Arc::clone(&cache);
        let window = config.viewer.size();
        move || {
            let (page, index, count) = {
                let pager = lock(&pager);
                (pager.current(), pager.index(), pager.count())
            };
            let bitmap = if page.is_waiting() {
                Bitmap::Placeholder(Placeholder::NotReady)
            } else {
                cache.image(&page)
            };
            output::print_page_status(&page, index, count, &bitmap, window);
        }
    };
    let debouncer = Debouncer::new(config.timing.debounce(), show);
    debouncer.call();

    for line in io::stdin().lock().lines() {
        let line = line?;
        {
            let mut pager = lock(&pager);
            match line.trim() {
                "" | "n" => pager.next(),
                "p" => pager.previous(),
                "f" => pager.start(),
                "l" => pager.end(),
                "q" => break,
                other => {
                    eprintln!("unknown command {other:?} (n, p, f, l, q)");
                    continue;
                }
            }
        }
        debouncer.call();
    }
    drop(debouncer);

    log::info!("waiting for the scan to finish");
    if consumer.join().is_err() {
        log::error!("shelf consumer panicked");
    }
    let in_flight = ingest.in_flight().clone();
    ingest.join();
    in_flight.wait();
    Ok(())
}

fn list(roots: Vec<PathBuf>, cache: Arc<Cache>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (rx, ingest) = ingest::spawn(roots, Arc::clone(&cache))?;
    let shelf = Shelf::new();
    shelf.consume(rx, |book| log::debug!("found {}", book.path));

    let in_flight = ingest.in_flight().clone();
    ingest.join();
    in_flight.wait();

    let books = shelf.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&books)?);
    } else {
        output::print_books(&books);
        println!("{}", output::format_cache_summary(cache.len(), cache.path()));
    }
    Ok(())
}

/// Close the store once every other holder is gone.
fn close_cache(cache: Arc<Cache>) -> Result<(), comic::cache::CacheError> {
    match Arc::try_unwrap(cache) {
        Ok(cache) => cache.close(),
        Err(cache) => {
            log::warn!("page cache still shared at shutdown, flushing instead");
            cache.flush()
        }
    }
}
