//! tender-watch CLI
//!
//! Runs the discovery loop locally and edits the watch list.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tender_watch::{
    config::ConfigStore,
    error::{AppError, Result},
    models::{Settings, StoreId},
    pipeline::{self, CycleRunner, NotificationDedup, Scheduler},
    services::{HttpTransport, LogSink},
    storage::{LocalStorage, RecordStorage},
};

/// tender-watch - procurement listing watcher
#[derive(Parser, Debug)]
#[command(
    name = "tender-watch",
    version,
    about = "Watch tender listing pages for keyword matches"
)]
struct Cli {
    /// Path to the settings file
    #[arg(long, default_value = "settings.toml")]
    settings: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the discovery loop until Ctrl-C; watch list edits apply from the next cycle
    Run,

    /// Run a single discovery cycle and print its report
    Once,

    /// Validate the settings and the watch list
    Validate,

    /// Show paths, the watch list and store sizes
    Info,

    /// List persisted records
    Results {
        /// Store to list
        #[arg(long, default_value = "matched")]
        store: StoreId,
    },

    /// Add or remove watched sites
    Site {
        #[command(subcommand)]
        action: SiteAction,
    },

    /// Add or remove CSS selectors of a site
    Selector {
        #[command(subcommand)]
        action: SelectorAction,
    },

    /// Add or remove keywords
    Keyword {
        #[command(subcommand)]
        action: KeywordAction,
    },

    /// Set the wait between cycles, in seconds
    Interval { secs: u64 },
}

#[derive(Subcommand, Debug)]
enum SiteAction {
    Add { url: String },
    Remove { url: String },
}

#[derive(Subcommand, Debug)]
enum SelectorAction {
    Add { url: String, selector: String },
    Remove { url: String, selector: String },
}

#[derive(Subcommand, Debug)]
enum KeywordAction {
    Add { keyword: String },
    Remove { keyword: String },
}

/// How often `run` checks the watch list file for edits.
const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Initialize logging. `RUST_LOG` overrides the given level.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Load settings before the logger exists; report the outcome once it does.
fn load_settings(path: &Path, verbose: bool) -> Settings {
    let loaded = path.exists().then(|| Settings::load(path));

    let level = match (&loaded, verbose) {
        (_, true) => "debug".to_string(),
        (Some(Ok(settings)), false) => settings.logging.level.clone(),
        _ => "info".to_string(),
    };
    init_logging(&level);

    match loaded {
        Some(Ok(settings)) => {
            log::debug!("Loaded settings from {}", path.display());
            settings
        }
        Some(Err(e)) => {
            log::warn!(
                "Settings load failed from {}: {}. Using defaults.",
                path.display(),
                e
            );
            Settings::default()
        }
        None => {
            log::debug!("No settings file at {}, using defaults", path.display());
            Settings::default()
        }
    }
}

fn build_runner(settings: &Settings, storage: Arc<LocalStorage>) -> Result<CycleRunner> {
    let transport = HttpTransport::from_config(&settings.crawler)?;
    Ok(CycleRunner::new(Arc::new(transport), storage, Arc::new(LogSink))
        .with_fetch_timeout(Duration::from_secs(settings.crawler.timeout_secs)))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli.settings, cli.verbose);

    let config_store = ConfigStore::new(&settings.paths.config_file);
    let storage = Arc::new(LocalStorage::new(&settings.paths.data_dir));

    match cli.command {
        Command::Run => {
            let shared = pipeline::share(config_store.load());
            let mut scheduler = Scheduler::new(build_runner(&settings, Arc::clone(&storage))?);
            scheduler.start(Arc::clone(&shared))?;

            log::info!("Press Ctrl-C to stop");
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);
            let mut poll = tokio::time::interval(CONFIG_POLL_INTERVAL);
            let mut last_error = None;

            loop {
                tokio::select! {
                    result = &mut ctrl_c => {
                        result?;
                        break;
                    }
                    _ = poll.tick() => match config_store.reload_into(&shared) {
                        Ok(_) => last_error = None,
                        Err(e) => {
                            let message = e.to_string();
                            if last_error.as_ref() != Some(&message) {
                                log::warn!("Keeping the current watch list: {}", message);
                                last_error = Some(message);
                            }
                        }
                    },
                }
            }

            scheduler.shutdown().await;
        }

        Command::Once => {
            let config = config_store.load();
            config.validate_for_run().map_err(AppError::validation)?;

            let runner = build_runner(&settings, Arc::clone(&storage))?;
            let report = runner.run_cycle(&config, &mut NotificationDedup::new()).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = settings.validate() {
                log::error!("Settings validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Settings OK");

            if !config_store.path().exists() {
                return Err(AppError::config(format!(
                    "watch list not found at {}",
                    config_store.path().display()
                )));
            }
            let config = config_store.try_load()?;
            if let Err(e) = config.validate_for_run() {
                log::error!("Watch list is not ready to run: {}", e);
                return Err(AppError::validation(e));
            }
            log::info!(
                "✓ Watch list OK ({} sites, {} selectors, {} keywords)",
                config.sites.len(),
                config.selector_count(),
                config.keywords.len()
            );
        }

        Command::Info => {
            let config = config_store.load();
            log::info!("Settings file: {}", cli.settings.display());
            log::info!("Watch list: {}", config_store.path().display());
            log::info!("Data directory: {}", storage.root_dir().display());

            for site in &config.sites {
                log::info!("Site {} ({} selectors)", site.url, site.selectors.len());
                for selector in &site.selectors {
                    log::info!("  {}", selector);
                }
            }
            log::info!("Keywords: {}", config.keywords.join(", "));
            log::info!("Loop time: {} s", config.interval_secs);

            for store in StoreId::ALL {
                match storage.load(store).await {
                    Ok(records) => log::info!("Store {}: {} records", store, records.len()),
                    Err(e) => log::warn!("Store {}: {}", store, e),
                }
            }
        }

        Command::Results { store } => {
            let records = storage.load(store).await?;
            if records.is_empty() {
                log::info!("No records in {}", store);
            }
            for record in &records {
                println!("{}", record.format("{index}\t{first_seen}\t{title}\t{link}"));
            }
        }

        Command::Site { action } => match action {
            SiteAction::Add { url } => {
                config_store.update(|c| c.add_site(&url))?;
                log::info!("Added site {}", url);
            }
            SiteAction::Remove { url } => {
                config_store.update(|c| c.remove_site(&url).map(|_| ()))?;
                log::info!("Removed site {}", url);
            }
        },

        Command::Selector { action } => match action {
            SelectorAction::Add { url, selector } => {
                config_store.update(|c| c.add_selector(&url, &selector))?;
                log::info!("Added selector {} to {}", selector, url);
            }
            SelectorAction::Remove { url, selector } => {
                config_store.update(|c| c.remove_selector(&url, &selector))?;
                log::info!("Removed selector {} from {}", selector, url);
            }
        },

        Command::Keyword { action } => match action {
            KeywordAction::Add { keyword } => {
                config_store.update(|c| c.add_keyword(&keyword))?;
                log::info!("Added keyword {}", keyword);
            }
            KeywordAction::Remove { keyword } => {
                config_store.update(|c| c.remove_keyword(&keyword))?;
                log::info!("Removed keyword {}", keyword);
            }
        },

        Command::Interval { secs } => {
            config_store.update(|c| c.set_interval(secs))?;
            log::info!("Loop time set to {} s", secs);
        }
    }

    Ok(())
}
