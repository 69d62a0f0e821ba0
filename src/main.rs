//! Hockey features CLI
//!
//! Scrapes swehockey schedules and derives per-team game features.

use clap::{Parser, Subcommand};
use hockey::export::OutputFormat;
use hockey::{Config, Result, RollingPolicy};

#[derive(Parser)]
#[command(name = "hockey")]
#[command(about = "Swedish ice hockey schedule scraping and feature derivation", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Derive the per-team feature table from stored schedule rows
    Features {
        /// Raw rows file (defaults to data.rows_path)
        #[arg(long)]
        input: Option<String>,
        /// Output file (defaults to data.features_path)
        #[arg(long)]
        output: Option<String>,
        /// Output format; guessed from the extension when omitted
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Override the rolling window size
        #[arg(long)]
        window: Option<usize>,
        /// Override the rolling policy (partial, fill-zero, strict)
        #[arg(long)]
        policy: Option<String>,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Fetch schedule pages and store their raw rows
    Sync {
        /// Schedule ids to fetch (defaults to scraper.schedules)
        #[arg(long = "schedule")]
        schedules: Vec<String>,
        /// Cache directory for HTML files (defaults to data.cache_dir)
        #[arg(long)]
        cache: Option<String>,
        /// Use only cached files (no network requests)
        #[arg(long)]
        offline: bool,
    },
    /// Parse cached schedule pages directly
    ParseCache {
        /// Directory containing cached HTML files
        dir: String,
    },
    /// Fetch event logs and shot summaries for games
    Events {
        /// Game ids; defaults to every game id in the stored rows
        game_ids: Vec<String>,
        /// Directory for events.csv and summaries.csv
        #[arg(long, default_value = "data")]
        output_dir: String,
    },
    /// Show stored data status
    Status,
}

fn parse_policy(s: &str) -> Result<RollingPolicy> {
    match s.to_lowercase().replace('-', "_").as_str() {
        "partial" => Ok(RollingPolicy::Partial),
        "fill_zero" => Ok(RollingPolicy::FillZero),
        "strict" => Ok(RollingPolicy::Strict),
        other => Err(hockey::HockeyError::Config(format!(
            "Unknown rolling policy: {}. Use partial, fill-zero or strict.",
            other
        ))),
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Sync {
                schedules,
                cache,
                offline,
            } => commands::data_sync(&config, schedules, cache, offline),
            DataCommands::ParseCache { dir } => commands::parse_cache(&config, &dir),
            DataCommands::Events {
                game_ids,
                output_dir,
            } => commands::data_events(&config, game_ids, &output_dir),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Features {
            input,
            output,
            format,
            window,
            policy,
        } => commands::features(&config, input, output, format, window, policy),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use hockey::data::events::group_by_game;
    use hockey::data::scrapers::{ScheduleSource, SwehockeyScraper};
    use hockey::export;
    use hockey::features::FeaturePipeline;
    use hockey::{HockeyError, ScheduleId};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.cache_dir)?;
        println!("Created {}/", config.data.cache_dir);

        println!("\nNext steps:");
        println!("  1. Add schedule ids to [scraper] schedules in {}", config_path);
        println!("  2. Run 'hockey data sync' to fetch schedule pages");
        println!("  3. Run 'hockey features' to derive the feature table");

        Ok(())
    }

    fn scraper(config: &Config, cache: Option<String>, offline: bool) -> Result<SwehockeyScraper> {
        let cache_dir = cache.unwrap_or_else(|| config.data.cache_dir.clone());
        println!("Using cache directory: {}", cache_dir);
        let mut scraper = SwehockeyScraper::new(&config.scraper)?.with_cache(&cache_dir);
        if offline {
            println!("Offline mode: using cached files only");
            scraper = scraper.offline_only(true);
        }
        Ok(scraper)
    }

    pub fn data_sync(
        config: &Config,
        schedules: Vec<String>,
        cache: Option<String>,
        offline: bool,
    ) -> Result<()> {
        let ids: Vec<ScheduleId> = if schedules.is_empty() {
            config.scraper.schedules.iter().map(ScheduleId::new).collect()
        } else {
            schedules.into_iter().map(ScheduleId::new).collect()
        };

        if ids.is_empty() {
            return Err(HockeyError::Config(
                "No schedules given. Pass --schedule or set scraper.schedules.".to_string(),
            ));
        }

        let scraper = scraper(config, cache, offline)?;
        let batches = scraper.fetch_all(&ids);
        let rows: usize = batches.iter().map(Vec::len).sum();
        println!("Fetched {} rows from {} schedules", rows, batches.len());

        export::save_rows(&config.data.rows_path, &batches)?;
        println!("Stored rows in {}", config.data.rows_path);
        Ok(())
    }

    pub fn parse_cache(config: &Config, dir: &str) -> Result<()> {
        println!("Parsing cached HTML files from {}...", dir);
        let scraper = SwehockeyScraper::new(&config.scraper)?;
        let batches = scraper.parse_directory(dir)?;
        let rows: usize = batches.iter().map(Vec::len).sum();
        println!("Found {} rows in {} schedules", rows, batches.len());

        if rows == 0 {
            println!("No rows found. Check the HTML files or parser logic.");
            return Ok(());
        }

        export::save_rows(&config.data.rows_path, &batches)?;
        println!("Stored rows in {}", config.data.rows_path);
        Ok(())
    }

    pub fn data_events(config: &Config, game_ids: Vec<String>, output_dir: &str) -> Result<()> {
        let game_ids = if game_ids.is_empty() {
            let mut ids: Vec<String> = export::load_rows(&config.data.rows_path)?
                .into_iter()
                .flatten()
                .filter_map(|row| row.game_id)
                .collect();
            ids.sort();
            ids.dedup();
            ids
        } else {
            game_ids
        };

        let scraper = scraper(config, None, false)?;
        let mut events = Vec::new();
        let mut summaries = Vec::new();
        for game_id in &game_ids {
            match scraper.fetch_game(game_id) {
                Ok((game_events, summary)) => {
                    events.extend(game_events);
                    summaries.extend(summary);
                }
                Err(e) => log::warn!("Failed to fetch game {}: {}", game_id, e),
            }
        }

        let total = events.len();
        let grouped = group_by_game(events);
        for (game_id, game_events) in &grouped {
            log::debug!("Game {}: {} timed events", game_id, game_events.len());
        }
        println!("Collected {} events from {} games", total, grouped.len());
        let events: Vec<_> = grouped.into_values().flatten().collect();

        let dir = std::path::Path::new(output_dir);
        export::save_events(dir.join("events.csv"), &events)?;
        export::save_summaries(dir.join("summaries.csv"), &summaries)?;
        println!("Wrote events.csv and summaries.csv to {}", output_dir);
        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let path = &config.data.rows_path;
        println!("Data Status");
        println!("───────────────────────────────");
        println!("  Rows file: {}", path);

        if !std::path::Path::new(path).exists() {
            println!("  (missing) run 'hockey data sync' first");
            return Ok(());
        }

        let batches = export::load_rows(path)?;
        let pipeline = FeaturePipeline::new(config.features.clone());
        let batch = pipeline.normalize(&batches);

        println!("  Schedules: {}", batches.len());
        println!("  Games:     {}", batch.games.len());
        println!("  Played:    {}", batch.games.iter().filter(|g| g.is_played()).count());
        println!("  Rejected:  {}", batch.rejected.len());
        let dates = batch.games.iter().map(|g| g.date);
        if let (Some(earliest), Some(latest)) = (dates.clone().min(), dates.max()) {
            println!("  Range:     {} to {}", earliest, latest);
        }
        Ok(())
    }

    pub fn features(
        config: &Config,
        input: Option<String>,
        output: Option<String>,
        format: Option<OutputFormat>,
        window: Option<usize>,
        policy: Option<String>,
    ) -> Result<()> {
        let mut feature_config = config.features.clone();
        if let Some(w) = window {
            if w == 0 {
                return Err(HockeyError::Config("--window must be at least 1".to_string()));
            }
            feature_config.window = w;
        }
        if let Some(p) = policy {
            feature_config.rolling_policy = parse_policy(&p)?;
        }

        let input = input.unwrap_or_else(|| config.data.rows_path.clone());
        let output = output.unwrap_or_else(|| config.data.features_path.clone());
        let format = format.unwrap_or_else(|| OutputFormat::from_path(&output));

        let batches = export::load_rows(&input)?;
        println!("Loaded {} schedules from {}", batches.len(), input);

        let pipeline = FeaturePipeline::new(feature_config);
        let result = pipeline.run(&batches)?;
        println!(
            "Normalized {} games ({} rows rejected)",
            result.batch.games.len(),
            result.batch.rejected.len()
        );

        export::save_features(&output, &result.rows, pipeline.config().lags, format)?;
        println!("Wrote {} feature rows to {}", result.rows.len(), output);
        Ok(())
    }
}
