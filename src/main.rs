mod app;
mod event;

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use vocabdrill::catalog::Catalog;
use vocabdrill::config::Config;
use vocabdrill::session::driver::SessionDriver;
use vocabdrill::store::json_store::JsonStore;
use vocabdrill::store::schema::ExportData;
use vocabdrill::store::{KeyValueStore, MemoryStore};

use app::App;
use event::{AppEvent, EventHandler};

#[derive(Parser)]
#[command(name = "vocabdrill", version, about = "Adaptive vocabulary quiz in the terminal")]
struct Cli {
    #[arg(long, help = "Load the catalog from a JSON file")]
    catalog: Option<PathBuf>,

    #[arg(short = 'n', long, help = "Bundled or user catalog name")]
    catalog_name: Option<String>,

    #[arg(long, help = "Fetch the catalog from a URL")]
    catalog_url: Option<String>,

    #[arg(long, help = "List bundled catalogs and exit")]
    list_catalogs: bool,

    #[arg(short, long, help = "Questions per round")]
    rounds: Option<usize>,

    #[arg(short, long, help = "Start with this topic selected (\"All\" for every topic)")]
    topic: Option<String>,

    #[arg(long, help = "Disable adaptive selection")]
    no_adaptive: bool,

    #[arg(long, help = "Auto-advance delay after an answer, 0 to disable")]
    auto_advance_ms: Option<u64>,

    #[arg(long, help = "Keep stats in memory only")]
    memory: bool,

    #[arg(long, help = "Seed for question selection")]
    seed: Option<u64>,

    #[arg(long, help = "Write all stored stats to a JSON file and exit")]
    export: Option<PathBuf>,

    #[arg(long, help = "Replace stored stats from an exported JSON file and exit")]
    import: Option<PathBuf>,

    #[arg(long, help = "Write the effective configuration to the config file")]
    save_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if cli.list_catalogs {
        for name in Catalog::bundled_names() {
            println!("{name}");
        }
        return Ok(());
    }

    if let Some(path) = &cli.export {
        let store = JsonStore::new()?;
        let data = store.export_all();
        fs::write(path, serde_json::to_string_pretty(&data)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("exported {} entries to {}", data.entries.len(), path.display());
        return Ok(());
    }
    if let Some(path) = &cli.import {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let data: ExportData = serde_json::from_str(&content)?;
        let mut store = JsonStore::new()?;
        store.import_all(&data)?;
        println!("imported {} entries", data.entries.len());
        return Ok(());
    }

    let mut config = Config::load().unwrap_or_else(|e| {
        log::warn!("Could not load config, using defaults: {e}");
        Config::default()
    });
    if let Some(rounds) = cli.rounds {
        config.round_size = rounds;
    }
    if let Some(ms) = cli.auto_advance_ms {
        config.auto_advance_ms = ms;
    }
    if cli.no_adaptive {
        config.adaptive_enabled = false;
    }
    if let Some(name) = &cli.catalog_name {
        config.catalog = name.clone();
    }
    config.validate();
    if cli.save_config {
        config.save()?;
    }

    let catalog = load_catalog(&cli, &config)?;
    log::info!("Loaded {} terms", catalog.len());

    let store: Box<dyn KeyValueStore> = if cli.memory {
        Box::new(MemoryStore::new())
    } else {
        match JsonStore::new() {
            Ok(store) => Box::new(store),
            Err(e) => {
                log::warn!("Stats will not be saved: {e:#}");
                Box::new(MemoryStore::new())
            }
        }
    };

    let mut session = SessionDriver::new(catalog, store, config.session_config());
    if let Some(seed) = cli.seed {
        session = session.seeded(seed);
    }
    if let Some(topic) = &cli.topic {
        if !session.catalog().has_topic(topic) {
            bail!("unknown topic: {topic}");
        }
        session.set_topic(Some(topic.as_str()))?;
    }

    let mut app = App::with_session(session);
    let events = EventHandler::new(Duration::from_millis(100));
    run_app(&mut app, &events)
}

fn load_catalog(cli: &Cli, config: &Config) -> Result<Catalog> {
    let catalog = if let Some(path) = &cli.catalog {
        Catalog::from_path(path)?
    } else if let Some(url) = &cli.catalog_url {
        Catalog::fetch(url)?
    } else {
        Catalog::load(&config.catalog)?
    };
    Ok(catalog)
}

fn run_app(app: &mut App, events: &EventHandler) -> Result<()> {
    let mut stdout = io::stdout();
    loop {
        let out = app.take_output();
        if !out.is_empty() {
            stdout.write_all(out.as_bytes())?;
            stdout.flush()?;
        }

        match events.next()? {
            AppEvent::Line(line) => app.handle_line(&line),
            AppEvent::Tick => app.handle_tick(),
            AppEvent::Eof => app.should_quit = true,
        }

        if app.should_quit {
            let out = app.take_output();
            stdout.write_all(out.as_bytes())?;
            return Ok(());
        }
    }
}
