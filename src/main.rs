//! Meteopin host: pins coordinates, caches their weather and prints the
//! dashboard to the terminal.
//!
//! ```sh
//! meteopin add 56.8389 60.6057
//! meteopin list
//! meteopin show-on-map 1760000000000
//! meteopin clear --yes
//! ```

mod console;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meteopin_core::{AppError, Config};
use meteopin_weather::WeatherProvider;
use meteopin_widgets::{
    CardList, FileKeyValueStore, MarkerLayer, RefreshPolicy, WidgetId, WidgetLifecycleEngine,
    WidgetStore,
};

use crate::console::{ConsoleMap, ConsolePresenter};

/// Weather pins on a terminal dashboard
#[derive(Parser, Debug)]
#[command(name = "meteopin")]
#[command(about = "Pin coordinates and keep their current weather at hand")]
struct Cli {
    /// Run without the map (list-only mode)
    #[arg(long)]
    no_map: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh stale widgets and print every card
    List,
    /// Pin a new coordinate
    Add {
        #[arg(allow_hyphen_values = true)]
        latitude: String,
        #[arg(allow_hyphen_values = true)]
        longitude: String,
    },
    /// Fetch fresh weather for one widget
    Refresh { id: i64 },
    /// Remove one widget
    Delete { id: i64 },
    /// Remove every widget
    Clear {
        /// Confirm removal of all widgets
        #[arg(long)]
        yes: bool,
    },
    /// Centre the map on a widget
    FlyTo { id: i64 },
    /// Centre the map on a widget and open its marker details
    ShowOnMap { id: i64 },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    meteopin_core::init()?;

    let (config, _) = Config::load_validated().context("Failed to load configuration")?;

    let storage = FileKeyValueStore::new(&config.widgets.data_dir)
        .with_context(|| format!("Failed to open data dir {:?}", config.widgets.data_dir))?;
    let store = WidgetStore::open(Box::new(storage), config.widgets.duplicate_tolerance);
    let provider =
        WeatherProvider::from_config(&config.weather).context("Failed to create weather client")?;
    let engine = WidgetLifecycleEngine::new(
        store,
        Arc::new(provider),
        RefreshPolicy::new(config.widgets.cache_duration()),
    );

    let cards = Arc::new(CardList::new(ConsolePresenter::default()));
    engine.subscribe(cards.clone());

    if cli.no_map {
        tracing::info!("Map disabled, running in list-only mode");
    } else {
        let layer = Arc::new(MarkerLayer::new(
            Arc::new(ConsoleMap::default()),
            &config.map,
        ));
        if let Err(e) = layer.init(&engine.widgets()).await {
            report(e.into());
        }
        engine.subscribe(layer);
    }

    tracing::info!("Meteopin started");

    let summary = engine.bootstrap_refresh().await;
    tracing::debug!(?summary, "Startup refresh finished");

    run(&engine, cli.command.unwrap_or(Command::List)).await;

    cards.adapter().print();
    Ok(())
}

async fn run(engine: &WidgetLifecycleEngine, command: Command) {
    match command {
        Command::List => {}
        Command::Add {
            latitude,
            longitude,
        } => match engine.create_widget_from_input(&latitude, &longitude).await {
            Ok(Some(widget)) => println!("Added widget {}", widget.id()),
            Ok(None) => eprintln!("Another widget is still being created"),
            Err(e) => report(e.into()),
        },
        Command::Refresh { id } => {
            if engine.refresh_widget(WidgetId::new(id)).await.is_none() {
                eprintln!("No widget with id {}", id);
            }
        }
        Command::Delete { id } => {
            if !engine.delete_widget(WidgetId::new(id)) {
                eprintln!("No widget with id {}", id);
            }
        }
        Command::Clear { yes } => {
            if !engine.clear_all(|| yes) {
                eprintln!("Pass --yes to remove all widgets");
            }
        }
        Command::FlyTo { id } => {
            if !engine.fly_to(WidgetId::new(id)) {
                eprintln!("No widget with id {}", id);
            }
        }
        Command::ShowOnMap { id } => {
            if !engine.show_on_map(WidgetId::new(id)) {
                eprintln!("No widget with id {}", id);
            }
        }
    }
}

fn report(error: AppError) {
    tracing::debug!("{}", error);
    eprintln!("{}", error.user_message());
}
