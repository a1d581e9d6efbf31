use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use inquire::{Confirm, Select, Text};
use std::{fmt, process::ExitCode, sync::Arc};

use weather_core::{
    Config, FavoritesStore, FileStorage, LocationCache, LocationData, LocationResolver,
    MemoryStorage, Providers, ResolveError, Resolution, Storage, Theme, ThemeStore,
    display::DailyView, providers_from_config,
};

use crate::render::Renderer;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Terminal weather dashboard")]
pub struct Cli {
    /// Log debug output to stderr.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Print without colours.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Keep cache, favorites and theme in memory for this run only.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Behave as if location access was refused.
    #[arg(long, global = true)]
    pub no_geolocation: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the dashboard for the cached, current or default location.
    Show {
        /// 10-day instead of 7-day forecast.
        #[arg(long)]
        extended: bool,
    },

    /// Ask for a fresh position, ignoring the cached one.
    Current {
        #[arg(long)]
        extended: bool,
    },

    /// Search for a place and show its weather.
    Search {
        query: String,

        /// Pick the N-th result (1-based) instead of prompting.
        #[arg(long)]
        pick: Option<usize>,

        #[arg(long)]
        extended: bool,
    },

    /// Manage favorite locations.
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },

    /// Show or change the colour theme.
    Theme {
        #[command(subcommand)]
        action: Option<ThemeCommand>,
    },

    /// Interactively choose the fallback city used when no position is available.
    Configure,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    List,
    Add {
        query: String,
        #[arg(long)]
        pick: Option<usize>,
    },
    Remove {
        name: String,
    },
    Toggle {
        query: String,
        #[arg(long)]
        pick: Option<usize>,
    },
    Show {
        name: String,
        #[arg(long)]
        extended: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ThemeCommand {
    Show,
    Toggle,
    Set { theme: String },
}

fn daily_view(extended: bool) -> DailyView {
    if extended {
        DailyView::Extended
    } else {
        DailyView::Week
    }
}

/// Everything a command needs, built once per invocation.
struct App {
    config: Config,
    storage: Arc<dyn Storage>,
    providers: Providers,
    renderer: Renderer,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let config = Config::load()?;

        let storage: Arc<dyn Storage> = if cli.ephemeral {
            Arc::new(MemoryStorage::new())
        } else {
            let storage = FileStorage::open_default()?;
            tracing::debug!("Using storage at {}", storage.dir().display());
            Arc::new(storage)
        };

        let providers = providers_from_config(&config, !cli.no_geolocation)
            .context("Failed to set up weather providers")?;

        let theme = ThemeStore::new(storage.clone()).load_or(Theme::default());
        let renderer = Renderer::new(theme, !cli.no_color);

        Ok(Self {
            config,
            storage,
            providers,
            renderer,
        })
    }

    fn resolver(&self) -> LocationResolver {
        LocationResolver::new(
            self.providers.weather.clone(),
            self.providers.reverse.clone(),
            self.providers.geolocator.clone(),
            LocationCache::new(self.storage.clone()),
            &self.config,
        )
    }

    fn favorites(&self) -> FavoritesStore {
        FavoritesStore::load(self.storage.clone())
    }

    /// Print the dashboard, or a red banner when resolution failed.
    fn present(&self, outcome: Result<Resolution, ResolveError>, view: DailyView) -> Result<ExitCode> {
        match outcome {
            Ok(resolution) => {
                let is_favorite = self.favorites().is_favorite(resolution.coordinate);
                let out = self
                    .renderer
                    .dashboard(&resolution, is_favorite, view, Utc::now())?;
                print!("{out}");
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                tracing::debug!("Resolution failed: {}", e);
                eprintln!("{}", self.renderer.error(e.user_message()));
                Ok(ExitCode::FAILURE)
            }
        }
    }

    /// Ranked search results; empty when the query is too short.
    async fn search(&self, query: &str) -> Result<Vec<LocationData>> {
        self.providers.search.search(query).await.map_err(|e| {
            let message = e.user_message();
            anyhow::Error::new(e).context(message)
        })
    }

    /// Search and choose one result, by index or interactively.
    async fn search_and_pick(&self, query: &str, pick: Option<usize>) -> Result<Option<LocationData>> {
        let results = self.search(query).await?;
        if results.is_empty() {
            println!("No locations found for '{}'.", query.trim());
            return Ok(None);
        }

        match pick {
            Some(n) => {
                let index = n.checked_sub(1).filter(|i| *i < results.len()).ok_or_else(|| {
                    anyhow!("--pick must be between 1 and {}", results.len())
                })?;
                Ok(results.into_iter().nth(index))
            }
            None => {
                let choices: Vec<SearchChoice> = results
                    .into_iter()
                    .map(|location| SearchChoice {
                        label: self.renderer.location_line(&location),
                        location,
                    })
                    .collect();
                let choice = Select::new("Select a location:", choices)
                    .prompt()
                    .context("Location selection cancelled")?;
                Ok(Some(choice.location))
            }
        }
    }
}

struct SearchChoice {
    label: String,
    location: LocationData,
}

impl fmt::Display for SearchChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl Cli {
    pub async fn run(self) -> Result<ExitCode> {
        let app = App::new(&self)?;

        match self.command {
            Command::Show { extended } => {
                let outcome = app.resolver().resolve_on_load().await;
                app.present(outcome, daily_view(extended))
            }
            Command::Current { extended } => {
                let outcome = app.resolver().use_current_location().await;
                app.present(outcome, daily_view(extended))
            }
            Command::Search {
                query,
                pick,
                extended,
            } => {
                let Some(location) = app.search_and_pick(&query, pick).await? else {
                    return Ok(ExitCode::SUCCESS);
                };
                let outcome = app.resolver().select_location(&location).await;
                app.present(outcome, daily_view(extended))
            }
            Command::Favorites { action } => run_favorites(&app, action).await,
            Command::Theme { action } => run_theme(&app, action),
            Command::Configure => configure(app).await,
        }
    }
}

async fn run_favorites(app: &App, action: FavoritesCommand) -> Result<ExitCode> {
    let favorites = app.favorites();
    let needs_saved = matches!(
        action,
        FavoritesCommand::Remove { .. } | FavoritesCommand::Show { .. }
    );
    if needs_saved && favorites.is_empty() {
        bail!("No favorite locations saved yet");
    }

    match action {
        FavoritesCommand::List => {
            print!("{}", app.renderer.favorites(&favorites.list())?);
            if !favorites.is_empty() {
                println!("{} saved", favorites.len());
            }
        }
        FavoritesCommand::Add { query, pick } => {
            if let Some(location) = app.search_and_pick(&query, pick).await? {
                let name = location.display_name();
                favorites.add(location, Utc::now())?;
                println!("★ Added {name} to favorites.");
            }
        }
        FavoritesCommand::Remove { name } => {
            let favorite = favorites
                .find_by_name(&name)
                .ok_or_else(|| anyhow!("No favorite named '{name}'"))?;
            favorites.remove(favorite.coordinate())?;
            println!("Removed {} from favorites.", favorite.location.display_name());
        }
        FavoritesCommand::Toggle { query, pick } => {
            if let Some(location) = app.search_and_pick(&query, pick).await? {
                let name = location.display_name();
                if favorites.toggle(location, Utc::now())? {
                    println!("★ Added {name} to favorites.");
                } else {
                    println!("Removed {name} from favorites.");
                }
            }
        }
        FavoritesCommand::Show { name, extended } => {
            let favorite = favorites
                .find_by_name(&name)
                .ok_or_else(|| anyhow!("No favorite named '{name}'"))?;
            let outcome = app.resolver().select_location(&favorite.location).await;
            return app.present(outcome, daily_view(extended));
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_theme(app: &App, action: Option<ThemeCommand>) -> Result<ExitCode> {
    let store = ThemeStore::new(app.storage.clone());

    match action.unwrap_or(ThemeCommand::Show) {
        ThemeCommand::Show => println!("Theme: {}", store.load_or(Theme::default())),
        ThemeCommand::Toggle => {
            let theme = store.toggle(Theme::default())?;
            println!("Theme switched to {theme}.");
        }
        ThemeCommand::Set { theme } => {
            let theme = Theme::try_from(theme.as_str())?;
            store.save(theme)?;
            println!("Theme set to {theme}.");
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn configure(app: App) -> Result<ExitCode> {
    let current = &app.config.default_location;
    println!(
        "Current default city: {} ({:.4}, {:.4})",
        current.name, current.latitude, current.longitude
    );

    let query = Text::new("Default city:")
        .with_help_message("Shown whenever your own location is unavailable")
        .prompt()
        .context("Configuration cancelled")?;

    let Some(location) = app.search_and_pick(&query, None).await? else {
        bail!("Default city unchanged");
    };

    let name = location.display_name();
    let confirmed = Confirm::new(&format!("Use {name} as the default city?"))
        .with_default(true)
        .prompt()
        .context("Configuration cancelled")?;
    if !confirmed {
        println!("Default city unchanged.");
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = app.config;
    config.set_default_location(name.clone(), location.coordinate());
    config.save()?;
    println!(
        "Saved {name} to {}",
        Config::config_file_path()?.display()
    );

    Ok(ExitCode::SUCCESS)
}
