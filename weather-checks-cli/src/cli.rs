use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use rand::{SeedableRng, rngs::StdRng};
use std::path::{Path, PathBuf};

use weather_checks_core::{
    Config, CrossCheckOutcome, HttpWeatherClient, MergeOutcome, Pipeline, ScrapeClient,
    WeatherRecord, WeatherStore,
    config::{DEFAULT_BASE_URL, find_root_directory},
    pipeline::{CROSS_CHECK_CITY, DEFAULT_CITY, DEFAULT_COUNTRY, DEFAULT_RANDOM_COUNT, FIXED_CITIES},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-checks", version, about = "Weather API, database and website cross-checks")]
pub struct Cli {
    /// Log at debug level, with source locations.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Directory to start looking for the project root from.
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the API base URL and key to the project config.
    Configure,

    /// Fetch one city, store it and verify the stored row.
    RoundTrip {
        #[arg(long, default_value = DEFAULT_CITY)]
        city: String,
    },

    /// Fetch a fixed list of cities, report the hottest and verify each row.
    FixedList {
        /// City to fetch; repeat for several. Defaults to the built-in list.
        #[arg(long = "city")]
        cities: Vec<String>,
    },

    /// Store random cities of a country until enough succeed.
    Random {
        #[arg(long, default_value = DEFAULT_COUNTRY)]
        country: String,

        #[arg(long, default_value_t = DEFAULT_RANDOM_COUNT)]
        count: usize,

        /// Seed for reproducible picks.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Scrape a city's weather page and merge it onto the stored record.
    CrossCheck {
        #[arg(long, default_value = CROSS_CHECK_CITY)]
        city: String,
    },

    /// Print stored records as JSON.
    Show {
        #[arg(long, conflicts_with_all = ["name", "all"])]
        id: Option<i64>,

        #[arg(long, conflicts_with = "all")]
        name: Option<String>,

        #[arg(long)]
        all: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        if let Command::Configure = self.command {
            return configure(&self.root);
        }

        let config = Config::load(&self.root)?;
        let store = WeatherStore::open(&config.database_path())?;

        if let Command::Show { id, name, all } = &self.command {
            return show(&store, *id, name.as_deref(), *all);
        }

        let pipeline = Pipeline::new(HttpWeatherClient::new(&config)?, store);

        match self.command {
            Command::RoundTrip { city } => {
                let report = pipeline.round_trip(&city).await?;
                println!(
                    "{} (id {}): temperature {}, feels like {} ({:?}, verified at {})",
                    report.record.city_name,
                    report.record.city_id,
                    report.record.temperature,
                    report.record.feels_like,
                    report.outcome,
                    report.record.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
                );
            }
            Command::FixedList { cities } => {
                let report = if cities.is_empty() {
                    pipeline.fixed_cities(FIXED_CITIES).await?
                } else {
                    pipeline.fixed_cities(cities.as_slice()).await?
                };

                for weather in &report.stored {
                    println!("{:<16} average {:>8.2}", weather.city_name, weather.average);
                }
                for city in &report.skipped {
                    println!("{city:<16} skipped");
                }
                if let Some(hottest) = &report.hottest {
                    println!("Highest average temperature: {}", hottest.city_name);
                }
            }
            Command::Random { country, count, seed } => {
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                let stored = pipeline.random_cities(&country, count, &mut rng).await?;
                for weather in &stored {
                    println!("{} (id {})", weather.city_name, weather.city_id);
                }
            }
            Command::CrossCheck { city } => {
                let scraper = ScrapeClient::new(&config)?;
                match pipeline.scrape_cross_check(&city, &scraper).await? {
                    CrossCheckOutcome::NoCityPath { city } => {
                        println!("No weather page found for {city}");
                    }
                    CrossCheckOutcome::NoBaseRecord { city_name } => {
                        println!("No stored record named {city_name}; nothing merged");
                    }
                    CrossCheckOutcome::Merged { city_id, city_name, outcome } => match outcome {
                        MergeOutcome::Merged { applied, ignored } => println!(
                            "{city_name} (id {city_id}): merged {applied} fields, ignored {ignored:?}"
                        ),
                        other => println!("{city_name} (id {city_id}): {other:?}"),
                    },
                }
            }
            Command::Configure | Command::Show { .. } => {}
        }

        Ok(())
    }
}

fn configure(start: &Path) -> anyhow::Result<()> {
    let root = find_root_directory(start)?;
    let existing = Config::load_from_root(root.clone()).ok();

    let default_url = existing
        .as_ref()
        .map(|cfg| cfg.api.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let base_url = Text::new("Weather API base URL:")
        .with_default(&default_url)
        .prompt()
        .context("Failed to read base URL")?;

    let api_key = Password::new("API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let cfg = match existing {
        Some(mut cfg) => {
            cfg.api.base_url = base_url;
            cfg.api.api_key = api_key;
            cfg
        }
        None => Config::new(root, base_url, api_key),
    };

    cfg.save()?;
    println!("Saved configuration to {}", cfg.config_file_path().display());
    Ok(())
}

fn show(store: &WeatherStore, id: Option<i64>, name: Option<&str>, all: bool) -> anyhow::Result<()> {
    let records: Vec<WeatherRecord> = match (id, name) {
        (Some(id), _) => store.get_by_city_id(id)?.into_iter().collect(),
        (None, Some(name)) => store.get_by_city_name(name)?.into_iter().collect(),
        (None, None) if all => store.all()?,
        (None, None) => anyhow::bail!("Pass one of --id, --name or --all"),
    };

    if records.is_empty() {
        println!("No matching records");
        return Ok(());
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&records).context("Failed to format records")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn round_trip_defaults_to_rome() {
        let cli = Cli::try_parse_from(["weather-checks", "round-trip"]).unwrap();
        assert!(matches!(cli.command, Command::RoundTrip { city } if city == "Rome"));
    }

    #[test]
    fn random_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "weather-checks", "random", "--country", "Italy", "--count", "3", "--seed", "7",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Random { ref country, count: 3, seed: Some(7) } if country == "Italy"
        ));
    }

    #[test]
    fn fixed_list_collects_repeated_cities() {
        let cli =
            Cli::try_parse_from(["weather-checks", "fixed-list", "--city", "Oslo", "--city", "Rome"])
                .unwrap();
        match cli.command {
            Command::FixedList { cities } => assert_eq!(cities, vec!["Oslo", "Rome"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn show_id_conflicts_with_name() {
        let err = Cli::try_parse_from(["weather-checks", "show", "--id", "1", "--name", "Rome"]);
        assert!(err.is_err());
    }
}
