//! The checks: fetch, normalize, persist, re-read and compare.

use anyhow::Result;
use rand::{Rng, seq::SliceRandom};
use std::collections::HashSet;

use crate::{
    client::WeatherSource,
    error::CheckError,
    model::{CityWeather, WeatherRecord},
    scrape::{ScrapeClient, extract_city_name_from_heading},
    store::{MergeOutcome, UpsertOutcome, WeatherStore},
    verify::{verify_record, verify_temperatures},
};

pub const DEFAULT_CITY: &str = "Rome";
pub const FIXED_CITIES: &[&str] = &["Milan", "Paris", "London", "New York", "Tokyo", "Sydney"];
pub const DEFAULT_COUNTRY: &str = "Israel";
pub const DEFAULT_RANDOM_COUNT: usize = 5;
pub const CROSS_CHECK_CITY: &str = "London";

/// Attempts allowed on top of the requested number of random cities.
pub const EXTRA_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct RoundTripReport {
    pub weather: CityWeather,
    pub outcome: UpsertOutcome,
    pub record: WeatherRecord,
}

#[derive(Debug, Clone, Default)]
pub struct FixedListReport {
    pub stored: Vec<CityWeather>,
    pub skipped: Vec<String>,
    pub hottest: Option<CityWeather>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CrossCheckOutcome {
    /// The completion endpoint had no weather page for the city.
    NoCityPath { city: String },
    Merged {
        city_id: i64,
        city_name: String,
        outcome: MergeOutcome,
    },
    /// The page was scraped but nothing is stored under its city name.
    NoBaseRecord { city_name: String },
}

/// City with the highest average; the first one wins a tie.
pub fn hottest_city(cities: &[CityWeather]) -> Option<&CityWeather> {
    cities
        .iter()
        .reduce(|best, city| if city.average > best.average { city } else { best })
}

#[derive(Debug)]
pub struct Pipeline<S> {
    source: S,
    store: WeatherStore,
}

impl<S: WeatherSource> Pipeline<S> {
    pub fn new(source: S, store: WeatherStore) -> Self {
        Self { source, store }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &WeatherStore {
        &self.store
    }

    /// Fetch one city and upsert it. Cities the API refuses or answers with
    /// an unusable payload are logged and skipped with `Ok(None)`.
    pub async fn fetch_and_store(&self, city: &str) -> Result<Option<CityWeather>> {
        let response = self.source.fetch_current_weather(city).await?;
        if !response.is_ok() {
            tracing::warn!(
                "Failed to fetch weather data for {city}, status code: {}",
                response.status
            );
            return Ok(None);
        }

        let payload = match response.json() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Weather payload for {city} is not valid JSON ({e}). Skipping processing.");
                return Ok(None);
            }
        };

        let weather = match CityWeather::from_payload(&payload, city) {
            Ok(weather) => weather,
            Err(e) => {
                tracing::warn!("Skipping {city}: {e}");
                return Ok(None);
            }
        };

        self.store.upsert_weather(
            weather.city_id,
            &weather.city_name,
            weather.temperature,
            weather.feels_like,
            Some(weather.average),
        )?;

        tracing::info!("Weather data for {city} fetched and processed.");
        Ok(Some(weather))
    }

    /// Fetch one city, store it, read it back by id and compare.
    pub async fn round_trip(&self, city: &str) -> Result<RoundTripReport> {
        let response = self.source.fetch_current_weather(city).await?;
        if !response.is_ok() {
            return Err(CheckError::Status { city: city.to_string(), status: response.status }.into());
        }

        let payload = response.json().map_err(|e| CheckError::InvalidJson {
            city: city.to_string(),
            reason: e.to_string(),
        })?;

        let weather = CityWeather::from_payload(&payload, city).map_err(|source| {
            CheckError::Normalize { city: city.to_string(), source }
        })?;

        let outcome = self.store.upsert_weather(
            weather.city_id,
            &weather.city_name,
            weather.temperature,
            weather.feels_like,
            Some(weather.average),
        )?;

        let record = self
            .store
            .get_by_city_id(weather.city_id)?
            .ok_or(CheckError::MissingRecord { city_id: weather.city_id })?;

        verify_temperatures(&record, weather.temperature, weather.feels_like)?;

        Ok(RoundTripReport { weather, outcome, record })
    }

    /// Store every listed city that can be fetched, report the hottest one
    /// and verify each stored row.
    pub async fn fixed_cities<C: AsRef<str>>(&self, cities: &[C]) -> Result<FixedListReport> {
        let mut report = FixedListReport::default();

        for city in cities {
            let city = city.as_ref();
            match self.fetch_and_store(city).await? {
                Some(weather) => report.stored.push(weather),
                None => report.skipped.push(city.to_string()),
            }
        }

        report.hottest = hottest_city(&report.stored).cloned();
        if let Some(hottest) = &report.hottest {
            tracing::info!(
                "The city with the highest average temperature is: {} ({:.2})",
                hottest.city_name,
                hottest.average
            );
        }

        for expected in &report.stored {
            let record = self
                .store
                .get_by_city_id(expected.city_id)?
                .ok_or(CheckError::MissingRecord { city_id: expected.city_id })?;
            verify_record(&record, expected)?;
        }

        Ok(report)
    }

    /// Pick random cities of `country` until `count` distinct ones are stored.
    /// Cities are distinct by API id, so two names for one place count once.
    /// Gives up after `count + EXTRA_ATTEMPTS` attempts, or at once when the
    /// pool has fewer names than `count`.
    pub async fn random_cities<R>(
        &self,
        country: &str,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<CityWeather>>
    where
        R: Rng + ?Sized,
    {
        let cities = self.source.fetch_cities_for_country(country).await?;
        if cities.is_empty() {
            tracing::warn!("No cities returned for {country}");
        }

        let distinct_names = cities.iter().collect::<HashSet<_>>().len();
        if distinct_names < count {
            tracing::warn!("{country} has {distinct_names} cities, {count} requested");
            return Err(CheckError::NotEnoughCities { expected: count, got: 0, attempts: 0 }.into());
        }

        let max_attempts = count.saturating_add(EXTRA_ATTEMPTS);
        let mut attempts = 0;
        let mut found: Vec<CityWeather> = Vec::new();

        while found.len() < count && attempts < max_attempts {
            attempts += 1;
            let Some(city) = cities.choose(rng) else {
                continue;
            };

            let Some(weather) = self.fetch_and_store(city).await? else {
                continue;
            };

            match found.iter().position(|stored| stored.city_id == weather.city_id) {
                Some(index) => found[index] = weather,
                None => found.push(weather),
            }
        }

        if found.len() < count {
            return Err(CheckError::NotEnoughCities {
                expected: count,
                got: found.len(),
                attempts,
            }
            .into());
        }

        tracing::info!("Stored {} cities of {country} in {attempts} attempts", found.len());
        Ok(found)
    }

    /// Scrape the city's weather page and merge its table onto the stored
    /// record named in the page heading.
    pub async fn scrape_cross_check(
        &self,
        city: &str,
        scraper: &ScrapeClient,
    ) -> Result<CrossCheckOutcome> {
        let Some(path) = self.source.resolve_city_path(city).await? else {
            tracing::warn!("No weather page found for {city}");
            return Ok(CrossCheckOutcome::NoCityPath { city: city.to_string() });
        };

        let page = scraper.scrape_city_page(&path).await?;

        let city_name = page
            .heading
            .as_deref()
            .and_then(extract_city_name_from_heading)
            .ok_or_else(|| CheckError::Heading { heading: page.heading.clone() })?;

        match self.store.get_by_city_name(&city_name)? {
            Some(record) => {
                let outcome = self.store.merge_extended(record.city_id, &page.table)?;
                Ok(CrossCheckOutcome::Merged {
                    city_id: record.city_id,
                    city_name,
                    outcome,
                })
            }
            None => {
                let location = page
                    .table
                    .get("Location")
                    .and_then(|location| location.split_whitespace().next())
                    .unwrap_or(city_name.as_str());
                tracing::info!("No data found for {location} in the database");
                Ok(CrossCheckOutcome::NoBaseRecord { city_name })
            }
        }
    }
}
