//! Core library for the `weather-checks` runner.
//!
//! This crate defines:
//! - Configuration discovery and loading
//! - Clients for the weather, cities and city-page services
//! - The SQLite store of weather records
//! - The checks that tie them together
//!
//! It is used by `weather-checks-cli`, but every check can also be driven
//! directly, e.g. from integration tests with a fake [`WeatherSource`].

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod scrape;
pub mod store;
pub mod verify;

pub use client::{HttpWeatherClient, RawWeatherResponse, WeatherSource};
pub use config::Config;
pub use error::CheckError;
pub use model::{CityWeather, ExtendedData, ExtendedField, TemperatureFields, WeatherRecord};
pub use pipeline::{CrossCheckOutcome, FixedListReport, Pipeline, RoundTripReport};
pub use scrape::{ScrapeClient, ScrapedPage};
pub use store::{MergeOutcome, UpsertOutcome, WeatherStore};
