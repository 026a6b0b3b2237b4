//! Reading the public weather page of a city.
//!
//! Fetching and parsing are split: [`ScrapeClient::scrape_city_page`] does the
//! HTTP part, [`parse_city_page`] is pure and can be fed saved HTML.

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::{collections::BTreeMap, time::Duration};

use crate::{Config, client::USER_AGENT};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const ROW_SELECTOR: &str = ".table.table--left.table--inner-borders-rows tbody tr";
const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";

/// Key/value rows of the details table and the first heading of the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapedPage {
    pub table: BTreeMap<String, String>,
    pub heading: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScrapeClient {
    site_url: String,
    http: Client,
}

impl ScrapeClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            site_url: config.endpoints.site_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Full page URL for a site path. Paths are lowercased.
    pub fn page_url(&self, city_path: &str) -> String {
        let path = city_path.to_lowercase();
        if path.starts_with('/') {
            format!("{}{}", self.site_url, path)
        } else {
            format!("{}/{}", self.site_url, path)
        }
    }

    pub async fn scrape_city_page(&self, city_path: &str) -> Result<ScrapedPage> {
        let url = self.page_url(city_path);
        tracing::info!("Scraping {url}");

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to load {url}"))?;

        let status = res.status();
        if !status.is_success() {
            return Err(anyhow!("Loading {url} failed with status {status}"));
        }

        let html = res
            .text()
            .await
            .with_context(|| format!("Failed to read page body of {url}"))?;

        parse_city_page(&html)
    }
}

pub fn parse_city_page(html: &str) -> Result<ScrapedPage> {
    let document = Html::parse_document(html);

    let rows = selector(ROW_SELECTOR)?;
    let key_cell = selector("th")?;
    let value_cell = selector("td")?;
    let headings = selector(HEADING_SELECTOR)?;

    let mut table = BTreeMap::new();
    for row in document.select(&rows) {
        match (row.select(&key_cell).next(), row.select(&value_cell).next()) {
            (Some(key), Some(value)) => {
                let key = element_text(key);
                let key = key.trim_end_matches(':').trim_end().to_string();
                table.insert(key, element_text(value));
            }
            _ => tracing::info!("Invalid row structure - missing key or value"),
        }
    }

    let heading = document.select(&headings).next().map(element_text);

    Ok(ScrapedPage { table, heading })
}

/// The word after "in" in a heading such as "Weather in London, United Kingdom".
pub fn extract_city_name_from_heading(heading: &str) -> Option<String> {
    let mut words = heading.split_whitespace();
    words.by_ref().find(|word| *word == "in")?;
    let name = words.next()?;
    Some(name.strip_suffix(',').unwrap_or(name).to_string())
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid CSS selector {css:?}: {e:?}"))
}

/// Text content with runs of whitespace collapsed to one space.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
