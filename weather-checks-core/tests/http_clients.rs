//! Integration tests for the HTTP clients using wiremock.

use weather_checks_core::{Config, HttpWeatherClient, ScrapeClient, WeatherSource};
use wiremock::matchers::{body_string_contains, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::new(
        "/unused",
        format!("{}/data/2.5/weather", server.uri()),
        "TEST_KEY".to_string(),
    );
    config.endpoints.cities_url = format!("{}/api/v0.1/countries/cities", server.uri());
    config.endpoints.completion_url = format!("{}/scripts/completion.php", server.uri());
    config.endpoints.site_url = server.uri();
    config
}

#[tokio::test]
async fn test_current_weather_sends_city_and_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "New York"))
        .and(query_param("appid", "TEST_KEY"))
        .and(header_regex("user-agent", "^weather-checks/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 5128581,
            "name": "New York",
            "main": {"temp": 288.1, "feels_like": 287.4, "temp_min": 286.0, "temp_max": 290.0}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpWeatherClient::new(&config_for(&mock_server)).unwrap();
    let response = client.fetch_current_weather("New York").await.unwrap();

    assert_eq!(response.status, 200);
    let body = response.json().unwrap();
    assert_eq!(body["id"], 5128581);
    assert_eq!(body["main"]["temp"], 288.1);
}

#[tokio::test]
async fn test_current_weather_passes_units_when_configured() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = config_for(&mock_server);
    config.api.units = Some("metric".to_string());
    let client = HttpWeatherClient::new(&config).unwrap();

    assert_eq!(client.fetch_current_weather("Oslo").await.unwrap().status, 200);
}

#[tokio::test]
async fn test_current_weather_reports_non_200() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key"
        })))
        .mount(&mock_server)
        .await;

    let client = HttpWeatherClient::new(&config_for(&mock_server)).unwrap();
    let response = client.fetch_current_weather("Rome").await.unwrap();

    assert_eq!(response.status, 401);
    assert!(!response.is_ok());
}

#[tokio::test]
async fn test_cities_for_country_posts_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v0.1/countries/cities"))
        .and(body_string_contains("country=Israel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": false,
            "msg": "cities in Israel retrieved",
            "data": ["Haifa", "Jerusalem", "Eilat"]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpWeatherClient::new(&config_for(&mock_server)).unwrap();
    let cities = client.fetch_cities_for_country("Israel").await.unwrap();

    assert_eq!(cities, vec!["Haifa", "Jerusalem", "Eilat"]);
}

#[tokio::test]
async fn test_cities_for_unknown_country_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v0.1/countries/cities"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": true,
            "msg": "country not found"
        })))
        .mount(&mock_server)
        .await;

    let client = HttpWeatherClient::new(&config_for(&mock_server)).unwrap();
    let cities = client.fetch_cities_for_country("Atlantis").await.unwrap();

    assert!(cities.is_empty());
}

#[tokio::test]
async fn test_resolve_city_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/scripts/completion.php"))
        .and(query_param("query", "London"))
        .and(query_param("xd", "5"))
        .and(query_param("mode", "ci"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "/time/uk/london\tLondon\n/weather/@2643743\tLondon\n/weather/uk/london\tLondon, England\n",
        ))
        .mount(&mock_server)
        .await;

    let client = HttpWeatherClient::new(&config_for(&mock_server)).unwrap();
    let resolved = client.resolve_city_path("London").await.unwrap();

    assert_eq!(resolved.as_deref(), Some("/weather/uk/london"));
}

#[tokio::test]
async fn test_resolve_city_path_without_match() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/scripts/completion.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("/time/xx/nowhere\tNowhere\n"))
        .mount(&mock_server)
        .await;

    let client = HttpWeatherClient::new(&config_for(&mock_server)).unwrap();
    assert_eq!(client.resolve_city_path("Nowhere").await.unwrap(), None);
}

#[tokio::test]
async fn test_scrape_city_page_lowercases_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather/italy/rome"))
        .and(header_regex("user-agent", "^weather-checks/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                 <h1>Weather in Rome, Lazio, Italy</h1>
                 <table class="table table--left table--inner-borders-rows"><tbody>
                   <tr><th>Pressure:</th><td>1018 mbar</td></tr>
                 </tbody></table>
               </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    let scraper = ScrapeClient::new(&config_for(&mock_server)).unwrap();
    let page = scraper.scrape_city_page("/weather/Italy/Rome").await.unwrap();

    assert_eq!(page.heading.as_deref(), Some("Weather in Rome, Lazio, Italy"));
    assert_eq!(page.table["Pressure"], "1018 mbar");
}

#[tokio::test]
async fn test_scrape_city_page_fails_on_missing_page() {
    let mock_server = MockServer::start().await;

    let scraper = ScrapeClient::new(&config_for(&mock_server)).unwrap();
    let err = scraper.scrape_city_page("/weather/nowhere").await.unwrap_err();

    assert!(err.to_string().contains("404"));
}
