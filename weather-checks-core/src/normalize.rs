//! Pure transforms from raw payloads to the shapes the store understands.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{CityWeather, ExtendedData, ExtendedField, TemperatureFields};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("payload has no numeric city id")]
    MissingCityId,

    #[error("payload is missing numeric field `main.{field}`")]
    Incomplete { field: &'static str },
}

/// Pull `main.temp`, `main.feels_like`, `main.temp_min` and `main.temp_max`.
/// Any missing field fails the whole extraction.
pub fn extract_temperature_fields(payload: &Value) -> Result<TemperatureFields, NormalizeError> {
    let main = payload.get("main");
    let field = |name: &'static str| {
        main.and_then(|m| m.get(name))
            .and_then(Value::as_f64)
            .ok_or(NormalizeError::Incomplete { field: name })
    };

    Ok(TemperatureFields {
        temperature: field("temp")?,
        feels_like: field("feels_like")?,
        temp_min: field("temp_min")?,
        temp_max: field("temp_max")?,
    })
}

pub fn average_temperature(min: f64, max: f64) -> f64 {
    (min + max) / 2.0
}

/// Keep the labels that map to an [`ExtendedField`]; drop the rest with a warning.
pub fn normalize_extended_table(raw: &BTreeMap<String, String>) -> ExtendedData {
    let mut data = ExtendedData::default();

    for (label, value) in raw {
        match ExtendedField::from_label(label) {
            Some(field) => {
                data.fields.insert(field, value.clone());
            }
            None => {
                tracing::warn!("Ignoring unknown key: {label}");
                data.ignored.push(label.clone());
            }
        }
    }

    data
}

impl CityWeather {
    /// Normalize a current-weather payload. The stored name is the one the
    /// API reports, falling back to the name that was queried.
    pub fn from_payload(payload: &Value, requested_name: &str) -> Result<Self, NormalizeError> {
        let city_id = payload
            .get("id")
            .and_then(Value::as_i64)
            .ok_or(NormalizeError::MissingCityId)?;

        let temps = extract_temperature_fields(payload)?;

        let city_name = payload
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(requested_name)
            .to_string();

        Ok(Self {
            city_id,
            city_name,
            temperature: temps.temperature,
            feels_like: temps.feels_like,
            temp_min: temps.temp_min,
            temp_max: temps.temp_max,
            average: average_temperature(temps.temp_min, temps.temp_max),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "id": 3169070,
            "name": "Rome",
            "main": {
                "temp": 291.5,
                "feels_like": 290.9,
                "temp_min": 289.0,
                "temp_max": 293.0,
                "humidity": 60
            }
        })
    }

    #[test]
    fn average_of_ten_and_twenty() {
        assert_eq!(average_temperature(10.0, 20.0), 15.0);
    }

    #[test]
    fn average_is_not_rounded() {
        assert_eq!(average_temperature(1.0, 2.0), 1.5);
        assert_eq!(average_temperature(-3.0, 4.0), 0.5);
    }

    #[test]
    fn extracts_all_four_fields() {
        let temps = extract_temperature_fields(&payload()).unwrap();
        assert_eq!(temps.temperature, 291.5);
        assert_eq!(temps.feels_like, 290.9);
        assert_eq!(temps.temp_min, 289.0);
        assert_eq!(temps.temp_max, 293.0);
    }

    #[test]
    fn integer_temperatures_are_accepted() {
        let value = json!({"main": {"temp": 20, "feels_like": 19, "temp_min": 18, "temp_max": 22}});
        let temps = extract_temperature_fields(&value).unwrap();
        assert_eq!(temps.temp_max, 22.0);
    }

    #[test]
    fn missing_field_is_incomplete() {
        let mut value = payload();
        value["main"].as_object_mut().unwrap().remove("temp_max");

        let err = extract_temperature_fields(&value).unwrap_err();
        assert_eq!(err, NormalizeError::Incomplete { field: "temp_max" });
    }

    #[test]
    fn missing_main_reports_first_field() {
        let err = extract_temperature_fields(&json!({"id": 1})).unwrap_err();
        assert_eq!(err, NormalizeError::Incomplete { field: "temp" });
    }

    #[test]
    fn non_numeric_field_is_incomplete() {
        let mut value = payload();
        value["main"]["feels_like"] = json!("warm");

        let err = extract_temperature_fields(&value).unwrap_err();
        assert_eq!(err, NormalizeError::Incomplete { field: "feels_like" });
    }

    #[test]
    fn city_weather_from_payload() {
        let weather = CityWeather::from_payload(&payload(), "rome").unwrap();
        assert_eq!(weather.city_id, 3169070);
        assert_eq!(weather.city_name, "Rome");
        assert_eq!(weather.average, 291.0);
    }

    #[test]
    fn city_weather_falls_back_to_requested_name() {
        let mut value = payload();
        value.as_object_mut().unwrap().remove("name");

        let weather = CityWeather::from_payload(&value, "Haifa").unwrap();
        assert_eq!(weather.city_name, "Haifa");
    }

    #[test]
    fn city_weather_requires_id() {
        let mut value = payload();
        value.as_object_mut().unwrap().remove("id");

        let err = CityWeather::from_payload(&value, "Rome").unwrap_err();
        assert_eq!(err, NormalizeError::MissingCityId);
    }

    #[test]
    fn extended_table_keeps_known_labels_only() {
        let raw: BTreeMap<String, String> = [
            ("Location", "London, United Kingdom"),
            ("Current Time", "17 Oct 2026, 19:00:00"),
            ("Dew Point", "9 °C"),
            ("Forecast", "Rain"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let data = normalize_extended_table(&raw);
        assert_eq!(data.fields.len(), 3);
        assert_eq!(
            data.fields.get(&ExtendedField::Location).map(String::as_str),
            Some("London, United Kingdom")
        );
        assert_eq!(data.fields.get(&ExtendedField::DewPoint).map(String::as_str), Some("9 °C"));
        assert_eq!(data.ignored, vec!["Forecast".to_string()]);
    }

    #[test]
    fn empty_extended_table() {
        let data = normalize_extended_table(&BTreeMap::new());
        assert!(data.fields.is_empty());
        assert!(data.ignored.is_empty());
    }
}
