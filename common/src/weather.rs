use serde::{Deserialize, Serialize};

use crate::{config::WeatherConfig, error::WeatherError};

pub const MAX_FORECAST_DAYS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Coordinates(String),
    City { country: String, city: String },
}

impl Location {
    /// `country/city` selects a city, anything else is passed on as `lat,lon`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().split_once('/') {
            Some((country, city)) => Self::City {
                country: country.trim().to_string(),
                city: city.trim().replace(' ', "_"),
            },
            None => Self::Coordinates(raw.trim().replace(' ', "")),
        }
    }

    fn query(&self) -> String {
        match self {
            Self::Coordinates(lat_lon) => lat_lon.clone(),
            Self::City { country, city } => format!("{country}/{city}"),
        }
    }
}

pub fn request_path(api_key: &str, language: &str, location: &Location) -> String {
    format!(
        "/api/{api_key}/conditions/forecast/lang:{language}/q/{}.json",
        location.query()
    )
}

pub fn request_url(config: &WeatherConfig) -> String {
    let location = Location::parse(&config.location);
    format!(
        "http://{}{}",
        config.api_host,
        request_path(&config.api_key, &config.language, &location)
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Observation {
    pub city: String,
    pub temperature: f32,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Forecast {
    pub weekday: String,
    pub high: f32,
    pub low: f32,
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Conditions {
    pub observation: Observation,
    pub forecasts: Vec<Forecast>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f32),
    Text(String),
}

impl NumberOrText {
    fn value(&self) -> Result<f32, WeatherError> {
        match self {
            Self::Number(value) => Ok(*value),
            Self::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| WeatherError::Decode(format!("not a number: {text:?}"))),
        }
    }
}

#[derive(Deserialize)]
struct RawReport {
    current_observation: RawObservation,
    forecast: RawForecast,
}

#[derive(Deserialize)]
struct RawObservation {
    display_location: RawDisplayLocation,
    temp_c: NumberOrText,
    #[serde(default)]
    weather: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    icon_url: String,
}

#[derive(Deserialize)]
struct RawDisplayLocation {
    city: String,
}

#[derive(Deserialize)]
struct RawForecast {
    simpleforecast: RawSimpleForecast,
}

#[derive(Deserialize)]
struct RawSimpleForecast {
    forecastday: Vec<RawForecastDay>,
}

#[derive(Deserialize)]
struct RawForecastDay {
    date: RawDate,
    high: RawTemperature,
    low: RawTemperature,
    #[serde(default)]
    icon: String,
}

#[derive(Deserialize)]
struct RawDate {
    weekday: String,
}

#[derive(Deserialize)]
struct RawTemperature {
    celsius: NumberOrText,
}

fn icon_from_url(url: &str) -> Option<String> {
    let file = url.rsplit('/').next()?;
    let stem = file.split_once('.').map_or(file, |(stem, _)| stem);
    (!stem.is_empty()).then(|| stem.to_string())
}

pub fn decode_conditions(body: &[u8]) -> Result<Conditions, WeatherError> {
    let raw: RawReport =
        serde_json::from_slice(body).map_err(|err| WeatherError::Decode(err.to_string()))?;

    let current = raw.current_observation;
    let observation = Observation {
        city: current.display_location.city,
        temperature: current.temp_c.value()?,
        description: current.weather,
        icon: icon_from_url(&current.icon_url).unwrap_or(current.icon),
    };

    let forecasts = raw
        .forecast
        .simpleforecast
        .forecastday
        .into_iter()
        .take(MAX_FORECAST_DAYS)
        .map(|day| {
            Ok(Forecast {
                weekday: day.date.weekday,
                high: day.high.celsius.value()?,
                low: day.low.celsius.value()?,
                icon: day.icon,
            })
        })
        .collect::<Result<Vec<_>, WeatherError>>()?;

    Ok(Conditions {
        observation,
        forecasts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn day(weekday: &str, high: serde_json::Value, low: serde_json::Value, icon: &str) -> serde_json::Value {
        json!({
            "date": { "weekday": weekday, "day": 1 },
            "high": { "celsius": high, "fahrenheit": "0" },
            "low": { "celsius": low, "fahrenheit": "0" },
            "icon": icon
        })
    }

    fn report(days: Vec<serde_json::Value>) -> Vec<u8> {
        json!({
            "response": { "version": "0.1" },
            "current_observation": {
                "display_location": { "city": "Berlin", "country": "DL" },
                "temp_c": 7.5,
                "weather": "Mostly Cloudy",
                "icon": "mostlycloudy",
                "icon_url": "http://icons.wxug.com/i/c/k/nt_mostlycloudy.gif"
            },
            "forecast": { "simpleforecast": { "forecastday": days } }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn builds_request_paths() {
        assert_eq!(
            request_path("KEY", "DL", &Location::parse("52.52, 13.40")),
            "/api/KEY/conditions/forecast/lang:DL/q/52.52,13.40.json"
        );
        assert_eq!(
            request_path("KEY", "EN", &Location::parse("Germany/Bad Homburg")),
            "/api/KEY/conditions/forecast/lang:EN/q/Germany/Bad_Homburg.json"
        );

        let config = WeatherConfig {
            api_key: "abc".to_string(),
            ..WeatherConfig::default()
        };
        assert_eq!(
            request_url(&config),
            "http://api.wunderground.com/api/abc/conditions/forecast/lang:EN/q/52.5200,13.4050.json"
        );
    }

    #[test]
    fn decodes_observation_and_forecasts() {
        let body = report(vec![
            day("Monday", json!("8"), json!("1"), "rain"),
            day("Tuesday", json!(10), json!(-2), "clear"),
        ]);

        let conditions = decode_conditions(&body).unwrap();

        assert_eq!(
            conditions.observation,
            Observation {
                city: "Berlin".to_string(),
                temperature: 7.5,
                description: "Mostly Cloudy".to_string(),
                icon: "nt_mostlycloudy".to_string(),
            }
        );
        assert_eq!(
            conditions.forecasts,
            vec![
                Forecast {
                    weekday: "Monday".to_string(),
                    high: 8.0,
                    low: 1.0,
                    icon: "rain".to_string(),
                },
                Forecast {
                    weekday: "Tuesday".to_string(),
                    high: 10.0,
                    low: -2.0,
                    icon: "clear".to_string(),
                },
            ]
        );
    }

    #[test]
    fn keeps_at_most_four_forecast_days() {
        let days = (0..6)
            .map(|i| day(&format!("Day{i}"), json!(i), json!(0), "clear"))
            .collect();

        let conditions = decode_conditions(&report(days)).unwrap();

        assert_eq!(conditions.forecasts.len(), MAX_FORECAST_DAYS);
        assert_eq!(conditions.forecasts[3].weekday, "Day3");
    }

    #[test]
    fn falls_back_to_icon_without_url() {
        let body = json!({
            "current_observation": {
                "display_location": { "city": "Oslo" },
                "temp_c": "-3.5",
                "icon": "snow"
            },
            "forecast": { "simpleforecast": { "forecastday": [] } }
        })
        .to_string();

        let conditions = decode_conditions(body.as_bytes()).unwrap();

        assert_eq!(conditions.observation.icon, "snow");
        assert_eq!(conditions.observation.temperature, -3.5);
        assert!(conditions.forecasts.is_empty());
    }

    #[test]
    fn rejects_undecodable_reports() {
        assert!(matches!(
            decode_conditions(b"{\"response\":{\"error\":{}}}"),
            Err(WeatherError::Decode(_))
        ));
        assert!(matches!(decode_conditions(b"<html>"), Err(WeatherError::Decode(_))));

        let body = report(vec![day("Monday", json!("n/a"), json!("1"), "rain")]);
        assert!(matches!(decode_conditions(&body), Err(WeatherError::Decode(_))));
    }
}
