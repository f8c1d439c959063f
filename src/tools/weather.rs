//! Weather Tool Implementation
//!
//! Produces a synthetic reading; there is no upstream weather source.

use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ToolOutput, into_map, parse_args, require, timestamp};
use crate::core::error::ToolError;
use crate::core::registry::{ToolDescriptor, ToolKind, ToolRegistry};

const CONDITIONS: [&str; 4] = ["Sunny", "Cloudy", "Rainy", "Partly Cloudy"];

pub fn register(registry: &mut ToolRegistry) {
    registry.register(ToolDescriptor {
        kind: ToolKind::Weather,
        name: ToolKind::Weather.name(),
        title: "Weather Information",
        description: "Get current weather information for any location",
        input_schema: json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city or location to get weather for"
                },
                "units": {
                    "type": "string",
                    "enum": ["celsius", "fahrenheit"],
                    "default": "celsius",
                    "description": "Temperature units"
                }
            },
            "required": ["location"]
        }),
        invoking: "Fetching weather data...",
        invoked: "Weather data retrieved successfully.",
    });
}

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    location: Option<String>,
    units: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Celsius,
    Fahrenheit,
}

impl Units {
    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        match raw {
            "celsius" => Ok(Self::Celsius),
            "fahrenheit" => Ok(Self::Fahrenheit),
            other => Err(ToolError::invalid(format!(
                "Unknown units: {other} (expected 'celsius' or 'fahrenheit')"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Celsius => "celsius",
            Self::Fahrenheit => "fahrenheit",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

/// One synthetic observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub temperature: i64,
    pub condition: &'static str,
    pub humidity: u32,
    pub wind_speed: u32,
}

/// Draw a reading: 15..=30 °C (converted for Fahrenheit), humidity 40..=80 %,
/// wind 5..=20 km/h, and a uniformly chosen condition.
pub fn sample<R: Rng + ?Sized>(rng: &mut R, units: Units) -> Reading {
    let celsius: i64 = rng.gen_range(15..=30);
    let temperature = match units {
        Units::Celsius => celsius,
        Units::Fahrenheit => (celsius as f64 * 9.0 / 5.0 + 32.0).round() as i64,
    };
    Reading {
        temperature,
        condition: CONDITIONS[rng.gen_range(0..CONDITIONS.len())],
        humidity: rng.gen_range(40..=80),
        wind_speed: rng.gen_range(5..=20),
    }
}

pub fn run(arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
    run_with(arguments, &mut rand::thread_rng())
}

fn run_with<R: Rng + ?Sized>(arguments: &Map<String, Value>, rng: &mut R) -> Result<ToolOutput, ToolError> {
    let args: WeatherArgs = parse_args(arguments)?;
    let location = require(args.location, "location")?;
    if location.trim().is_empty() {
        return Err(ToolError::invalid("location must not be empty"));
    }
    let units = match args.units.as_deref() {
        Some(raw) => Units::parse(raw)?,
        None => Units::default(),
    };

    let reading = sample(rng, units);
    let text = format!(
        "Weather in {location}: {}{}, {}. Humidity: {}%, Wind: {} km/h",
        reading.temperature,
        units.symbol(),
        reading.condition,
        reading.humidity,
        reading.wind_speed,
    );

    let structured = into_map(json!({
        "location": location,
        "temperature": reading.temperature,
        "units": units.as_str(),
        "condition": reading.condition,
        "humidity": reading.humidity,
        "wind_speed": reading.wind_speed,
        "timestamp": timestamp(),
    }));

    Ok(ToolOutput { text, structured })
}
