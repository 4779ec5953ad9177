use super::{FieldType, InputSchema, ToolError, ToolFuture, ToolInfo, ToolTrait};
use serde_json::Value;

const WEATHER_TABLE: &[(&str, &str)] = &[
    ("bangalore", "cloudy with a temperature of 28 degrees Celsius"),
    ("mumbai", "partly cloudy with a temperature of 30 degrees Celsius"),
    ("delhi", "sunny with a temperature of 35 degrees Celsius"),
    ("chennai", "rainy with a temperature of 26 degrees Celsius"),
];

/// Static weather lookup for a handful of Indian cities.
pub struct WeatherTool;

pub fn lookup_weather(location: &str) -> String {
    let key = location.trim().to_lowercase();
    WEATHER_TABLE
        .iter()
        .find(|(city, _)| *city == key)
        .map(|(_, report)| report.to_string())
        .unwrap_or_else(|| format!("Unable to retrieve weather data for {}", location))
}

impl ToolTrait for WeatherTool {
    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: "getWeather".to_string(),
            description: "Get the weather for a specific location".to_string(),
            schema: InputSchema::new().required("location", FieldType::String, "City to look up"),
        }
    }

    fn execute(&self, arguments: Value) -> ToolFuture {
        Box::pin(async move {
            let location = arguments
                .get("location")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ToolError::InvalidArguments("location is required".to_string()))?;

            Ok(lookup_weather(location))
        })
    }
}
