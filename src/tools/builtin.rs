//! Demo tools answering weather questions for a few cities.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::tools::registry::ToolRegistry;
use crate::tools::tool::{AgentTool, Tool, ToolExecutionContext};
use crate::tools::types::AgentToolParameters;

const UNAVAILABLE: &str = "Unavailable";

fn city_parameters(info: &str) -> AgentToolParameters {
    AgentToolParameters::object()
        .string(
            "city",
            format!("The name of the city for which {info} info is requested"),
            true,
        )
        .build()
}

#[derive(Deserialize)]
struct CityQuery {
    city: String,
}

fn record_city(ctx: &ToolExecutionContext, city: &str) {
    ctx.record("requested_city", city);
}

/// `get_weather(city)`: a short description of the weather.
pub fn weather_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::typed(
        "get_weather",
        "Returns description of the weather in the specified city",
        city_parameters("weather"),
        |query: CityQuery, ctx| async move {
            record_city(&ctx, &query.city);
            let weather = match query.city.as_str() {
                "Seattle" => "Nice weather",
                "New York City" => "Good weather",
                _ => UNAVAILABLE,
            };
            Ok(json!(weather))
        },
    ))
}

/// `get_temperature(city)`: the temperature in Fahrenheit, as text.
pub fn temperature_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::typed(
        "get_temperature",
        "Returns the current temperature for the specified city",
        city_parameters("temperature"),
        |query: CityQuery, ctx| async move {
            record_city(&ctx, &query.city);
            let temperature = match query.city.as_str() {
                "Seattle" => "75",
                "New York City" => "80",
                _ => UNAVAILABLE,
            };
            Ok(json!(temperature))
        },
    ))
}

/// Registry holding `get_weather` and `get_temperature`.
pub fn weather_registry() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(weather_tool())
        .with_tool(temperature_tool())
}
