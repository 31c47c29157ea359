//! Model Context Protocol integration.

pub mod client;
pub mod registry;

/// Tool invoked for "weather alert in" queries.
pub const ALERTS_TOOL: &str = "get_alerts";
/// Tool invoked for "weather forecast for" queries.
pub const FORECAST_TOOL: &str = "get_forecast";
