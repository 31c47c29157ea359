//! Trigger-phrase routing.
//!
//! Matching is plain substring containment, case-insensitive, first match
//! wins. A query that merely mentions a trigger phrase mid-sentence still
//! routes to the tool; that is the intended behavior, not a bug.

use serde_json::{Map, Value};

/// Routes to the alerts tool; the remainder is a region/state code.
pub const ALERT_TRIGGER: &str = "weather alert in";
/// Routes to the forecast tool; the remainder is "<latitude> <longitude>".
pub const FORECAST_TRIGGER: &str = "weather forecast for";

pub const INVALID_LOCATION_MESSAGE: &str =
    "Invalid location format. Please provide latitude and longitude.";

/// Outcome of inspecting one query for tool triggers.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Invoke the alerts tool with an upper-cased state code.
    Alerts { state: String },
    /// Invoke the forecast tool with parsed coordinates.
    Forecast { latitude: f64, longitude: f64 },
    /// The forecast trigger matched but the remainder was not exactly two
    /// numbers; answer with [`INVALID_LOCATION_MESSAGE`] and skip the call.
    InvalidLocation,
    /// No trigger matched; fall through to the chat model.
    Chat,
}

pub fn route(query: &str) -> Route {
    if let Some(index) = find_last_ignore_ascii_case(query, ALERT_TRIGGER) {
        let state = query[index + ALERT_TRIGGER.len()..].trim().to_uppercase();
        return Route::Alerts { state };
    }
    if let Some(index) = find_last_ignore_ascii_case(query, FORECAST_TRIGGER) {
        return match parse_coordinates(&query[index + FORECAST_TRIGGER.len()..]) {
            Some((latitude, longitude)) => Route::Forecast {
                latitude,
                longitude,
            },
            None => Route::InvalidLocation,
        };
    }
    Route::Chat
}

/// Arguments for the alerts tool: `{"state": <code>}`.
pub fn alert_arguments(state: &str) -> Map<String, Value> {
    let mut arguments = Map::new();
    arguments.insert("state".to_string(), Value::String(state.to_string()));
    arguments
}

/// Arguments for the forecast tool: `{"latitude": <f64>, "longitude": <f64>}`.
pub fn forecast_arguments(latitude: f64, longitude: f64) -> Map<String, Value> {
    let mut arguments = Map::new();
    arguments.insert("latitude".to_string(), Value::from(latitude));
    arguments.insert("longitude".to_string(), Value::from(longitude));
    arguments
}

/// Byte index of the last ASCII-case-insensitive occurrence of `needle`:
/// when a trigger appears more than once, the argument is everything after
/// the final one. Both triggers are pure ASCII, so a byte-window scan keeps
/// the returned index on a char boundary of the original string.
fn find_last_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window.eq_ignore_ascii_case(needle))
}

/// Exactly two whitespace-separated floats, latitude then longitude.
fn parse_coordinates(remainder: &str) -> Option<(f64, f64)> {
    let mut parts = remainder.split_whitespace();
    let latitude: f64 = parts.next()?.parse().ok()?;
    let longitude: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_trigger_extracts_upper_cased_state() {
        assert_eq!(
            route("weather alert in ca"),
            Route::Alerts {
                state: "CA".to_string()
            }
        );
    }

    #[test]
    fn alert_trigger_is_case_insensitive() {
        assert_eq!(
            route("Weather ALERT in tx"),
            Route::Alerts {
                state: "TX".to_string()
            }
        );
    }

    #[test]
    fn alert_trigger_matches_mid_sentence() {
        assert_eq!(
            route("hey, is there a weather alert in ny right now?"),
            Route::Alerts {
                state: "NY RIGHT NOW?".to_string()
            }
        );
    }

    #[test]
    fn forecast_trigger_parses_two_floats_in_order() {
        assert_eq!(
            route("weather forecast for 38.5 -120.2"),
            Route::Forecast {
                latitude: 38.5,
                longitude: -120.2
            }
        );
    }

    #[test]
    fn forecast_with_non_numeric_remainder_is_invalid() {
        assert_eq!(route("weather forecast for abc"), Route::InvalidLocation);
    }

    #[test]
    fn forecast_with_wrong_token_count_is_invalid() {
        assert_eq!(route("weather forecast for 38.5"), Route::InvalidLocation);
        assert_eq!(
            route("weather forecast for 38.5 -120.2 100"),
            Route::InvalidLocation
        );
        assert_eq!(route("weather forecast for "), Route::InvalidLocation);
    }

    #[test]
    fn alert_trigger_wins_when_both_phrases_appear() {
        // First-match-wins in declaration order, not position order.
        assert_eq!(
            route("weather forecast for later, or a weather alert in wa"),
            Route::Alerts {
                state: "WA".to_string()
            }
        );
    }

    #[test]
    fn unmatched_queries_fall_through_to_chat() {
        assert_eq!(route("tell me a joke"), Route::Chat);
        assert_eq!(route(""), Route::Chat);
    }

    #[test]
    fn alert_arguments_carry_exactly_one_parameter() {
        let arguments = alert_arguments("CA");
        assert_eq!(arguments.len(), 1);
        assert_eq!(arguments.get("state"), Some(&Value::String("CA".to_string())));
    }

    #[test]
    fn forecast_arguments_carry_both_coordinates() {
        let arguments = forecast_arguments(38.5, -120.2);
        assert_eq!(arguments.len(), 2);
        assert_eq!(arguments.get("latitude"), Some(&Value::from(38.5)));
        assert_eq!(arguments.get("longitude"), Some(&Value::from(-120.2)));
    }

    #[test]
    fn repeated_trigger_uses_the_last_occurrence() {
        assert_eq!(
            route("weather alert in ca or maybe a weather alert in ny"),
            Route::Alerts {
                state: "NY".to_string()
            }
        );
        assert_eq!(
            route("weather forecast for home, I mean weather forecast for 38.5 -120.2"),
            Route::Forecast {
                latitude: 38.5,
                longitude: -120.2
            }
        );
    }

    #[test]
    fn find_is_ascii_case_insensitive() {
        assert_eq!(
            find_last_ignore_ascii_case("WEATHER ALERT IN ca", ALERT_TRIGGER),
            Some(0)
        );
        assert_eq!(find_last_ignore_ascii_case("no trigger here", ALERT_TRIGGER), None);
    }
}
