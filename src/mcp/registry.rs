use rust_mcp_schema::{ListToolsResult, Tool};
use std::collections::HashMap;

/// Immutable name-to-descriptor map built once from the `tools/list` result
/// and never mutated for the rest of the session.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    pub fn from_list(list: ListToolsResult) -> Self {
        let tools = list
            .tools
            .into_iter()
            .map(|tool| (tool.name.clone(), tool))
            .collect();
        Self { tools }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in sorted order, for stable display.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_list(names: &[&str]) -> ListToolsResult {
        serde_json::from_value(serde_json::json!({
            "tools": names
                .iter()
                .map(|name| serde_json::json!({"name": name, "inputSchema": {"type": "object"}}))
                .collect::<Vec<_>>()
        }))
        .expect("list should parse")
    }

    #[test]
    fn registry_indexes_tools_by_name() {
        let registry = ToolRegistry::from_list(sample_list(&["get_forecast", "get_alerts"]));
        assert!(registry.contains("get_alerts"));
        assert!(registry.contains("get_forecast"));
        assert!(!registry.contains("get_tides"));
    }

    #[test]
    fn names_are_sorted_for_display() {
        let registry = ToolRegistry::from_list(sample_list(&["get_forecast", "get_alerts"]));
        assert_eq!(registry.names(), vec!["get_alerts", "get_forecast"]);
    }

    #[test]
    fn empty_list_yields_empty_registry() {
        let registry = ToolRegistry::from_list(sample_list(&[]));
        assert!(registry.names().is_empty());
    }
}
