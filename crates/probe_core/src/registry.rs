//! Scenario registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::scenario::Scenario;
use crate::scenarios::MemberVpcScenario;

/// Maps scenario names to implementations, ordered by name.
#[derive(Default)]
pub struct ScenarioRegistry {
    scenarios: BTreeMap<String, Arc<dyn Scenario>>,
}

impl ScenarioRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in scenario.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MemberVpcScenario::new()));
        registry
    }

    /// Register a scenario under its `name()`, replacing any previous one.
    pub fn register(&mut self, scenario: Arc<dyn Scenario>) {
        let name = scenario.name().to_string();
        debug!("Registering scenario: {}", name);
        self.scenarios.insert(name, scenario);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Scenario>> {
        self.scenarios.get(name).cloned()
    }

    pub fn get_required(&self, name: &str) -> CoreResult<Arc<dyn Scenario>> {
        self.get(name)
            .ok_or_else(|| CoreError::ScenarioNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scenarios.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.scenarios.keys().map(|s| s.as_str()).collect()
    }

    pub fn all(&self) -> Vec<Arc<dyn Scenario>> {
        self.scenarios.values().cloned().collect()
    }

    /// Resolve names to scenarios; an empty selection means all.
    pub fn select(&self, names: &[String]) -> CoreResult<Vec<Arc<dyn Scenario>>> {
        if names.is_empty() {
            return Ok(self.all());
        }
        names.iter().map(|name| self.get_required(name)).collect()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let registry = ScenarioRegistry::with_builtins();
        assert!(registry.contains("member-vpc"));
        assert_eq!(registry.names(), vec!["member-vpc"]);
    }

    #[test]
    fn test_select() {
        let registry = ScenarioRegistry::with_builtins();

        assert_eq!(registry.select(&[]).unwrap().len(), registry.len());
        assert_eq!(
            registry.select(&["member-vpc".to_string()]).unwrap()[0].name(),
            "member-vpc"
        );
        assert!(matches!(
            registry.select(&["nope".to_string()]),
            Err(CoreError::ScenarioNotFound(_))
        ));
    }
}
