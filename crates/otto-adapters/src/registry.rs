//! Adapter lookup by agent type.

use std::collections::HashMap;
use std::sync::Arc;

use crate::claude::ClaudeAdapter;
use crate::codex::CodexAdapter;
use crate::traits::AgentAdapter;

/// Registry of vendor adapters keyed by agent type.
///
/// # Example
///
/// ```
/// use otto_adapters::AdapterRegistry;
///
/// let registry = AdapterRegistry::new();
/// assert!(registry.get("claude").is_some());
/// assert!(registry.get("gpt-pilot").is_none());
/// ```
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn AgentAdapter>>,
}

impl AdapterRegistry {
    /// Creates a registry with the built-in adapters.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ClaudeAdapter::new()));
        registry.register(Arc::new(CodexAdapter::new()));
        registry
    }

    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registers an adapter under its info ID, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn AgentAdapter>) {
        let id = adapter.info().id.clone();
        self.adapters.insert(id, adapter);
    }

    /// Gets the adapter for an agent type.
    pub fn get(&self, agent_type: &str) -> Option<Arc<dyn AgentAdapter>> {
        self.adapters.get(agent_type).cloned()
    }

    /// Lists registered agent types, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.adapters.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
