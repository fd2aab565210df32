//! Named connection strings.

use std::collections::HashMap;

/// Resolves a connection *name* from a definition to a connection string.
pub trait ConnectionRegistry: Send + Sync {
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Connections listed in the `[connections]` config table.
#[derive(Debug, Clone, Default)]
pub struct StaticConnections {
    entries: HashMap<String, String>,
}

impl StaticConnections {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }
}

impl ConnectionRegistry for StaticConnections {
    fn resolve(&self, name: &str) -> Option<String> {
        self.entries.get(name).cloned()
    }
}
