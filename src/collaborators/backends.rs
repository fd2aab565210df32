//! Backend executor seams.
//!
//! # Responsibilities
//! - Describe what each provider kind asks of its backend
//! - Keep wire protocols out of the gateway: embedders plug in executors
//!
//! # Design Decisions
//! - Requests carry resolved connection strings, never connection names
//! - SQL rows come back as flat [`Record`]s; documents as raw JSON

use std::collections::HashMap;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::Method;
use dashmap::DashMap;
use serde_json::Value;

use crate::collaborators::error::BackendResult;
use crate::definition::CommandType;
use crate::shaping::Record;

/// One SQL command with bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlRequest {
    pub connection_string: String,
    pub command: String,
    pub command_type: CommandType,
    pub parameters: Vec<(String, Value)>,
}

#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, request: SqlRequest) -> BackendResult<Vec<Record>>;
}

/// One aggregation against a document collection.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRequest {
    pub connection_string: String,
    pub database: String,
    pub collection: String,
    pub pipeline: Vec<Value>,
}

#[async_trait]
pub trait DocumentExecutor: Send + Sync {
    async fn aggregate(&self, request: DocumentRequest) -> BackendResult<Vec<Value>>;
}

/// Key-value cache holding snapshot text.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, connection_string: &str, database: i64, key: &str) -> BackendResult<Option<String>>;

    async fn set(&self, connection_string: &str, database: i64, key: &str, value: String) -> BackendResult<()>;
}

/// Process-local [`CacheStore`].
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<(String, i64, String), String>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, connection_string: &str, database: i64, key: &str) -> BackendResult<Option<String>> {
        let entry_key = (connection_string.to_string(), database, key.to_string());
        Ok(self.entries.get(&entry_key).map(|v| v.value().clone()))
    }

    async fn set(&self, connection_string: &str, database: i64, key: &str, value: String) -> BackendResult<()> {
        self.entries
            .insert((connection_string.to_string(), database, key.to_string()), value);
        Ok(())
    }
}

/// Request to an upstream HTTP service.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl OutboundResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}

#[async_trait]
pub trait OutboundExecutor: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> BackendResult<OutboundResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_cache_scopes_by_database() {
        let cache = InMemoryCache::new();
        cache.set("main", 0, "k", "zero".to_string()).await.unwrap();
        cache.set("main", 1, "k", "one".to_string()).await.unwrap();

        assert_eq!(cache.get("main", 0, "k").await.unwrap().as_deref(), Some("zero"));
        assert_eq!(cache.get("main", 1, "k").await.unwrap().as_deref(), Some("one"));
        assert_eq!(cache.get("other", 0, "k").await.unwrap(), None);
        assert_eq!(cache.len(), 2);
    }
}
