//! `data-source redis` endpoints and their refresh jobs.
//!
//! # Data Flow
//! ```text
//! refresh job (every interval):
//!     task SQL → rows → snapshot::encode → CacheStore::set(key)
//!
//! request:
//!     key template → CacheStore::get → snapshot::decode
//!     → per-row match (one task per row, unordered)
//!     → join, restore row order → shape
//! ```
//!
//! # Design Decisions
//! - The job is owned by the handler; `suspend` stops it and nothing else
//! - A missing key or no matching row is 204, not 404

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use futures_util::FutureExt;
use serde_json::Value;
use tokio::task::JoinSet;

use crate::collaborators::{
    BackendError, CacheStore, ConnectionRegistry, GatewayContext, SqlExecutor, SqlRequest,
};
use crate::definition::{CacheProvider, RefreshTask, SqlProvider};
use crate::handlers::endpoint::Endpoint;
use crate::handlers::error::{BuildError, BuildResult};
use crate::handlers::params::{field_ignore_case, values_equal, ParamValue, Parameters, QuestFilter};
use crate::handlers::snapshot::{self, ColumnType};
use crate::handlers::template::{substitute, Quoting};
use crate::handlers::Handler;
use crate::http::request::RequestContext;
use crate::http::response::GatewayResponse;
use crate::lifecycle::scheduler::{Job, JobHandle};
use crate::shaping::Record;

pub struct CacheHandler {
    endpoint: Endpoint,
    provider: CacheProvider,
    context: GatewayContext,
    refresh: Option<Box<dyn JobHandle>>,
}

impl CacheHandler {
    /// Build the handler and start its refresh job, if one is configured.
    pub fn new(endpoint: Endpoint, provider: CacheProvider, context: GatewayContext) -> BuildResult<Self> {
        let refresh = match &provider.task {
            Some(task) => Some(start_refresh(task, &provider, &context)?),
            None => None,
        };
        Ok(Self {
            endpoint,
            provider,
            context,
            refresh,
        })
    }
}

/// Parse `value::TypeCode` task parameters into typed values. A value
/// without a type code is a string.
pub fn typed_parameters(source: &SqlProvider) -> BuildResult<Vec<(String, Value)>> {
    source
        .parameters
        .iter()
        .map(|(name, raw)| {
            let value = match raw.rsplit_once("::") {
                Some((value, code)) => {
                    let ty = ColumnType::parse(code).ok_or_else(|| BuildError::InvalidTaskParameter {
                        name: name.clone(),
                        reason: format!("unknown type code `{code}`"),
                    })?;
                    ty.convert(value)
                        .map_err(|reason| BuildError::InvalidTaskParameter {
                            name: name.clone(),
                            reason,
                        })?
                }
                None => Value::String(raw.clone()),
            };
            Ok((name.clone(), value))
        })
        .collect()
}

struct RefreshJob {
    executor: Arc<dyn SqlExecutor>,
    cache: Arc<dyn CacheStore>,
    connections: Arc<dyn ConnectionRegistry>,
    source: SqlProvider,
    parameters: Vec<(String, Value)>,
    cache_connection: String,
    database: i64,
    key: String,
}

impl RefreshJob {
    async fn run(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(key = %self.key, error = %e, "Cache refresh failed");
        }
    }

    async fn refresh(&self) -> Result<(), BackendError> {
        let resolve = |name: &str| {
            self.connections
                .resolve(name)
                .ok_or_else(|| BackendError::UnknownConnection(name.to_string()))
        };

        let rows = self
            .executor
            .execute(SqlRequest {
                connection_string: resolve(&self.source.connection)?,
                command: self.source.command.clone(),
                command_type: self.source.command_type,
                parameters: self.parameters.clone(),
            })
            .await?;

        let text = snapshot::encode(&rows);
        self.cache
            .set(&resolve(&self.cache_connection)?, self.database, &self.key, text)
            .await?;
        tracing::debug!(key = %self.key, rows = rows.len(), "Cache refreshed");
        Ok(())
    }
}

fn start_refresh(
    task: &RefreshTask,
    provider: &CacheProvider,
    context: &GatewayContext,
) -> BuildResult<Box<dyn JobHandle>> {
    let executor = context.sql.clone().ok_or(BuildError::MissingExecutor("sql"))?;
    let refresh = Arc::new(RefreshJob {
        executor,
        cache: Arc::clone(&context.cache),
        connections: Arc::clone(&context.connections),
        parameters: typed_parameters(&task.source)?,
        source: task.source.clone(),
        cache_connection: provider.connection.clone(),
        database: provider.database,
        key: provider.key.clone(),
    });

    let job: Job = Arc::new(move || {
        let refresh = Arc::clone(&refresh);
        async move { refresh.run().await }.boxed()
    });
    Ok(context.scheduler.every(task.interval, job))
}

/// What a row must satisfy: equal values for parameters named like a
/// column, and every quest filter.
#[derive(Debug, Default)]
struct RowCriteria {
    equals: Vec<(String, Value)>,
    quests: Vec<QuestFilter>,
}

impl RowCriteria {
    fn from_parameters(params: &Parameters) -> Self {
        RowCriteria {
            equals: params
                .iter()
                .filter(|(_, value)| !matches!(value, ParamValue::Quest(_)))
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
            quests: params.quest_filters().cloned().collect(),
        }
    }

    fn matches(&self, record: &Record) -> bool {
        self.equals.iter().all(|(name, expected)| match field_ignore_case(record, name) {
            Some(actual) => values_equal(expected, actual),
            None => true,
        }) && self.quests.iter().all(|q| q.matches(record))
    }
}

/// Keep the rows matching `criteria`, checking each row on its own task.
async fn select_rows(rows: Vec<Record>, criteria: RowCriteria) -> Vec<Record> {
    let criteria = Arc::new(criteria);
    let mut tasks = JoinSet::new();
    for (index, row) in rows.into_iter().enumerate() {
        let criteria = Arc::clone(&criteria);
        tasks.spawn(async move { criteria.matches(&row).then_some((index, row)) });
    }

    let mut matched = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(hit)) => matched.push(hit),
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "Row match task failed"),
        }
    }
    matched.sort_by_key(|(index, _)| *index);
    matched.into_iter().map(|(_, row)| row).collect()
}

#[async_trait]
impl Handler for CacheHandler {
    async fn handle(&self, request: RequestContext) -> GatewayResponse {
        if let Err(response) = self.endpoint.authorize(&request).await {
            return response;
        }
        let params = match self.endpoint.parameters(&request, self.provider.use_body) {
            Ok(p) => p,
            Err(response) => return response,
        };

        let key = substitute(&self.provider.key, &params, Quoting::Raw);
        let cached = match self.context.connection(&self.provider.connection) {
            Ok(connection) => self.context.cache.get(&connection, self.provider.database, &key).await,
            Err(e) => Err(e),
        };
        let text = match cached {
            Ok(Some(text)) => text,
            Ok(None) => return self.endpoint.empty(StatusCode::NO_CONTENT),
            Err(e) => return self.endpoint.backend_failure(&request, &e),
        };

        let rows = match snapshot::decode(&text) {
            Ok(rows) => rows,
            Err(e) => return self.endpoint.shaping_failure(&request, &e),
        };

        let rows = select_rows(rows, RowCriteria::from_parameters(&params)).await;
        if rows.is_empty() {
            return self.endpoint.empty(StatusCode::NO_CONTENT);
        }
        self.endpoint.shape(&request, rows)
    }

    fn suspend(&self) {
        if let Some(job) = &self.refresh {
            job.stop();
        }
    }
}
