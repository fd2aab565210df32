//! Steps shared by every endpoint handler.
//!
//! # Data Flow
//! ```text
//! RequestContext
//!     → authorize (403 / 500 on rejection or provider failure)
//!     → parameters (400 on bad body or forbidden JSON)
//!     → [kind-specific backend call]
//!     → shape / success envelope, or failure envelope
//! ```
//!
//! # Design Decisions
//! - Backend error text is logged, never returned
//! - Error bodies carry the request id as tracking code only when the
//!   definition logs at error level, whatever the failure's own severity

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::collaborators::{Authenticator, BackendError, GatewayContext};
use crate::definition::{Authentication, Definition, LogTarget, Severity};
use crate::handlers::envelope::Envelope;
use crate::handlers::error::{BuildError, BuildResult};
use crate::handlers::params::Parameters;
use crate::http::request::RequestContext;
use crate::http::response::GatewayResponse;
use crate::observability::DefinitionLogger;
use crate::shaping::{Record, ResponseShaper, ShapingError};

/// Definition-level behaviour common to all provider kinds.
pub struct Endpoint {
    definition: Arc<Definition>,
    authenticator: Option<Arc<dyn Authenticator>>,
    logger: DefinitionLogger,
    envelope: Envelope,
}

impl Endpoint {
    /// Resolve the definition's authenticator and logger names.
    pub fn new(definition: Arc<Definition>, context: &GatewayContext) -> BuildResult<Self> {
        let authenticator = match &definition.authentication {
            Authentication::Disabled => None,
            Authentication::Provider(name) => Some(
                context
                    .authenticators
                    .get(name)
                    .cloned()
                    .ok_or_else(|| BuildError::UnknownAuthenticator(name.clone()))?,
            ),
        };

        let logger = match &definition.logs {
            LogTarget::Disabled => None,
            LogTarget::Named(name) => Some(
                context
                    .loggers
                    .get(name)
                    .cloned()
                    .ok_or_else(|| BuildError::UnknownLogger(name.clone()))?,
            ),
        };

        Ok(Self {
            envelope: Envelope::for_definition(&definition),
            logger: DefinitionLogger::new(logger, definition.log_threshold),
            definition,
            authenticator,
        })
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn logger(&self) -> &DefinitionLogger {
        &self.logger
    }

    /// Run the authenticator, if any.
    pub async fn authorize(&self, request: &RequestContext) -> Result<(), GatewayResponse> {
        let Some(authenticator) = &self.authenticator else {
            return Ok(());
        };

        match authenticator.authenticate(request).await {
            Ok(outcome) if outcome.authenticated => Ok(()),
            Ok(outcome) => {
                self.log(
                    Severity::Warning,
                    "request rejected by authentication",
                    request,
                    json!({ "reason": outcome.message }),
                );
                Err(self.failure(StatusCode::FORBIDDEN, request))
            }
            Err(e) => Err(self.backend_failure(request, &e)),
        }
    }

    /// Merge request inputs, answering 400 when they are unacceptable.
    pub fn parameters(&self, request: &RequestContext, use_body: bool) -> Result<Parameters, GatewayResponse> {
        Parameters::merge(&self.definition, request, use_body).map_err(|e| {
            self.log(
                Severity::Warning,
                "request inputs rejected",
                request,
                json!({ "reason": e.to_string() }),
            );
            self.failure(StatusCode::BAD_REQUEST, request)
        })
    }

    /// Group and render `records` per the definition's output rules.
    pub fn shape(&self, request: &RequestContext, records: Vec<Record>) -> GatewayResponse {
        let rules = &self.definition.output;
        match ResponseShaper::new(rules).shape(records, &rules.group_fields()) {
            Ok(value) => self.success(value),
            Err(e) => self.shaping_failure(request, &e),
        }
    }

    pub fn shaping_failure(&self, request: &RequestContext, error: &ShapingError) -> GatewayResponse {
        tracing::error!(
            request_id = %request.request_id,
            route = %self.definition.route_template,
            error = %error,
            "Shaping failed"
        );
        self.log(
            Severity::Exception,
            "shaping failed",
            request,
            json!({ "error": error.to_string() }),
        );
        self.failure(StatusCode::INTERNAL_SERVER_ERROR, request)
    }

    /// Apply rename/exclude to arbitrary JSON and wrap it.
    pub fn post_processed(&self, mut value: Value) -> GatewayResponse {
        ResponseShaper::new(&self.definition.output).post_process(&mut value);
        self.success(value)
    }

    pub fn success(&self, payload: Value) -> GatewayResponse {
        self.envelope.success(payload)
    }

    /// Error envelope; tracked when the definition logs at error level.
    pub fn failure(&self, status: StatusCode, request: &RequestContext) -> GatewayResponse {
        let tracking = self
            .logger
            .permits(Severity::Exception)
            .then_some(request.request_id.as_str());
        self.envelope.error(status, tracking)
    }

    /// 404 / 204 style answers that are not failures.
    pub fn empty(&self, status: StatusCode) -> GatewayResponse {
        if status == StatusCode::NO_CONTENT {
            GatewayResponse::no_content()
        } else {
            self.envelope.error(status, None)
        }
    }

    /// Log a collaborator failure in full and answer with a generic error.
    pub fn backend_failure(&self, request: &RequestContext, error: &BackendError) -> GatewayResponse {
        self.backend_failure_with_status(request, error, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn backend_failure_with_status(
        &self,
        request: &RequestContext,
        error: &BackendError,
        status: StatusCode,
    ) -> GatewayResponse {
        tracing::error!(
            request_id = %request.request_id,
            route = %self.definition.route_template,
            error = %error,
            "Backend call failed"
        );
        self.log(
            Severity::Exception,
            "backend call failed",
            request,
            json!({ "error": error.to_string() }),
        );
        self.failure(status, request)
    }

    pub fn log(&self, severity: Severity, message: &str, request: &RequestContext, mut payload: Value) {
        if !self.logger.permits(severity) {
            return;
        }
        if let Value::Object(map) = &mut payload {
            map.insert("trackingCode".into(), Value::String(request.request_id.clone()));
            map.insert("route".into(), Value::String(self.definition.route_template.clone()));
            map.insert("path".into(), Value::String(request.path.clone()));
        }
        self.logger.log(severity, message, &payload);
    }
}
