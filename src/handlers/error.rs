//! Handler construction errors.

use thiserror::Error;

/// A parsed definition could not be turned into a live handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("unknown authentication provider `{0}`")]
    UnknownAuthenticator(String),

    #[error("unknown logger `{0}`")]
    UnknownLogger(String),

    #[error("no {0} executor is configured")]
    MissingExecutor(&'static str),

    #[error("invalid HTTP method `{0}`")]
    InvalidMethod(String),

    #[error("invalid route template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("`{0}` data sources cannot be served")]
    UnsupportedProvider(&'static str),

    #[error("task parameter `{name}`: {reason}")]
    InvalidTaskParameter { name: String, reason: String },
}

pub type BuildResult<T> = Result<T, BuildError>;
